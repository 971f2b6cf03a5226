//! Host-side architecture backend.
//!
//! Used by `cargo test` and by any host tool that wants to drive the
//! portable kernel logic without real hardware. There is no real user-mode
//! execution here: tests construct a [`SavedState`] with the arguments a
//! task's registers would have held, hand it to the dispatcher, and assert
//! on the resulting kernel/task state.

use super::{ArchState, EntryPoint, StackInit};

/// A saved register frame: four argument registers, one stack-spill slot for
/// `Send`'s fifth argument, and the return-value register. Real hardware
/// would spread this across a stack frame and a handful of registers; here
/// it's just an array.
#[derive(Copy, Clone, Debug, Default)]
pub struct SavedState {
    args: [u32; 5],
    ret0: u32,
    /// Recorded only for debugging -- `sim` never actually calls this.
    entry: Option<EntryPoint>,
}

impl SavedState {
    /// Builds a frame with the given syscall arguments, as if a task had
    /// just trapped with them in its registers. Test-only convenience.
    pub fn with_args(args: [u32; 5]) -> Self {
        Self {
            args,
            ret0: 0,
            entry: None,
        }
    }
}

impl ArchState for SavedState {
    fn arg(&self, index: usize) -> u32 {
        self.args[index]
    }

    fn set_ret(&mut self, index: usize, value: u32) {
        if index == 0 {
            self.ret0 = value;
        }
    }

    fn ret0(&self) -> u32 {
        self.ret0
    }
}

pub struct Stacks;

impl StackInit for Stacks {
    fn init_stack(_slot: usize, entry: EntryPoint) -> SavedState {
        SavedState {
            args: [0; 5],
            ret0: 0,
            entry: Some(entry),
        }
    }
}
