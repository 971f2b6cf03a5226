//! Architecture boundary.
//!
//! The rest of the kernel is written against [`ArchState`] and the small set
//! of free functions below; it never reaches for a register or a raw trap
//! vector directly. Two backends implement the boundary: [`ts7200`], the real
//! ARMv4 SWI/IRQ shim for the reference board, and [`sim`], an in-memory
//! stand-in used by `cargo test` and by host-side tools. Selection is by
//! `cfg`, not by a generic parameter, so the rest of the crate names one
//! concrete `SavedState` type.

use abi::Priority;

pub mod sim;
pub mod ts7200;

cfg_if::cfg_if! {
    if #[cfg(target_arch = "arm")] {
        pub use ts7200::SavedState;
        pub use ts7200::Stacks;
    } else {
        pub use sim::SavedState;
        pub use sim::Stacks;
    }
}

/// A task's entry point. Never returns: falling off the end is implicitly an
/// `Exit`, via the `lr` written into the initial stack frame (§3).
pub type EntryPoint = fn() -> !;

/// Per-task saved register frame, read by the dispatcher to extract syscall
/// arguments and written by it to deliver syscall return values.
///
/// Mirrors the real hardware convention: the first four syscall arguments
/// live in registers 0-3, and a fifth (used only by `Send`, for its
/// `reply_cap`) lives in a stack spill slot. Implementors choose whatever
/// internal representation suits the backend; `sim`'s is a plain array.
pub trait ArchState: Default + core::fmt::Debug {
    fn arg(&self, index: usize) -> u32;
    fn set_ret(&mut self, index: usize, value: u32);

    fn arg0(&self) -> u32 {
        self.arg(0)
    }
    fn arg1(&self) -> u32 {
        self.arg(1)
    }
    fn arg2(&self) -> u32 {
        self.arg(2)
    }
    fn arg3(&self) -> u32 {
        self.arg(3)
    }
    /// The fifth syscall argument, read from the stack spill slot.
    fn arg4(&self) -> u32 {
        self.arg(4)
    }

    /// Writes a syscall's single return value (register 0).
    fn set_ret0(&mut self, value: u32) {
        self.set_ret(0, value);
    }

    fn ret0(&self) -> u32 {
        self.arg(0)
    }
}

/// Per-architecture stack bookkeeping for a freshly created task.
///
/// `ts7200` reserves a real slice of a statically sized stacks region and
/// writes the bit-exact initial frame into it (§3); `sim` has no memory
/// layout to protect and always succeeds, recording only the entry point for
/// diagnostics. Either way, exceeding the architecture's own notion of
/// capacity is a kernel panic, not a recoverable error (§4.2).
pub trait StackInit {
    /// Builds a fresh `SavedState` for `slot` (an index into the task table)
    /// that will resume execution at `entry`. Panics if `slot` exceeds the
    /// backend's statically reserved capacity -- this indicates the
    /// bootstrap sized the task table larger than the stacks region allows,
    /// which is a build-time misconfiguration, not a runtime condition a
    /// caller can recover from.
    fn init_stack(slot: usize, entry: EntryPoint) -> SavedState;
}

/// Performs the architecture-specific work of resuming `tid` in user mode.
///
/// On `ts7200` this restores the saved frame and returns to user mode via
/// the real context-switch sequence and never returns to its caller until
/// the task next traps. On `sim` there is no real user-mode execution to
/// resume -- tests drive syscalls directly -- so this is a no-op recorded
/// only for bookkeeping/log purposes.
pub fn note_activation(tid: abi::Tid, priority: Priority) {
    log::trace!("activate tid={:?} priority={:?}", tid, priority);
}
