//! Kernel bootstrap and main loop.
//!
//! [`build`] constructs a [`Kernel`] with the idle task and the first user
//! task created and ready; [`run`] then drives schedule/activate/trap forever
//! until the shutdown condition is reached. The two are split so that `build`
//! and the scheduling logic in `run` stay host-testable: only the "resume a
//! task in user mode and wait for the next trap" step is genuinely
//! architecture-specific, and it's injected as a closure rather than called
//! directly, so tests can script a sequence of synthetic traps instead of
//! running real user code.

use crate::kernel::Kernel;
use crate::syscalls::{self, Outcome};
use crate::task::Priority;

/// What brought the kernel back from a resumed task.
pub enum Trap {
    /// A supervisor call, with its decoded syscall number.
    Syscall(u32),
    /// A hardware interrupt, with the event id and any associated payload.
    Interrupt { event_id: u32, payload: u32 },
}

/// Parameters for [`build`]: the priority and entry point of the one task the
/// bootstrap creates itself. Everything else -- a name server, additional
/// workers -- is up to that first task to create via `Create`.
pub struct BootConfig {
    pub first_task_priority: Priority,
    pub first_task_entry: crate::arch::EntryPoint,
}

/// The idle task: the lowest-priority task in the system, always ready,
/// scheduled only when nothing else is. Its body never actually runs on the
/// host backend (`arch::sim` has no real user-mode execution); on `ts7200` it
/// would sit in a low-power wait for the next interrupt.
fn idle_task_entry() -> ! {
    loop {}
}

/// Builds a fresh kernel with the idle task in its reserved slot and the
/// first user task created at `config.first_task_priority`. Does not touch
/// any hardware; callers targeting a real board should run [`arch_init`]
/// first.
pub fn build<const TASKS: usize, const EVENTS: usize>(config: BootConfig) -> Kernel<TASKS, EVENTS> {
    let mut kernel = Kernel::new();
    let idle = kernel.create_idle(idle_task_entry);
    kernel.set_idle(idle);
    kernel
        .create(config.first_task_priority, None, config.first_task_entry)
        .expect("task table has no room for both the idle task and the first user task");
    kernel
}

/// Performs one-time hardware setup: installs the trap vectors and starts the
/// tick/free-running timers. A no-op on the host backend.
///
/// # Safety
///
/// Must run exactly once, before `run`, and before interrupts are unmasked.
pub unsafe fn arch_init() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "arm")] {
            crate::arch::ts7200::install_vectors();
            crate::arch::ts7200::configure_timers();
        } else {
            log::debug!("arch_init: host backend, nothing to install");
        }
    }
}

/// Masks interrupts and stops the timers on the way back to the boot
/// monitor. A no-op on the host backend.
///
/// # Safety
///
/// Only call once, on the shutdown path; leaves the board unable to service
/// further interrupts.
unsafe fn arch_shutdown() {
    cfg_if::cfg_if! {
        if #[cfg(target_arch = "arm")] {
            crate::arch::ts7200::mask_all_and_stop_timers();
        } else {
            log::debug!("arch_shutdown: host backend, nothing to mask");
        }
    }
}

/// Drives the kernel forever: schedule the next task, check whether it's
/// time to shut down, activate it, and handle whatever trap comes back.
///
/// Shuts down (returning the exit status) when either a task calls
/// `Shutdown`, or the only runnable task is idle and no task is blocked in
/// `AwaitEvent` -- at that point nothing could ever wake the system again
/// (§9), so there is no point resuming idle at all.
///
/// `next_trap` performs the architecture-specific "resume `kernel.current()`
/// in user mode and block until the next trap" step, reporting what
/// happened. Real boot code on `ts7200` plugs in the real context switch;
/// tests plug in a scripted sequence that also pokes the resumed task's
/// saved registers first, exactly as if it had run up to that syscall.
pub fn run<const TASKS: usize, const EVENTS: usize>(
    mut kernel: Kernel<TASKS, EVENTS>,
    mut next_trap: impl FnMut(&mut Kernel<TASKS, EVENTS>) -> Trap,
) -> i32 {
    loop {
        let tid = kernel.schedule();
        if tid == kernel.idle() && kernel.num_event_waiters() == 0 {
            log::info!("only idle runnable and nothing can ever wake again; shutting down");
            return shutdown(kernel, 0);
        }
        kernel.activate(tid);
        match next_trap(&mut kernel) {
            Trap::Syscall(nr) => {
                if let Outcome::Shutdown(status) = syscalls::dispatch(&mut kernel, nr) {
                    return shutdown(kernel, status);
                }
            }
            Trap::Interrupt { event_id, payload } => {
                let interrupted = kernel.current();
                if event_id == abi::event::TICK {
                    // The periodic tick is the kernel's only clock: charge
                    // this elapsed tick to idle time iff idle was the task
                    // the tick interrupted.
                    kernel.record_tick(interrupted == kernel.idle());
                }
                syscalls::dispatch_interrupt(&mut kernel, event_id, payload);
                // An interrupt doesn't change what the interrupted task was
                // doing; if it was simply Ready (e.g. idle, or a task
                // between syscalls), it needs to go back in the ready pool
                // the same way `dispatch` requeues a task after a syscall.
                kernel.requeue_if_ready(interrupted);
            }
        }
    }
}

fn shutdown<const TASKS: usize, const EVENTS: usize>(_kernel: Kernel<TASKS, EVENTS>, status: i32) -> i32 {
    // SAFETY: called exactly once, on the way back to the boot monitor.
    unsafe {
        arch_shutdown();
    }
    status
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arch::sim::SavedState;
    use abi::Tid;

    fn user_task() -> ! {
        loop {}
    }

    #[test]
    fn build_creates_idle_and_first_task_ready() {
        let mut kernel: Kernel<8, 8> = build(BootConfig {
            first_task_priority: Priority::new(1).unwrap(),
            first_task_entry: user_task,
        });
        let first = kernel.schedule();
        assert_eq!(first, Tid::new(0));
        assert_eq!(kernel.schedule(), kernel.idle());
    }

    #[test]
    fn run_shuts_down_immediately_when_only_idle_is_runnable() {
        let kernel: Kernel<8, 8> = {
            let mut k = Kernel::new();
            let idle = k.create_idle(user_task);
            k.set_idle(idle);
            k
        };
        let status = run(kernel, |_k| unreachable!("idle-only kernel never traps"));
        assert_eq!(status, 0);
    }

    #[test]
    fn run_dispatches_a_scripted_shutdown_syscall() {
        let kernel: Kernel<8, 8> = build(BootConfig {
            first_task_priority: Priority::new(1).unwrap(),
            first_task_entry: user_task,
        });
        let status = run(kernel, |k| {
            let t = k.current();
            k.task_mut(t).unwrap().save = SavedState::with_args([99, 0, 0, 0, 0]);
            Trap::Syscall(abi::Sysnum::Shutdown as u32)
        });
        assert_eq!(status, 99);
    }

    #[test]
    fn run_delivers_a_scripted_interrupt_then_lets_the_waiter_finish() {
        let kernel: Kernel<8, 8> = build(BootConfig {
            first_task_priority: Priority::new(1).unwrap(),
            first_task_entry: user_task,
        });
        let mut step = 0;
        let status = run(kernel, |k| {
            step += 1;
            match step {
                1 => {
                    let t = k.current();
                    k.task_mut(t).unwrap().save =
                        SavedState::with_args([abi::event::TICK, 0, 0, 0, 0]);
                    Trap::Syscall(abi::Sysnum::AwaitEvent as u32)
                }
                2 => Trap::Interrupt {
                    event_id: abi::event::TICK,
                    payload: 0,
                },
                _ => {
                    let t = k.current();
                    k.task_mut(t).unwrap().save = SavedState::with_args([5, 0, 0, 0, 0]);
                    Trap::Syscall(abi::Sysnum::Shutdown as u32)
                }
            }
        });
        assert_eq!(status, 5);
    }

    #[test]
    fn tick_interrupts_advance_idle_accounting() {
        let kernel: Kernel<8, 8> = build(BootConfig {
            first_task_priority: Priority::new(1).unwrap(),
            first_task_entry: user_task,
        });
        let mut step = 0;
        let status = run(kernel, |k| {
            step += 1;
            match step {
                1 => {
                    let t = k.current();
                    k.task_mut(t).unwrap().save =
                        SavedState::with_args([abi::event::TICK, 0, 0, 0, 0]);
                    Trap::Syscall(abi::Sysnum::AwaitEvent as u32)
                }
                2 => {
                    // Only idle is ready now; this tick interrupts it.
                    assert_eq!(k.current(), k.idle());
                    Trap::Interrupt {
                        event_id: abi::event::TICK,
                        payload: 0,
                    }
                }
                3 => {
                    assert_eq!(k.idle_percent(), 100);
                    let t = k.current();
                    k.task_mut(t).unwrap().save = SavedState::with_args([0; 5]);
                    Trap::Syscall(abi::Sysnum::Yield as u32)
                }
                4 => {
                    // The woken task is running again; this tick interrupts
                    // it, not idle.
                    assert_ne!(k.current(), k.idle());
                    Trap::Interrupt {
                        event_id: abi::event::TICK,
                        payload: 0,
                    }
                }
                _ => {
                    assert_eq!(k.idle_percent(), 50);
                    let t = k.current();
                    k.task_mut(t).unwrap().save = SavedState::with_args([3, 0, 0, 0, 0]);
                    Trap::Syscall(abi::Sysnum::Shutdown as u32)
                }
            }
        });
        assert_eq!(status, 3);
    }
}
