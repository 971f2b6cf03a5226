//! Supervisor-call dispatcher.
//!
//! Decodes the syscall number and the saved register frame of the currently
//! running task, calls into the portable [`Kernel`] engine, and writes any
//! immediate return value back into that frame. Blocking calls (`Send` into
//! a busy receiver, `Receive` with an empty send queue, `AwaitEvent`) leave
//! the return register untouched here -- it gets written later, by whatever
//! wakes the task.

use crate::arch::ArchState;
use crate::err::{CreateError, EventError};
use crate::kernel::Kernel;
use crate::task::Priority;
use abi::{Sysnum, Tid};

/// What the main loop should do after a trap has been fully handled.
#[must_use]
pub enum Outcome {
    /// Continue the schedule/activate loop as usual.
    Continue,
    /// Shut down with the given exit status (`Shutdown` syscall).
    Shutdown(i32),
}

/// Dispatches one trap for the currently running task. `nr` is the decoded
/// syscall number; arguments and return values are read from and written to
/// that task's saved frame.
pub fn dispatch<const TASKS: usize, const EVENTS: usize>(
    kernel: &mut Kernel<TASKS, EVENTS>,
    nr: u32,
) -> Outcome {
    let current = kernel.current();
    let sysnum = Sysnum::try_from(nr).unwrap_or_else(|_| panic!("unknown syscall number {nr}"));

    match sysnum {
        Sysnum::Yield => {
            log::trace!("tid={:?} Yield", current);
        }
        Sysnum::Exit => {
            let status = arg(kernel, current, 0) as i32;
            log::debug!("tid={:?} Exit(status={status})", current);
            kernel.exit(current);
        }
        Sysnum::MyTid => {
            set_ret0(kernel, current, current.index() as u32);
        }
        Sysnum::MyParentTid => {
            let parent = kernel.task(current).and_then(|t| t.parent_tid);
            let ret = parent.map(|t| t.index() as u32).unwrap_or(abi::ret::BAD_TID as u32);
            set_ret0(kernel, current, ret);
        }
        Sysnum::Create => {
            let raw_priority = arg(kernel, current, 0) as i32;
            let entry_addr = arg(kernel, current, 1) as usize;
            let result = match Priority::new(raw_priority) {
                None => Err(CreateError::InvalidPriority),
                Some(priority) => {
                    // SAFETY: the caller is trusted to have passed the address
                    // of a real `arch::EntryPoint`-shaped function; the kernel
                    // does not call it until the new task is first activated.
                    let entry: crate::arch::EntryPoint =
                        unsafe { core::mem::transmute(entry_addr) };
                    kernel.create(priority, Some(current), entry)
                }
            };
            let ret = match result {
                Ok(tid) => tid.index() as u32,
                Err(e) => e.code() as u32,
            };
            set_ret0(kernel, current, ret);
        }
        Sysnum::Send => {
            let callee = Tid::new(arg(kernel, current, 0) as usize);
            let msg_ptr = arg(kernel, current, 1) as usize;
            let msg_len = arg(kernel, current, 2) as usize;
            let reply_ptr = arg(kernel, current, 3) as usize;
            let reply_cap = arg(kernel, current, 4) as usize;
            if let Err(e) = kernel.send(current, callee, msg_ptr, msg_len, reply_ptr, reply_cap) {
                set_ret0(kernel, current, e.code() as u32);
            }
        }
        Sysnum::Receive => {
            let out_tid_ptr = arg(kernel, current, 0) as usize;
            let recv_buf = arg(kernel, current, 1) as usize;
            let recv_cap = arg(kernel, current, 2) as usize;
            match kernel.receive(current, out_tid_ptr, recv_buf, recv_cap) {
                Some(n) => set_ret0(kernel, current, n),
                None => kernel.block_in_receive(current, out_tid_ptr, recv_buf, recv_cap),
            }
        }
        Sysnum::Reply => {
            let target = Tid::new(arg(kernel, current, 0) as usize);
            let reply_ptr = arg(kernel, current, 1) as usize;
            let reply_len = arg(kernel, current, 2) as usize;
            let ret = match kernel.reply(target, reply_ptr, reply_len) {
                Ok(n) => n,
                Err(e) => e.code() as u32,
            };
            set_ret0(kernel, current, ret);
        }
        Sysnum::AwaitEvent => {
            let event_id = arg(kernel, current, 0);
            if let Err(EventError::Disallowed) = kernel.await_event(current, event_id) {
                set_ret0(kernel, current, abi::ret::INVALID_EVENT as u32);
            }
        }
        Sysnum::Perf => {
            set_ret0(kernel, current, kernel.idle_percent());
        }
        Sysnum::Panic => {
            let code = arg(kernel, current, 0);
            log::error!("tid={:?} user panic, code={code}", current);
            panic!("user task {current:?} called Panic (code {code})");
        }
        Sysnum::Shutdown => {
            let status = arg(kernel, current, 0) as i32;
            return Outcome::Shutdown(status);
        }
    }

    kernel.requeue_if_ready(current);
    Outcome::Continue
}

/// Delivers a fired interrupt, logging the outcome. Used by the board's IRQ
/// path (and directly by tests) instead of `dispatch`, since interrupts
/// aren't syscalls.
pub fn dispatch_interrupt<const TASKS: usize, const EVENTS: usize>(
    kernel: &mut Kernel<TASKS, EVENTS>,
    event_id: u32,
    payload: u32,
) {
    match kernel.handle_interrupt(event_id, payload) {
        Some(woken) => log::trace!("event {event_id} woke tid={:?}", woken),
        None => log::trace!("event {event_id} fired with no waiter"),
    }
}

fn arg<const TASKS: usize, const EVENTS: usize>(
    kernel: &Kernel<TASKS, EVENTS>,
    tid: Tid,
    index: usize,
) -> u32 {
    kernel.task(tid).expect("current task missing").save.arg(index)
}

fn set_ret0<const TASKS: usize, const EVENTS: usize>(
    kernel: &mut Kernel<TASKS, EVENTS>,
    tid: Tid,
    value: u32,
) {
    kernel
        .task_mut(tid)
        .expect("current task missing")
        .save
        .set_ret0(value);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::Kernel;

    fn new_kernel() -> Kernel<8, 8> {
        Kernel::new()
    }

    fn set_args(kernel: &mut Kernel<8, 8>, tid: Tid, args: [u32; 5]) {
        kernel.task_mut(tid).unwrap().save = crate::arch::sim::SavedState::with_args(args);
    }

    #[test]
    fn yield_leaves_task_ready_and_requeues_it() {
        let mut k = new_kernel();
        let t = k.create(Priority::new(1).unwrap(), None, || loop {}).unwrap();
        k.schedule();
        k.activate(t);
        set_args(&mut k, t, [0; 5]);
        assert!(matches!(dispatch(&mut k, Sysnum::Yield as u32), Outcome::Continue));
        assert_eq!(k.schedule(), t);
    }

    #[test]
    fn my_tid_returns_own_index() {
        let mut k = new_kernel();
        let t = k.create(Priority::new(1).unwrap(), None, || loop {}).unwrap();
        k.schedule();
        k.activate(t);
        set_args(&mut k, t, [0; 5]);
        dispatch(&mut k, Sysnum::MyTid as u32);
        assert_eq!(k.task(t).unwrap().save.ret0(), t.index() as u32);
    }

    #[test]
    fn await_event_with_bad_id_returns_invalid_event_immediately() {
        let mut k = new_kernel();
        let t = k.create(Priority::new(1).unwrap(), None, || loop {}).unwrap();
        k.schedule();
        k.activate(t);
        set_args(&mut k, t, [999, 0, 0, 0, 0]);
        dispatch(&mut k, Sysnum::AwaitEvent as u32);
        assert_eq!(
            k.task(t).unwrap().save.ret0(),
            abi::ret::INVALID_EVENT as u32
        );
    }

    #[test]
    fn shutdown_is_reported_to_caller() {
        let mut k = new_kernel();
        let t = k.create(Priority::new(1).unwrap(), None, || loop {}).unwrap();
        k.schedule();
        k.activate(t);
        set_args(&mut k, t, [7, 0, 0, 0, 0]);
        match dispatch(&mut k, Sysnum::Shutdown as u32) {
            Outcome::Shutdown(status) => assert_eq!(status, 7),
            Outcome::Continue => panic!("expected shutdown"),
        }
    }
}
