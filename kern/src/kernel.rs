//! The kernel aggregate: task table, ready queue, and event map, plus the
//! synchronous Send/Receive/Reply engine and task lifecycle operations.
//!
//! This struct is reached only from trap context (`syscalls::dispatch`,
//! `event::handle_interrupt`'s caller). There is no `static mut` and no
//! global lock: the single-threaded-kernel invariant (§9) means ordinary
//! `&mut Kernel` borrowing through the call stack is sufficient.

use crate::arch::{self, ArchState, StackInit};
use crate::containers::PriorityQueue;
use crate::err::{CreateError, EventError, SrrError};
use crate::event::EventMap;
use crate::task::{Priority, TaskDescriptor, TaskState, Tid};

/// Copies `min(src_len, dst_cap)` bytes from `src_ptr` to `dst_ptr`.
///
/// # Safety
///
/// The caller must guarantee both ranges are valid for the given lengths and
/// do not overlap. The kernel does not validate user-supplied pointers
/// (§4.4) -- they are trusted to lie within the calling task's own stack.
unsafe fn copy_bytes(src_ptr: usize, src_len: usize, dst_ptr: usize, dst_cap: usize) -> usize {
    let n = src_len.min(dst_cap);
    if n > 0 {
        core::ptr::copy_nonoverlapping(src_ptr as *const u8, dst_ptr as *mut u8, n);
    }
    n
}

/// Writes `tid`'s index into the `u32` at `out_ptr`.
///
/// # Safety
///
/// `out_ptr` must be valid for a `u32` write.
unsafe fn write_tid(out_ptr: usize, tid: Tid) {
    (out_ptr as *mut u32).write(tid.index() as u32);
}

pub struct Kernel<
    const TASKS: usize = { abi::DEFAULT_TASK_CAPACITY },
    const EVENTS: usize = { abi::DEFAULT_EVENT_CAPACITY },
> {
    tasks: [Option<TaskDescriptor>; TASKS],
    ready: PriorityQueue<Tid, TASKS>,
    events: EventMap<EVENTS>,
    current: Tid,
    idle_tid: Tid,
    idle_ticks: crate::time::IdleAccounting,
}

impl<const TASKS: usize, const EVENTS: usize> Default for Kernel<TASKS, EVENTS> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const TASKS: usize, const EVENTS: usize> Kernel<TASKS, EVENTS> {
    pub const fn new() -> Self {
        Self {
            tasks: [const { None }; TASKS],
            ready: PriorityQueue::new(),
            events: EventMap::new(),
            current: Tid(0),
            idle_tid: Tid(0),
            idle_ticks: crate::time::IdleAccounting::new(),
        }
    }

    pub fn task(&self, tid: Tid) -> Option<&TaskDescriptor> {
        self.tasks.get(tid.index())?.as_ref()
    }

    pub fn task_mut(&mut self, tid: Tid) -> Option<&mut TaskDescriptor> {
        self.tasks.get_mut(tid.index())?.as_mut()
    }

    pub fn current(&self) -> Tid {
        self.current
    }

    pub fn set_idle(&mut self, tid: Tid) {
        self.idle_tid = tid;
    }

    pub fn idle(&self) -> Tid {
        self.idle_tid
    }

    pub fn num_event_waiters(&self) -> usize {
        self.events.num_waiters()
    }

    pub fn record_tick(&mut self, was_idle: bool) {
        self.idle_ticks.record_tick(was_idle);
    }

    pub fn idle_percent(&self) -> u32 {
        self.idle_ticks.idle_percent()
    }

    fn require_task(&self, tid: Tid) -> Result<usize, SrrError> {
        let idx = tid.index();
        if idx >= TASKS || self.tasks[idx].is_none() {
            Err(SrrError::BadTid)
        } else {
            Ok(idx)
        }
    }

    fn push_ready(&mut self, tid: Tid) {
        let priority = self.tasks[tid.index()].as_ref().unwrap().priority.value();
        self.ready
            .push(tid, priority)
            .expect("ready queue overflow");
    }

    /// Creates a task at `priority`, owned by `parent`, that will begin
    /// execution at `entry`. `priority` is assumed already validated by the
    /// caller (the syscall dispatcher rejects negative priorities before
    /// this is ever called; bootstrap passes `Priority::IDLE` directly for
    /// the one task allowed to have it).
    pub fn create(
        &mut self,
        priority: Priority,
        parent: Option<Tid>,
        entry: arch::EntryPoint,
    ) -> Result<Tid, CreateError> {
        let slot = self
            .tasks
            .iter()
            .position(Option::is_none)
            .ok_or(CreateError::OutOfTaskDescriptors)?;
        let tid = Tid::new(slot);
        let save = arch::Stacks::init_stack(slot, entry);
        self.tasks[slot] = Some(TaskDescriptor::new(tid, priority, parent, save));
        self.push_ready(tid);
        Ok(tid)
    }

    /// Creates the idle task directly in the reserved last slot, bypassing
    /// both the free-slot scan and the `priority >= 0` check that guards the
    /// ordinary `create` -- only the bootstrap may call this, exactly once.
    pub fn create_idle(&mut self, entry: arch::EntryPoint) -> Tid {
        let slot = TASKS - 1;
        assert!(self.tasks[slot].is_none(), "idle slot already occupied");
        let tid = Tid::new(slot);
        let save = arch::Stacks::init_stack(slot, entry);
        self.tasks[slot] = Some(TaskDescriptor::new(tid, Priority::IDLE, None, save));
        self.push_ready(tid);
        tid
    }

    /// Tears down `tid`'s slot, waking every task queued to send to it with
    /// the "receiver terminated" code (§4.2).
    pub fn exit(&mut self, tid: Tid) {
        let idx = tid.index();
        let mut cursor = self.tasks[idx].as_ref().and_then(|t| t.send_queue_head);
        while let Some(sender) = cursor {
            let sender_idx = sender.index();
            let next = match self.tasks[sender_idx].as_ref().unwrap().state {
                TaskState::SendWait { next_in_queue, .. } => next_in_queue,
                _ => unreachable!("queued sender must be in SendWait"),
            };
            {
                let sender_task = self.tasks[sender_idx].as_mut().unwrap();
                sender_task.state = TaskState::Ready;
                sender_task.save.set_ret0(abi::ret::DEAD as u32);
            }
            self.push_ready(sender);
            cursor = next;
        }
        self.tasks[idx] = None;
    }

    /// Implements `Send`. On success the caller has been transitioned either
    /// to `SendWait` (queued) or `ReplyWait` (delivered, awaiting `Reply`);
    /// the caller's eventual return value is written later, never here.
    pub fn send(
        &mut self,
        caller: Tid,
        callee: Tid,
        msg_ptr: usize,
        msg_len: usize,
        reply_ptr: usize,
        reply_cap: usize,
    ) -> Result<(), SrrError> {
        let callee_idx = self.require_task(callee)?;
        let caller_idx = caller.index();

        let recv_args = match self.tasks[callee_idx].as_ref().unwrap().state {
            TaskState::RecvWait {
                out_tid_ptr,
                recv_buf,
                recv_cap,
            } => Some((out_tid_ptr, recv_buf, recv_cap)),
            _ => None,
        };

        if let Some((out_tid_ptr, recv_buf, recv_cap)) = recv_args {
            // Deliver directly: callee was already waiting in Receive.
            let n = unsafe { copy_bytes(msg_ptr, msg_len, recv_buf, recv_cap) };
            unsafe { write_tid(out_tid_ptr, caller) };
            {
                let callee_task = self.tasks[callee_idx].as_mut().unwrap();
                callee_task.state = TaskState::Ready;
                callee_task.save.set_ret0(n as u32);
            }
            self.push_ready(callee);
            self.tasks[caller_idx].as_mut().unwrap().state = TaskState::ReplyWait {
                reply_buf: reply_ptr,
                reply_cap,
            };
        } else {
            // Callee busy (Ready, SendWait, ReplyWait, or EventWait): queue.
            self.tasks[caller_idx].as_mut().unwrap().state = TaskState::SendWait {
                callee,
                msg_ptr,
                msg_len,
                reply_ptr,
                reply_cap,
                next_in_queue: None,
            };
            let prev_tail = self.tasks[callee_idx].as_ref().unwrap().send_queue_tail;
            match prev_tail {
                Some(prev) => {
                    if let TaskState::SendWait { next_in_queue, .. } =
                        &mut self.tasks[prev.index()].as_mut().unwrap().state
                    {
                        *next_in_queue = Some(caller);
                    }
                }
                None => {
                    self.tasks[callee_idx].as_mut().unwrap().send_queue_head = Some(caller);
                }
            }
            self.tasks[callee_idx].as_mut().unwrap().send_queue_tail = Some(caller);
        }
        Ok(())
    }

    /// Implements `Receive`. Returns `Some(n)` if a queued sender's message
    /// was delivered immediately (the caller's own return value); `None` if
    /// the caller is now blocked in `RecvWait`.
    pub fn receive(
        &mut self,
        caller: Tid,
        out_tid_ptr: usize,
        recv_buf: usize,
        recv_cap: usize,
    ) -> Option<u32> {
        let caller_idx = caller.index();
        let head = self.tasks[caller_idx].as_ref().unwrap().send_queue_head;
        let sender = head?;
        let sender_idx = sender.index();
        let (msg_ptr, msg_len, reply_ptr, reply_cap, next) =
            match self.tasks[sender_idx].as_ref().unwrap().state {
                TaskState::SendWait {
                    msg_ptr,
                    msg_len,
                    reply_ptr,
                    reply_cap,
                    next_in_queue,
                    ..
                } => (msg_ptr, msg_len, reply_ptr, reply_cap, next_in_queue),
                _ => unreachable!("queued sender must be in SendWait"),
            };

        let n = unsafe { copy_bytes(msg_ptr, msg_len, recv_buf, recv_cap) };
        unsafe { write_tid(out_tid_ptr, sender) };

        let caller_task = self.tasks[caller_idx].as_mut().unwrap();
        caller_task.send_queue_head = next;
        if next.is_none() {
            caller_task.send_queue_tail = None;
        }
        self.tasks[sender_idx].as_mut().unwrap().state = TaskState::ReplyWait {
            reply_buf: reply_ptr,
            reply_cap,
        };
        Some(n as u32)
    }

    /// Blocks `caller` in `RecvWait` when its send queue was empty.
    pub fn block_in_receive(&mut self, caller: Tid, out_tid_ptr: usize, recv_buf: usize, recv_cap: usize) {
        self.tasks[caller.index()].as_mut().unwrap().state = TaskState::RecvWait {
            out_tid_ptr,
            recv_buf,
            recv_cap,
        };
    }

    /// Implements `Reply`. Returns the byte count delivered to `target` on
    /// success.
    pub fn reply(&mut self, target: Tid, reply_ptr: usize, reply_len: usize) -> Result<u32, SrrError> {
        let target_idx = self.require_task(target)?;
        let (reply_buf, reply_cap) = match self.tasks[target_idx].as_ref().unwrap().state {
            TaskState::ReplyWait {
                reply_buf,
                reply_cap,
            } => (reply_buf, reply_cap),
            _ => return Err(SrrError::Dead),
        };
        let n = unsafe { copy_bytes(reply_ptr, reply_len, reply_buf, reply_cap) };
        {
            let target_task = self.tasks[target_idx].as_mut().unwrap();
            target_task.state = TaskState::Ready;
            target_task.save.set_ret0(n as u32);
        }
        self.push_ready(target);
        Ok(n as u32)
    }

    /// Implements `AwaitEvent`'s blocking half, after the allow-list check.
    pub fn await_event(&mut self, caller: Tid, event_id: u32) -> Result<(), EventError> {
        if !abi::event::is_allowed(event_id) {
            return Err(EventError::Disallowed);
        }
        self.events.register(event_id, caller);
        self.tasks[caller.index()].as_mut().unwrap().state = TaskState::EventWait { event_id };
        Ok(())
    }

    /// Delivers a fired interrupt to its waiter, if any. Returns the woken
    /// task, if there was one, purely for logging -- the wake itself already
    /// happened (state set to `Ready`, pushed to the ready queue).
    pub fn handle_interrupt(&mut self, event_id: u32, payload: u32) -> Option<Tid> {
        let waiter = self.events.fire(event_id)?;
        let idx = waiter.index();
        let task = self.tasks[idx].as_mut().unwrap();
        task.state = TaskState::Ready;
        task.save.set_ret0(payload);
        self.push_ready(waiter);
        Some(waiter)
    }

    /// Pops the next task to run. Panics if nothing is runnable -- this
    /// should never happen because the idle task is always ready when no
    /// other task is (§4.3).
    pub fn schedule(&mut self) -> Tid {
        self.ready.pop().expect("no tasks runnable")
    }

    pub fn activate(&mut self, tid: Tid) {
        self.current = tid;
        let priority = self.tasks[tid.index()].as_ref().unwrap().priority;
        arch::note_activation(tid, priority);
    }

    /// After a trap returns control to the kernel, re-queues `tid` if its
    /// state is still `Ready` (i.e. it neither blocked nor exited).
    pub fn requeue_if_ready(&mut self, tid: Tid) {
        let idx = tid.index();
        if matches!(&self.tasks[idx], Some(t) if t.is_ready()) {
            self.push_ready(tid);
        }
    }
}
