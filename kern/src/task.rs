//! Task descriptors and the per-task blocking state machine.

pub use abi::{Priority, Tid};

use crate::arch;

/// A task's blocking state, carrying exactly the data needed to resume it
/// (§3). Never a tag word plus separate flag booleans -- a genuine sum type,
/// matched exhaustively everywhere it's consumed.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TaskState {
    /// Eligible to run; present in the ready queue unless currently running.
    Ready,
    /// Blocked sending to `callee`. `next_in_queue` links to the next sender
    /// also waiting on the same receiver, forming an intrusive FIFO.
    SendWait {
        callee: Tid,
        msg_ptr: usize,
        msg_len: usize,
        reply_ptr: usize,
        reply_cap: usize,
        next_in_queue: Option<Tid>,
    },
    /// Blocked in `Receive`, recording where to write the sender's Tid and
    /// message.
    RecvWait {
        out_tid_ptr: usize,
        recv_buf: usize,
        recv_cap: usize,
    },
    /// Blocked after a `Send` was delivered, waiting for the receiver's
    /// `Reply`. The reply buffer is the same one passed to the original
    /// `Send` call.
    ReplyWait { reply_buf: usize, reply_cap: usize },
    /// Blocked in `AwaitEvent` on the given event id.
    EventWait { event_id: u32 },
}

impl Default for TaskState {
    fn default() -> Self {
        TaskState::Ready
    }
}

/// A task descriptor.
#[derive(Debug)]
pub struct TaskDescriptor {
    pub tid: Tid,
    pub priority: Priority,
    pub parent_tid: Option<Tid>,
    pub state: TaskState,
    /// Saved register frame. Meaningful only while `tid` is not the
    /// currently executing task.
    pub save: arch::SavedState,
    /// Head of this task's send queue: the longest-waiting sender blocked on
    /// it, if any.
    pub send_queue_head: Option<Tid>,
    /// Tail of this task's send queue, so a newly blocked sender can be
    /// appended in O(1).
    pub send_queue_tail: Option<Tid>,
}

impl TaskDescriptor {
    pub fn new(tid: Tid, priority: Priority, parent_tid: Option<Tid>, save: arch::SavedState) -> Self {
        Self {
            tid,
            priority,
            parent_tid,
            state: TaskState::Ready,
            save,
            send_queue_head: None,
            send_queue_tail: None,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state == TaskState::Ready
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_task_is_ready_with_empty_send_queue() {
        let t = TaskDescriptor::new(Tid::new(2), Priority::new(1).unwrap(), None, Default::default());
        assert!(t.is_ready());
        assert_eq!(t.send_queue_head, None);
        assert_eq!(t.send_queue_tail, None);
    }
}
