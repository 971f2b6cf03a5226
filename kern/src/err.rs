//! Typed kernel errors.
//!
//! User-recoverable conditions are represented as small enums here and
//! flattened to the ABI's negative integer codes only at the syscall-return
//! boundary (`syscalls::dispatch`). Nothing in this module is a panic; fatal
//! conditions call `panic!`/`assert!` directly at their call site instead of
//! routing through an error type, since by definition nothing downstream
//! could recover from them.

use abi::ret;

/// Failure modes of the SRR primitives (`Send`/`Reply`; `Receive` cannot
/// fail in a well-formed kernel).
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum SrrError {
    /// The named Tid is out of range or names an empty task slot.
    BadTid,
    /// The SRR partner has terminated before the rendezvous could complete.
    Dead,
}

impl SrrError {
    pub fn code(self) -> i32 {
        match self {
            SrrError::BadTid => ret::BAD_TID,
            SrrError::Dead => ret::DEAD,
        }
    }
}

/// Failure modes of `Create`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CreateError {
    InvalidPriority,
    OutOfTaskDescriptors,
}

impl CreateError {
    pub fn code(self) -> i32 {
        match self {
            CreateError::InvalidPriority => ret::INVALID_PRIORITY,
            CreateError::OutOfTaskDescriptors => ret::OUT_OF_TASK_DESCRIPTORS,
        }
    }
}

/// Failure modes of `AwaitEvent`.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum EventError {
    /// `event_id` is not on the fixed allow-list (`abi::event::is_allowed`).
    Disallowed,
}

impl EventError {
    pub fn code(self) -> i32 {
        match self {
            EventError::Disallowed => ret::INVALID_EVENT,
        }
    }
}
