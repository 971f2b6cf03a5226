//! Kernel ABI definitions, shared between the kernel and user tasks.
//!
//! Everything in this crate describes the wire contract that crosses the
//! supervisor-call boundary: syscall numbers, Tid encoding, priority
//! encoding, and the small set of negative return codes the kernel can hand
//! back to a task. None of it is specific to one architecture backend.

#![no_std]

/// Compile-time capacity of the task table. The idle task occupies the last
/// slot, placed there directly by the bootstrap rather than through the
/// ordinary allocator. No other slot is mechanically reserved (see
/// `NAMESERVER_TID`).
pub const DEFAULT_TASK_CAPACITY: usize = 48;

/// Compile-time capacity of the event map (see `event` below).
pub const DEFAULT_EVENT_CAPACITY: usize = 64;

/// The Tid a name server is conventionally expected to claim.
///
/// This core does not ship a name server and does not reserve this slot
/// itself: ordinary task allocation hands out the lowest free slot, so in a
/// build with no name server it is simply whichever task is created first
/// (in practice, the first user task -- see `kern::startup::build`). A
/// client crate that wants a name server should create it before any other
/// task so that it lands here.
pub const NAMESERVER_TID: Tid = Tid(0);

/// Reserved priority value used only by the bootstrap-created idle task.
/// `Priority::new` rejects this value; only `Priority::IDLE` produces it.
pub const IDLE_PRIORITY: i32 = -1;

/// Task identifier: a small non-negative index into the kernel's task table.
///
/// This ABI carries no generation number — the design does not distinguish
/// a task's successive incarnations, so a `Tid` names a *slot*, not a
/// lineage. A stale `Tid`
/// (naming a slot that has since been reused by a different task) is
/// indistinguishable from a fresh one; callers that care about this must
/// build their own liveness protocol atop SRR.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[repr(transparent)]
pub struct Tid(pub u16);

impl Tid {
    pub fn new(index: usize) -> Self {
        debug_assert!(index <= u16::MAX as usize);
        Tid(index as u16)
    }

    pub fn index(self) -> usize {
        usize::from(self.0)
    }
}

impl From<usize> for Tid {
    fn from(index: usize) -> Self {
        Tid::new(index)
    }
}

/// A task's scheduling priority.
///
/// Higher numeric values are *more* important; `IDLE_PRIORITY = -1` is the
/// unique reserved minimum, below every ordinary task's `0..` priority. This
/// type deliberately does not implement `PartialOrd`/`Ord` on the raw value
/// to avoid confusing "greater priority value" with "more important" at call
/// sites — compare with `is_more_important_than` instead.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Priority(i32);

impl Priority {
    /// The unique reserved priority of the idle task. Only the bootstrap may
    /// construct a task with this priority.
    pub const IDLE: Priority = Priority(IDLE_PRIORITY);

    /// Constructs a priority for an ordinary (non-idle) task.
    ///
    /// Returns `None` if `value` is negative, mirroring the kernel's
    /// `INVALID_PRIORITY` check in `Create`.
    pub fn new(value: i32) -> Option<Self> {
        if value < 0 {
            None
        } else {
            Some(Priority(value))
        }
    }

    pub fn value(self) -> i32 {
        self.0
    }

    /// True if `self` should run before `other` when both are ready.
    pub fn is_more_important_than(self, other: Self) -> bool {
        self.0 > other.0
    }
}

/// Enumeration of syscall numbers, in the stable order fixed by §4.6 of the
/// design. `Shutdown` is numbered but not required by every deployment.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[repr(u32)]
pub enum Sysnum {
    Yield = 0,
    Exit = 1,
    MyParentTid = 2,
    MyTid = 3,
    Create = 4,
    Send = 5,
    Receive = 6,
    Reply = 7,
    AwaitEvent = 8,
    Perf = 9,
    Panic = 10,
    Shutdown = 11,
}

impl core::convert::TryFrom<u32> for Sysnum {
    type Error = ();

    fn try_from(x: u32) -> Result<Self, Self::Error> {
        Ok(match x {
            0 => Self::Yield,
            1 => Self::Exit,
            2 => Self::MyParentTid,
            3 => Self::MyTid,
            4 => Self::Create,
            5 => Self::Send,
            6 => Self::Receive,
            7 => Self::Reply,
            8 => Self::AwaitEvent,
            9 => Self::Perf,
            10 => Self::Panic,
            11 => Self::Shutdown,
            _ => return Err(()),
        })
    }
}

/// Negative return codes a syscall handler may hand back in register 0.
///
/// `SRR_PENDING_RECV`/`SRR_PENDING_SEND` are internal sentinels: they are
/// written transiently into a blocked caller's saved frame and are always
/// overwritten with the real result (by `Reply`, or by the interrupt/SRR
/// partner that wakes the task) before that frame is ever restored to user
/// mode. A task's register 0 never holds one of these after a syscall it
/// made has actually completed.
pub mod ret {
    /// Tid named by the caller is out of range, or names an empty slot.
    pub const BAD_TID: i32 = -1;
    /// The SRR partner has terminated (Exit'd) before the rendezvous could
    /// complete.
    pub const DEAD: i32 = -2;
    /// Sentinel written into a sender blocked in `SendWait`; never observed.
    pub const SRR_PENDING_SEND: i32 = -3;
    /// Sentinel written into a receiver blocked in `RecvWait`; never
    /// observed.
    pub const SRR_PENDING_RECV: i32 = -4;
    /// Invalid priority passed to `Create`.
    pub const INVALID_PRIORITY: i32 = -1;
    /// Task table exhausted in `Create`.
    pub const OUT_OF_TASK_DESCRIPTORS: i32 = -2;
    /// Disallowed event id passed to `AwaitEvent`.
    pub const INVALID_EVENT: i32 = -1;
}

/// The fixed allow-list of event ids a task may `AwaitEvent` on, and the
/// kernel's documented mapping from id to interrupt source (§6.2).
///
/// The tick and the first free-running timer keep the vector numbers used by
/// the reference board's VIC wiring (`4`, `5`); the UART ids are this
/// implementation's own documented fixed mapping, for ports that don't
/// share that wiring.
pub mod event {
    /// 508 kHz free-running interval timer (Timer 1). Not normally awaited
    /// directly -- it backs the idle-time measurement -- but it is a valid
    /// `AwaitEvent` target for a user-level timeout server.
    pub const TIMER1: u32 = 4;
    /// 10 ms periodic tick (Timer 2). The canonical clock-server source.
    pub const TICK: u32 = 5;
    /// Secondary free-running timer (Timer 3).
    pub const TIMER3: u32 = 51;
    /// UART2 receive-data-available.
    pub const UART2_RX: u32 = 52;
    /// UART2 transmit-holding-register-empty.
    pub const UART2_TX: u32 = 53;
    /// UART2 modem status change.
    pub const UART2_MODEM: u32 = 54;

    /// The full allow-list, in ascending numeric order.
    pub const ALL: &[u32] = &[TIMER1, TICK, TIMER3, UART2_RX, UART2_TX, UART2_MODEM];

    pub fn is_allowed(id: u32) -> bool {
        ALL.contains(&id)
    }
}
