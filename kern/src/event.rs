//! The event/interrupt bridge: maps event ids to at most one waiting task,
//! and turns hardware interrupts into task wakeups.

use crate::containers::SparseArray;
use abi::Tid;

/// Registered waiters, one slot per allow-listed event id (§4.5).
#[derive(Debug)]
pub struct EventMap<const N: usize> {
    waiters: SparseArray<Tid, N>,
}

impl<const N: usize> Default for EventMap<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> EventMap<N> {
    pub const fn new() -> Self {
        Self {
            waiters: SparseArray::new(),
        }
    }

    /// Records `tid` as the waiter for `event_id`.
    ///
    /// # Panics
    ///
    /// If another task is already registered for this id -- the design
    /// treats a second waiter on the same event as a fatal kernel error
    /// (§4.5, §9), not a silently-overwritten registration.
    pub fn register(&mut self, event_id: u32, tid: Tid) {
        assert!(
            !self.waiters.has(event_id as usize),
            "event {event_id} already has a waiter"
        );
        self.waiters.put(event_id as usize, tid);
    }

    /// Removes and returns the waiter for `event_id`, if any. Called when
    /// the matching interrupt fires; returns `None` if no task was waiting,
    /// in which case the event is simply dropped (§4.5).
    pub fn fire(&mut self, event_id: u32) -> Option<Tid> {
        self.waiters.take(event_id as usize)
    }

    pub fn num_waiters(&self) -> usize {
        self.waiters.num_present()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fire_returns_and_clears_registered_waiter() {
        let mut events: EventMap<64> = EventMap::new();
        events.register(abi::event::TICK, Tid::new(3));
        assert_eq!(events.fire(abi::event::TICK), Some(Tid::new(3)));
        assert_eq!(events.fire(abi::event::TICK), None);
    }

    #[test]
    fn fire_on_unwaited_event_is_dropped_quietly() {
        let mut events: EventMap<64> = EventMap::new();
        assert_eq!(events.fire(abi::event::UART2_RX), None);
    }

    #[test]
    #[should_panic(expected = "already has a waiter")]
    fn double_registration_panics() {
        let mut events: EventMap<64> = EventMap::new();
        events.register(abi::event::TICK, Tid::new(1));
        events.register(abi::event::TICK, Tid::new(2));
    }

    #[test]
    fn num_waiters_tracks_registrations() {
        let mut events: EventMap<64> = EventMap::new();
        events.register(abi::event::TICK, Tid::new(1));
        events.register(abi::event::TIMER3, Tid::new(2));
        assert_eq!(events.num_waiters(), 2);
        events.fire(abi::event::TICK);
        assert_eq!(events.num_waiters(), 1);
    }
}
