//! Delayed hardware events, ordered by the virtual clock.
//!
//! Devices schedule work to happen some number of cycles in the future
//! (command completion, watchdogs, cassette priming). Events carry a kind
//! bitmask so a whole family can be cancelled at once, and a tagged action
//! that the bus executes when the event comes due.

/// Disk command completion.
pub const EVENT_DISK_DONE: u32 = 1 << 0;
/// Disk lost-data watchdog.
pub const EVENT_DISK_LOST_DATA: u32 = 1 << 1;
/// Disk first data-request.
pub const EVENT_DISK_FIRST_DRQ: u32 = 1 << 2;
/// Cassette interrupt priming after motor-on.
pub const EVENT_KICK_OFF_CASSETTE: u32 = 1 << 3;

/// All disk events.
pub const EVENT_DISK: u32 = EVENT_DISK_DONE | EVENT_DISK_LOST_DATA | EVENT_DISK_FIRST_DRQ;

/// What to do when an event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventAction {
    /// Clear Busy, set the given status bits, raise the disk IntRq NMI.
    DiskDone { bits: u8 },
    /// Abort the given command with LostData if it is still in progress.
    DiskLostData { command: u8 },
    /// Raise DRQ with the given status bits and arm the LostData watchdog.
    DiskFirstDrq { bits: u8 },
    /// Prime cassette rise/fall interrupts for 1500-baud reads.
    KickOffCassette,
}

/// A single scheduled event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Event {
    pub kind: u32,
    pub action: EventAction,
    /// Clock value at which the event fires.
    pub clock: u64,
}

/// All scheduled events, kept sorted by fire clock. Ties preserve
/// insertion order.
#[derive(Default)]
pub struct Events {
    queue: Vec<Event>,
}

impl Events {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue up an event to fire at `clock`.
    pub fn add(&mut self, kind: u32, action: EventAction, clock: u64) {
        let event = Event {
            kind,
            action,
            clock,
        };
        let position = self.queue.partition_point(|e| e.clock <= clock);
        self.queue.insert(position, event);
    }

    /// Remove and return the next event due at or before `clock`.
    ///
    /// The caller runs the action and calls again, so an action may
    /// re-enqueue into the same dispatch pass.
    pub fn pop_due(&mut self, clock: u64) -> Option<Event> {
        if self.queue.first().is_some_and(|e| e.clock <= clock) {
            Some(self.queue.remove(0))
        } else {
            None
        }
    }

    /// Remove every event whose kind matches the mask.
    pub fn cancel(&mut self, mask: u32) {
        self.queue.retain(|e| e.kind & mask == 0);
    }

    /// The earliest event matching the mask, left in place.
    #[must_use]
    pub fn first_event(&self, mask: u32) -> Option<&Event> {
        self.queue.iter().find(|e| e.kind & mask != 0)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dispatch_in_clock_order() {
        let mut events = Events::new();
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 1 }, 300);
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 2 }, 100);
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 3 }, 200);

        assert_eq!(events.pop_due(50), None);
        assert_eq!(
            events.pop_due(300).unwrap().action,
            EventAction::DiskDone { bits: 2 }
        );
        assert_eq!(
            events.pop_due(300).unwrap().action,
            EventAction::DiskDone { bits: 3 }
        );
        assert_eq!(
            events.pop_due(300).unwrap().action,
            EventAction::DiskDone { bits: 1 }
        );
        assert!(events.is_empty());
    }

    #[test]
    fn ties_preserve_insertion_order() {
        let mut events = Events::new();
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 1 }, 100);
        events.add(EVENT_DISK_LOST_DATA, EventAction::DiskLostData { command: 2 }, 100);

        assert_eq!(
            events.pop_due(100).unwrap().action,
            EventAction::DiskDone { bits: 1 }
        );
        assert_eq!(
            events.pop_due(100).unwrap().action,
            EventAction::DiskLostData { command: 2 }
        );
    }

    #[test]
    fn cancel_by_mask() {
        let mut events = Events::new();
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, 100);
        events.add(EVENT_DISK_LOST_DATA, EventAction::DiskLostData { command: 0 }, 200);
        events.add(EVENT_KICK_OFF_CASSETTE, EventAction::KickOffCassette, 300);

        events.cancel(EVENT_DISK);
        assert_eq!(events.pop_due(u64::MAX).unwrap().action, EventAction::KickOffCassette);
        assert!(events.is_empty());
    }

    #[test]
    fn first_event_filters_by_mask() {
        let mut events = Events::new();
        events.add(EVENT_DISK_LOST_DATA, EventAction::DiskLostData { command: 0 }, 100);
        events.add(EVENT_DISK_DONE, EventAction::DiskDone { bits: 0 }, 200);

        let first = events
            .first_event(EVENT_DISK & !EVENT_DISK_LOST_DATA)
            .unwrap();
        assert_eq!(first.clock, 200);
        assert!(events.first_event(EVENT_KICK_OFF_CASSETTE).is_none());
    }
}
