// Copyright (C) 2026 Michael Wilson <mike@mdwn.dev>
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//

//! Delayed delivery of outgoing MIDI events.

use std::{cmp::Ordering, collections::BinaryHeap, time::Duration};

use midly::live::LiveEvent;

/// Converts durations into the tick unit of the engine's time cursor.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeBase {
    ticks_per_second: u64,
}

impl TimeBase {
    /// A millisecond clock, as used by the standalone runner.
    pub const MILLISECONDS: TimeBase = TimeBase {
        ticks_per_second: 1000,
    };

    /// Creates a time base. Zero is treated as one tick per second.
    pub fn new(ticks_per_second: u64) -> TimeBase {
        TimeBase {
            ticks_per_second: ticks_per_second.max(1),
        }
    }

    pub fn ticks_per_second(&self) -> u64 {
        self.ticks_per_second
    }

    /// The number of ticks in the duration, rounded down.
    pub fn ticks(&self, duration: Duration) -> u64 {
        let ticks = duration.as_nanos() * u128::from(self.ticks_per_second) / 1_000_000_000;
        u64::try_from(ticks).unwrap_or(u64::MAX)
    }
}

impl Default for TimeBase {
    fn default() -> Self {
        TimeBase::MILLISECONDS
    }
}

/// An event waiting for its delivery time.
#[derive(Debug)]
struct ScheduledEvent {
    deliver_at: u64,
    sequence: u64,
    event: LiveEvent<'static>,
}

// The heap is a max-heap, so ordering is reversed to pop the earliest event
// first. Events due at the same tick leave in the order they were scheduled.
impl Ord for ScheduledEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .deliver_at
            .cmp(&self.deliver_at)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

impl PartialOrd for ScheduledEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledEvent {
    fn eq(&self, other: &Self) -> bool {
        self.deliver_at == other.deliver_at && self.sequence == other.sequence
    }
}

impl Eq for ScheduledEvent {}

/// A min-priority queue of outgoing events keyed by delivery time.
#[derive(Debug, Default)]
pub struct Scheduler {
    time_base: TimeBase,
    queue: BinaryHeap<ScheduledEvent>,
    next_sequence: u64,
}

impl Scheduler {
    pub fn new(time_base: TimeBase) -> Scheduler {
        Scheduler {
            time_base,
            queue: BinaryHeap::new(),
            next_sequence: 0,
        }
    }

    pub fn time_base(&self) -> TimeBase {
        self.time_base
    }

    /// Queues the event for delivery `delay` after `now`.
    pub fn schedule(&mut self, event: LiveEvent<'static>, now: u64, delay: Duration) {
        let deliver_at = now.saturating_add(self.time_base.ticks(delay));
        self.queue.push(ScheduledEvent {
            deliver_at,
            sequence: self.next_sequence,
            event,
        });
        self.next_sequence += 1;
    }

    /// Removes and returns every event due at or before `now`, earliest first.
    pub fn collect_due(&mut self, now: u64) -> Vec<LiveEvent<'static>> {
        let mut due = Vec::new();
        while self
            .queue
            .peek()
            .is_some_and(|scheduled| scheduled.deliver_at <= now)
        {
            if let Some(scheduled) = self.queue.pop() {
                due.push(scheduled.event);
            }
        }
        due
    }

    /// Drops every pending event.
    pub fn clear(&mut self) {
        self.queue.clear();
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
