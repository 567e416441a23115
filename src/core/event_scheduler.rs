use std::cmp::Ordering;
use std::collections::BinaryHeap;

use super::types::{SimTime, TIME_EPSILON};

#[derive(Debug)]
pub struct ScheduledEvent<T> {
    pub due_at: SimTime,
    pub sequence_num: u64,
    pub payload: T,
}

impl<T> PartialEq for ScheduledEvent<T> {
    fn eq(&self, other: &Self) -> bool {
        self.due_at.total_cmp(&other.due_at) == Ordering::Equal
            && self.sequence_num == other.sequence_num
    }
}

impl<T> Eq for ScheduledEvent<T> {}

impl<T> PartialOrd for ScheduledEvent<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for ScheduledEvent<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reverse ordering for min-heap (BinaryHeap is max-heap by default)
        other
            .due_at
            .total_cmp(&self.due_at)
            .then_with(|| other.sequence_num.cmp(&self.sequence_num))
    }
}

/// Events keyed on absolute simulated time. Nothing fires on its own: the
/// owner drains due events during its tick, so pausing the clock pauses the
/// schedule.
#[derive(Debug)]
pub struct EventScheduler<T> {
    event_queue: BinaryHeap<ScheduledEvent<T>>,
    sequence_counter: u64,
}

impl<T> EventScheduler<T> {
    pub fn new() -> Self {
        Self {
            event_queue: BinaryHeap::new(),
            sequence_counter: 0,
        }
    }

    /// Schedule `payload` to become due at `due_at`
    pub fn schedule_at(&mut self, due_at: SimTime, payload: T) {
        self.event_queue.push(ScheduledEvent {
            due_at,
            sequence_num: self.sequence_counter,
            payload,
        });
        self.sequence_counter += 1;
    }

    /// Remove and return every event due at or before `now`, earliest first;
    /// events due at the same time come out in scheduling order
    pub fn pop_due(&mut self, now: SimTime) -> Vec<T> {
        let mut due = Vec::new();
        while self
            .event_queue
            .peek()
            .is_some_and(|event| event.due_at <= now + TIME_EPSILON)
        {
            if let Some(event) = self.event_queue.pop() {
                due.push(event.payload);
            }
        }
        due
    }

    pub fn has_events(&self) -> bool {
        !self.event_queue.is_empty()
    }

    pub fn len(&self) -> usize {
        self.event_queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.event_queue.is_empty()
    }

    /// Due time of the earliest event without removing it
    pub fn peek_next_due(&self) -> Option<SimTime> {
        self.event_queue.peek().map(|event| event.due_at)
    }
}

impl<T> Default for EventScheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}
