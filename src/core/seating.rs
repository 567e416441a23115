//! Fixed seat collection and FIFO queue matching.
//!
//! Seat lifecycle: Empty -> Occupied -> Dirty -> Cleaning -> Empty. Only
//! Empty seats are assignable. Cleaning completion is a scheduled event on
//! simulated time, drained during the seating phase of each tick.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::event_scheduler::EventScheduler;
use super::types::{CustomerId, SeatId, SimTime};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeatStatus {
    Empty,
    Occupied,
    Dirty,
    Cleaning,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Seat {
    id: SeatId,
    status: SeatStatus,
    occupant: Option<CustomerId>,
}

impl Seat {
    fn new(id: SeatId) -> Self {
        Self {
            id,
            status: SeatStatus::Empty,
            occupant: None,
        }
    }

    pub fn id(&self) -> SeatId {
        self.id
    }

    pub fn status(&self) -> SeatStatus {
        self.status
    }

    pub fn occupant(&self) -> Option<CustomerId> {
        self.occupant
    }

    pub fn is_assignable(&self) -> bool {
        self.status == SeatStatus::Empty
    }
}

/// Read-only projection for rendering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatView {
    pub id: SeatId,
    pub status: SeatStatus,
    pub occupant: Option<CustomerId>,
}

impl From<&Seat> for SeatView {
    fn from(seat: &Seat) -> Self {
        Self {
            id: seat.id,
            status: seat.status,
            occupant: seat.occupant,
        }
    }
}

#[derive(Debug)]
pub struct SeatingAllocator {
    seats: Vec<Seat>,
    cleaning_delay: f64,
    cleaning_schedule: EventScheduler<SeatId>,
}

impl SeatingAllocator {
    pub fn new(seat_count: usize, cleaning_delay: f64) -> Self {
        Self {
            seats: (0..seat_count).map(|i| Seat::new(SeatId::new(i))).collect(),
            cleaning_delay,
            cleaning_schedule: EventScheduler::new(),
        }
    }

    pub fn seats(&self) -> &[Seat] {
        &self.seats
    }

    pub fn seat(&self, id: SeatId) -> Option<&Seat> {
        self.seats.get(id.index())
    }

    pub fn capacity(&self) -> usize {
        self.seats.len()
    }

    pub fn count_with_status(&self, status: SeatStatus) -> usize {
        self.seats.iter().filter(|s| s.status == status).count()
    }

    pub fn snapshot(&self) -> Vec<SeatView> {
        self.seats.iter().map(SeatView::from).collect()
    }

    /// Start cleaning every dirty seat, then return seats whose cleaning is
    /// due to Empty. Returns the seats that became assignable.
    pub fn advance_cleaning(&mut self, now: SimTime) -> Vec<SeatId> {
        for seat in self.seats.iter_mut().filter(|s| s.status == SeatStatus::Dirty) {
            seat.status = SeatStatus::Cleaning;
            self.cleaning_schedule.schedule_at(now + self.cleaning_delay, seat.id);
        }

        let mut cleaned = Vec::new();
        for seat_id in self.cleaning_schedule.pop_due(now) {
            if let Some(seat) = self.seats.get_mut(seat_id.index()) {
                if seat.status == SeatStatus::Cleaning {
                    seat.status = SeatStatus::Empty;
                    cleaned.push(seat_id);
                }
            }
        }
        cleaned
    }

    /// Seat queued customers strictly in FIFO order. Each customer takes the
    /// first Empty seat; matching stops at the first customer left without
    /// one, so nobody skips ahead. Matched customers are removed from the
    /// queue, which stays compact.
    pub fn match_queue(&mut self, queue: &mut VecDeque<CustomerId>) -> Vec<(CustomerId, SeatId)> {
        let mut matched = Vec::new();
        while let Some(&customer_id) = queue.front() {
            let Some(seat) = self.seats.iter_mut().find(|s| s.is_assignable()) else {
                break;
            };
            seat.status = SeatStatus::Occupied;
            seat.occupant = Some(customer_id);
            matched.push((customer_id, seat.id));
            queue.pop_front();
        }
        matched
    }

    /// The occupant left: the seat turns Dirty and forgets the customer.
    /// Returns false if `customer_id` does not occupy `seat_id`.
    pub fn release(&mut self, seat_id: SeatId, customer_id: CustomerId) -> bool {
        match self.seats.get_mut(seat_id.index()) {
            Some(seat) if seat.occupant == Some(customer_id) => {
                seat.status = SeatStatus::Dirty;
                seat.occupant = None;
                true
            }
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue_of(ids: &[u64]) -> VecDeque<CustomerId> {
        ids.iter().map(|id| CustomerId::new(*id)).collect()
    }

    #[test]
    fn test_fifo_matching_stops_when_full() {
        let mut allocator = SeatingAllocator::new(2, 1.0);
        let mut queue = queue_of(&[1, 2, 3]);

        let matched = allocator.match_queue(&mut queue);
        assert_eq!(
            matched,
            vec![
                (CustomerId::new(1), SeatId::new(0)),
                (CustomerId::new(2), SeatId::new(1)),
            ]
        );
        assert_eq!(queue, queue_of(&[3]));
        assert_eq!(allocator.count_with_status(SeatStatus::Occupied), 2);
    }

    #[test]
    fn test_seat_round_trip_respects_cleaning_delay() {
        let mut allocator = SeatingAllocator::new(1, 2.0);
        let mut queue = queue_of(&[1]);
        allocator.match_queue(&mut queue);

        assert!(allocator.release(SeatId::new(0), CustomerId::new(1)));
        assert_eq!(allocator.seats()[0].status(), SeatStatus::Dirty);
        assert_eq!(allocator.seats()[0].occupant(), None);

        let mut waiting = queue_of(&[2]);
        assert!(allocator.advance_cleaning(10.0).is_empty());
        assert_eq!(allocator.seats()[0].status(), SeatStatus::Cleaning);
        assert!(allocator.match_queue(&mut waiting).is_empty());

        assert!(allocator.advance_cleaning(11.0).is_empty());
        assert!(allocator.match_queue(&mut waiting).is_empty());

        assert_eq!(allocator.advance_cleaning(12.0), vec![SeatId::new(0)]);
        assert_eq!(allocator.seats()[0].status(), SeatStatus::Empty);
        assert_eq!(
            allocator.match_queue(&mut waiting),
            vec![(CustomerId::new(2), SeatId::new(0))]
        );
    }

    #[test]
    fn test_release_requires_matching_occupant() {
        let mut allocator = SeatingAllocator::new(1, 0.0);
        let mut queue = queue_of(&[1]);
        allocator.match_queue(&mut queue);

        assert!(!allocator.release(SeatId::new(0), CustomerId::new(2)));
        assert!(!allocator.release(SeatId::new(5), CustomerId::new(1)));
        assert_eq!(allocator.seats()[0].status(), SeatStatus::Occupied);
    }

    #[test]
    fn test_zero_delay_cleans_within_same_pass() {
        let mut allocator = SeatingAllocator::new(1, 0.0);
        let mut queue = queue_of(&[1]);
        allocator.match_queue(&mut queue);
        allocator.release(SeatId::new(0), CustomerId::new(1));

        assert_eq!(allocator.advance_cleaning(4.0), vec![SeatId::new(0)]);
        assert_eq!(allocator.snapshot()[0].status, SeatStatus::Empty);
    }
}
