use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::menu::{MenuItem, SpecialRequest};
use super::types::{CustomerId, OrderId, SimTime, TIME_EPSILON};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Preparing,
    Ready,
    Served,
}

/// An order owned by a single customer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub item: String,
    pub quantity: u32,
    pub unit_price: f64,
    pub total_price: f64,
    pub prep_time_minutes: f64,
    pub status: OrderStatus,
    pub time_placed: SimTime,
    pub time_started: Option<SimTime>,
    pub time_completed: Option<SimTime>,
    pub special_request: Option<SpecialRequest>,
}

impl Order {
    pub fn new(
        id: OrderId,
        item: &MenuItem,
        quantity: u32,
        special_request: Option<SpecialRequest>,
        placed_at: SimTime,
    ) -> Self {
        Self {
            id,
            item: item.key.clone(),
            quantity,
            unit_price: item.price,
            total_price: item.price * quantity as f64,
            prep_time_minutes: item.prep_time_minutes,
            status: OrderStatus::Pending,
            time_placed: placed_at,
            time_started: None,
            time_completed: None,
            special_request,
        }
    }

    pub(crate) fn mark_preparing(&mut self, at: SimTime) {
        self.status = OrderStatus::Preparing;
        self.time_started = Some(at);
    }

    pub(crate) fn mark_ready(&mut self, at: SimTime) {
        self.status = OrderStatus::Ready;
        self.time_completed = Some(at);
    }

    pub(crate) fn mark_served(&mut self) {
        self.status = OrderStatus::Served;
    }

    pub fn is_active(&self) -> bool {
        self.status != OrderStatus::Served
    }
}

/// Pipeline-side view of an order: ids and timing only, the order data
/// stays with its customer
#[derive(Debug, Clone, PartialEq)]
struct Ticket {
    order_id: OrderId,
    customer_id: CustomerId,
    prep_time: f64,
    placed_at: SimTime,
    started_at: Option<SimTime>,
}

/// Progress reported by one pipeline pass
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Started {
        order_id: OrderId,
        customer_id: CustomerId,
        at: SimTime,
    },
    Completed {
        order_id: OrderId,
        customer_id: CustomerId,
        at: SimTime,
        prep_duration: f64,
    },
}

/// Tracks outstanding orders through pending -> preparing -> ready/served,
/// never preparing more orders than there are preparation units
#[derive(Debug, Clone)]
pub struct OrderPipeline {
    capacity: usize,
    /// Orders left preparing above capacity by a reduction
    carried_over: usize,
    pending: VecDeque<Ticket>,
    preparing: Vec<Ticket>,
}

impl OrderPipeline {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            carried_over: 0,
            pending: VecDeque::new(),
            preparing: Vec::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the number of preparation units. Orders already preparing are
    /// never pre-empted; a reduction only holds back promotions until enough
    /// of them complete.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.carried_over = self.preparing.len().saturating_sub(capacity);
    }

    /// More orders preparing than the capacity plus what a reduction left
    /// in flight
    pub fn is_over_capacity(&self) -> bool {
        self.preparing.len() > self.capacity + self.carried_over
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    pub fn preparing_count(&self) -> usize {
        self.preparing.len()
    }

    pub fn is_tracking(&self, order_id: OrderId) -> bool {
        self.pending.iter().any(|t| t.order_id == order_id)
            || self.preparing.iter().any(|t| t.order_id == order_id)
    }

    /// Start tracking a freshly placed order
    pub fn submit(&mut self, order: &Order, customer_id: CustomerId) {
        self.pending.push_back(Ticket {
            order_id: order.id,
            customer_id,
            prep_time: order.prep_time_minutes,
            placed_at: order.time_placed,
            started_at: None,
        });
    }

    /// Drop an order whose owner has left. Returns whether it was tracked.
    pub fn cancel(&mut self, order_id: OrderId) -> bool {
        let pending_before = self.pending.len();
        let preparing_before = self.preparing.len();
        self.pending.retain(|t| t.order_id != order_id);
        self.preparing.retain(|t| t.order_id != order_id);

        let freed = preparing_before - self.preparing.len();
        self.carried_over = self.carried_over.saturating_sub(freed);
        pending_before != self.pending.len() || freed > 0
    }

    /// Complete every preparing order whose prep time has elapsed, then
    /// promote pending orders into the freed units in placement order
    pub fn advance(&mut self, now: SimTime) -> Vec<PipelineEvent> {
        let mut events = Vec::new();

        let preparing_before = self.preparing.len();
        let mut still_preparing = Vec::with_capacity(preparing_before);
        for ticket in self.preparing.drain(..) {
            let started = ticket.started_at.unwrap_or(now);
            let elapsed = now - started;
            if elapsed + TIME_EPSILON >= ticket.prep_time {
                events.push(PipelineEvent::Completed {
                    order_id: ticket.order_id,
                    customer_id: ticket.customer_id,
                    at: now,
                    prep_duration: elapsed,
                });
            } else {
                still_preparing.push(ticket);
            }
        }
        let finished = preparing_before - still_preparing.len();
        self.preparing = still_preparing;
        self.carried_over = self.carried_over.saturating_sub(finished);

        while self.preparing.len() < self.capacity {
            let Some(mut ticket) = self.pending.pop_front() else {
                break;
            };
            ticket.started_at = Some(now);
            log::debug!(
                "[OrderPipeline] {} for {} started after {:.2} min pending",
                ticket.order_id,
                ticket.customer_id,
                now - ticket.placed_at
            );
            events.push(PipelineEvent::Started {
                order_id: ticket.order_id,
                customer_id: ticket.customer_id,
                at: now,
            });
            self.preparing.push(ticket);
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(id: u64, prep: f64, placed: SimTime) -> Order {
        let item = MenuItem::new("test", "Test", 2.0, prep);
        Order::new(OrderId::new(id), &item, 2, None, placed)
    }

    fn completed(events: &[PipelineEvent]) -> Vec<OrderId> {
        events
            .iter()
            .filter_map(|e| match e {
                PipelineEvent::Completed { order_id, .. } => Some(*order_id),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_order_pricing() {
        let o = order(1, 3.0, 0.0);
        assert_eq!(o.total_price, 4.0);
        assert_eq!(o.status, OrderStatus::Pending);
        assert!(o.is_active());
    }

    #[test]
    fn test_promotion_respects_capacity_and_fifo() {
        let mut pipeline = OrderPipeline::new(2);
        for id in 1..=3 {
            pipeline.submit(&order(id, 5.0, id as f64), CustomerId::new(id));
        }

        let events = pipeline.advance(3.0);
        assert_eq!(events.len(), 2);
        assert_eq!(pipeline.preparing_count(), 2);
        assert_eq!(pipeline.pending_count(), 1);
        assert!(matches!(
            events[0],
            PipelineEvent::Started { order_id, .. } if order_id == OrderId::new(1)
        ));
    }

    #[test]
    fn test_served_exactly_when_prep_time_elapsed() {
        let mut pipeline = OrderPipeline::new(1);
        pipeline.submit(&order(1, 4.0, 0.0), CustomerId::new(1));

        pipeline.advance(10.0);
        for now in [11.0, 12.0, 13.0] {
            assert!(completed(&pipeline.advance(now)).is_empty());
        }
        assert_eq!(completed(&pipeline.advance(14.0)), vec![OrderId::new(1)]);
        assert_eq!(pipeline.preparing_count(), 0);
    }

    #[test]
    fn test_completion_frees_unit_for_next_order() {
        let mut pipeline = OrderPipeline::new(1);
        pipeline.submit(&order(1, 1.0, 0.0), CustomerId::new(1));
        pipeline.submit(&order(2, 1.0, 0.0), CustomerId::new(2));

        pipeline.advance(0.0);
        let events = pipeline.advance(1.0);
        assert_eq!(completed(&events), vec![OrderId::new(1)]);
        assert!(pipeline.is_tracking(OrderId::new(2)));
        assert_eq!(pipeline.preparing_count(), 1);
        assert_eq!(pipeline.pending_count(), 0);
    }

    #[test]
    fn test_cancel_removes_ticket() {
        let mut pipeline = OrderPipeline::new(1);
        pipeline.submit(&order(1, 2.0, 0.0), CustomerId::new(1));
        pipeline.submit(&order(2, 2.0, 0.0), CustomerId::new(2));
        pipeline.advance(0.0);

        assert!(pipeline.cancel(OrderId::new(1)));
        assert!(!pipeline.cancel(OrderId::new(1)));
        pipeline.advance(0.5);
        assert!(pipeline.is_tracking(OrderId::new(2)));
        assert_eq!(pipeline.preparing_count(), 1);
    }

    #[test]
    fn test_reduced_capacity_lets_in_flight_orders_finish() {
        let mut pipeline = OrderPipeline::new(3);
        for id in 1..=4 {
            pipeline.submit(&order(id, 5.0, 0.0), CustomerId::new(id));
        }
        pipeline.advance(0.0);
        assert_eq!(pipeline.preparing_count(), 3);

        pipeline.set_capacity(1);
        assert_eq!(pipeline.preparing_count(), 3);
        assert!(!pipeline.is_over_capacity());

        let events = pipeline.advance(1.0);
        assert!(events.is_empty());
        assert_eq!(pipeline.pending_count(), 1);

        let events = pipeline.advance(5.0);
        assert_eq!(
            completed(&events),
            vec![OrderId::new(1), OrderId::new(2), OrderId::new(3)]
        );
        assert_eq!(pipeline.preparing_count(), 1);
        assert_eq!(pipeline.pending_count(), 0);
        assert!(!pipeline.is_over_capacity());
    }

    #[test]
    fn test_raised_capacity_promotes_on_next_advance() {
        let mut pipeline = OrderPipeline::new(1);
        for id in 1..=3 {
            pipeline.submit(&order(id, 5.0, 0.0), CustomerId::new(id));
        }
        pipeline.advance(0.0);
        assert_eq!(pipeline.preparing_count(), 1);

        pipeline.set_capacity(3);
        pipeline.advance(1.0);
        assert_eq!(pipeline.preparing_count(), 3);
        assert_eq!(pipeline.capacity(), 3);
    }
}
