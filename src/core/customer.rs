//! Per-customer lifecycle state machine.
//!
//! Queued -> Seated -> AwaitingOrder -> Eating -> Paying -> Departed, with
//! an early exit to Abandoned from any waiting state (Queued, Seated,
//! AwaitingOrder) once the wait exceeds the customer's patience.

use serde::{Deserialize, Serialize};

use super::context::TickContext;
use super::menu::{choose_item, CustomerCategory, SpecialRequest};
use super::order::{Order, OrderStatus};
use super::random::RandomSource;
use super::types::{CustomerId, OrderId, SeatId, SimTime, TIME_EPSILON};

pub const MAX_SATISFACTION: f64 = 100.0;
/// Satisfaction lost per minute of waiting
pub const WAIT_DECAY_PER_MINUTE: f64 = 5.0;
/// Satisfaction regained per minute of eating
pub const EATING_RECOVERY_PER_MINUTE: f64 = 0.5;
/// Flat bonus when an order arrives within the grace period
pub const PROMPT_SERVICE_BONUS: f64 = 5.0;
/// An order is late once the wait exceeds this multiple of its prep time
pub const LATE_SERVICE_FACTOR: f64 = 1.5;
/// Per-instance traits vary by ±20% around the category base
pub const TRAIT_JITTER: f64 = 0.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CustomerState {
    Queued,
    Seated,
    AwaitingOrder,
    Eating,
    Paying,
    Departed,
    Abandoned,
}

impl CustomerState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, CustomerState::Departed | CustomerState::Abandoned)
    }

    /// States in which the patience clock runs
    pub fn is_waiting(&self) -> bool {
        matches!(
            self,
            CustomerState::Queued | CustomerState::Seated | CustomerState::AwaitingOrder
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LeaveReason {
    /// Patience ran out while queued or waiting for an order
    WaitedTooLong,
    /// Seated but nothing on the menu could be ordered before patience ran out
    NothingAvailable,
}

/// Outcome of one customer update
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerUpdate {
    Unchanged,
    OrderPlaced(OrderId),
    Left(LeaveReason),
    Paid { amount: f64, tip: f64 },
}

/// Read-only projection for rendering
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerView {
    pub id: CustomerId,
    pub category: CustomerCategory,
    pub state: CustomerState,
    pub satisfaction: f64,
    pub patience: f64,
    pub waited_minutes: f64,
    pub seat: Option<SeatId>,
    pub order_item: Option<String>,
    pub order_status: Option<OrderStatus>,
}

#[derive(Debug, Clone)]
pub struct Customer {
    id: CustomerId,
    category: CustomerCategory,
    patience: f64,
    spend_budget: f64,
    tip_multiplier: f64,
    satisfaction: f64,
    state: CustomerState,
    arrival_time: SimTime,
    wait_start_time: SimTime,
    state_entered_at: SimTime,
    order: Option<Order>,
    seat: Option<SeatId>,
}

impl Customer {
    /// New queued customer with traits drawn within ±20% of the category base
    pub fn new(id: CustomerId, category: CustomerCategory, now: SimTime, rng: &mut dyn RandomSource) -> Self {
        let profile = category.profile();
        let low = 1.0 - TRAIT_JITTER;
        let high = 1.0 + TRAIT_JITTER;
        let patience = profile.base_patience_minutes * rng.uniform_range(low, high);
        let spend = profile.base_spend * rng.uniform_range(low, high);
        let tip_multiplier = profile.tip_multiplier * rng.uniform_range(low, high);
        Self::with_traits(id, category, now, patience, spend, tip_multiplier)
    }

    /// New queued customer with explicit traits
    pub fn with_traits(
        id: CustomerId,
        category: CustomerCategory,
        now: SimTime,
        patience: f64,
        spend_budget: f64,
        tip_multiplier: f64,
    ) -> Self {
        Self {
            id,
            category,
            patience,
            spend_budget,
            tip_multiplier,
            satisfaction: MAX_SATISFACTION,
            state: CustomerState::Queued,
            arrival_time: now,
            wait_start_time: now,
            state_entered_at: now,
            order: None,
            seat: None,
        }
    }

    pub fn id(&self) -> CustomerId {
        self.id
    }

    pub fn category(&self) -> CustomerCategory {
        self.category
    }

    pub fn state(&self) -> CustomerState {
        self.state
    }

    pub fn satisfaction(&self) -> f64 {
        self.satisfaction
    }

    pub fn patience(&self) -> f64 {
        self.patience
    }

    pub fn spend_budget(&self) -> f64 {
        self.spend_budget
    }

    pub fn tip_multiplier(&self) -> f64 {
        self.tip_multiplier
    }

    pub fn arrival_time(&self) -> SimTime {
        self.arrival_time
    }

    pub fn wait_start_time(&self) -> SimTime {
        self.wait_start_time
    }

    pub fn order(&self) -> Option<&Order> {
        self.order.as_ref()
    }

    pub fn seat(&self) -> Option<SeatId> {
        self.seat
    }

    pub fn view(&self, now: SimTime) -> CustomerView {
        CustomerView {
            id: self.id,
            category: self.category,
            state: self.state,
            satisfaction: self.satisfaction,
            patience: self.patience,
            waited_minutes: if self.state.is_waiting() {
                (now - self.wait_start_time).max(0.0)
            } else {
                0.0
            },
            seat: self.seat,
            order_item: self.order.as_ref().map(|o| o.item.clone()),
            order_status: self.order.as_ref().map(|o| o.status),
        }
    }

    fn set_satisfaction(&mut self, value: f64) {
        self.satisfaction = if value.is_nan() {
            0.0
        } else {
            value.clamp(0.0, MAX_SATISFACTION)
        };
    }

    fn enter(&mut self, state: CustomerState, now: SimTime) {
        log::debug!("[Customer {}] {:?} -> {:?} at {:.2}", self.id, self.state, state, now);
        self.state = state;
        self.state_entered_at = now;
    }

    /// Queued -> Seated. Ignored in any other state.
    pub(crate) fn take_seat(&mut self, seat: SeatId, now: SimTime) -> bool {
        if self.state != CustomerState::Queued {
            return false;
        }
        self.seat = Some(seat);
        self.wait_start_time = now;
        self.enter(CustomerState::Seated, now);
        true
    }

    /// Clear the seat back-reference once the seat has been released
    pub(crate) fn leave_seat(&mut self) -> Option<SeatId> {
        self.seat.take()
    }

    pub(crate) fn order_started(&mut self, order_id: OrderId, at: SimTime) {
        if let Some(order) = self.order.as_mut().filter(|o| o.id == order_id) {
            order.mark_preparing(at);
        }
    }

    /// The pipeline finished the order: ready, served, and AwaitingOrder ->
    /// Eating with the service satisfaction adjustment
    pub(crate) fn order_served(&mut self, order_id: OrderId, now: SimTime) -> bool {
        if self.state != CustomerState::AwaitingOrder {
            return false;
        }
        let Some(order) = self.order.as_mut().filter(|o| o.id == order_id) else {
            return false;
        };
        order.mark_ready(now);
        order.mark_served();

        let wait = now - self.wait_start_time;
        let grace = LATE_SERVICE_FACTOR * order.prep_time_minutes;
        let delta = if wait > grace {
            -WAIT_DECAY_PER_MINUTE * (wait - grace)
        } else {
            PROMPT_SERVICE_BONUS
        };
        self.set_satisfaction(self.satisfaction + delta);
        self.enter(CustomerState::Eating, now);
        true
    }

    /// Advance this customer by one tick
    pub fn update(&mut self, ctx: &mut TickContext<'_>) -> CustomerUpdate {
        let now = ctx.now;
        match self.state {
            CustomerState::Queued | CustomerState::AwaitingOrder => {
                self.check_patience(now, LeaveReason::WaitedTooLong)
            }
            CustomerState::Seated => {
                if let Some(order) = self.generate_order(ctx) {
                    let order_id = order.id;
                    log::info!(
                        "[Customer {}] ordered {}x {} ({:.2})",
                        self.id,
                        order.quantity,
                        order.item,
                        order.total_price
                    );
                    self.order = Some(order);
                    self.enter(CustomerState::AwaitingOrder, now);
                    return CustomerUpdate::OrderPlaced(order_id);
                }
                self.check_patience(now, LeaveReason::NothingAvailable)
            }
            CustomerState::Eating => {
                self.set_satisfaction(self.satisfaction + EATING_RECOVERY_PER_MINUTE * ctx.delta);
                if now - self.state_entered_at + TIME_EPSILON >= ctx.dwell.eating_minutes {
                    self.enter(CustomerState::Paying, now);
                }
                CustomerUpdate::Unchanged
            }
            CustomerState::Paying => {
                if now - self.state_entered_at + TIME_EPSILON < ctx.dwell.paying_minutes {
                    return CustomerUpdate::Unchanged;
                }
                let amount = self.order.as_ref().map_or(0.0, |o| o.total_price);
                let tip = self.compute_tip(amount, ctx.rng);
                self.enter(CustomerState::Departed, now);
                CustomerUpdate::Paid { amount, tip }
            }
            CustomerState::Departed | CustomerState::Abandoned => CustomerUpdate::Unchanged,
        }
    }

    fn check_patience(&mut self, now: SimTime, reason: LeaveReason) -> CustomerUpdate {
        let elapsed = now - self.wait_start_time;
        if elapsed > self.patience {
            log::info!(
                "[Customer {}] left after waiting {:.2} min ({:?})",
                self.id,
                elapsed,
                reason
            );
            self.enter(CustomerState::Abandoned, now);
            return CustomerUpdate::Left(reason);
        }
        self.set_satisfaction(MAX_SATISFACTION - elapsed.max(0.0) * WAIT_DECAY_PER_MINUTE);
        CustomerUpdate::Unchanged
    }

    fn generate_order(&mut self, ctx: &mut TickContext<'_>) -> Option<Order> {
        let profile = self.category.profile();
        let item = choose_item(
            ctx.menu,
            profile.preferences,
            ctx.availability,
            ctx.rng,
        )?
        .clone();

        let quantity = 1 + ctx.rng.index(3) as u32;
        let special_request = if ctx.rng.chance(profile.special_request_probability) {
            SpecialRequest::sampler().sample(ctx.rng).copied()
        } else {
            None
        };
        let order_id = ctx.next_order_id();
        Some(Order::new(order_id, &item, quantity, special_request, ctx.now))
    }

    /// tip = total × (0.10 + U(0, 0.10)) × satisfaction/100 × tip multiplier
    fn compute_tip(&self, amount: f64, rng: &mut dyn RandomSource) -> f64 {
        let rate = 0.10 + rng.uniform_range(0.0, 0.10);
        amount * rate * (self.satisfaction / MAX_SATISFACTION) * self.tip_multiplier
    }
}
