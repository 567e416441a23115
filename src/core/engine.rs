//! Tick-driven orchestrator owning every live customer, the waiting queue,
//! the seats, the order pipeline and the model calibration.
//!
//! One `advance` call runs, in order: customer updates, the order pipeline,
//! the seating phase (cleaning then FIFO matching), model recalibration.
//! Seat matching therefore always sees the post-transition customer set and
//! the model always sees the post-match state.

use std::collections::{BTreeMap, VecDeque};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::config::VenueConfig;
use super::context::TickContext;
use super::customer::{Customer, CustomerState, CustomerUpdate, CustomerView, MAX_SATISFACTION};
use super::error::{ConfigError, Result, VenueError};
use super::event::ServiceEvent;
use super::menu::{AlwaysAvailable, CustomerCategory, Menu, MenuAvailability};
use super::order::{OrderPipeline, PipelineEvent};
use super::queueing::{self, ModelOutcome, QueueingModel};
use super::random::{RandomSource, SeededRandom, WeightedSampler};
use super::rates::{EmpiricalRates, RateEstimator};
use super::seating::{SeatStatus, SeatView, SeatingAllocator};
use super::types::{CustomerId, IdSequence, SimTime, TIME_EPSILON};

/// Latest model fit from empirical rates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Calibration {
    pub rates: EmpiricalRates,
    pub server_count: usize,
    pub outcome: ModelOutcome,
    pub computed_at: SimTime,
}

/// Running totals since the engine started
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceStats {
    pub spawned: u64,
    pub seated: u64,
    pub orders_placed: u64,
    pub orders_served: u64,
    pub departed: u64,
    pub abandoned: u64,
    pub revenue: f64,
    pub tips: f64,
    /// Sum of arrival-to-seat waits of every seated customer
    pub total_queue_wait: f64,
    pub total_departure_satisfaction: f64,
}

impl ServiceStats {
    pub fn mean_queue_wait(&self) -> Option<f64> {
        (self.seated > 0).then(|| self.total_queue_wait / self.seated as f64)
    }

    pub fn mean_departure_satisfaction(&self) -> Option<f64> {
        (self.departed > 0).then(|| self.total_departure_satisfaction / self.departed as f64)
    }

    pub fn abandonment_ratio(&self) -> Option<f64> {
        let finished = self.departed + self.abandoned;
        (finished > 0).then(|| self.abandoned as f64 / finished as f64)
    }
}

/// Per-tick summary handed to observers
#[derive(Debug, Clone, PartialEq)]
pub struct TickSummary {
    pub tick: u64,
    pub game_time: SimTime,
    pub queue_length: usize,
    pub occupied_seats: usize,
    pub orders_pending: usize,
    pub orders_preparing: usize,
    pub terminal_events: usize,
}

/// Observer trait for engine ticks
pub trait EngineObserver: Send {
    /// Called after every completed tick
    fn on_tick_complete(&mut self, summary: &TickSummary);
}

pub struct ServiceEngine {
    session_id: Uuid,
    config: VenueConfig,
    menu: Menu,
    availability: Box<dyn MenuAvailability>,
    rng: Box<dyn RandomSource>,
    ids: IdSequence,
    category_sampler: WeightedSampler<CustomerCategory>,
    customers: BTreeMap<CustomerId, Customer>,
    queue: VecDeque<CustomerId>,
    seating: SeatingAllocator,
    pipeline: OrderPipeline,
    estimator: RateEstimator,
    calibration: Option<Calibration>,
    pending_events: Vec<ServiceEvent>,
    stats: ServiceStats,
    game_time: SimTime,
    tick_count: u64,
    observers: Vec<Box<dyn EngineObserver>>,
}

impl ServiceEngine {
    /// Create an engine with the default menu, every item available and a
    /// random source seeded from the configuration
    pub fn new(config: VenueConfig) -> Result<Self> {
        config.validate()?;

        let session_id = Uuid::new_v4();
        log::info!(
            "[ServiceEngine {}] {} seats, {} servers, seed {}",
            session_id,
            config.seat_count,
            config.server_count,
            config.random_seed
        );

        Ok(Self {
            session_id,
            menu: Menu::default(),
            availability: Box::new(AlwaysAvailable),
            rng: Box::new(SeededRandom::new(config.random_seed)),
            ids: IdSequence::default(),
            category_sampler: WeightedSampler::new(
                config.category_weights.iter().map(|(c, w)| (*w, *c)).collect(),
            ),
            customers: BTreeMap::new(),
            queue: VecDeque::new(),
            seating: SeatingAllocator::new(config.seat_count, config.cleaning_delay_minutes),
            pipeline: OrderPipeline::new(config.server_count),
            estimator: RateEstimator::new(config.rate_window_minutes),
            calibration: None,
            pending_events: Vec::new(),
            stats: ServiceStats::default(),
            game_time: 0.0,
            tick_count: 0,
            observers: Vec::new(),
            config,
        })
    }

    /// Replace the random source, e.g. with a scripted one in tests
    pub fn with_random_source(mut self, rng: Box<dyn RandomSource>) -> Self {
        self.rng = rng;
        self
    }

    pub fn with_menu(mut self, menu: Menu) -> Self {
        self.menu = menu;
        self
    }

    pub fn with_availability(mut self, availability: Box<dyn MenuAvailability>) -> Self {
        self.availability = availability;
        self
    }

    pub fn add_observer(&mut self, observer: Box<dyn EngineObserver>) {
        self.observers.push(observer);
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn config(&self) -> &VenueConfig {
        &self.config
    }

    pub fn game_time(&self) -> SimTime {
        self.game_time
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn stats(&self) -> &ServiceStats {
        &self.stats
    }

    pub fn calibration(&self) -> Option<&Calibration> {
        self.calibration.as_ref()
    }

    pub fn active_customers(&self) -> usize {
        self.customers.len()
    }

    pub fn orders_pending(&self) -> usize {
        self.pipeline.pending_count()
    }

    pub fn orders_preparing(&self) -> usize {
        self.pipeline.preparing_count()
    }

    /// Create a queued customer at the current game time. Without a category
    /// one is drawn from the configured category weights.
    pub fn spawn_customer(&mut self, category: Option<CustomerCategory>) -> CustomerId {
        let category = match category {
            Some(category) => category,
            None => self
                .category_sampler
                .sample(&mut *self.rng)
                .copied()
                .unwrap_or_default(),
        };

        let id = self.ids.next_customer();
        let customer = Customer::new(id, category, self.game_time, &mut *self.rng);
        log::debug!(
            "[ServiceEngine {}] {} ({}) arrived at {:.2}, patience {:.1}",
            self.session_id,
            id,
            category,
            self.game_time,
            customer.patience()
        );

        self.customers.insert(id, customer);
        self.queue.push_back(id);
        self.estimator.record_arrival(self.game_time);
        self.stats.spawned += 1;
        id
    }

    /// Spawn by category name; unknown names use the default category
    pub fn spawn_customer_named(&mut self, category: &str) -> CustomerId {
        self.spawn_customer(Some(CustomerCategory::from_name(category)))
    }

    /// Run one tick and drain the terminal events it produced
    pub fn advance(&mut self, game_time: SimTime, delta: f64) -> Result<Vec<ServiceEvent>> {
        if !delta.is_finite() || delta < 0.0 {
            return Err(VenueError::InvalidDelta(delta));
        }
        if !game_time.is_finite() || game_time + TIME_EPSILON < self.game_time {
            return Err(VenueError::TimeWentBackwards {
                current: self.game_time,
                requested: game_time,
            });
        }

        self.game_time = game_time;
        self.tick_count += 1;
        self.estimator.observe_clock(game_time);
        log::debug!("=== [ServiceEngine {}] tick {} at {:.2} ===", self.session_id, self.tick_count, game_time);

        self.update_customers(game_time, delta);
        self.advance_pipeline(game_time);
        self.seat_customers(game_time);
        self.recalibrate(game_time);

        if self.config.enforce_invariants {
            self.check_invariants()?;
        }

        let events = std::mem::take(&mut self.pending_events);
        self.notify_tick_complete(events.len());
        Ok(events)
    }

    fn update_customers(&mut self, now: SimTime, delta: f64) {
        let mut finished = Vec::new();
        {
            let mut ctx = TickContext::new(
                now,
                delta,
                &self.menu,
                &*self.availability,
                &mut *self.rng,
                self.config.dwell,
                &mut self.ids,
            );

            for (id, customer) in self.customers.iter_mut() {
                match customer.update(&mut ctx) {
                    CustomerUpdate::Unchanged => {}
                    CustomerUpdate::OrderPlaced(_) => {
                        if let Some(order) = customer.order() {
                            self.pipeline.submit(order, *id);
                            self.stats.orders_placed += 1;
                        }
                    }
                    CustomerUpdate::Left(reason) => {
                        finished.push(ServiceEvent::CustomerLeft {
                            customer_id: *id,
                            category: customer.category(),
                            reason,
                            at: now,
                        });
                    }
                    CustomerUpdate::Paid { amount, tip } => {
                        finished.push(ServiceEvent::PaymentReceived {
                            customer_id: *id,
                            category: customer.category(),
                            amount,
                            tip,
                            satisfaction: customer.satisfaction(),
                            at: now,
                        });
                    }
                }
            }
        }

        for event in finished {
            self.retire(event);
        }
    }

    /// Remove a customer that reached a terminal state and free what it held
    fn retire(&mut self, event: ServiceEvent) {
        let id = event.customer_id();
        if let Some(mut customer) = self.customers.remove(&id) {
            if let Some(seat) = customer.leave_seat() {
                if !self.seating.release(seat, id) {
                    log::warn!("[ServiceEngine {}] {} did not hold {}", self.session_id, id, seat);
                }
            }
            if let Some(order) = customer.order().filter(|o| o.is_active()) {
                self.pipeline.cancel(order.id);
            }
            if customer.state() == CustomerState::Abandoned {
                self.queue.retain(|queued| *queued != id);
            }
        }

        match &event {
            ServiceEvent::CustomerLeft { .. } => self.stats.abandoned += 1,
            ServiceEvent::PaymentReceived {
                amount,
                tip,
                satisfaction,
                ..
            } => {
                self.stats.departed += 1;
                self.stats.revenue += amount;
                self.stats.tips += tip;
                self.stats.total_departure_satisfaction += satisfaction;
            }
        }
        self.pending_events.push(event);
    }

    fn advance_pipeline(&mut self, now: SimTime) {
        for event in self.pipeline.advance(now) {
            match event {
                PipelineEvent::Started {
                    order_id,
                    customer_id,
                    at,
                } => {
                    if let Some(customer) = self.customers.get_mut(&customer_id) {
                        customer.order_started(order_id, at);
                    }
                }
                PipelineEvent::Completed {
                    order_id,
                    customer_id,
                    at,
                    prep_duration,
                } => {
                    self.estimator.record_completion(at, prep_duration);
                    let served = self
                        .customers
                        .get_mut(&customer_id)
                        .is_some_and(|customer| customer.order_served(order_id, at));
                    if served {
                        self.stats.orders_served += 1;
                    } else {
                        log::warn!(
                            "[ServiceEngine {}] {} finished but {} was not waiting for it",
                            self.session_id,
                            order_id,
                            customer_id
                        );
                    }
                }
            }
        }
    }

    fn seat_customers(&mut self, now: SimTime) {
        self.seating.advance_cleaning(now);

        for (customer_id, seat_id) in self.seating.match_queue(&mut self.queue) {
            let arrived_at = self
                .customers
                .get_mut(&customer_id)
                .and_then(|customer| customer.take_seat(seat_id, now).then(|| customer.arrival_time()));
            match arrived_at {
                Some(arrival_time) => {
                    self.stats.seated += 1;
                    self.stats.total_queue_wait += now - arrival_time;
                    log::debug!("[ServiceEngine {}] {} seated at {}", self.session_id, customer_id, seat_id);
                }
                None => {
                    log::warn!(
                        "[ServiceEngine {}] {} could not take {}, releasing it",
                        self.session_id,
                        customer_id,
                        seat_id
                    );
                    self.seating.release(seat_id, customer_id);
                }
            }
        }
    }

    fn recalibrate(&mut self, now: SimTime) {
        let Some(rates) = self.estimator.estimate(now) else {
            return;
        };

        let server_count = self.pipeline.capacity();
        let model = match QueueingModel::new(rates.arrival_rate, rates.service_rate, server_count) {
            Ok(model) => model,
            Err(err) => {
                log::warn!("[ServiceEngine {}] skipping recalibration: {}", self.session_id, err);
                return;
            }
        };

        let outcome = model.solve();
        let was_stable = self.calibration.map_or(true, |c| c.outcome.is_stable());
        if was_stable && !outcome.is_stable() {
            log::warn!(
                "[ServiceEngine {}] queue unstable at {:.2}: rho = {:.3}",
                self.session_id,
                now,
                outcome.traffic_intensity()
            );
        }

        self.calibration = Some(Calibration {
            rates,
            server_count,
            outcome,
            computed_at: now,
        });
    }

    fn notify_tick_complete(&mut self, terminal_events: usize) {
        if self.observers.is_empty() {
            return;
        }
        let summary = TickSummary {
            tick: self.tick_count,
            game_time: self.game_time,
            queue_length: self.queue.len(),
            occupied_seats: self.seating.count_with_status(SeatStatus::Occupied),
            orders_pending: self.pipeline.pending_count(),
            orders_preparing: self.pipeline.preparing_count(),
            terminal_events,
        };
        for observer in &mut self.observers {
            observer.on_tick_complete(&summary);
        }
    }

    /// Waiting queue in arrival order
    pub fn queue_snapshot(&self) -> Vec<CustomerView> {
        self.queue
            .iter()
            .filter_map(|id| self.customers.get(id))
            .map(|c| c.view(self.game_time))
            .collect()
    }

    pub fn seat_snapshot(&self) -> Vec<SeatView> {
        self.seating.snapshot()
    }

    pub fn customer(&self, id: CustomerId) -> Option<CustomerView> {
        self.customers.get(&id).map(|c| c.view(self.game_time))
    }

    pub fn customers(&self) -> Vec<CustomerView> {
        self.customers.values().map(|c| c.view(self.game_time)).collect()
    }

    /// Advisory server count meeting `target_wait_minutes` under the latest
    /// calibration, `None` when no count within the search bound does.
    /// Falls back to the live count before any calibration exists. Never
    /// changes the live capacity.
    pub fn recommend_server_count(&self, target_wait_minutes: f64) -> Result<Option<usize>> {
        let current = self.pipeline.capacity();
        match &self.calibration {
            Some(calibration) => Ok(queueing::recommend_server_count(
                calibration.rates.arrival_rate,
                calibration.rates.service_rate,
                current,
                target_wait_minutes,
            )?),
            None => Ok(Some(current)),
        }
    }

    /// Change the number of preparation units. Orders already preparing
    /// keep their unit; a reduction only holds back new promotions.
    pub fn set_server_count(&mut self, servers: usize) -> Result<()> {
        if servers == 0 {
            return Err(ConfigError::NoServers.into());
        }
        log::info!(
            "[ServiceEngine {}] server count {} -> {} at {:.2}",
            self.session_id,
            self.pipeline.capacity(),
            servers,
            self.game_time
        );
        self.pipeline.set_capacity(servers);
        self.config.server_count = servers;
        Ok(())
    }

    /// Verify seat, queue, satisfaction and pipeline invariants
    pub fn check_invariants(&self) -> Result<()> {
        let mut seated = 0;
        for customer in self.customers.values() {
            let satisfaction = customer.satisfaction();
            if !(0.0..=MAX_SATISFACTION).contains(&satisfaction) {
                return Err(VenueError::Invariant(format!(
                    "{} has satisfaction {}",
                    customer.id(),
                    satisfaction
                )));
            }

            if let Some(seat_id) = customer.seat() {
                seated += 1;
                let holds = self
                    .seating
                    .seat(seat_id)
                    .is_some_and(|s| s.status() == SeatStatus::Occupied && s.occupant() == Some(customer.id()));
                if !holds {
                    return Err(VenueError::SeatMismatch {
                        seat: seat_id,
                        customer: customer.id(),
                    });
                }
                if self.queue.contains(&customer.id()) {
                    return Err(VenueError::QueuedAndSeated(customer.id()));
                }
            }
        }

        let occupied = self.seating.count_with_status(SeatStatus::Occupied);
        if occupied != seated {
            return Err(VenueError::Invariant(format!(
                "{} seated customers but {} occupied seats",
                seated, occupied
            )));
        }

        for id in &self.queue {
            match self.customers.get(id) {
                Some(c) if c.state() == CustomerState::Queued && c.seat().is_none() => {}
                _ => {
                    return Err(VenueError::Invariant(format!(
                        "{} is in the queue but not waiting for a seat",
                        id
                    )))
                }
            }
        }

        if self.pipeline.is_over_capacity() {
            return Err(VenueError::CapacityExceeded {
                preparing: self.pipeline.preparing_count(),
                capacity: self.pipeline.capacity(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::customer::LeaveReason;
    use crate::core::menu::AvailableItems;
    use crate::core::random::ScriptedRandom;

    fn engine(config: VenueConfig) -> ServiceEngine {
        ServiceEngine::new(config.with_invariant_checks(true))
            .unwrap()
            .with_random_source(Box::new(ScriptedRandom::constant(0.5)))
    }

    #[test]
    fn test_rejects_invalid_config() {
        assert!(matches!(
            ServiceEngine::new(VenueConfig::new().with_seats(0)),
            Err(VenueError::Config(_))
        ));
    }

    #[test]
    fn test_rejects_time_going_backwards() {
        let mut engine = engine(VenueConfig::new());
        engine.advance(5.0, 5.0).unwrap();
        assert!(matches!(
            engine.advance(4.0, 0.0),
            Err(VenueError::TimeWentBackwards { .. })
        ));
        assert_eq!(engine.advance(5.0, -1.0), Err(VenueError::InvalidDelta(-1.0)));
    }

    #[test]
    fn test_spawn_queues_then_seats() {
        let mut engine = engine(VenueConfig::new().with_seats(1));
        let first = engine.spawn_customer(Some(CustomerCategory::Tourist));
        let second = engine.spawn_customer(None);

        assert_eq!(engine.queue_snapshot().len(), 2);
        engine.advance(0.0, 0.0).unwrap();

        let queue = engine.queue_snapshot();
        assert_eq!(queue.len(), 1);
        assert_eq!(queue[0].id, second);
        assert_eq!(engine.customer(first).unwrap().state, CustomerState::Seated);
        assert_eq!(engine.seat_snapshot()[0].occupant, Some(first));
    }

    #[test]
    fn test_unknown_category_name_uses_default() {
        let mut engine = engine(VenueConfig::new());
        let id = engine.spawn_customer_named("time traveller");
        assert_eq!(engine.customer(id).unwrap().category, CustomerCategory::default());
    }

    #[test]
    fn test_full_visit_produces_payment() {
        let mut engine = engine(VenueConfig::new().with_cleaning_delay(1.0));
        let id = engine.spawn_customer(Some(CustomerCategory::Regular));

        let mut events = Vec::new();
        for minute in 0..40 {
            events.extend(engine.advance(minute as f64, 1.0).unwrap());
        }

        assert_eq!(events.len(), 1);
        match &events[0] {
            ServiceEvent::PaymentReceived {
                customer_id,
                amount,
                tip,
                ..
            } => {
                assert_eq!(*customer_id, id);
                assert!(*amount > 0.0);
                assert!(*tip > 0.0);
            }
            other => panic!("expected payment, got {:?}", other),
        }
        assert_eq!(engine.active_customers(), 0);
        assert_eq!(engine.stats().departed, 1);
        assert_eq!(engine.stats().orders_served, 1);
        assert_eq!(engine.seat_snapshot()[0].status, SeatStatus::Empty);
    }

    #[test]
    fn test_stalled_customer_frees_seat() {
        let mut engine = engine(VenueConfig::new().with_seats(1).with_cleaning_delay(0.0))
            .with_availability(Box::new(AvailableItems::none()));
        let id = engine.spawn_customer(Some(CustomerCategory::Business));

        let mut left = Vec::new();
        for minute in 0..=10 {
            left.extend(engine.advance(minute as f64, 1.0).unwrap());
        }

        assert_eq!(
            left,
            vec![ServiceEvent::CustomerLeft {
                customer_id: id,
                category: CustomerCategory::Business,
                reason: LeaveReason::NothingAvailable,
                at: 9.0,
            }]
        );
        assert_eq!(engine.seat_snapshot()[0].status, SeatStatus::Empty);
        assert_eq!(engine.orders_pending(), 0);
    }

    #[test]
    fn test_abandoning_customer_cancels_order() {
        // Nothing completes within a Business customer's patience
        let slow = Menu::new(vec![crate::core::menu::MenuItem::new("coffee", "Coffee", 3.0, 30.0)]);
        let mut engine = engine(VenueConfig::new().with_servers(1)).with_menu(slow);
        engine.spawn_customer(Some(CustomerCategory::Business));

        let mut events = Vec::new();
        for minute in 0..=12 {
            events.extend(engine.advance(minute as f64, 1.0).unwrap());
        }

        assert_eq!(events.len(), 1);
        assert!(matches!(
            events[0],
            ServiceEvent::CustomerLeft {
                reason: LeaveReason::WaitedTooLong,
                ..
            }
        ));
        assert_eq!(engine.orders_preparing(), 0);
        assert_eq!(engine.stats().abandoned, 1);
    }

    struct Counter(std::sync::Arc<std::sync::atomic::AtomicU64>);

    impl EngineObserver for Counter {
        fn on_tick_complete(&mut self, _summary: &TickSummary) {
            self.0.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        }
    }

    #[test]
    fn test_observers_see_every_tick() {
        let ticks = std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0));
        let mut engine = engine(VenueConfig::new());
        engine.add_observer(Box::new(Counter(ticks.clone())));

        for minute in 0..3 {
            engine.advance(minute as f64, 1.0).unwrap();
        }
        assert_eq!(ticks.load(std::sync::atomic::Ordering::SeqCst), 3);
    }

    #[test]
    fn test_recommendation_defaults_to_configured_servers() {
        let engine = engine(VenueConfig::new().with_servers(3));
        assert!(engine.calibration().is_none());
        assert_eq!(engine.recommend_server_count(5.0).unwrap(), Some(3));
    }

    #[test]
    fn test_set_server_count_rejects_zero() {
        let mut engine = engine(VenueConfig::new().with_servers(2));
        assert_eq!(
            engine.set_server_count(0),
            Err(VenueError::Config(ConfigError::NoServers))
        );
        engine.set_server_count(4).unwrap();
        assert_eq!(engine.config().server_count, 4);
        assert_eq!(engine.recommend_server_count(5.0).unwrap(), Some(4));
    }
}
