use super::config::DwellTimes;
use super::menu::{Menu, MenuAvailability};
use super::random::RandomSource;
use super::types::{IdSequence, OrderId, SimTime};

/// Everything a component operation may read or draw from during one tick.
/// Built by the engine for each pass and handed down explicitly.
pub struct TickContext<'a> {
    pub now: SimTime,
    pub delta: f64,
    pub menu: &'a Menu,
    pub availability: &'a dyn MenuAvailability,
    pub rng: &'a mut dyn RandomSource,
    pub dwell: DwellTimes,
    pub(crate) ids: &'a mut IdSequence,
}

impl<'a> TickContext<'a> {
    pub(crate) fn new(
        now: SimTime,
        delta: f64,
        menu: &'a Menu,
        availability: &'a dyn MenuAvailability,
        rng: &'a mut dyn RandomSource,
        dwell: DwellTimes,
        ids: &'a mut IdSequence,
    ) -> Self {
        Self {
            now,
            delta,
            menu,
            availability,
            rng,
            dwell,
            ids,
        }
    }

    pub(crate) fn next_order_id(&mut self) -> OrderId {
        self.ids.next_order()
    }
}
