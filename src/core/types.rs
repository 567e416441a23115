use serde::{Deserialize, Serialize};

/// Identifier of a customer inside one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CustomerId(pub(crate) u64);

impl CustomerId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw numeric id
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for CustomerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "customer_{}", self.0)
    }
}

/// Identifier of an order, unique inside one engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub(crate) u64);

impl OrderId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for OrderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "order_{}", self.0)
    }
}

/// Index of a seat in the allocator's fixed seat collection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeatId(pub(crate) usize);

impl SeatId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SeatId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "seat_{}", self.0)
    }
}

/// Simulated time in minutes
pub type SimTime = f64;

/// Slack for elapsed-time comparisons on accumulated float clocks
pub const TIME_EPSILON: f64 = 1e-9;

/// Monotonic id source shared by the engine for customers and orders
#[derive(Debug, Clone, Default)]
pub(crate) struct IdSequence {
    next: u64,
}

impl IdSequence {
    pub(crate) fn next_customer(&mut self) -> CustomerId {
        self.next += 1;
        CustomerId(self.next)
    }

    pub(crate) fn next_order(&mut self) -> OrderId {
        self.next += 1;
        OrderId(self.next)
    }
}
