use thiserror::Error;

use super::types::{CustomerId, SeatId, SimTime};

/// Errors produced by the analytic queueing model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    #[error("arrival rate must be finite and non-negative, got {0}")]
    InvalidArrivalRate(f64),

    #[error("service rate must be finite and positive, got {0}")]
    InvalidServiceRate(f64),

    #[error("server count must be at least 1")]
    NoServers,

    #[error("target wait must be finite and non-negative, got {0}")]
    InvalidTarget(f64),
}

/// Errors produced while validating configuration
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("seat count must be greater than 0")]
    NoSeats,

    #[error("server count must be greater than 0")]
    NoServers,

    #[error("{name} must be finite and non-negative, got {value}")]
    InvalidDuration { name: &'static str, value: f64 },

    #[error("rate window must be greater than 0 minutes")]
    EmptyRateWindow,

    #[error("category weights must contain at least one positive weight")]
    NoCategoryWeights,

    #[error("replication count must be greater than 0")]
    NoReplications,

    #[error("tick length must be greater than 0 minutes")]
    ZeroTick,

    #[error("arrival rate must be finite and positive, got {0}")]
    InvalidArrivalRate(f64),
}

/// Errors surfaced by the service engine
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VenueError {
    #[error("game time went backwards: {current} -> {requested}")]
    TimeWentBackwards { current: SimTime, requested: SimTime },

    #[error("delta time must be finite and non-negative, got {0}")]
    InvalidDelta(f64),

    #[error("customer {0} is both queued and seated")]
    QueuedAndSeated(CustomerId),

    #[error("seat {seat} and customer {customer} disagree about occupancy")]
    SeatMismatch { seat: SeatId, customer: CustomerId },

    #[error("{preparing} orders preparing exceeds capacity {capacity}")]
    CapacityExceeded { preparing: usize, capacity: usize },

    #[error("invariant violated: {0}")]
    Invariant(String),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("queueing model error: {0}")]
    Model(#[from] ModelError),

    #[error("thread pool error: {0}")]
    ThreadPool(String),
}

pub type Result<T> = std::result::Result<T, VenueError>;
