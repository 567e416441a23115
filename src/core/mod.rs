pub mod arrivals;
pub mod config;
pub mod context;
pub mod customer;
pub mod engine;
pub mod error;
pub mod event;
pub mod event_scheduler;
pub mod menu;
pub mod order;
pub mod queueing;
pub mod random;
pub mod rates;
pub mod replication;
pub mod seating;
pub mod types;

// Re-export commonly used types
pub use config::{ConcurrencyMode, DwellTimes, ReplicationConfig, VenueConfig};
pub use engine::{Calibration, EngineObserver, ServiceEngine, ServiceStats, TickSummary};
pub use error::{ConfigError, ModelError, Result, VenueError};
