pub mod core;

// Re-export commonly used types
pub use crate::core::customer::{CustomerState, CustomerView, LeaveReason};
pub use crate::core::engine::ServiceEngine;
pub use crate::core::event::ServiceEvent;
pub use crate::core::menu::{CustomerCategory, MenuAvailability};
pub use crate::core::queueing::{ModelOutcome, QueueingModel, SteadyState};
pub use crate::core::seating::{SeatStatus, SeatView};
pub use crate::core::types::{CustomerId, OrderId, SeatId, SimTime};
