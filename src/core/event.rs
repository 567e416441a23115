use serde::{Deserialize, Serialize};

use super::customer::LeaveReason;
use super::menu::CustomerCategory;
use super::types::{CustomerId, SimTime};

/// Terminal customer events drained from each tick for the economy and HUD
/// collaborators. Money and reputation updates happen on their side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServiceEvent {
    CustomerLeft {
        customer_id: CustomerId,
        category: CustomerCategory,
        reason: LeaveReason,
        at: SimTime,
    },
    PaymentReceived {
        customer_id: CustomerId,
        category: CustomerCategory,
        amount: f64,
        tip: f64,
        satisfaction: f64,
        at: SimTime,
    },
}

impl ServiceEvent {
    pub fn customer_id(&self) -> CustomerId {
        match self {
            ServiceEvent::CustomerLeft { customer_id, .. }
            | ServiceEvent::PaymentReceived { customer_id, .. } => *customer_id,
        }
    }
}
