//! Analytic M/M/c queueing model.
//!
//! Pure functions over an arrival rate λ (per minute), a per-server service
//! rate μ (per minute) and a server count c. The model is recalibrated from
//! empirical rates every tick and is advisory only: nothing here mutates the
//! discrete simulation.

use serde::{Deserialize, Serialize};

use super::error::ModelError;

/// Upper bound for the server-count search
pub const MAX_RECOMMENDED_SERVERS: usize = 64;

/// Parameters of an M/M/c queue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QueueingModel {
    arrival_rate: f64,
    service_rate: f64,
    server_count: usize,
}

/// Steady-state metrics of a stable queue
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SteadyState {
    pub arrival_rate: f64,
    pub service_rate: f64,
    pub server_count: usize,
    /// ρ = λ / (cμ)
    pub traffic_intensity: f64,
    /// Probability of an empty system
    pub p0: f64,
    /// Mean number waiting in queue
    pub lq: f64,
    /// Mean wait in queue (minutes)
    pub wq: f64,
    /// Mean number in system
    pub l: f64,
    /// Mean time in system (minutes)
    pub w: f64,
    pub utilization: f64,
    /// Erlang-C probability that an arrival has to wait
    pub probability_of_waiting: f64,
}

/// Result of solving the model. Callers must branch on stability before
/// reading queue lengths or waits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ModelOutcome {
    Stable(SteadyState),
    Unstable { traffic_intensity: f64 },
}

impl ModelOutcome {
    pub fn is_stable(&self) -> bool {
        matches!(self, ModelOutcome::Stable(_))
    }

    pub fn steady_state(&self) -> Option<&SteadyState> {
        match self {
            ModelOutcome::Stable(state) => Some(state),
            ModelOutcome::Unstable { .. } => None,
        }
    }

    pub fn traffic_intensity(&self) -> f64 {
        match self {
            ModelOutcome::Stable(state) => state.traffic_intensity,
            ModelOutcome::Unstable { traffic_intensity } => *traffic_intensity,
        }
    }

    /// Whether the mean queue wait is at or below `target_wait` minutes.
    /// An unstable queue never meets a target.
    pub fn meets_wait_target(&self, target_wait: f64) -> bool {
        match self {
            ModelOutcome::Stable(state) => state.wq <= target_wait,
            ModelOutcome::Unstable { .. } => false,
        }
    }
}

impl QueueingModel {
    pub fn new(arrival_rate: f64, service_rate: f64, server_count: usize) -> Result<Self, ModelError> {
        if !arrival_rate.is_finite() || arrival_rate < 0.0 {
            return Err(ModelError::InvalidArrivalRate(arrival_rate));
        }
        if !service_rate.is_finite() || service_rate <= 0.0 {
            return Err(ModelError::InvalidServiceRate(service_rate));
        }
        if server_count == 0 {
            return Err(ModelError::NoServers);
        }
        Ok(Self {
            arrival_rate,
            service_rate,
            server_count,
        })
    }

    pub fn arrival_rate(&self) -> f64 {
        self.arrival_rate
    }

    pub fn service_rate(&self) -> f64 {
        self.service_rate
    }

    pub fn server_count(&self) -> usize {
        self.server_count
    }

    /// Offered load a = λ/μ (in Erlangs)
    pub fn offered_load(&self) -> f64 {
        self.arrival_rate / self.service_rate
    }

    pub fn traffic_intensity(&self) -> f64 {
        self.arrival_rate / (self.server_count as f64 * self.service_rate)
    }

    pub fn is_stable(&self) -> bool {
        self.traffic_intensity() < 1.0
    }

    pub fn solve(&self) -> ModelOutcome {
        let rho = self.traffic_intensity();
        if rho >= 1.0 {
            return ModelOutcome::Unstable {
                traffic_intensity: rho,
            };
        }

        let c = self.server_count;
        let a = self.offered_load();

        // Σ_{n<c} aⁿ/n! built term by term, then a^c/c! from the last term
        let mut term = 1.0;
        let mut partial_sum = 0.0;
        for n in 0..c {
            if n > 0 {
                term *= a / n as f64;
            }
            partial_sum += term;
        }
        let erlang_term = term * a / c as f64;

        let p0 = 1.0 / (partial_sum + erlang_term / (1.0 - rho));
        let lq = erlang_term * rho * p0 / ((1.0 - rho) * (1.0 - rho));
        let wq = if self.arrival_rate > 0.0 {
            lq / self.arrival_rate
        } else {
            0.0
        };
        let probability_of_waiting = erlang_term * p0 / (1.0 - rho);

        ModelOutcome::Stable(SteadyState {
            arrival_rate: self.arrival_rate,
            service_rate: self.service_rate,
            server_count: c,
            traffic_intensity: rho,
            p0,
            lq,
            wq,
            l: lq + a,
            w: wq + 1.0 / self.service_rate,
            utilization: rho,
            probability_of_waiting,
        })
    }

    /// Probability of exactly `n` customers in the system, `None` when unstable
    pub fn occupancy_probability(&self, n: usize) -> Option<f64> {
        self.solve()
            .steady_state()
            .map(|state| state.occupancy_probability(n))
    }
}

impl SteadyState {
    /// Pₙ = aⁿ/n! · P₀ for n < c, aⁿ/(c^(n−c) · c!) · P₀ otherwise
    pub fn occupancy_probability(&self, n: usize) -> f64 {
        let a = self.arrival_rate / self.service_rate;
        let mut p = self.p0;
        for k in 1..=n {
            p *= a / k.min(self.server_count) as f64;
        }
        p
    }
}

/// Smallest server count whose mean queue wait meets `target_wait`, searched
/// monotonically from `current`: downwards while the smaller count still
/// meets the target, upwards while the target is missed. The upward search
/// stops at `MAX_RECOMMENDED_SERVERS`; `None` means no count up to that
/// bound meets the target. Advisory only.
pub fn recommend_server_count(
    arrival_rate: f64,
    service_rate: f64,
    current: usize,
    target_wait: f64,
) -> Result<Option<usize>, ModelError> {
    if !target_wait.is_finite() || target_wait < 0.0 {
        return Err(ModelError::InvalidTarget(target_wait));
    }

    let meets = |servers: usize| -> Result<bool, ModelError> {
        Ok(QueueingModel::new(arrival_rate, service_rate, servers)?
            .solve()
            .meets_wait_target(target_wait))
    };

    let mut servers = current.max(1);
    if meets(servers)? {
        while servers > 1 && meets(servers - 1)? {
            servers -= 1;
        }
        return Ok(Some(servers));
    }

    while servers < MAX_RECOMMENDED_SERVERS {
        servers += 1;
        if meets(servers)? {
            return Ok(Some(servers));
        }
    }
    Ok(None)
}
