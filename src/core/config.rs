//! Configuration for venue simulations
//!
//! `VenueConfig` sizes a single engine; `ReplicationConfig` controls batches
//! of independent seeded runs, including how they are spread over threads.

use serde::{Deserialize, Serialize};

use super::error::ConfigError;
use super::menu::CustomerCategory;

/// Enumeration of supported concurrency modes for replication batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConcurrencyMode {
    /// Replications run one after another on the calling thread
    #[default]
    Sequential,
    /// Replications are spread over a Rayon thread pool
    Rayon,
}

/// Fixed dwell times of the late customer states
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DwellTimes {
    pub eating_minutes: f64,
    pub paying_minutes: f64,
}

impl Default for DwellTimes {
    fn default() -> Self {
        Self {
            eating_minutes: 10.0,
            paying_minutes: 1.0,
        }
    }
}

/// Configuration of one service engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VenueConfig {
    /// Number of seats (tables)
    pub seat_count: usize,
    /// Number of preparation units (servers)
    pub server_count: usize,
    /// Minutes a seat spends in cleaning before it is empty again
    pub cleaning_delay_minutes: f64,
    pub dwell: DwellTimes,
    /// Sliding window used to estimate arrival and service rates
    pub rate_window_minutes: f64,
    /// Relative weights used when a customer is spawned without a category
    pub category_weights: Vec<(CustomerCategory, f64)>,
    /// Seed of the engine's random source
    pub random_seed: u64,
    /// Check seat/queue/pipeline invariants at the end of every tick
    pub enforce_invariants: bool,
}

impl Default for VenueConfig {
    fn default() -> Self {
        Self {
            seat_count: 6,
            server_count: 2,
            cleaning_delay_minutes: 2.0,
            dwell: DwellTimes::default(),
            rate_window_minutes: 60.0,
            category_weights: CustomerCategory::ALL.iter().map(|c| (*c, 1.0)).collect(),
            random_seed: 42,
            enforce_invariants: false,
        }
    }
}

impl VenueConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_seats(mut self, seats: usize) -> Self {
        self.seat_count = seats;
        self
    }

    pub fn with_servers(mut self, servers: usize) -> Self {
        self.server_count = servers;
        self
    }

    pub fn with_cleaning_delay(mut self, minutes: f64) -> Self {
        self.cleaning_delay_minutes = minutes;
        self
    }

    pub fn with_dwell_times(mut self, eating_minutes: f64, paying_minutes: f64) -> Self {
        self.dwell = DwellTimes {
            eating_minutes,
            paying_minutes,
        };
        self
    }

    pub fn with_rate_window(mut self, minutes: f64) -> Self {
        self.rate_window_minutes = minutes;
        self
    }

    pub fn with_category_weights(mut self, weights: Vec<(CustomerCategory, f64)>) -> Self {
        self.category_weights = weights;
        self
    }

    pub fn with_random_seed(mut self, seed: u64) -> Self {
        self.random_seed = seed;
        self
    }

    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.enforce_invariants = enabled;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.seat_count == 0 {
            return Err(ConfigError::NoSeats);
        }
        if self.server_count == 0 {
            return Err(ConfigError::NoServers);
        }

        let durations = [
            ("cleaning delay", self.cleaning_delay_minutes),
            ("eating time", self.dwell.eating_minutes),
            ("paying time", self.dwell.paying_minutes),
        ];
        for (name, value) in durations {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidDuration { name, value });
            }
        }

        if !self.rate_window_minutes.is_finite() || self.rate_window_minutes <= 0.0 {
            return Err(ConfigError::EmptyRateWindow);
        }

        if !self
            .category_weights
            .iter()
            .any(|(_, weight)| weight.is_finite() && *weight > 0.0)
        {
            return Err(ConfigError::NoCategoryWeights);
        }

        Ok(())
    }
}

/// Configuration for a batch of independent seeded runs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationConfig {
    pub venue: VenueConfig,
    pub replications: usize,
    pub duration_minutes: f64,
    pub tick_minutes: f64,
    /// Poisson arrival rate (customers per minute)
    pub arrival_rate_per_minute: f64,
    /// Replication `i` runs with seed `base_seed + i`
    pub base_seed: u64,
    /// Queue wait the server-count recommendation aims for
    pub target_wait_minutes: f64,
    pub concurrency_mode: ConcurrencyMode,
    /// Only relevant when concurrency_mode is Rayon
    pub thread_pool_size: Option<usize>,
}

impl Default for ReplicationConfig {
    fn default() -> Self {
        Self {
            venue: VenueConfig::default(),
            replications: 8,
            duration_minutes: 480.0,
            tick_minutes: 1.0,
            arrival_rate_per_minute: 0.3,
            base_seed: 42,
            target_wait_minutes: 5.0,
            concurrency_mode: ConcurrencyMode::default(),
            thread_pool_size: None,
        }
    }
}

impl ReplicationConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_venue(mut self, venue: VenueConfig) -> Self {
        self.venue = venue;
        self
    }

    pub fn with_replications(mut self, replications: usize) -> Self {
        self.replications = replications;
        self
    }

    pub fn with_duration(mut self, minutes: f64) -> Self {
        self.duration_minutes = minutes;
        self
    }

    pub fn with_tick(mut self, minutes: f64) -> Self {
        self.tick_minutes = minutes;
        self
    }

    pub fn with_arrival_rate(mut self, per_minute: f64) -> Self {
        self.arrival_rate_per_minute = per_minute;
        self
    }

    pub fn with_base_seed(mut self, seed: u64) -> Self {
        self.base_seed = seed;
        self
    }

    pub fn with_target_wait(mut self, minutes: f64) -> Self {
        self.target_wait_minutes = minutes;
        self
    }

    pub fn with_concurrency(mut self, mode: ConcurrencyMode) -> Self {
        self.concurrency_mode = mode;
        self
    }

    pub fn with_thread_pool_size(mut self, size: usize) -> Self {
        self.thread_pool_size = Some(size);
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.venue.validate()?;
        if self.replications == 0 {
            return Err(ConfigError::NoReplications);
        }
        if !self.tick_minutes.is_finite() || self.tick_minutes <= 0.0 {
            return Err(ConfigError::ZeroTick);
        }
        if !self.duration_minutes.is_finite() || self.duration_minutes < 0.0 {
            return Err(ConfigError::InvalidDuration {
                name: "duration",
                value: self.duration_minutes,
            });
        }
        if !self.arrival_rate_per_minute.is_finite() || self.arrival_rate_per_minute <= 0.0 {
            return Err(ConfigError::InvalidArrivalRate(self.arrival_rate_per_minute));
        }
        if !self.target_wait_minutes.is_finite() || self.target_wait_minutes < 0.0 {
            return Err(ConfigError::InvalidDuration {
                name: "target wait",
                value: self.target_wait_minutes,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VenueConfig::default();
        assert_eq!(config.seat_count, 6);
        assert_eq!(config.server_count, 2);
        assert_eq!(config.dwell.eating_minutes, 10.0);
        assert_eq!(config.dwell.paying_minutes, 1.0);
        assert_eq!(config.category_weights.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = VenueConfig::new()
            .with_seats(3)
            .with_servers(4)
            .with_cleaning_delay(5.0)
            .with_random_seed(7);

        assert_eq!(config.seat_count, 3);
        assert_eq!(config.server_count, 4);
        assert_eq!(config.cleaning_delay_minutes, 5.0);
        assert_eq!(config.random_seed, 7);
    }

    #[test]
    fn test_validation() {
        assert_eq!(VenueConfig::new().with_seats(0).validate(), Err(ConfigError::NoSeats));
        assert_eq!(VenueConfig::new().with_servers(0).validate(), Err(ConfigError::NoServers));
        assert!(matches!(
            VenueConfig::new().with_cleaning_delay(-1.0).validate(),
            Err(ConfigError::InvalidDuration { name: "cleaning delay", .. })
        ));
        assert_eq!(
            VenueConfig::new()
                .with_category_weights(vec![(CustomerCategory::Student, 0.0)])
                .validate(),
            Err(ConfigError::NoCategoryWeights)
        );
    }

    #[test]
    fn test_replication_config() {
        let config = ReplicationConfig::new()
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(4)
            .with_replications(2);

        assert_eq!(config.concurrency_mode, ConcurrencyMode::Rayon);
        assert_eq!(config.thread_pool_size, Some(4));
        assert!(config.validate().is_ok());
        assert_eq!(
            config.clone().with_replications(0).validate(),
            Err(ConfigError::NoReplications)
        );
        assert_eq!(config.with_tick(0.0).validate(), Err(ConfigError::ZeroTick));
    }

    #[test]
    fn test_concurrency_mode_default() {
        assert_eq!(ConcurrencyMode::default(), ConcurrencyMode::Sequential);
    }
}
