//! Batches of independent seeded runs, used to compare the discrete
//! simulation against the calibrated M/M/c model.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::arrivals::ArrivalGenerator;
use super::config::{ConcurrencyMode, ReplicationConfig};
use super::engine::ServiceEngine;
use super::error::{Result, VenueError};
use super::queueing::ModelOutcome;

/// Seed offset separating the arrival stream from the engine's own draws
const ARRIVAL_SEED_SALT: u64 = 0x9E37_79B9_7F4A_7C15;

/// Outcome of one replication
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplicationSummary {
    pub run_id: Uuid,
    pub seed: u64,
    pub customers_spawned: u64,
    pub customers_departed: u64,
    pub customers_abandoned: u64,
    pub revenue: f64,
    pub tips: f64,
    pub mean_queue_wait: Option<f64>,
    pub mean_departure_satisfaction: Option<f64>,
    pub abandonment_ratio: Option<f64>,
    pub observed_arrival_rate: Option<f64>,
    pub observed_service_rate: Option<f64>,
    pub model: Option<ModelOutcome>,
    /// `None` when no bounded server count meets the target wait
    pub recommended_servers: Option<usize>,
}

/// Averages across a batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchAggregate {
    pub replications: usize,
    pub mean_revenue: f64,
    pub mean_tips: f64,
    pub mean_abandonment_ratio: f64,
    /// Fraction of replications whose final calibration was unstable
    pub unstable_fraction: f64,
    pub max_recommended_servers: Option<usize>,
    /// Replications where no bounded server count met the target wait
    pub unreachable_targets: usize,
}

/// Drive one engine with Poisson arrivals for `duration` minutes in fixed
/// ticks. Arrivals up to each tick are spawned right after that tick runs.
pub fn drive(
    engine: &mut ServiceEngine,
    arrivals: &mut ArrivalGenerator,
    duration: f64,
    tick: f64,
) -> Result<usize> {
    let mut terminal_events = 0;
    let steps = (duration / tick).ceil() as u64;
    for step in 0..=steps {
        let now = step as f64 * tick;
        let delta = if step == 0 { 0.0 } else { tick };
        terminal_events += engine.advance(now, delta)?.len();
        for _ in 0..arrivals.arrivals_until(now) {
            engine.spawn_customer(None);
        }
    }
    Ok(terminal_events)
}

/// Run replication `index` of the batch
pub fn run_replication(config: &ReplicationConfig, index: usize) -> Result<ReplicationSummary> {
    let seed = config.base_seed.wrapping_add(index as u64);
    let venue = config.venue.clone().with_random_seed(seed);
    let mut engine = ServiceEngine::new(venue)?;
    let mut arrivals = ArrivalGenerator::seeded(config.arrival_rate_per_minute, seed ^ ARRIVAL_SEED_SALT);

    drive(&mut engine, &mut arrivals, config.duration_minutes, config.tick_minutes)?;

    let stats = engine.stats();
    let calibration = engine.calibration();
    let summary = ReplicationSummary {
        run_id: engine.session_id(),
        seed,
        customers_spawned: stats.spawned,
        customers_departed: stats.departed,
        customers_abandoned: stats.abandoned,
        revenue: stats.revenue,
        tips: stats.tips,
        mean_queue_wait: stats.mean_queue_wait(),
        mean_departure_satisfaction: stats.mean_departure_satisfaction(),
        abandonment_ratio: stats.abandonment_ratio(),
        observed_arrival_rate: calibration.map(|c| c.rates.arrival_rate),
        observed_service_rate: calibration.map(|c| c.rates.service_rate),
        model: calibration.map(|c| c.outcome),
        recommended_servers: engine.recommend_server_count(config.target_wait_minutes)?,
    };

    log::info!(
        "[Replication {}] seed {}: {} departed, {} abandoned, revenue {:.2}",
        summary.run_id,
        seed,
        summary.customers_departed,
        summary.customers_abandoned,
        summary.revenue
    );
    Ok(summary)
}

/// Run the whole batch, sequentially or on a Rayon pool. Results are in
/// replication order either way.
pub fn run_replications(config: &ReplicationConfig) -> Result<Vec<ReplicationSummary>> {
    config.validate()?;

    match config.concurrency_mode {
        ConcurrencyMode::Sequential => (0..config.replications)
            .map(|index| run_replication(config, index))
            .collect(),
        ConcurrencyMode::Rayon => {
            let run = || {
                (0..config.replications)
                    .into_par_iter()
                    .map(|index| run_replication(config, index))
                    .collect::<Result<Vec<_>>>()
            };
            match config.thread_pool_size {
                Some(size) => rayon::ThreadPoolBuilder::new()
                    .num_threads(size)
                    .build()
                    .map_err(|e| VenueError::ThreadPool(e.to_string()))?
                    .install(run),
                None => run(),
            }
        }
    }
}

pub fn aggregate(summaries: &[ReplicationSummary]) -> Option<BatchAggregate> {
    if summaries.is_empty() {
        return None;
    }
    let n = summaries.len() as f64;

    Some(BatchAggregate {
        replications: summaries.len(),
        mean_revenue: summaries.iter().map(|s| s.revenue).sum::<f64>() / n,
        mean_tips: summaries.iter().map(|s| s.tips).sum::<f64>() / n,
        mean_abandonment_ratio: summaries
            .iter()
            .map(|s| s.abandonment_ratio.unwrap_or(0.0))
            .sum::<f64>()
            / n,
        unstable_fraction: summaries
            .iter()
            .filter(|s| s.model.is_some_and(|m| !m.is_stable()))
            .count() as f64
            / n,
        max_recommended_servers: summaries.iter().filter_map(|s| s.recommended_servers).max(),
        unreachable_targets: summaries.iter().filter(|s| s.recommended_servers.is_none()).count(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::VenueConfig;

    fn small_batch() -> ReplicationConfig {
        ReplicationConfig::new()
            .with_venue(VenueConfig::new().with_invariant_checks(true))
            .with_replications(3)
            .with_duration(120.0)
            .with_arrival_rate(0.2)
    }

    #[test]
    fn test_sequential_batch_is_reproducible() {
        let a = run_replications(&small_batch()).unwrap();
        let b = run_replications(&small_batch()).unwrap();

        assert_eq!(a.len(), 3);
        for (x, y) in a.iter().zip(&b) {
            assert_eq!(x.seed, y.seed);
            assert_eq!(x.customers_spawned, y.customers_spawned);
            assert_eq!(x.revenue, y.revenue);
        }
        assert!(a.iter().all(|s| s.customers_spawned > 0));
    }

    #[test]
    fn test_rayon_matches_sequential() {
        let sequential = run_replications(&small_batch()).unwrap();
        let parallel = run_replications(
            &small_batch()
                .with_concurrency(ConcurrencyMode::Rayon)
                .with_thread_pool_size(2),
        )
        .unwrap();

        let key = |s: &ReplicationSummary| (s.seed, s.customers_spawned, s.customers_departed);
        assert_eq!(
            sequential.iter().map(key).collect::<Vec<_>>(),
            parallel.iter().map(key).collect::<Vec<_>>()
        );
    }

    #[test]
    fn test_aggregate() {
        let summaries = run_replications(&small_batch()).unwrap();
        let batch = aggregate(&summaries).unwrap();
        assert_eq!(batch.replications, 3);
        assert!(batch.mean_revenue >= 0.0);
        assert!((0.0..=1.0).contains(&batch.mean_abandonment_ratio));
        assert_eq!(
            batch.unreachable_targets,
            summaries.iter().filter(|s| s.recommended_servers.is_none()).count()
        );
        for s in &summaries {
            let finished = s.customers_departed + s.customers_abandoned;
            if finished > 0 {
                let expected = s.customers_abandoned as f64 / finished as f64;
                assert_eq!(s.abandonment_ratio, Some(expected));
            }
        }
        assert!(aggregate(&[]).is_none());
    }

    #[test]
    fn test_invalid_batch_rejected() {
        let config = small_batch().with_replications(0);
        assert!(matches!(run_replications(&config), Err(VenueError::Config(_))));
    }
}
