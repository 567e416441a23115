use venue_sim::core::arrivals::ArrivalGenerator;
use venue_sim::core::replication::{aggregate, drive, run_replications};
use venue_sim::core::{
    ConcurrencyMode, EngineObserver, ReplicationConfig, ServiceEngine, TickSummary, VenueConfig,
};
use venue_sim::ModelOutcome;

/// Logs a status line once per simulated hour
struct HourlyReport;

impl EngineObserver for HourlyReport {
    fn on_tick_complete(&mut self, summary: &TickSummary) {
        if summary.game_time > 0.0 && summary.game_time % 60.0 == 0.0 {
            log::info!(
                "t={:>5.0} queue={} seated={} pending={} preparing={}",
                summary.game_time,
                summary.queue_length,
                summary.occupied_seats,
                summary.orders_pending,
                summary.orders_preparing
            );
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .format_timestamp(None)
        .init();

    let config = ReplicationConfig::new()
        .with_venue(VenueConfig::new().with_seats(8).with_servers(2))
        .with_arrival_rate(0.35)
        .with_duration(480.0)
        .with_replications(16)
        .with_concurrency(ConcurrencyMode::Rayon);
    config.validate()?;

    println!("Starting venue simulation");
    println!(
        "  seats={} servers={} arrivals/min={:.2} duration={} min",
        config.venue.seat_count,
        config.venue.server_count,
        config.arrival_rate_per_minute,
        config.duration_minutes
    );

    let mut engine = ServiceEngine::new(config.venue.clone())?;
    engine.add_observer(Box::new(HourlyReport));
    let mut arrivals = ArrivalGenerator::seeded(config.arrival_rate_per_minute, config.base_seed);
    drive(&mut engine, &mut arrivals, config.duration_minutes, config.tick_minutes)?;

    let stats = engine.stats();
    println!("\nSingle run {}", engine.session_id());
    println!("  spawned={} departed={} abandoned={}", stats.spawned, stats.departed, stats.abandoned);
    println!("  revenue={:.2} tips={:.2}", stats.revenue, stats.tips);
    if let Some(wait) = stats.mean_queue_wait() {
        println!("  mean wait for a seat={:.2} min", wait);
    }

    match engine.calibration().map(|c| c.outcome) {
        Some(ModelOutcome::Stable(state)) => println!(
            "  model: rho={:.3} Lq={:.2} Wq={:.2} min P(wait)={:.3}",
            state.traffic_intensity, state.lq, state.wq, state.probability_of_waiting
        ),
        Some(ModelOutcome::Unstable { traffic_intensity }) => {
            println!("  model: unstable (rho={:.3})", traffic_intensity)
        }
        None => println!("  model: not enough observations"),
    }
    match engine.recommend_server_count(config.target_wait_minutes)? {
        Some(servers) => println!(
            "  recommended servers for a {:.0} min wait: {}",
            config.target_wait_minutes, servers
        ),
        None => println!(
            "  no server count meets a {:.0} min wait",
            config.target_wait_minutes
        ),
    }

    let summaries = run_replications(&config)?;
    if let Some(batch) = aggregate(&summaries) {
        println!("\nBatch of {} replications", batch.replications);
        println!("{}", serde_json::to_string_pretty(&batch)?);
    }

    Ok(())
}
