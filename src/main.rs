/*
 * 3D Flocking Simulation
 *
 * Headless runner: loads a flock configuration (first argument, FLOCK_CONFIG,
 * or defaults), spawns the flock and steps it at a fixed delta time,
 * logging a stats line every `report_every` ticks.
 */

use std::path::PathBuf;
use std::time::Instant;

use tracing::info;
use tracing_subscriber::EnvFilter;

use flocking::{Flock, FlockConfig, FlockStats};

fn main() -> anyhow::Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    info!("Flocking v{}", env!("CARGO_PKG_VERSION"));

    let config = FlockConfig::load(std::env::args().nth(1).map(PathBuf::from))?;
    info!(
        "Configuration loaded: {} units, seed {}, {} ticks at dt={}, {} obstacles, {}",
        config.unit_count,
        config.seed,
        config.run.ticks,
        config.run.delta_time,
        config.obstacles.len(),
        if config.run.parallel { "snapshot-parallel" } else { "sequential" },
    );

    let mut flock = Flock::from_config(&config)?;
    let obstacles = &config.obstacles;
    let run = &config.run;

    let started = Instant::now();
    for tick in 1..=run.ticks {
        let tick_started = Instant::now();
        if run.parallel {
            flock.tick_parallel(obstacles, run.delta_time);
        } else {
            flock.tick(obstacles, run.delta_time);
        }

        if run.report_every > 0 && tick % run.report_every == 0 {
            info!("{}", FlockStats::collect(&flock, tick_started.elapsed()));
        }
    }

    info!(
        "Simulated {} ticks in {:.2?}",
        flock.ticks(),
        started.elapsed()
    );
    Ok(())
}
