//! Host binary that runs one simulated day at a demo port.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `PORTCALL_CONFIG` (default
//!    `portcall-config.yaml`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the engine on a manual clock starting at today's midnight
//! 4. Start the event logger
//! 5. Register the demo port and file the fleet's bookings
//! 6. Run the day and log the performance report

mod error;
mod fleet;
mod simulation;

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveTime, Utc};
use portcall_core::{EngineConfig, ManualClock, PortEngine, PortProfileWeather, StaticPricing};
use portcall_types::{Commodity, PortEvent};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rust_decimal_macros::dec;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::error::RunnerError;
use crate::simulation::PortDay;

/// Seed used when `PORTCALL_SEED` is unset or unparsable.
const DEFAULT_SEED: u64 = 7;

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration cannot be loaded or the engine
/// reports an internal fault.
#[tokio::main]
async fn main() -> Result<(), RunnerError> {
    // 1. Configuration first: it carries the log level and format.
    let (config, config_path) = load_config()?;

    // 2. Structured logging.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    if config.logging.is_json() {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    info!("portcall-runner starting");
    match &config_path {
        Some(path) => info!(path = %path.display(), "Configuration loaded"),
        None => info!("Config file not found, using defaults"),
    }

    // 3. Engine on simulated time.
    let day_start = Utc::now().date_naive().and_time(NaiveTime::MIN).and_utc();
    let clock = Arc::new(ManualClock::new(day_start));
    let pricing = StaticPricing::new([
        (Commodity::Steel, dec!(6)),
        (Commodity::Vehicles, dec!(40)),
        (Commodity::RefinedFuel, dec!(3)),
    ]);
    let engine = Arc::new(PortEngine::new(
        config,
        Arc::new(pricing),
        Arc::new(PortProfileWeather),
        clock.clone(),
    ));

    // 4. Event logger.
    let logger = spawn_event_logger(engine.subscribe());

    // 5. Port and bookings.
    let state = engine.initialize_port(fleet::demo_port()).await?;
    info!(
        port_id = %state.port_id,
        weather = ?state.weather,
        "Demo port registered"
    );

    let seed = std::env::var("PORTCALL_SEED")
        .ok()
        .and_then(|raw| raw.parse().ok())
        .unwrap_or(DEFAULT_SEED);
    let mut day = PortDay::new(
        Arc::clone(&engine),
        clock,
        StdRng::seed_from_u64(seed),
        state.port_id,
        day_start,
    );
    let confirmed = day.book(fleet::demo_fleet()).await?;
    info!(confirmed, seed, "Bookings filed");
    day.squall(14, 16);

    // 6. Run the day.
    let metrics = day.run().await?;
    let inventory = engine.get_cargo_inventory(state.port_id).await?;
    info!(
        metrics = %serde_json::to_string(&metrics).unwrap_or_default(),
        "Port performance"
    );
    info!(
        inventory = %serde_json::to_string(&inventory).unwrap_or_default(),
        "Closing inventory"
    );

    // Dropping the last engine handle closes the event stream.
    drop(engine);
    logger.await.map_err(|e| RunnerError::EventLogger {
        message: format!("{e}"),
    })?;

    info!("portcall-runner finished");
    Ok(())
}

/// Load configuration from `PORTCALL_CONFIG`, or defaults if the file is
/// absent. Returns the path that was read, if any.
fn load_config() -> Result<(EngineConfig, Option<PathBuf>), RunnerError> {
    let path = std::env::var("PORTCALL_CONFIG")
        .map_or_else(|_| PathBuf::from("portcall-config.yaml"), PathBuf::from);
    if path.exists() {
        let config = EngineConfig::from_file(&path)?;
        Ok((config, Some(path)))
    } else {
        Ok((EngineConfig::default(), None))
    }
}

/// Log every engine event until the stream closes.
fn spawn_event_logger(mut rx: broadcast::Receiver<PortEvent>) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    info!(
                        kind = event.kind(),
                        port_id = %event.port_id(),
                        at = %event.at(),
                        payload = %serde_json::to_string(&event).unwrap_or_default(),
                        "Port event"
                    );
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Event logger fell behind");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}
