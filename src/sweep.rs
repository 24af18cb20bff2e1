use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, instrument, warn};

use crate::dispatch::{DispatchOutcome, Dispatcher};

/// Configuration for the sweep task
#[derive(Debug, Clone)]
pub struct SweepConfig {
    /// How often to run the sweep
    pub interval: Duration,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(15),
        }
    }
}

/// Starts the background task that periodically closes expired map votes
/// and retries lobbies waiting on a server. Whatever it produces goes out
/// through the dispatcher's relay.
#[instrument(skip(dispatcher))]
pub async fn start_sweep_task(dispatcher: Arc<Dispatcher>, config: SweepConfig) {
    info!(
        interval_secs = config.interval.as_secs(),
        "Starting lobby sweep background task"
    );

    let mut sweep_interval = interval(config.interval);

    loop {
        sweep_interval.tick().await;
        run_sweep(&dispatcher).await;
    }
}

async fn run_sweep(dispatcher: &Dispatcher) -> DispatchOutcome {
    debug!("Running lobby sweep");
    let outcome = dispatcher.sweep().await;

    if !outcome.topics.is_empty() {
        info!(
            advanced = outcome.topics.len(),
            completed = outcome.announcements.len(),
            "Lobby sweep advanced channels"
        );
        let delivered = dispatcher.relay().push(outcome.clone());
        if delivered == 0 {
            warn!("No chat bridge attached, sweep outcome not relayed");
        }
    }
    outcome
}
