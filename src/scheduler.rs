use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::{error, info};

use crate::config::SchedulerConfig;
use crate::state::SharedState;

/// Periodic full re-clone loop. Webhook deltas keep the mirror fresh between
/// runs; the re-clone repairs whatever drift the clone/webhook race left
/// behind.
pub struct Scheduler {
    state: Arc<SharedState>,
    config: SchedulerConfig,
}

impl Scheduler {
    #[must_use]
    pub fn new(state: Arc<SharedState>, config: SchedulerConfig) -> Self {
        Self { state, config }
    }

    pub async fn start(&self) {
        let hours = self.config.reclone_interval_hours;
        if hours == 0 {
            info!("Scheduled re-clone disabled");
            return;
        }

        let mut ticker = interval(Duration::from_secs(u64::from(hours) * 3600));
        // The first tick fires immediately; the startup clone already covers it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            info!("Starting scheduled re-clone");
            if let Err(e) = self.state.mirrors.clone_all().await {
                error!("Scheduled re-clone failed: {e:#}");
            }
        }
    }
}
