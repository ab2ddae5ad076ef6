//! Periodic collection scheduling.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::info;

use crate::collector::SharedCollector;

/// Drives collection cycles at a fixed interval.
///
/// Cycles run one after another on a single task and never overlap. A tick
/// that falls due while a cycle is still running is skipped.
pub struct Scheduler {
    collector: SharedCollector,
    instances: Arc<[String]>,
    interval: Duration,
}

impl Scheduler {
    /// Create a scheduler for a fixed set of instances.
    pub fn new(collector: SharedCollector, instances: Vec<String>, interval: Duration) -> Self {
        Self {
            collector,
            instances: instances.into(),
            interval,
        }
    }

    /// Run the first cycle to completion, then spawn the periodic loop.
    ///
    /// The loop stops when `shutdown` turns true; an in-flight cycle is
    /// dropped rather than drained.
    pub async fn start(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        info!(
            instances = self.instances.len(),
            interval = %humantime::format_duration(self.interval),
            "Starting collection scheduler"
        );

        self.collector.run_cycle(&self.instances).await;

        tokio::spawn(self.run(shutdown))
    }

    async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = shutdown_requested(&mut shutdown) => break,
            }

            tokio::select! {
                _ = self.collector.run_cycle(&self.instances) => {}
                _ = shutdown_requested(&mut shutdown) => {
                    info!("Collection cycle interrupted by shutdown");
                    break;
                }
            }
        }

        info!("Collection scheduler stopped");
    }
}

/// Resolve once the shutdown flag is set or its sender is gone.
async fn shutdown_requested(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}
