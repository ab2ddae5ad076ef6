//! Sample collection: fetch each instance and write its gauges.

use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::fetcher::StatsFetcher;
use crate::registry::SharedGauges;

/// Collection statistics. Kept for logging and readiness, not exported.
#[derive(Debug, Clone, Default)]
pub struct CycleStats {
    /// Completed collection cycles.
    pub cycles_completed: u64,
    /// Successful samples across all cycles.
    pub samples_collected: u64,
    /// Failed samples across all cycles.
    pub samples_failed: u64,
    /// Successful samples in the most recent cycle.
    pub last_cycle_collected: usize,
    /// Failed samples in the most recent cycle.
    pub last_cycle_failed: usize,
}

/// Collects samples from SIPIS instances into the gauge set.
pub struct SampleCollector {
    fetcher: StatsFetcher,
    gauges: SharedGauges,
    stats: RwLock<CycleStats>,
}

impl SampleCollector {
    /// Create a new collector writing into `gauges`.
    pub fn new(fetcher: StatsFetcher, gauges: SharedGauges) -> Self {
        Self {
            fetcher,
            gauges,
            stats: RwLock::new(CycleStats::default()),
        }
    }

    /// Collect one sample for `instance`.
    ///
    /// On failure the error is logged and the instance's gauges keep their
    /// last values.
    pub async fn collect(&self, instance: &str) {
        self.collect_sample(instance).await;
    }

    /// Run one collection cycle over `instances`, in order.
    ///
    /// A failing instance never stops the remaining ones from being
    /// collected.
    pub async fn run_cycle(&self, instances: &[String]) {
        let mut collected = 0;
        let mut failed = 0;

        for instance in instances {
            if self.collect_sample(instance).await {
                collected += 1;
            } else {
                failed += 1;
            }
        }

        let mut stats = self.stats.write();
        stats.cycles_completed += 1;
        stats.last_cycle_collected = collected;
        stats.last_cycle_failed = failed;

        debug!(
            cycle = stats.cycles_completed,
            collected, failed, "Collection cycle finished"
        );
    }

    /// Get collection statistics.
    pub fn stats(&self) -> CycleStats {
        self.stats.read().clone()
    }

    /// The gauge set this collector writes into.
    pub fn gauges(&self) -> &SharedGauges {
        &self.gauges
    }

    async fn collect_sample(&self, instance: &str) -> bool {
        info!(instance = %instance, "Collecting sample");

        match self.fetcher.fetch(instance).await {
            Ok(measurement) => {
                self.gauges.record(instance, &measurement);
                self.stats.write().samples_collected += 1;
                debug!(
                    instance = %instance,
                    count = measurement.instance.count,
                    uptime_secs = measurement.server.uptime_in_seconds,
                    "Sample recorded"
                );
                true
            }
            Err(e) => {
                self.stats.write().samples_failed += 1;
                warn!(
                    instance = %instance,
                    error = %e,
                    timeout = e.is_timeout(),
                    "Error collecting sample"
                );
                false
            }
        }
    }
}

/// Create a shareable collector handle.
pub type SharedCollector = Arc<SampleCollector>;
