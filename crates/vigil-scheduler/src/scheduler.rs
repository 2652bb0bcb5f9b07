//! Drift-corrected periodic firing of probe cycles.

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{debug, error, info};

use crate::runner::CycleRunner;

/// Fires probe cycles at a nominal interval on a dedicated task.
///
/// The first cycle runs immediately. Each subsequent sleep is shortened
/// by the sub-second remainder of the accumulated drift, so the long-run
/// average period stays at the nominal interval even when individual
/// cycles take variable time to process.
pub struct CycleScheduler {
    runner: CycleRunner,
    interval: Duration,
}

impl CycleScheduler {
    pub fn new(runner: CycleRunner, interval: Duration) -> Self {
        Self { runner, interval }
    }

    /// Run cycles until the shutdown signal flips.
    ///
    /// A failed cycle is logged and does not stop future ticks. The
    /// shutdown signal is raced against the inter-cycle sleep, so the
    /// task exits promptly mid-wait.
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.interval.as_secs(),
            "cycle scheduler started"
        );

        let epoch = Instant::now();
        let mut fired: u64 = 0;

        loop {
            match self.runner.run_cycle().await {
                Ok(report) => debug!(
                    probed = report.probed,
                    passed = report.passed,
                    apps = report.apps_touched,
                    "scheduled cycle finished"
                ),
                Err(e) => error!(error = %e, "scheduled cycle failed"),
            }
            fired += 1;

            let sleep = next_sleep(self.interval, epoch.elapsed(), fired);
            tokio::select! {
                _ = tokio::time::sleep(sleep) => {}
                _ = shutdown.changed() => {
                    info!("cycle scheduler shutting down");
                    break;
                }
            }
        }
    }
}

/// Time to sleep before the next tick.
///
/// `fired` cycles have run since `epoch`, so the accumulated drift is
/// `elapsed − interval × fired`. The sleep is shortened by the drift's
/// sub-second remainder (Euclidean, always in `[0, 1)`): whole seconds
/// of backlog are left alone, but the fractional creep that would
/// otherwise compound tick after tick is cancelled on every sleep.
fn next_sleep(interval: Duration, elapsed: Duration, fired: u64) -> Duration {
    let drift = elapsed.as_secs_f64() - interval.as_secs_f64() * fired as f64;
    let correction = drift.rem_euclid(1.0);
    Duration::from_secs_f64((interval.as_secs_f64() - correction).max(0.0))
}
