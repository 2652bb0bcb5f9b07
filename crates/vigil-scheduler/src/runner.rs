//! Cycle runner — one full probe pass over registered tests.

use std::collections::BTreeSet;

use tracing::debug;

use vigil_probe::Prober;
use vigil_state::{AppId, HealthSummary, StateResult, StateStore, epoch_secs};

/// What one cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    /// Tests probed (one result appended each).
    pub probed: usize,
    /// How many of those probes passed.
    pub passed: usize,
    /// Apps whose `updated_at` was stamped with the cycle start.
    pub apps_touched: usize,
}

/// Orchestrates probe cycles against the record store.
#[derive(Clone)]
pub struct CycleRunner {
    store: StateStore,
    prober: Prober,
}

impl CycleRunner {
    pub fn new(store: StateStore, prober: Prober) -> Self {
        Self { store, prober }
    }

    /// Probe every registered test exactly once.
    ///
    /// Each outcome is appended as a result; a failed probe is recorded
    /// and never aborts the pass. After probing, every app owning at
    /// least one probed test gets its `updated_at` set to the cycle's
    /// start time, once per app. Storage errors abort the cycle.
    pub async fn run_cycle(&self) -> StateResult<CycleReport> {
        let started_at = epoch_secs();
        let tests = self.store.list_tests()?;
        let mut owners: BTreeSet<AppId> = BTreeSet::new();
        let mut passed = 0usize;

        for test in &tests {
            let outcome = self.prober.execute(test).await;
            self.store
                .append_result(test.id, outcome.success, outcome.occurred_at)?;
            owners.insert(test.app_id);
            if outcome.success {
                passed += 1;
            }
        }
        for app_id in &owners {
            self.store.touch_app(*app_id, started_at)?;
        }

        debug!(
            probed = tests.len(),
            passed,
            apps = owners.len(),
            "probe cycle complete"
        );
        Ok(CycleReport {
            probed: tests.len(),
            passed,
            apps_touched: owners.len(),
        })
    }

    /// On-demand cycle scoped to one app's tests.
    ///
    /// Persists results and touches the app exactly like the periodic
    /// path, then returns the freshly measured `(passed, total)` summary.
    /// Returns `None` if the app does not exist.
    pub async fn run_app_cycle(&self, app_id: AppId) -> StateResult<Option<HealthSummary>> {
        if self.store.get_app(app_id)?.is_none() {
            return Ok(None);
        }
        let started_at = epoch_secs();
        let tests = self.store.list_tests_for_app(app_id)?;
        let mut passed: u32 = 0;

        for test in &tests {
            let outcome = self.prober.execute(test).await;
            self.store
                .append_result(test.id, outcome.success, outcome.occurred_at)?;
            if outcome.success {
                passed += 1;
            }
        }
        self.store.touch_app(app_id, started_at)?;

        Ok(Some(HealthSummary {
            passed,
            total: (tests.len() as u32).max(1),
        }))
    }
}
