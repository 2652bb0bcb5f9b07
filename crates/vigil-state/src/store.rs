//! StateStore — redb-backed record persistence for Vigil.
//!
//! Provides typed CRUD operations over apps, tests, and results, plus the
//! read-time health aggregation over recorded outcomes. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports
//! both on-disk and in-memory backends (the latter for testing).
//!
//! Ids are allocated from a persisted counter table inside the same write
//! transaction as the insert, so a failed create never burns an id that a
//! committed record observed.

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable};
use tracing::debug;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

const APP_SEQ: &str = "app";
const TEST_SEQ: &str = "test";
const RESULT_SEQ: &str = "result";

/// Thread-safe record store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "record store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory record store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        txn.open_table(APPS).map_err(map_err!(Table))?;
        txn.open_table(TESTS).map_err(map_err!(Table))?;
        txn.open_table(RESULTS).map_err(map_err!(Table))?;
        txn.open_table(COUNTERS).map_err(map_err!(Table))?;
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Apps ───────────────────────────────────────────────────────

    /// Register a new app. The id is store-assigned.
    pub fn create_app(&self, new: &NewApp, now: u64) -> StateResult<AppInfo> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let app;
        {
            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let id = next_id(&mut counters, APP_SEQ)?;
            app = AppInfo {
                id,
                name: new.name.clone(),
                icon: new.icon.clone(),
                created_at: now,
                updated_at: now,
            };
            let value = serde_json::to_vec(&app).map_err(map_err!(Serialize))?;
            let mut apps = txn.open_table(APPS).map_err(map_err!(Table))?;
            apps.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = app.id, name = %app.name, "app stored");
        Ok(app)
    }

    /// Get an app by id.
    pub fn get_app(&self, app_id: AppId) -> StateResult<Option<AppInfo>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let apps = txn.open_table(APPS).map_err(map_err!(Table))?;
        match apps.get(app_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let app: AppInfo =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(app))
            }
            None => Ok(None),
        }
    }

    /// List all registered apps.
    pub fn list_apps(&self) -> StateResult<Vec<AppInfo>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let apps = txn.open_table(APPS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in apps.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let app: AppInfo =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(app);
        }
        Ok(results)
    }

    /// Delete an app along with its tests and their results. Returns true
    /// if the app existed.
    pub fn delete_app(&self, app_id: AppId) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut apps = txn.open_table(APPS).map_err(map_err!(Table))?;
            existed = apps.remove(app_id).map_err(map_err!(Write))?.is_some();
            if existed {
                let mut tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
                let owned = owned_test_ids(&tests, app_id)?;
                for test_id in &owned {
                    tests.remove(*test_id).map_err(map_err!(Write))?;
                }
                let mut results = txn.open_table(RESULTS).map_err(map_err!(Table))?;
                for test_id in &owned {
                    remove_results_for_test(&mut results, *test_id)?;
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = app_id, existed, "app deleted");
        Ok(existed)
    }

    /// Set an app's `updated_at`. Returns true if the app existed.
    pub fn touch_app(&self, app_id: AppId, now: u64) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let touched;
        {
            let mut apps = txn.open_table(APPS).map_err(map_err!(Table))?;
            let found = match apps.get(app_id).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice::<AppInfo>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            touched = match found {
                Some(mut app) => {
                    app.updated_at = now;
                    let value = serde_json::to_vec(&app).map_err(map_err!(Serialize))?;
                    apps.insert(app_id, value.as_slice()).map_err(map_err!(Write))?;
                    true
                }
                None => false,
            };
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(touched)
    }

    // ── Tests ──────────────────────────────────────────────────────

    /// Register a new test under an app and touch the app's `updated_at`.
    /// Returns `None` if the app does not exist.
    pub fn create_test(
        &self,
        app_id: AppId,
        new: &NewTest,
        now: u64,
    ) -> StateResult<Option<TestSpec>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let test;
        {
            let mut apps = txn.open_table(APPS).map_err(map_err!(Table))?;
            let found = match apps.get(app_id).map_err(map_err!(Read))? {
                Some(guard) => Some(
                    serde_json::from_slice::<AppInfo>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            let Some(mut app) = found else {
                return Ok(None);
            };
            app.updated_at = now;
            let value = serde_json::to_vec(&app).map_err(map_err!(Serialize))?;
            apps.insert(app_id, value.as_slice()).map_err(map_err!(Write))?;

            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let id = next_id(&mut counters, TEST_SEQ)?;
            test = TestSpec {
                id,
                app_id,
                name: new.name.clone(),
                url: new.url.clone(),
                method: new.method,
                parameters: new.parameters.clone(),
                graphql: new.graphql,
                created_at: now,
                updated_at: now,
            };
            let value = serde_json::to_vec(&test).map_err(map_err!(Serialize))?;
            let mut tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
            tests.insert(id, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = test.id, app_id, url = %test.url, "test stored");
        Ok(Some(test))
    }

    /// Get a test by id.
    pub fn get_test(&self, test_id: TestId) -> StateResult<Option<TestSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
        match tests.get(test_id).map_err(map_err!(Read))? {
            Some(guard) => {
                let test: TestSpec =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(test))
            }
            None => Ok(None),
        }
    }

    /// List all tests across all apps.
    pub fn list_tests(&self) -> StateResult<Vec<TestSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in tests.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let test: TestSpec =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(test);
        }
        Ok(results)
    }

    /// List all tests belonging to one app.
    pub fn list_tests_for_app(&self, app_id: AppId) -> StateResult<Vec<TestSpec>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in tests.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let test: TestSpec =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if test.app_id == app_id {
                results.push(test);
            }
        }
        Ok(results)
    }

    /// Delete a test and its results, touching the parent app's
    /// `updated_at`. Returns the removed spec, or `None` if absent.
    pub fn delete_test(&self, test_id: TestId, now: u64) -> StateResult<Option<TestSpec>> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let removed;
        {
            let mut tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
            removed = match tests.remove(test_id).map_err(map_err!(Write))? {
                Some(guard) => Some(
                    serde_json::from_slice::<TestSpec>(guard.value())
                        .map_err(map_err!(Deserialize))?,
                ),
                None => None,
            };
            if let Some(test) = &removed {
                let mut results = txn.open_table(RESULTS).map_err(map_err!(Table))?;
                remove_results_for_test(&mut results, test.id)?;

                let mut apps = txn.open_table(APPS).map_err(map_err!(Table))?;
                let found = match apps.get(test.app_id).map_err(map_err!(Read))? {
                    Some(guard) => Some(
                        serde_json::from_slice::<AppInfo>(guard.value())
                            .map_err(map_err!(Deserialize))?,
                    ),
                    None => None,
                };
                if let Some(mut app) = found {
                    app.updated_at = now;
                    let value = serde_json::to_vec(&app).map_err(map_err!(Serialize))?;
                    apps.insert(app.id, value.as_slice()).map_err(map_err!(Write))?;
                }
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(id = test_id, existed = removed.is_some(), "test deleted");
        Ok(removed)
    }

    // ── Results ────────────────────────────────────────────────────

    /// Append one probe outcome for a test. Errors with `NotFound` if the
    /// test no longer exists (e.g. deleted mid-cycle).
    pub fn append_result(
        &self,
        test_id: TestId,
        success: bool,
        now: u64,
    ) -> StateResult<TestResult> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let result;
        {
            let tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
            if tests.get(test_id).map_err(map_err!(Read))?.is_none() {
                return Err(StateError::NotFound(format!("test {test_id}")));
            }
            let mut counters = txn.open_table(COUNTERS).map_err(map_err!(Table))?;
            let id = next_id(&mut counters, RESULT_SEQ)?;
            result = TestResult {
                id,
                test_id,
                success,
                created_at: now,
                updated_at: now,
            };
            let value = serde_json::to_vec(&result).map_err(map_err!(Serialize))?;
            let mut results = txn.open_table(RESULTS).map_err(map_err!(Table))?;
            results
                .insert((test_id, id), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(result)
    }

    /// The result with the maximum `created_at` for a test, if any. Ties
    /// are broken arbitrarily (any maximal element).
    pub fn latest_result(&self, test_id: TestId) -> StateResult<Option<TestResult>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let results = txn.open_table(RESULTS).map_err(map_err!(Table))?;
        latest_result_in(&results, test_id)
    }

    /// Up to `limit` most recent results for a test, newest first.
    pub fn list_results_for_test(
        &self,
        test_id: TestId,
        limit: usize,
    ) -> StateResult<Vec<TestResult>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let table = txn.open_table(RESULTS).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in table
            .range((test_id, u64::MIN)..=(test_id, u64::MAX))
            .map_err(map_err!(Read))?
        {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let result: TestResult =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            results.push(result);
        }
        results.sort_by(|a, b| (b.created_at, b.id).cmp(&(a.created_at, a.id)));
        results.truncate(limit);
        Ok(results)
    }

    /// Bulk-delete every recorded result. Returns the number removed.
    pub fn clear_results(&self) -> StateResult<u64> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let count;
        {
            let mut results = txn.open_table(RESULTS).map_err(map_err!(Table))?;
            let keys: Vec<(u64, u64)> = results
                .iter()
                .map_err(map_err!(Read))?
                .filter_map(|entry| entry.ok().map(|(key, _)| key.value()))
                .collect();
            count = keys.len() as u64;
            for key in keys {
                results.remove(key).map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(count, "results cleared");
        Ok(count)
    }

    // ── Health aggregation ─────────────────────────────────────────

    /// Derive the `(passed, total)` health summary for an app from each
    /// test's most recent result. Computed freshly from persisted history
    /// on every call; returns `None` if the app does not exist.
    ///
    /// A test with no result yet counts as passed, and `total` is floored
    /// at 1 even for an app with zero tests.
    pub fn latest_health(&self, app_id: AppId) -> StateResult<Option<HealthSummary>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let apps = txn.open_table(APPS).map_err(map_err!(Table))?;
        if apps.get(app_id).map_err(map_err!(Read))?.is_none() {
            return Ok(None);
        }
        let tests = txn.open_table(TESTS).map_err(map_err!(Table))?;
        let results = txn.open_table(RESULTS).map_err(map_err!(Table))?;

        let mut total: u32 = 0;
        let mut passed: u32 = 0;
        for entry in tests.iter().map_err(map_err!(Read))? {
            let (_, value) = entry.map_err(map_err!(Read))?;
            let test: TestSpec =
                serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
            if test.app_id != app_id {
                continue;
            }
            total += 1;
            match latest_result_in(&results, test.id)? {
                Some(latest) if !latest.success => {}
                // No history yet counts as passed.
                _ => passed += 1,
            }
        }
        Ok(Some(HealthSummary {
            passed,
            total: total.max(1),
        }))
    }
}

/// Allocate the next id from a named sequence.
fn next_id(counters: &mut redb::Table<&'static str, u64>, kind: &str) -> StateResult<u64> {
    let next = counters
        .get(kind)
        .map_err(map_err!(Read))?
        .map(|guard| guard.value())
        .unwrap_or(0)
        + 1;
    counters.insert(kind, next).map_err(map_err!(Write))?;
    Ok(next)
}

/// Ids of all tests owned by an app (scan + filter on the stored record).
fn owned_test_ids(
    tests: &impl ReadableTable<u64, &'static [u8]>,
    app_id: AppId,
) -> StateResult<Vec<TestId>> {
    let mut owned = Vec::new();
    for entry in tests.iter().map_err(map_err!(Read))? {
        let (key, value) = entry.map_err(map_err!(Read))?;
        let test: TestSpec =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        if test.app_id == app_id {
            owned.push(key.value());
        }
    }
    Ok(owned)
}

/// Remove the whole `(test_id, *)` range from the results table.
fn remove_results_for_test(
    results: &mut redb::Table<(u64, u64), &'static [u8]>,
    test_id: TestId,
) -> StateResult<()> {
    let keys: Vec<(u64, u64)> = results
        .range((test_id, u64::MIN)..=(test_id, u64::MAX))
        .map_err(map_err!(Read))?
        .filter_map(|entry| entry.ok().map(|(key, _)| key.value()))
        .collect();
    for key in keys {
        results.remove(key).map_err(map_err!(Write))?;
    }
    Ok(())
}

/// The maximal-`created_at` result within a test's key range.
fn latest_result_in(
    results: &impl ReadableTable<(u64, u64), &'static [u8]>,
    test_id: TestId,
) -> StateResult<Option<TestResult>> {
    let mut latest: Option<TestResult> = None;
    for entry in results
        .range((test_id, u64::MIN)..=(test_id, u64::MAX))
        .map_err(map_err!(Read))?
    {
        let (_, value) = entry.map_err(map_err!(Read))?;
        let result: TestResult =
            serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
        if latest
            .as_ref()
            .is_none_or(|cur| result.created_at >= cur.created_at)
        {
            latest = Some(result);
        }
    }
    Ok(latest)
}
