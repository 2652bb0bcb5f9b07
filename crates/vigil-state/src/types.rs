//! Domain types for the Vigil record store.
//!
//! These types represent the persisted state of monitored apps, their
//! probe definitions (tests), and recorded probe outcomes (results). All
//! types are serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};

/// Unique identifier for a monitored app.
pub type AppId = u64;

/// Unique identifier for a test within an app.
pub type TestId = u64;

/// Unique identifier for a recorded result.
pub type ResultId = u64;

// ── App ───────────────────────────────────────────────────────────

/// A monitored application. Owns a set of tests; deleting an app
/// cascades to its tests and their results.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AppInfo {
    pub id: AppId,
    pub name: String,
    /// Icon URL shown by status clients.
    pub icon: String,
    /// Unix timestamp (seconds) when this app was registered.
    pub created_at: u64,
    /// Unix timestamp (seconds) of the last mutation or probe cycle.
    pub updated_at: u64,
}

/// Fields supplied by a client when registering an app.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewApp {
    pub name: String,
    pub icon: String,
}

// ── Test ──────────────────────────────────────────────────────────

/// HTTP verb a test probes with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// The wire representation of this verb.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// A single configured probe belonging to an app.
///
/// `parameters` is stored opaquely: a JSON object of string fields for
/// plain REST tests, or a GraphQL query string when `graphql` is set.
/// The flag fixes how the string is interpreted for the whole of one
/// probe.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestSpec {
    pub id: TestId,
    pub app_id: AppId,
    pub name: String,
    /// Target URL the probe is issued against.
    pub url: String,
    pub method: HttpMethod,
    pub parameters: String,
    /// When set, `parameters` is a GraphQL query shipped as `?query=`.
    pub graphql: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

/// Fields supplied by a client when registering a test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewTest {
    pub name: String,
    pub url: String,
    pub method: HttpMethod,
    #[serde(default)]
    pub parameters: String,
    #[serde(default)]
    pub graphql: bool,
}

// ── Result ────────────────────────────────────────────────────────

/// One recorded outcome of executing a test. Append-only: results are
/// never updated, only bulk-deleted by maintenance or cascade.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestResult {
    pub id: ResultId,
    pub test_id: TestId,
    pub success: bool,
    pub created_at: u64,
    pub updated_at: u64,
}

// ── Health summary ────────────────────────────────────────────────

/// Derived `(passed, total)` health of an app, computed from each test's
/// most recent result at read time. Never persisted.
///
/// A test with no recorded result counts as passed, and `total` is
/// floored at 1, so the pair is always a usable ratio.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthSummary {
    #[serde(rename = "success")]
    pub passed: u32,
    pub total: u32,
}

/// Current wall-clock time as integer Unix epoch seconds.
pub fn epoch_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
