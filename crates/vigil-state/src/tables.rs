//! redb table definitions for the Vigil record store.
//!
//! `apps` and `tests` are keyed by their numeric id. `results` uses a
//! composite `(test_id, result_id)` key so one test's history is a
//! contiguous range scan. `counters` holds the next-id sequence per record
//! kind.

use redb::TableDefinition;

/// Monitored apps keyed by app id.
pub const APPS: TableDefinition<u64, &[u8]> = TableDefinition::new("apps");

/// Probe definitions keyed by test id.
pub const TESTS: TableDefinition<u64, &[u8]> = TableDefinition::new("tests");

/// Probe outcomes keyed by `(test_id, result_id)`.
pub const RESULTS: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("results");

/// Id sequences keyed by record kind (`"app"`, `"test"`, `"result"`).
pub const COUNTERS: TableDefinition<&str, u64> = TableDefinition::new("counters");
