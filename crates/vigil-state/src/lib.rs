//! vigil-state — embedded record store for Vigil.
//!
//! Backed by [redb](https://docs.rs/redb), provides persistent and
//! in-memory storage for monitored apps, their probe definitions (tests),
//! and recorded probe outcomes (results), plus the read-time health
//! aggregation over that history.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Apps and tests are keyed by store-assigned `u64` ids from a persisted
//! counter table; results use a composite `(test_id, result_id)` key so a
//! test's history is one contiguous range scan.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and is passed down explicitly to every consumer — there is no global
//! store handle, so each test can construct its own isolated instance.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
