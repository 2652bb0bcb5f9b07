//! vigil-scheduler — probe cycle orchestration for Vigil.
//!
//! A cycle probes every registered test exactly once, records one result
//! per test, and stamps the cycle's start time on every app that owns a
//! probed test. The periodic scheduler fires cycles on a dedicated
//! background task at a nominal interval, correcting each sleep for
//! accumulated drift so the long-run firing rate stays exact.
//!
//! # Architecture
//!
//! ```text
//! CycleScheduler (one background task)
//!   ├── drift-corrected sleep between ticks
//!   ├── watch-channel shutdown before each sleep
//!   └── CycleRunner
//!       ├── StateStore (list tests, append results, touch apps)
//!       └── Prober (one bounded outbound probe per test)
//! ```
//!
//! A probe failure is recorded and never aborts the cycle; a storage
//! failure aborts the current cycle but not future ticks.

pub mod runner;
pub mod scheduler;

pub use runner::{CycleReport, CycleRunner};
pub use scheduler::CycleScheduler;
