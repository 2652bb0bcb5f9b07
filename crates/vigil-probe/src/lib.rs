//! vigil-probe — outbound probe execution for Vigil.
//!
//! Runs one configured test against its target URL and classifies the
//! outcome. A probe never raises: non-2xx statuses, transport failures
//! (timeout, DNS, refused connection), and malformed parameter strings
//! all classify as a failed outcome that the caller records.
//!
//! # Request shaping
//!
//! ```text
//! Prober::execute(test)
//!   ├── graphql  → GET url?query=<whitespace-stripped parameters>, empty body
//!   ├── REST     → <configured verb> url, parameters as form fields
//!   └── status ∈ [200, 300) → success
//! ```
//!
//! Every probe runs under the client-wide timeout, so one hung endpoint
//! cannot stall the rest of a cycle.

pub mod executor;

pub use executor::{ProbeError, ProbeOutcome, Prober};
