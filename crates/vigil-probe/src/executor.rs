//! Probe execution — request shaping and status classification.

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;
use tracing::debug;

use vigil_state::{HttpMethod, TestSpec, epoch_secs};

/// Outcome of executing one test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeOutcome {
    pub success: bool,
    /// Unix timestamp (seconds) when the probe finished.
    pub occurred_at: u64,
}

/// Why a probe could not be issued or completed.
///
/// Internal to classification: `execute` maps every variant to a failed
/// outcome instead of surfacing it.
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("parameters are not a flat JSON object of string fields: {0}")]
    BadParameters(String),

    #[error(transparent)]
    Request(#[from] reqwest::Error),
}

/// Issues probes with a shared HTTP client.
///
/// The client carries a bounded per-request timeout; a single hung
/// endpoint fails its own probe and nothing else.
#[derive(Clone)]
pub struct Prober {
    client: reqwest::Client,
}

impl Prober {
    /// Build a prober whose every request is bounded by `timeout`.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("vigil-probe/0.1")
            .build()?;
        Ok(Self { client })
    }

    /// Execute one test and classify the outcome.
    ///
    /// Never fails: any error on the way to a status code is a failed
    /// outcome. The test record itself is not mutated.
    pub async fn execute(&self, test: &TestSpec) -> ProbeOutcome {
        let success = match self.send(test).await {
            Ok(status) => {
                let passed = status_passes(status);
                if !passed {
                    debug!(status, url = %test.url, "probe returned non-2xx");
                }
                passed
            }
            Err(e) => {
                debug!(error = %e, url = %test.url, "probe failed");
                false
            }
        };
        ProbeOutcome {
            success,
            occurred_at: epoch_secs(),
        }
    }

    /// Shape and send the request, returning the response status code.
    async fn send(&self, test: &TestSpec) -> Result<u16, ProbeError> {
        let response = if test.graphql {
            // GraphQL goes out as GET with the stripped query appended,
            // regardless of the configured method.
            let query = strip_whitespace(&test.parameters);
            self.client
                .get(&test.url)
                .query(&[("query", query.as_str())])
                .send()
                .await?
        } else {
            let fields = parse_fields(&test.parameters)?;
            self.client
                .request(request_method(test.method), &test.url)
                .form(&fields)
                .send()
                .await?
        };
        Ok(response.status().as_u16())
    }
}

/// A probe passes iff the status code lies in [200, 300).
fn status_passes(code: u16) -> bool {
    (200..300).contains(&code)
}

/// Remove every whitespace character from a GraphQL query string.
fn strip_whitespace(query: &str) -> String {
    query.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Interpret a REST parameter string as form fields. An empty or blank
/// string means no fields; anything that is not a flat JSON object of
/// string fields is a malformed-parameter condition.
fn parse_fields(raw: &str) -> Result<HashMap<String, String>, ProbeError> {
    if raw.trim().is_empty() {
        return Ok(HashMap::new());
    }
    serde_json::from_str(raw).map_err(|e| ProbeError::BadParameters(e.to_string()))
}

/// Closed mapping from the stored verb to the outbound request method.
fn request_method(method: HttpMethod) -> reqwest::Method {
    match method {
        HttpMethod::Get => reqwest::Method::GET,
        HttpMethod::Post => reqwest::Method::POST,
        HttpMethod::Put => reqwest::Method::PUT,
        HttpMethod::Patch => reqwest::Method::PATCH,
        HttpMethod::Delete => reqwest::Method::DELETE,
    }
}
