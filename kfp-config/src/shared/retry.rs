use serde::Serialize;
use serde_json::Value;

use crate::shared::ValidationErrors;
use crate::shared::document::{FromDocument, Section};

/// Retry behavior applied to a failed task.
///
/// The three fields only make sense together, so a pool specific policy always replaces the
/// default one as a whole.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct RetryPolicy {
    /// Number of retries before the task is marked as failed.
    pub num_retries: u32,
    /// Delay before the first retry, forwarded verbatim (e.g. `60s`, `5m`).
    pub backoff_duration: String,
    /// Multiplier applied to the delay after each retry.
    pub backoff_factor: f64,
}

impl FromDocument for RetryPolicy {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;

        let num_retries = section.required_integer("num_retries", errors);
        let backoff_duration = section.required_non_empty("backoff_duration", errors);
        let backoff_factor = section.required_float("backoff_factor", errors);

        Some(Self {
            num_retries: num_retries?,
            backoff_duration: backoff_duration?,
            backoff_factor: backoff_factor?,
        })
    }
}
