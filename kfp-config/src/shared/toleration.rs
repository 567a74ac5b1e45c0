use serde::Serialize;
use serde_json::Value;

use crate::shared::ValidationErrors;
use crate::shared::document::{FromDocument, Section};

/// A scheduling toleration forwarded to the task's pod spec.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TolerationSpec {
    pub key: String,
    pub operator: String,
    /// Absent for `Exists` tolerations.
    pub value: Option<String>,
    pub effect: String,
}

impl FromDocument for TolerationSpec {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;

        let key = section.required_string("key", errors);
        let operator = section.required_non_empty("operator", errors);
        let value = section.optional_string("value", errors);
        let effect = section.required_string("effect", errors);

        Some(Self {
            key: key?,
            operator: operator?,
            value,
            effect: effect?,
        })
    }
}
