use std::collections::BTreeMap;

use serde_json::Value;

use crate::shared::ValidationErrors;
use crate::shared::document::{FromDocument, Section, coerce_string, describe};

/// Resource requests of a task, keyed by resource name (`cpu`, `memory`, `nvidia.com/gpu`, ...)
/// with Kubernetes quantity strings as values.
///
/// There is no fixed key set; every key is forwarded to the container spec.
pub type ResourceSpec = BTreeMap<String, String>;

impl FromDocument for ResourceSpec {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;
        let before = errors.len();

        let mut spec = ResourceSpec::new();
        for (name, quantity) in section.entries() {
            match coerce_string(quantity) {
                Some(quantity) if !quantity.trim().is_empty() => {
                    spec.insert(name.clone(), quantity);
                }
                Some(_) => errors.invalid_value(section.field(name), "quantity must not be empty"),
                None => errors.invalid_type(section.field(name), "a quantity", describe(quantity)),
            }
        }

        (errors.len() == before).then_some(spec)
    }
}
