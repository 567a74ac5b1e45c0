use serde::Serialize;
use serde_json::{Map, Value};

use crate::shared::ValidationErrors;
use crate::shared::document::{FromDocument, Section, describe};

const DEFAULT_VOLUME_SIZE: &str = "1Gi";
const DEFAULT_ACCESS_MODES: &[&str] = &["ReadWriteOnce"];

/// Suffixes accepted in Kubernetes quantities.
const QUANTITY_SUFFIXES: &[&str] = &[
    "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

/// Shared data volume mounted into every task of a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VolumeConfig {
    /// Storage class of the claim, cluster default when absent.
    pub storageclass: Option<String>,
    /// Requested size as a Kubernetes quantity, e.g. `3Gi`.
    pub size: String,
    pub access_modes: Vec<String>,
    /// Skip copying the image's data directory into the fresh volume.
    pub skip_init: bool,
    /// Keep the volume after the run finishes.
    pub keep: bool,
    /// Uid that owns the volume contents.
    pub owner: u32,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            storageclass: None,
            size: DEFAULT_VOLUME_SIZE.to_string(),
            access_modes: DEFAULT_ACCESS_MODES.iter().map(|m| m.to_string()).collect(),
            skip_init: false,
            keep: false,
            owner: 0,
        }
    }
}

impl FromDocument for VolumeConfig {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;
        let before = errors.len();

        let storageclass = section.optional_string("storageclass", errors);
        let size = section.string_or("size", DEFAULT_VOLUME_SIZE, errors);
        if !is_quantity(&size) {
            errors.invalid_value(
                section.field("size"),
                format!("{size:?} is not a valid quantity"),
            );
        }

        let list_errors = errors.len();
        let access_modes = section.string_list_or("access_modes", DEFAULT_ACCESS_MODES, errors);
        if access_modes.is_empty() && errors.len() == list_errors {
            errors.invalid_value(
                section.field("access_modes"),
                "at least one access mode is required",
            );
        }

        let volume = Self {
            storageclass,
            size,
            access_modes,
            skip_init: section.bool_or("skip_init", false, errors),
            keep: section.bool_or("keep", false, errors),
            owner: section.integer_or("owner", 0, errors),
        };

        (errors.len() == before).then_some(volume)
    }
}

/// An additional volume mounted into the tasks of a node pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExtraVolumeConfig {
    /// Pod volume definition forwarded verbatim; must carry a `name`.
    pub volume: Map<String, Value>,
    pub mount_path: String,
}

impl ExtraVolumeConfig {
    pub fn name(&self) -> Option<&str> {
        self.volume.get("name").and_then(Value::as_str)
    }
}

impl FromDocument for ExtraVolumeConfig {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;

        let mount_path = section.required_non_empty("mount_path", errors);
        let volume = match section.get("volume") {
            None => {
                errors.missing(section.field("volume"));
                None
            }
            Some(Value::Object(volume)) => match volume.get("name") {
                Some(Value::String(name)) if !name.is_empty() => Some(volume.clone()),
                _ => {
                    errors.invalid_value(
                        section.field("volume"),
                        "a pod volume definition with a non-empty `name` is required",
                    );
                    None
                }
            },
            Some(other) => {
                errors.invalid_type(section.field("volume"), "a mapping", describe(other));
                None
            }
        };

        Some(Self {
            volume: volume?,
            mount_path: mount_path?,
        })
    }
}

/// Checks `quantity` against the Kubernetes quantity grammar, without exponent notation.
fn is_quantity(quantity: &str) -> bool {
    let unsigned = quantity.strip_prefix(['+', '-']).unwrap_or(quantity);
    let split = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(split);

    let digits = number.chars().filter(char::is_ascii_digit).count();
    let dots = number.matches('.').count();

    digits > 0 && dots <= 1 && QUANTITY_SUFFIXES.contains(&suffix)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_empty_volume_uses_defaults() {
        let volume = VolumeConfig::from_value(&json!({})).unwrap();

        assert_eq!(volume, VolumeConfig::default());
        assert!(!volume.keep);
        assert_eq!(volume.size, "1Gi");
        assert_eq!(volume.access_modes, vec!["ReadWriteOnce"]);
    }

    #[test]
    fn test_full_volume() {
        let volume = VolumeConfig::from_value(&json!({
            "storageclass": "default",
            "size": "3Gi",
            "access_modes": ["ReadWriteOnce"],
            "keep": true,
            "owner": 1000,
        }))
        .unwrap();

        assert_eq!(volume.storageclass.as_deref(), Some("default"));
        assert_eq!(volume.size, "3Gi");
        assert!(volume.keep);
        assert_eq!(volume.owner, 1000);
    }

    #[test]
    fn test_string_fields_from_environment() {
        let volume = VolumeConfig::from_value(&json!({
            "access_modes": "ReadWriteOnce,ReadOnlyMany",
            "keep": "true",
            "owner": "1000",
        }))
        .unwrap();

        assert_eq!(volume.access_modes, vec!["ReadWriteOnce", "ReadOnlyMany"]);
        assert!(volume.keep);
        assert_eq!(volume.owner, 1000);
    }

    #[test]
    fn test_empty_access_modes_are_rejected() {
        let errors = VolumeConfig::from_value(&json!({
            "size": "lots",
            "access_modes": "",
        }))
        .unwrap_err();

        assert!(errors.contains_field("size"));
        assert!(errors.contains_field("access_modes"));
    }

    #[test]
    fn test_invalid_volume_fields() {
        let errors = VolumeConfig::from_value(&json!({
            "size": "lots",
            "access_modes": { "mode": "ReadWriteOnce" },
            "keep": "maybe",
        }))
        .unwrap_err();

        assert!(errors.contains_field("size"));
        assert!(errors.contains_field("access_modes"));
        assert!(errors.contains_field("keep"));
    }

    #[test]
    fn test_quantities() {
        for valid in ["1Gi", "500m", "1.5G", "100", "+2Ki", ".5M"] {
            assert!(is_quantity(valid), "{valid} should be valid");
        }
        for invalid in ["", "Gi", "1GB", "1..5Gi", "one"] {
            assert!(!is_quantity(invalid), "{invalid} should be invalid");
        }
    }

    #[test]
    fn test_extra_volume_requires_named_volume() {
        let extra = ExtraVolumeConfig::from_value(&json!({
            "mount_path": "/dev/shm",
            "volume": { "name": "dshm", "emptyDir": { "medium": "Memory" } },
        }))
        .unwrap();
        assert_eq!(extra.name(), Some("dshm"));

        let errors = ExtraVolumeConfig::from_value(&json!({
            "mount_path": "",
            "volume": { "emptyDir": {} },
        }))
        .unwrap_err();
        assert!(errors.contains_field("mount_path"));
        assert!(errors.contains_field("volume"));
    }
}
