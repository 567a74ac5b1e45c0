use std::collections::BTreeSet;

use serde::Serialize;
use serde_json::Value;

use crate::shared::document::{FromDocument, Section};
use crate::shared::{DEFAULT_NODE_POOL, RunConfig, ValidationErrors};

/// Root of the plugin's configuration document.
///
/// A [`PluginConfig`] is built once through [`FromDocument::from_value`] (or one of the
/// `load_*` functions) and is immutable afterwards. Everything the submission path needs per
/// node pool is derived from it by the functions in [`crate::resolver`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PluginConfig {
    /// Base URL of the Kubeflow Pipelines API.
    pub host: String,
    pub run_config: RunConfig,
    /// Google Cloud project hosting the cluster, if any.
    pub project_id: Option<String>,
    pub region: Option<String>,
}

impl PluginConfig {
    /// Parses and validates a configuration document.
    ///
    /// Equivalent to [`FromDocument::from_value`]; every violation in the document is reported in
    /// the returned [`ValidationErrors`].
    pub fn parse_document(document: &Value) -> Result<Self, ValidationErrors> {
        Self::from_value(document)
    }

    /// Returns every node pool named in any override table, plus [`DEFAULT_NODE_POOL`], sorted.
    pub fn referenced_node_pools(&self) -> Vec<String> {
        let run_config = &self.run_config;
        let pools: BTreeSet<&str> = std::iter::once(DEFAULT_NODE_POOL)
            .chain(run_config.resources.node_pools())
            .chain(run_config.tolerations.node_pools())
            .chain(run_config.retry_policy.node_pools())
            .chain(run_config.extra_volumes.node_pools())
            .collect();

        pools.into_iter().map(str::to_string).collect()
    }
}

impl FromDocument for PluginConfig {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;

        let host = section.required_non_empty("host", errors).and_then(|host| {
            if host.starts_with("http://") || host.starts_with("https://") {
                Some(host)
            } else {
                errors.invalid_value(
                    section.field("host"),
                    "must start with http:// or https://",
                );
                None
            }
        });

        let run_config = match section.get("run_config") {
            Some(run_config) => RunConfig::parse(run_config, &section.field("run_config"), errors),
            None => {
                // Report the nested required field too, so one pass lists everything missing.
                errors.missing(section.field("run_config"));
                errors.missing(section.field("run_config.image"));
                None
            }
        };

        let project_id = section.optional_string("project_id", errors);
        let region = section.optional_string("region", errors);

        Some(Self {
            host: host?,
            run_config: run_config?,
            project_id,
            region,
        })
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::shared::{DEFAULT_TTL_SECONDS, NodeMergeStrategy};

    fn minimal() -> Value {
        json!({
            "host": "https://example.com",
            "run_config": { "image": "gcr.io/project-image/test" },
        })
    }

    #[test]
    fn test_plugin_config() {
        let config = PluginConfig::parse_document(&json!({
            "host": "https://example.com",
            "run_config": {
                "image": "gcr.io/project-image/test",
                "image_pull_policy": "Always",
                "experiment_name": "Test Experiment",
                "run_name": "test run",
                "scheduled_run_name": "scheduled run",
                "description": "My awesome pipeline",
                "wait_for_completion": true,
                "ttl": 300,
                "volume": {
                    "storageclass": "default",
                    "size": "3Gi",
                    "access_modes": ["ReadWriteOnce"],
                    "keep": true,
                },
            },
        }))
        .unwrap();

        let run_config = &config.run_config;
        assert_eq!(config.host, "https://example.com");
        assert_eq!(run_config.image, "gcr.io/project-image/test");
        assert_eq!(run_config.image_pull_policy, "Always");
        assert_eq!(
            run_config.experiment_name.as_deref(),
            Some("Test Experiment")
        );
        assert_eq!(run_config.run_name.as_deref(), Some("test run"));
        assert_eq!(
            run_config.scheduled_run_name.as_deref(),
            Some("scheduled run")
        );
        assert_eq!(
            run_config.description.as_deref(),
            Some("My awesome pipeline")
        );
        assert!(run_config.wait_for_completion);
        assert_eq!(run_config.ttl, 300);

        let volume = run_config.volume.as_ref().unwrap();
        assert_eq!(volume.storageclass.as_deref(), Some("default"));
        assert_eq!(volume.size, "3Gi");
        assert!(volume.keep);
        assert_eq!(volume.access_modes, vec!["ReadWriteOnce"]);
    }

    #[test]
    fn test_defaults() {
        let config = PluginConfig::parse_document(&minimal()).unwrap();
        let run_config = &config.run_config;

        assert_eq!(run_config.image_pull_policy, "IfNotPresent");
        assert_eq!(run_config.ttl, DEFAULT_TTL_SECONDS);
        assert_eq!(run_config.ttl, 604_800);
        assert_eq!(run_config.volume, None);
        assert_eq!(run_config.description, None);
        assert_eq!(run_config.max_cache_staleness, None);
        assert!(!run_config.wait_for_completion);
        assert!(run_config.store_kedro_outputs_as_kfp_artifacts);
        assert_eq!(run_config.node_merge_strategy, NodeMergeStrategy::None);
        assert!(run_config.resources.is_empty());
        assert!(run_config.tolerations.is_empty());
        assert!(run_config.retry_policy.is_empty());
        assert!(run_config.extra_volumes.is_empty());
        assert_eq!(config.project_id, None);
    }

    #[test]
    fn test_missing_required_config() {
        let errors = PluginConfig::parse_document(&json!({})).unwrap_err();

        assert!(errors.contains_field("host"));
        assert!(errors.contains_field("run_config"));
        assert!(errors.contains_field("run_config.image"));
    }

    #[test]
    fn test_missing_image() {
        let errors = PluginConfig::parse_document(&json!({
            "host": "https://example.com",
            "run_config": { "run_name": "test run" },
        }))
        .unwrap_err();

        assert_eq!(errors.len(), 1);
        assert!(errors.contains_field("run_config.image"));
    }

    #[test]
    fn test_reports_all_violations_at_once() {
        let errors = PluginConfig::parse_document(&json!({
            "host": "example.com",
            "run_config": {
                "ttl": "a week",
                "wait_for_completion": "sometimes",
                "node_merge_strategy": "partial",
                "retry_policy": {
                    "node1": { "num_retries": "x", "backoff_duration": "1s", "backoff_factor": 1 },
                },
                "tolerations": { "__default__": { "key": "k" } },
            },
        }))
        .unwrap_err();

        for field in [
            "host",
            "run_config.image",
            "run_config.ttl",
            "run_config.wait_for_completion",
            "run_config.node_merge_strategy",
            "run_config.retry_policy.node1.num_retries",
            "run_config.tolerations.__default__",
        ] {
            assert!(errors.contains_field(field), "missing {field}");
        }
        assert_eq!(errors.len(), 7);
    }

    #[test]
    fn test_rejects_non_mapping_document() {
        let errors = PluginConfig::parse_document(&json!("host: x")).unwrap_err();

        assert!(errors.contains_field("<root>"));
    }

    #[test]
    fn test_do_not_keep_volume_by_default() {
        let mut document = minimal();
        document["run_config"]["volume"] = json!({});

        let config = PluginConfig::parse_document(&document).unwrap();

        assert!(!config.run_config.volume.unwrap().keep);
    }

    #[test]
    fn test_null_volume_is_materialized() {
        let mut document = minimal();
        document["run_config"]["volume"] = Value::Null;

        let config = PluginConfig::parse_document(&document).unwrap();

        assert_eq!(config.run_config.volume, Some(Default::default()));
    }

    #[test]
    fn test_reuse_run_name_for_scheduled_run_name() {
        let mut document = minimal();
        document["run_config"]["run_name"] = json!("some run");

        let config = PluginConfig::parse_document(&document).unwrap();

        assert_eq!(config.run_config.run_name.as_deref(), Some("some run"));
        assert_eq!(
            config.run_config.scheduled_run_name.as_deref(),
            Some("some run")
        );
    }

    #[test]
    fn test_empty_max_cache_staleness_is_none() {
        let mut document = minimal();
        document["run_config"]["max_cache_staleness"] = json!("");
        document["run_config"]["node_merge_strategy"] = json!("FULL");

        let config = PluginConfig::parse_document(&document).unwrap();

        assert_eq!(config.run_config.max_cache_staleness, None);
        assert_eq!(
            config.run_config.node_merge_strategy,
            NodeMergeStrategy::Full
        );
    }

    #[test]
    fn test_referenced_node_pools() {
        let mut document = minimal();
        document["run_config"]["resources"] = json!({ "node2": { "cpu": "1" } });
        document["run_config"]["tolerations"] = json!({ "node1": [] });
        document["run_config"]["retry_policy"] = json!({
            "node2": { "num_retries": 1, "backoff_duration": "1s", "backoff_factor": 1 },
        });

        let config = PluginConfig::parse_document(&document).unwrap();

        assert_eq!(
            config.referenced_node_pools(),
            vec!["__default__", "node1", "node2"]
        );
    }
}
