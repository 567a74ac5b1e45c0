use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::shared::document::{FromDocument, Section};
use crate::shared::{
    ExtraVolumeConfig, OverrideTable, ResourceSpec, RetryPolicy, TolerationSpec, ValidationErrors,
    VolumeConfig,
};

const DEFAULT_IMAGE_PULL_POLICY: &str = "IfNotPresent";

/// Seconds a finished run is kept around before garbage collection, one week.
pub const DEFAULT_TTL_SECONDS: u64 = 3600 * 24 * 7;

/// How pipeline nodes are grouped into tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeMergeStrategy {
    /// One task per pipeline node, each scheduled on its own node pool.
    #[default]
    None,
    /// The whole pipeline runs in a single task on the default node pool.
    Full,
}

impl NodeMergeStrategy {
    const NONE: &'static str = "none";
    const FULL: &'static str = "full";

    fn parse(value: &str) -> Option<Self> {
        match value.to_lowercase().as_str() {
            Self::NONE => Some(Self::None),
            Self::FULL => Some(Self::Full),
            _ => None,
        }
    }
}

impl fmt::Display for NodeMergeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str(Self::NONE),
            Self::Full => f.write_str(Self::FULL),
        }
    }
}

/// Parameters of the runs submitted to the cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunConfig {
    /// Container image every task runs.
    pub image: String,
    pub image_pull_policy: String,
    /// Pipeline root where the cluster stores artifacts.
    pub root: Option<String>,
    pub experiment_name: Option<String>,
    pub run_name: Option<String>,
    /// Name of scheduled runs, copied from `run_name` when not written.
    pub scheduled_run_name: Option<String>,
    pub description: Option<String>,
    pub wait_for_completion: bool,
    /// Seconds a finished run is kept before the cluster deletes it.
    pub ttl: u64,
    /// Shared data volume, only present when the document has a `volume` key.
    pub volume: Option<VolumeConfig>,
    pub store_kedro_outputs_as_kfp_artifacts: bool,
    pub max_cache_staleness: Option<String>,
    /// Pipeline run after the main one finishes, whatever its outcome.
    pub on_exit_pipeline: Option<String>,
    pub node_merge_strategy: NodeMergeStrategy,
    pub resources: OverrideTable<ResourceSpec>,
    pub tolerations: OverrideTable<Vec<TolerationSpec>>,
    pub retry_policy: OverrideTable<RetryPolicy>,
    pub extra_volumes: OverrideTable<Vec<ExtraVolumeConfig>>,
}

impl FromDocument for RunConfig {
    fn parse(value: &Value, path: &str, errors: &mut ValidationErrors) -> Option<Self> {
        let section = Section::new(value, path, errors)?;

        let image = section.required_non_empty("image", errors);
        let run_name = section.optional_string("run_name", errors);
        let scheduled_run_name = section
            .optional_string("scheduled_run_name", errors)
            .or_else(|| run_name.clone());

        // `volume:` and `volume: {}` still materialize a volume with defaults.
        let volume = if section.contains("volume") {
            match section.get("volume") {
                Some(value) => VolumeConfig::parse(value, &section.field("volume"), errors),
                None => Some(VolumeConfig::default()),
            }
        } else {
            None
        };

        let node_merge_strategy = match section.optional_string("node_merge_strategy", errors) {
            None => NodeMergeStrategy::default(),
            Some(raw) => NodeMergeStrategy::parse(&raw).unwrap_or_else(|| {
                errors.invalid_value(
                    section.field("node_merge_strategy"),
                    format!(
                        "{raw:?} is not supported, use `{}` or `{}`",
                        NodeMergeStrategy::NONE,
                        NodeMergeStrategy::FULL
                    ),
                );
                NodeMergeStrategy::default()
            }),
        };

        let run_config = Self {
            image_pull_policy: section.string_or(
                "image_pull_policy",
                DEFAULT_IMAGE_PULL_POLICY,
                errors,
            ),
            root: section.optional_string("root", errors),
            experiment_name: section.optional_string("experiment_name", errors),
            scheduled_run_name,
            run_name,
            description: section.optional_string("description", errors),
            wait_for_completion: section.bool_or("wait_for_completion", false, errors),
            ttl: section.integer_or("ttl", DEFAULT_TTL_SECONDS, errors),
            volume,
            store_kedro_outputs_as_kfp_artifacts: section.bool_or(
                "store_kedro_outputs_as_kfp_artifacts",
                true,
                errors,
            ),
            max_cache_staleness: section
                .optional_string("max_cache_staleness", errors)
                .filter(|staleness| !staleness.is_empty()),
            on_exit_pipeline: section.optional_string("on_exit_pipeline", errors),
            node_merge_strategy,
            resources: override_table(&section, "resources", errors),
            tolerations: override_table(&section, "tolerations", errors),
            retry_policy: override_table(&section, "retry_policy", errors),
            extra_volumes: override_table(&section, "extra_volumes", errors),
            image: image?,
        };

        Some(run_config)
    }
}

/// Parses the override table stored under `key`, empty when the key is absent or invalid.
fn override_table<V>(
    section: &Section<'_>,
    key: &str,
    errors: &mut ValidationErrors,
) -> OverrideTable<V>
where
    V: FromDocument,
{
    section
        .get(key)
        .and_then(|value| OverrideTable::parse(value, &section.field(key), errors))
        .unwrap_or_default()
}
