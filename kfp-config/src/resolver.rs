//! Per node pool resolution of the configuration document.
//!
//! Every function here is a pure function of the document and the pool name: no I/O, no
//! caching, no mutation. Calling them repeatedly or from many threads at once over the same
//! [`PluginConfig`] always yields identical results.
//!
//! A pool nobody configured is not an error: it resolves to an empty map, an empty list or
//! `None`, depending on the domain.

use serde::Serialize;

use crate::merge::{FieldMerge, ReplaceOrDefault, WholeRecordOrDefault};
use crate::shared::{ExtraVolumeConfig, PluginConfig, ResourceSpec, RetryPolicy, TolerationSpec};

/// Resource requests for `node_pool`: the default entry overlaid with the pool's own entry.
pub fn resolve_resources(config: &PluginConfig, node_pool: &str) -> ResourceSpec {
    config.run_config.resources.resolve(node_pool, &FieldMerge)
}

/// Tolerations for `node_pool`: the pool's own list if written, else the default list.
pub fn resolve_tolerations(config: &PluginConfig, node_pool: &str) -> Vec<TolerationSpec> {
    config
        .run_config
        .tolerations
        .resolve(node_pool, &ReplaceOrDefault)
}

/// Retry policy for `node_pool`: the pool's own policy if written, else the default policy.
pub fn resolve_retry_policy(config: &PluginConfig, node_pool: &str) -> Option<RetryPolicy> {
    config
        .run_config
        .retry_policy
        .resolve(node_pool, &WholeRecordOrDefault)
}

/// Extra volumes for `node_pool`, resolved like tolerations.
pub fn resolve_extra_volumes(config: &PluginConfig, node_pool: &str) -> Vec<ExtraVolumeConfig> {
    config
        .run_config
        .extra_volumes
        .resolve(node_pool, &ReplaceOrDefault)
}

/// Every resolved domain of one node pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResolvedNodePool {
    pub node_pool: String,
    pub resources: ResourceSpec,
    pub tolerations: Vec<TolerationSpec>,
    pub retry_policy: Option<RetryPolicy>,
    pub extra_volumes: Vec<ExtraVolumeConfig>,
}

/// Resolves all domains of `node_pool` at once.
pub fn resolve_node_pool(config: &PluginConfig, node_pool: &str) -> ResolvedNodePool {
    ResolvedNodePool {
        node_pool: node_pool.to_string(),
        resources: resolve_resources(config, node_pool),
        tolerations: resolve_tolerations(config, node_pool),
        retry_policy: resolve_retry_policy(config, node_pool),
        extra_volumes: resolve_extra_volumes(config, node_pool),
    }
}
