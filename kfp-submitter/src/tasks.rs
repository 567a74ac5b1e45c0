use kfp_config::resolver::{ResolvedNodePool, resolve_node_pool};
use kfp_config::shared::{DEFAULT_NODE_POOL, NodeMergeStrategy, PluginConfig, VolumeConfig};
use secrecy::SecretString;
use serde::Serialize;
use tracing::debug;

/// One task of a run: the container image and everything resolved for its node pool.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskConfig {
    pub image: String,
    pub image_pull_policy: String,
    #[serde(flatten)]
    pub node_pool: ResolvedNodePool,
}

/// Everything needed to start a pipeline run.
#[derive(Debug, Serialize)]
pub struct RunRequest {
    pub host: String,
    pub root: Option<String>,
    pub experiment_name: Option<String>,
    pub run_name: Option<String>,
    pub scheduled_run_name: Option<String>,
    pub description: Option<String>,
    pub ttl_seconds: u64,
    pub wait_for_completion: bool,
    pub volume: Option<VolumeConfig>,
    pub max_cache_staleness: Option<String>,
    pub on_exit_pipeline: Option<String>,
    pub store_outputs_as_artifacts: bool,
    pub tasks: Vec<TaskConfig>,
    #[serde(skip)]
    pub token: Option<SecretString>,
}

impl RunRequest {
    pub fn with_token(mut self, token: Option<SecretString>) -> Self {
        self.token = token;
        self
    }

    /// Finds the task running on `node_pool`.
    pub fn task(&self, node_pool: &str) -> Option<&TaskConfig> {
        self.tasks
            .iter()
            .find(|task| task.node_pool.node_pool == node_pool)
    }
}

/// Builds an unauthenticated run request with one task per distinct node pool.
///
/// With [`NodeMergeStrategy::Full`] the whole pipeline runs as a single task on the default pool
/// and `node_pools` is ignored.
pub fn build_run_request(config: &PluginConfig, node_pools: &[String]) -> RunRequest {
    let run_config = &config.run_config;

    let pools: Vec<&str> = match run_config.node_merge_strategy {
        NodeMergeStrategy::Full => vec![DEFAULT_NODE_POOL],
        NodeMergeStrategy::None => {
            let mut pools: Vec<&str> = Vec::with_capacity(node_pools.len());
            for pool in node_pools {
                if !pools.contains(&pool.as_str()) {
                    pools.push(pool);
                }
            }
            pools
        }
    };

    let tasks = pools
        .into_iter()
        .map(|pool| {
            let node_pool = resolve_node_pool(config, pool);
            debug!(
                node_pool = pool,
                resources = node_pool.resources.len(),
                tolerations = node_pool.tolerations.len(),
                has_retry_policy = node_pool.retry_policy.is_some(),
                extra_volumes = node_pool.extra_volumes.len(),
                "resolved task"
            );

            TaskConfig {
                image: run_config.image.clone(),
                image_pull_policy: run_config.image_pull_policy.clone(),
                node_pool,
            }
        })
        .collect();

    RunRequest {
        host: config.host.clone(),
        root: run_config.root.clone(),
        experiment_name: run_config.experiment_name.clone(),
        run_name: run_config.run_name.clone(),
        scheduled_run_name: run_config.scheduled_run_name.clone(),
        description: run_config.description.clone(),
        ttl_seconds: run_config.ttl,
        wait_for_completion: run_config.wait_for_completion,
        volume: run_config.volume.clone(),
        max_cache_staleness: run_config.max_cache_staleness.clone(),
        on_exit_pipeline: run_config.on_exit_pipeline.clone(),
        store_outputs_as_artifacts: run_config.store_kedro_outputs_as_kfp_artifacts,
        tasks,
        token: None,
    }
}
