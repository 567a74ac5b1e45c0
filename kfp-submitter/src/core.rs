use kfp_config::shared::{PluginConfig, RunConfig, VolumeConfig};
use tracing::{debug, info};

use crate::credentials::{CredentialProvider, obtain_token_or_none};
use crate::submitter::{PipelineSubmitter, RunHandle};
use crate::tasks::build_run_request;

/// Submits a run covering every node pool the configuration refers to.
///
/// Credentials are optional: when `credentials` yields nothing, the request is sent without a
/// token.
pub async fn start_submission_with_config<C, S>(
    config: PluginConfig,
    credentials: &C,
    submitter: &S,
) -> anyhow::Result<RunHandle>
where
    C: CredentialProvider,
    S: PipelineSubmitter,
{
    info!("starting pipeline submission");

    log_config(&config);

    let node_pools = config.referenced_node_pools();
    let token = obtain_token_or_none(credentials).await;
    let request = build_run_request(&config, &node_pools).with_token(token);
    let tasks = request.tasks.len();

    let handle = submitter.submit(request).await?;

    info!(run_id = handle.run_id, tasks, "pipeline submitted");

    Ok(handle)
}

fn log_config(config: &PluginConfig) {
    debug!(
        host = config.host,
        project_id = config.project_id,
        region = config.region,
        "plugin config"
    );
    log_run_config(&config.run_config);
}

fn log_run_config(config: &RunConfig) {
    debug!(
        image = config.image,
        image_pull_policy = config.image_pull_policy,
        experiment_name = config.experiment_name,
        run_name = config.run_name,
        scheduled_run_name = config.scheduled_run_name,
        wait_for_completion = config.wait_for_completion,
        ttl = config.ttl,
        node_merge_strategy = %config.node_merge_strategy,
        "run config"
    );
    debug!(
        resources = ?config.resources.node_pools().collect::<Vec<_>>(),
        tolerations = ?config.tolerations.node_pools().collect::<Vec<_>>(),
        retry_policy = ?config.retry_policy.node_pools().collect::<Vec<_>>(),
        extra_volumes = ?config.extra_volumes.node_pools().collect::<Vec<_>>(),
        "node pool overrides"
    );
    if let Some(volume) = &config.volume {
        log_volume_config(volume);
    }
}

fn log_volume_config(config: &VolumeConfig) {
    debug!(
        storageclass = config.storageclass,
        size = config.size,
        access_modes = ?config.access_modes,
        skip_init = config.skip_init,
        keep = config.keep,
        owner = config.owner,
        "volume config"
    );
}
