use kfp_config::shared::PluginConfig;
use kfp_submitter::config::load_plugin_config;
use kfp_submitter::core::start_submission_with_config;
use kfp_submitter::credentials::{
    DEX_SESSION_ENV_NAME, EnvTokenProvider, FirstAvailable, IAP_TOKEN_ENV_NAME,
};
use kfp_submitter::submitter::DryRunSubmitter;
use kfp_telemetry::init_tracing_with_run;
use tracing::error;

fn main() -> anyhow::Result<()> {
    // Load and validate the plugin config
    let plugin_config = load_plugin_config()?;

    // Tag JSON log entries with the run they belong to
    let experiment = plugin_config.run_config.experiment_name.clone();
    let run_name = plugin_config.run_config.run_name.clone();
    let _log_flusher = init_tracing_with_run(env!("CARGO_BIN_NAME"), experiment, run_name)?;

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?
        .block_on(async_main(plugin_config))?;

    Ok(())
}

async fn async_main(plugin_config: PluginConfig) -> anyhow::Result<()> {
    let credentials = FirstAvailable::new(
        EnvTokenProvider::new(IAP_TOKEN_ENV_NAME),
        EnvTokenProvider::new(DEX_SESSION_ENV_NAME),
    );
    let submitter = DryRunSubmitter::new();

    if let Err(err) = start_submission_with_config(plugin_config, &credentials, &submitter).await
    {
        error!("an error occurred while submitting the pipeline: {err}");

        return Err(err);
    }

    Ok(())
}
