use kfp_config::load_config;
use kfp_config::shared::PluginConfig;

/// Loads the layered [`PluginConfig`], which is validated while it is parsed.
pub fn load_plugin_config() -> anyhow::Result<PluginConfig> {
    let config = load_config()?;

    Ok(config)
}
