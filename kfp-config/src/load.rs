use std::io;
use std::path::Path;

use rust_cli_config::{Config, ConfigError, File, FileFormat};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

use crate::environment::Environment;
use crate::shared::{FromDocument, PluginConfig, ValidationErrors};

/// Directory containing configuration files relative to the working directory.
const CONFIGURATION_DIR: &str = "configuration";

/// Base configuration file loaded for all environments.
const BASE_CONFIG_FILE: &str = "base.yaml";

/// Prefix for environment variable configuration overrides.
const ENV_PREFIX: &str = "KFP";

/// Separator between environment variable prefix and key segments.
const ENV_PREFIX_SEPARATOR: &str = "_";

/// Separator for nested configuration keys in environment variables.
///
/// Example: `KFP_RUN_CONFIG__IMAGE` sets the `run_config.image` field.
const ENV_SEPARATOR: &str = "__";

/// Errors raised while loading the configuration document.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read configuration: {0}")]
    Source(#[from] ConfigError),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("failed to determine the current directory: {0}")]
    CurrentDir(#[source] io::Error),

    #[error("failed to detect the environment: {0}")]
    Environment(#[source] io::Error),
}

/// Loads the layered configuration document and validates it.
///
/// Sources, later ones overriding earlier ones:
/// 1. `configuration/base.yaml`
/// 2. `configuration/{environment}.yaml`, if it exists
/// 3. Environment variables prefixed with `KFP`, nested keys separated by `__`
pub fn load_config() -> Result<PluginConfig, LoadError> {
    let base_path = std::env::current_dir().map_err(LoadError::CurrentDir)?;
    let configuration_directory = base_path.join(CONFIGURATION_DIR);

    let environment = Environment::load().map_err(LoadError::Environment)?;

    // Values stay strings, the typed model coerces them per field. Comma separated lists such as
    // `KFP_RUN_CONFIG__VOLUME__ACCESS_MODES=ReadWriteOnce,ReadOnlyMany` are split there too.
    let environment_source = rust_cli_config::Environment::with_prefix(ENV_PREFIX)
        .prefix_separator(ENV_PREFIX_SEPARATOR)
        .separator(ENV_SEPARATOR);

    let settings = Config::builder()
        .add_source(File::from(configuration_directory.join(BASE_CONFIG_FILE)))
        .add_source(
            File::from(configuration_directory.join(environment.config_file_name()))
                .required(false),
        )
        .add_source(environment_source)
        .build()?;

    debug!(%environment, "loaded layered configuration");

    into_plugin_config(settings)
}

/// Loads and validates a single configuration file, format picked from its extension.
pub fn load_config_from_file(path: impl AsRef<Path>) -> Result<PluginConfig, LoadError> {
    let settings = Config::builder()
        .add_source(File::from(path.as_ref()))
        .build()?;

    into_plugin_config(settings)
}

/// Parses and validates a YAML configuration document.
pub fn load_config_from_str(yaml: &str) -> Result<PluginConfig, LoadError> {
    let settings = Config::builder()
        .add_source(File::from_str(yaml, FileFormat::Yaml))
        .build()?;

    into_plugin_config(settings)
}

fn into_plugin_config(settings: Config) -> Result<PluginConfig, LoadError> {
    let document: Value = settings.try_deserialize()?;

    Ok(PluginConfig::from_value(&document)?)
}
