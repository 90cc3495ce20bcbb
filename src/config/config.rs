use figment::providers::{Env, Format, Yaml};
use figment::Figment;
use schemars::{schema_for, JsonSchema};
use serde::{Deserialize, Serialize};

use super::client::{ClientConfig, CredentialsConfig};
use super::logging::LoggingConfig;

/// Prefix for environment overrides, e.g. `AUTHCLIENT_CLIENT__BASE_URL`.
pub const ENV_PREFIX: &str = "AUTHCLIENT_";

/// A top-level enum for versioned configurations.
#[derive(Deserialize, Serialize, JsonSchema)]
#[serde(tag = "version")]
pub enum Config {
    #[serde(rename = "1.0.0")]
    ConfigV1(ConfigV1),
}

/// Main config for v1.0.0.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ConfigV1 {
    pub client: ClientConfig,
    #[serde(default)]
    pub credentials: CredentialsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn extract(figment: Figment) -> Result<ConfigV1, String> {
    let config = figment
        .extract::<Config>()
        .map_err(|e| format!("Error loading configuration: {}", e))?;
    match config {
        Config::ConfigV1(c) => Ok(c),
    }
}

/// Load config from a YAML file, letting `AUTHCLIENT_*` environment variables override it.
pub fn load_config(path: &str) -> Result<ConfigV1, String> {
    extract(
        Figment::new()
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__")),
    )
}

/// Load config from an in-memory YAML document; no environment overrides apply.
pub fn load_config_from_str(yaml: &str) -> Result<ConfigV1, String> {
    extract(Figment::new().merge(Yaml::string(yaml)))
}

/// Render the JSON schema for the configuration.
pub fn config_schema() -> Result<String, String> {
    let schema = schema_for!(Config);
    serde_json::to_string_pretty(&schema).map_err(|e| format!("Failed to render schema: {}", e))
}
