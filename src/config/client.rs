use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

pub const DEFAULT_REFRESH_PATH: &str = "/api/v1/auth/refresh-tokens";
pub const DEFAULT_TIMEOUT_IN_MS: u64 = 10_000;

/// Where the protected API and its token-exchange endpoint live.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct ClientConfig {
    /// Prefix joined with every request target, e.g. "https://api.example.com".
    pub base_url: String,
    /// Target of the token-exchange call, relative to `base_url`.
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,
    /// Per-call timeout; an elapsed timeout is reported as a network failure.
    #[serde(default = "default_timeout_in_ms")]
    pub timeout_in_ms: u64,
    pub user_agent: Option<String>,
}

fn default_refresh_path() -> String {
    DEFAULT_REFRESH_PATH.to_string()
}

fn default_timeout_in_ms() -> u64 {
    DEFAULT_TIMEOUT_IN_MS
}

/// Tokens to seed the credential store with at startup (e.g. from a previous login).
#[derive(Deserialize, Serialize, Debug, Clone, Default, JsonSchema)]
pub struct CredentialsConfig {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}
