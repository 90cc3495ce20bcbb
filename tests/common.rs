#![allow(dead_code)]

use authclient::client::RequestExecutor;
use authclient::config::load_config_from_str;
use authclient::credentials::Credential;
use authclient::startup::build_executor;

pub const REFRESH_PATH: &str = "/api/v1/auth/refresh-tokens";

/// Builds an executor against `base_url` the same way the binary does,
/// seeding the store with `credential`.
pub fn build_client(base_url: &str, credential: &Credential) -> RequestExecutor {
    let mut yaml = format!(
        r#"
version: "1.0.0"
logging:
  level: "debug"
  format: "json"
client:
  base_url: "{}"
  timeout_in_ms: 2000
"#,
        base_url
    );
    if !credential.is_empty() {
        yaml.push_str("credentials:\n");
        if let Some(access) = &credential.access_token {
            yaml.push_str(&format!("  access_token: \"{}\"\n", access));
        }
        if let Some(refresh) = &credential.refresh_token {
            yaml.push_str(&format!("  refresh_token: \"{}\"\n", refresh));
        }
    }

    let config = load_config_from_str(&yaml).expect("test config should parse");
    build_executor(&config).expect("executor should build")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

pub fn token_pair(access: &str, refresh: &str) -> String {
    format!(
        r#"{{"accessToken": "{}", "refreshToken": "{}"}}"#,
        access, refresh
    )
}
