use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::classifier::{classify_status, server_message, ResponseClass};
use crate::client::dispatch::Dispatcher;
use crate::client::request::RequestSpec;
use crate::credentials::Credential;

/// Swaps a refresh token for a new access/refresh pair.
#[async_trait::async_trait]
pub trait TokenExchanger: Send + Sync {
    /// A descriptive name for logs.
    fn get_name(&self) -> &str;

    /// Any error means the refresh failed and the session is over.
    async fn exchange(&self, refresh_token: &str) -> Result<Credential, String>;
}

#[derive(Deserialize)]
struct TokenEnvelope {
    token: String,
}

/// Accepted token-exchange response bodies.
#[derive(Deserialize)]
#[serde(untagged)]
enum ExchangeResponse {
    Flat {
        #[serde(rename = "accessToken", alias = "access_token")]
        access_token: String,
        #[serde(rename = "refreshToken", alias = "refresh_token")]
        refresh_token: String,
    },
    Nested {
        access: TokenEnvelope,
        refresh: TokenEnvelope,
    },
}

impl ExchangeResponse {
    fn into_credential(self) -> Result<Credential, String> {
        let (access, refresh) = match self {
            ExchangeResponse::Flat {
                access_token,
                refresh_token,
            } => (access_token, refresh_token),
            ExchangeResponse::Nested { access, refresh } => (access.token, refresh.token),
        };
        if access.is_empty() || refresh.is_empty() {
            return Err("Token exchange returned an empty token".to_string());
        }
        Ok(Credential::new(access, refresh))
    }
}

/// Parses a token-exchange response body into a credential.
pub fn parse_exchange_response(body: &str) -> Result<Credential, String> {
    serde_json::from_str::<ExchangeResponse>(body)
        .map_err(|e| format!("Malformed token exchange response: {}", e))?
        .into_credential()
}

/// Exchanges tokens by POSTing `{"refreshToken": ...}` to the refresh endpoint.
pub struct HttpTokenExchanger {
    dispatcher: Dispatcher,
    refresh_path: String,
}

impl HttpTokenExchanger {
    pub fn new(dispatcher: Dispatcher, refresh_path: impl Into<String>) -> Self {
        HttpTokenExchanger {
            dispatcher,
            refresh_path: refresh_path.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenExchanger for HttpTokenExchanger {
    fn get_name(&self) -> &str {
        "http"
    }

    async fn exchange(&self, refresh_token: &str) -> Result<Credential, String> {
        debug!(
            "Exchanging refresh token at '{}'",
            self.dispatcher.url_for(&self.refresh_path)
        );

        // The exchange never carries a bearer and must never loop back into a refresh.
        let spec = RequestSpec::post(self.refresh_path.as_str())
            .json(&json!({ "refreshToken": refresh_token }))?
            .without_auth_retry();

        let response = self
            .dispatcher
            .send(&spec, None)
            .await
            .map_err(|e| format!("Failed to call token exchange endpoint: {}", e))?;

        match classify_status(response.status) {
            ResponseClass::Success => parse_exchange_response(&response.body),
            ResponseClass::AuthorizationFailure | ResponseClass::Failure => Err(format!(
                "Token exchange rejected with status {}: {}",
                response.status,
                server_message(&response.body)
            )),
        }
    }
}
