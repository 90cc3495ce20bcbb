use std::time::Duration;

use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::StatusCode;
use tracing::debug;

use super::request::{RequestBody, RequestSpec};
use crate::config::ClientConfig;

/// A response that made it back, body fully read.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: StatusCode,
    pub body: String,
}

/// Sends single requests against the configured base URL. Knows nothing about
/// refresh or retry; shared by the executor and the token exchanger.
#[derive(Clone)]
pub struct Dispatcher {
    http: reqwest::Client,
    base_url: String,
}

impl Dispatcher {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Dispatcher {
            http,
            base_url: base_url.into(),
        }
    }

    /// Builds the underlying HTTP client from config (timeout, user agent).
    pub fn from_config(config: &ClientConfig) -> Result<Self, String> {
        let mut builder =
            reqwest::Client::builder().timeout(Duration::from_millis(config.timeout_in_ms));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| format!("Failed to build HTTP client: {}", e))?;
        Ok(Self::new(http, config.base_url.clone()))
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolves a request target against the base URL. Absolute URLs pass through.
    pub fn url_for(&self, target: &str) -> String {
        if target.starts_with("http://") || target.starts_with("https://") {
            return target.to_string();
        }
        let base = self.base_url.trim_end_matches('/');
        if target.starts_with('/') {
            format!("{}{}", base, target)
        } else {
            format!("{}/{}", base, target)
        }
    }

    /// Sends `spec` once, with `bearer` as the authorization header if given.
    /// Errors mean no usable response arrived (connect, timeout, broken body).
    pub async fn send(
        &self,
        spec: &RequestSpec,
        bearer: Option<&str>,
    ) -> Result<RawResponse, reqwest::Error> {
        let url = self.url_for(&spec.target);
        debug!(
            "Sending {} {} (authorized={})",
            spec.method,
            url,
            bearer.is_some()
        );

        let mut request = self.http.request(spec.method.clone(), &url);
        for (name, value) in &spec.headers {
            request = request.header(name.as_str(), value.as_str());
        }
        if let Some(token) = bearer {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }
        request = match &spec.body {
            Some(RequestBody::Json(value)) => request.json(value),
            Some(RequestBody::Raw { content_type, data }) => request
                .header(CONTENT_TYPE, content_type.as_str())
                .body(data.clone()),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        debug!("{} {} answered {}", spec.method, url, status);
        Ok(RawResponse { status, body })
    }
}
