use reqwest::Method;
use serde::Serialize;
use serde_json::Value;

/// What to send along with a request.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Serialized as JSON with `Content-Type: application/json`.
    Json(Value),
    /// Sent as-is with the given content type (e.g. a prepared multipart payload).
    Raw {
        content_type: String,
        data: Vec<u8>,
    },
}

/// Description of one outbound call.
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: Method,
    /// Path relative to the configured base URL, or an absolute URL.
    pub target: String,
    pub body: Option<RequestBody>,
    /// Whether an authorization failure may trigger a refresh and a single retry.
    pub allow_auth_retry: bool,
    /// Bearer token to use instead of the stored one for the first attempt.
    pub bearer_override: Option<String>,
    pub headers: Vec<(String, String)>,
}

impl RequestSpec {
    pub fn new(method: Method, target: impl Into<String>) -> Self {
        RequestSpec {
            method,
            target: target.into(),
            body: None,
            allow_auth_retry: true,
            bearer_override: None,
            headers: Vec::new(),
        }
    }

    pub fn get(target: impl Into<String>) -> Self {
        Self::new(Method::GET, target)
    }

    pub fn post(target: impl Into<String>) -> Self {
        Self::new(Method::POST, target)
    }

    pub fn put(target: impl Into<String>) -> Self {
        Self::new(Method::PUT, target)
    }

    pub fn patch(target: impl Into<String>) -> Self {
        Self::new(Method::PATCH, target)
    }

    pub fn delete(target: impl Into<String>) -> Self {
        Self::new(Method::DELETE, target)
    }

    /// Attaches a JSON body.
    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self, String> {
        let value = serde_json::to_value(body)
            .map_err(|e| format!("Failed to serialize request body: {}", e))?;
        self.body = Some(RequestBody::Json(value));
        Ok(self)
    }

    pub fn raw(mut self, content_type: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.body = Some(RequestBody::Raw {
            content_type: content_type.into(),
            data: data.into(),
        });
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer_override = Some(token.into());
        self
    }

    /// Disables refresh-and-retry on authorization failure for this call.
    pub fn without_auth_retry(mut self) -> Self {
        self.allow_auth_retry = false;
        self
    }
}
