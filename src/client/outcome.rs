use reqwest::StatusCode;
use serde::de::DeserializeOwned;

use super::classifier::FailureKind;

/// A successful response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    pub status: StatusCode,
    pub body: String,
}

impl Payload {
    /// Decodes the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, String> {
        serde_json::from_str(&self.body).map_err(|e| format!("Failed to parse response JSON: {}", e))
    }
}

/// Terminal result of `RequestExecutor::execute`. Every failure path ends in one of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RequestOutcome {
    Success(Payload),
    /// The server answered with a non-success status (or a 401 that survived the retry).
    ClientFailure { status: StatusCode, message: String },
    /// No response was received.
    NetworkFailure { message: String },
    /// The credential could not be refreshed; the user has to log in again.
    AuthRequired,
}

impl RequestOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, RequestOutcome::Success(_))
    }

    /// The failure category, or `None` on success.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            RequestOutcome::Success(_) => None,
            RequestOutcome::ClientFailure { .. } => Some(FailureKind::Client),
            RequestOutcome::NetworkFailure { .. } => Some(FailureKind::Network),
            RequestOutcome::AuthRequired => Some(FailureKind::AuthRequired),
        }
    }

    /// Label used for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            RequestOutcome::Success(_) => "success",
            RequestOutcome::ClientFailure { .. } => "client_failure",
            RequestOutcome::NetworkFailure { .. } => "network_failure",
            RequestOutcome::AuthRequired => "auth_required",
        }
    }

    pub fn into_payload(self) -> Option<Payload> {
        match self {
            RequestOutcome::Success(payload) => Some(payload),
            _ => None,
        }
    }
}
