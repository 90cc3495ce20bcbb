//! Maps raw transport and protocol results onto the outcome taxonomy.
//!
//! Used by the executor for every response and exposed so callers can branch
//! on the kind of failure without looking at status codes themselves.

use reqwest::StatusCode;
use serde_json::Value;

use super::outcome::{Payload, RequestOutcome};

pub const NETWORK_FAILURE_MESSAGE: &str =
    "Unable to reach the server. Please check your internet connection or try again later.";
pub const TIMEOUT_MESSAGE: &str = "The server did not respond in time. Please try again later.";
pub const DEFAULT_FAILURE_MESSAGE: &str = "API Request Failed";
pub const INVALID_REQUEST_MESSAGE: &str = "The request could not be built";

/// Failure categories callers can branch on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    /// Nothing came back; retrying later may help.
    Network,
    /// The server rejected the call.
    Client,
    /// The session is gone; force a new login.
    AuthRequired,
}

/// How a response that did arrive should be handled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseClass {
    Success,
    /// The presented credential was rejected; eligible for refresh-and-retry.
    AuthorizationFailure,
    Failure,
}

pub fn is_authorization_failure(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
}

/// Classifies a response status.
pub fn classify_status(status: StatusCode) -> ResponseClass {
    if status.is_success() {
        ResponseClass::Success
    } else if is_authorization_failure(status) {
        ResponseClass::AuthorizationFailure
    } else {
        ResponseClass::Failure
    }
}

/// Classifies an error raised while sending or reading a response.
/// Only failures where no usable response arrived end up here.
///
/// A request that could not even be built (bad header, malformed URL) is
/// still reported as a network failure since nothing was sent, but with a
/// message that points at the request rather than the connection.
pub fn classify_transport_error(err: &reqwest::Error) -> RequestOutcome {
    let message = if err.is_builder() {
        format!("{}: {}", INVALID_REQUEST_MESSAGE, err)
    } else if err.is_timeout() {
        TIMEOUT_MESSAGE.to_string()
    } else {
        NETWORK_FAILURE_MESSAGE.to_string()
    };
    RequestOutcome::NetworkFailure { message }
}

/// Extracts a human-readable message from an error body: a JSON `message`
/// field, then a JSON `error` field, else the default.
pub fn server_message(body: &str) -> String {
    let parsed: Option<Value> = serde_json::from_str(body).ok();
    parsed
        .as_ref()
        .and_then(|v| v.get("message").or_else(|| v.get("error")))
        .and_then(Value::as_str)
        .filter(|m| !m.trim().is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| DEFAULT_FAILURE_MESSAGE.to_string())
}

/// Builds the outcome for a response that will not be retried.
pub fn classify_final(status: StatusCode, body: String) -> RequestOutcome {
    match classify_status(status) {
        ResponseClass::Success => RequestOutcome::Success(Payload { status, body }),
        ResponseClass::AuthorizationFailure | ResponseClass::Failure => {
            RequestOutcome::ClientFailure {
                status,
                message: server_message(&body),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_status() {
        assert_eq!(classify_status(StatusCode::OK), ResponseClass::Success);
        assert_eq!(classify_status(StatusCode::CREATED), ResponseClass::Success);
        assert_eq!(classify_status(StatusCode::NO_CONTENT), ResponseClass::Success);
        assert_eq!(
            classify_status(StatusCode::UNAUTHORIZED),
            ResponseClass::AuthorizationFailure
        );
        assert_eq!(classify_status(StatusCode::FORBIDDEN), ResponseClass::Failure);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), ResponseClass::Failure);
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            ResponseClass::Failure
        );
    }

    #[test]
    fn test_server_message_prefers_message_field() {
        assert_eq!(
            server_message(r#"{"message": "Product not found", "error": "x"}"#),
            "Product not found"
        );
        assert_eq!(server_message(r#"{"error": "Unauthorized access"}"#), "Unauthorized access");
    }

    #[test]
    fn test_server_message_falls_back_to_default() {
        assert_eq!(server_message(""), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(server_message("<html>oops</html>"), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(server_message(r#"{"message": 42}"#), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(server_message(r#"{"message": "  "}"#), DEFAULT_FAILURE_MESSAGE);
        assert_eq!(server_message(r#"["message"]"#), DEFAULT_FAILURE_MESSAGE);
    }

    #[test]
    fn test_classify_final() {
        assert_eq!(
            classify_final(StatusCode::OK, "{}".to_string()),
            RequestOutcome::Success(Payload {
                status: StatusCode::OK,
                body: "{}".to_string()
            })
        );
        // A 401 that is not going to be retried is an ordinary client failure.
        assert_eq!(
            classify_final(StatusCode::UNAUTHORIZED, String::new()),
            RequestOutcome::ClientFailure {
                status: StatusCode::UNAUTHORIZED,
                message: DEFAULT_FAILURE_MESSAGE.to_string()
            }
        );
        assert_eq!(
            classify_final(
                StatusCode::BAD_REQUEST,
                r#"{"message": "name is required"}"#.to_string()
            )
            .failure_kind(),
            Some(FailureKind::Client)
        );
    }
}
