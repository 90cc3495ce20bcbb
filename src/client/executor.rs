use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, warn};

use super::classifier::{classify_final, classify_status, classify_transport_error, ResponseClass};
use super::dispatch::Dispatcher;
use super::outcome::RequestOutcome;
use super::request::RequestSpec;
use crate::credentials::CredentialStore;
use crate::metrics::{Metrics, MetricsRecorder};
use crate::refresh::RefreshCoordinator;

/// The single entry point for authenticated calls.
///
/// Each call goes out with the stored access token. If the server rejects it,
/// the executor obtains a fresh credential through the [`RefreshCoordinator`]
/// and resends the call once; a second rejection is returned as is.
#[derive(Clone)]
pub struct RequestExecutor {
    dispatcher: Dispatcher,
    store: Arc<CredentialStore>,
    coordinator: RefreshCoordinator,
    refresh_url: String,
    metrics: Metrics,
}

impl RequestExecutor {
    /// `refresh_path` is the token-exchange target; calls to it never trigger a refresh.
    pub fn new(
        dispatcher: Dispatcher,
        coordinator: RefreshCoordinator,
        refresh_path: &str,
        metrics: Metrics,
    ) -> Self {
        let refresh_url = dispatcher.url_for(refresh_path);
        info!(
            "Creating request executor for '{}' (refresh endpoint '{}')",
            dispatcher.base_url(),
            refresh_url
        );
        RequestExecutor {
            store: coordinator.store().clone(),
            dispatcher,
            coordinator,
            refresh_url,
            metrics,
        }
    }

    /// The credential store shared with the coordinator; login and logout go through it.
    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn coordinator(&self) -> &RefreshCoordinator {
        &self.coordinator
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Sends `spec` and returns its terminal outcome. Never panics or errors
    /// past the four outcome kinds.
    pub async fn execute(&self, spec: RequestSpec) -> RequestOutcome {
        let started = Instant::now();
        let outcome = self.run(&spec).await;

        let label = outcome.label();
        self.metrics.record_request(label);
        self.metrics
            .record_request_duration(label, started.elapsed().as_secs_f64());

        match &outcome {
            RequestOutcome::Success(payload) => {
                debug!("{} {} succeeded with {}", spec.method, spec.target, payload.status)
            }
            RequestOutcome::ClientFailure { status, message } => {
                warn!("API error on {} {}: {} {}", spec.method, spec.target, status, message)
            }
            RequestOutcome::NetworkFailure { message } => {
                warn!("Network failure on {} {}: {}", spec.method, spec.target, message)
            }
            RequestOutcome::AuthRequired => {
                warn!(
                    "{} {} requires re-authentication",
                    spec.method, spec.target
                )
            }
        }
        outcome
    }

    fn is_refresh_target(&self, target: &str) -> bool {
        self.dispatcher.url_for(target) == self.refresh_url
    }

    async fn run(&self, spec: &RequestSpec) -> RequestOutcome {
        // One refresh-and-retry per call at most.
        let mut retry_budget = spec.allow_auth_retry && !self.is_refresh_target(&spec.target);
        let mut bearer = spec
            .bearer_override
            .clone()
            .or_else(|| self.store.access_token());

        loop {
            let response = match self.dispatcher.send(spec, bearer.as_deref()).await {
                Ok(response) => response,
                Err(e) => {
                    debug!("Transport error on {} {}: {}", spec.method, spec.target, e);
                    return classify_transport_error(&e);
                }
            };

            let rejected = classify_status(response.status) == ResponseClass::AuthorizationFailure;
            if !rejected || !retry_budget {
                return classify_final(response.status, response.body);
            }
            retry_budget = false;

            debug!(
                "{} {} rejected the credential; obtaining a fresh one",
                spec.method, spec.target
            );
            match self.fresh_bearer(bearer.as_deref()).await {
                Ok(token) => bearer = Some(token),
                Err(reason) => {
                    debug!("Could not refresh credential: {}", reason);
                    return RequestOutcome::AuthRequired;
                }
            }
        }
    }

    /// A token to retry with after `rejected` was refused.
    ///
    /// If the store already holds a different token, another caller refreshed
    /// in the meantime and that token is used without a second exchange.
    async fn fresh_bearer(&self, rejected: Option<&str>) -> Result<String, String> {
        if let Some(current) = self.store.access_token() {
            if rejected != Some(current.as_str()) {
                debug!("Credential was rotated while the call was in flight; reusing it");
                return Ok(current);
            }
        }

        let credential = self.coordinator.ensure_fresh_credential().await?;
        credential
            .access_token
            .ok_or_else(|| "Refreshed credential carries no access token".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::Credential;
    use crate::refresh::HttpTokenExchanger;
    use crate::client::classifier::{INVALID_REQUEST_MESSAGE, TIMEOUT_MESSAGE};
    use mockito::Server;
    use reqwest::StatusCode;
    use std::time::Duration;

    const REFRESH_PATH: &str = "/api/v1/auth/refresh-tokens";

    fn executor(url: String, credential: Credential) -> RequestExecutor {
        executor_with_http(reqwest::Client::new(), url, credential)
    }

    fn executor_with_http(
        http: reqwest::Client,
        url: String,
        credential: Credential,
    ) -> RequestExecutor {
        let dispatcher = Dispatcher::new(http, url);
        let store = Arc::new(CredentialStore::with_credential(credential));
        let metrics = Metrics::new().unwrap();
        let exchanger = Arc::new(HttpTokenExchanger::new(dispatcher.clone(), REFRESH_PATH));
        let coordinator = RefreshCoordinator::new(store, exchanger, metrics.clone());
        RequestExecutor::new(dispatcher, coordinator, REFRESH_PATH, metrics)
    }

    #[tokio::test]
    async fn test_call_without_retry_flag_returns_401_as_client_failure() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/api/products")
            .with_status(401)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let executor = executor(server.url(), Credential::new("T1", "R1"));
        let outcome = executor
            .execute(RequestSpec::get("/api/products").without_auth_retry())
            .await;

        refresh.assert_async().await;
        assert_eq!(
            outcome,
            RequestOutcome::ClientFailure {
                status: StatusCode::UNAUTHORIZED,
                message: "API Request Failed".to_string()
            }
        );
        assert_eq!(executor.store().get(), Credential::new("T1", "R1"));
    }

    #[tokio::test]
    async fn test_refresh_endpoint_never_refreshes_itself() {
        let mut server = Server::new_async().await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .with_status(401)
            .expect(1)
            .create_async()
            .await;

        let executor = executor(server.url(), Credential::new("T1", "R1"));
        // The retry flag is left on; targeting the refresh path disables it anyway.
        let outcome = executor.execute(RequestSpec::post(REFRESH_PATH)).await;

        refresh.assert_async().await;
        assert_eq!(
            outcome.failure_kind(),
            Some(crate::client::FailureKind::Client)
        );
        assert!(!executor.coordinator().is_refreshing());
    }

    #[tokio::test]
    async fn test_outcomes_are_counted() {
        let mut server = Server::new_async().await;
        server
            .mock("GET", "/ok")
            .with_status(200)
            .create_async()
            .await;
        server
            .mock("GET", "/missing")
            .with_status(404)
            .create_async()
            .await;

        let executor = executor(server.url(), Credential::new("T1", "R1"));
        assert!(executor.execute(RequestSpec::get("/ok")).await.is_success());
        assert!(!executor.execute(RequestSpec::get("/missing")).await.is_success());

        assert_eq!(executor.metrics().request_count("success"), 1);
        assert_eq!(executor.metrics().request_count("client_failure"), 1);
    }

    /// The 401 handler rotates the stored credential, as a concurrent refresh would.
    async fn rotating_server(server: &mut Server, store: Arc<CredentialStore>) {
        server
            .mock("GET", "/api/messages")
            .match_header("authorization", "Bearer T1")
            .with_status(401)
            .with_body_from_request(move |_| {
                store.set(Credential::new("T2", "R2"));
                Vec::new()
            })
            .expect(1)
            .create_async()
            .await;
    }

    #[tokio::test]
    async fn test_rotated_credential_is_reused_without_exchange() {
        let mut server = Server::new_async().await;
        let executor = executor(server.url(), Credential::new("T1", "R1"));
        rotating_server(&mut server, executor.store().clone()).await;
        let retried = server
            .mock("GET", "/api/messages")
            .match_header("authorization", "Bearer T2")
            .with_status(200)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let outcome = executor.execute(RequestSpec::get("/api/messages")).await;

        assert!(outcome.is_success(), "unexpected outcome: {:?}", outcome);
        retried.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(executor.metrics().refresh_count("started"), 0);
    }

    #[tokio::test]
    async fn test_retry_with_rotated_credential_uses_up_the_budget() {
        let mut server = Server::new_async().await;
        let executor = executor(server.url(), Credential::new("T1", "R1"));
        rotating_server(&mut server, executor.store().clone()).await;
        let retried = server
            .mock("GET", "/api/messages")
            .match_header("authorization", "Bearer T2")
            .with_status(401)
            .expect(1)
            .create_async()
            .await;
        let refresh = server
            .mock("POST", REFRESH_PATH)
            .expect(0)
            .create_async()
            .await;

        let outcome = executor.execute(RequestSpec::get("/api/messages")).await;

        retried.assert_async().await;
        refresh.assert_async().await;
        assert_eq!(
            outcome,
            RequestOutcome::ClientFailure {
                status: StatusCode::UNAUTHORIZED,
                message: "API Request Failed".to_string()
            }
        );
        assert_eq!(executor.store().get(), Credential::new("T2", "R2"));
    }

    #[tokio::test]
    async fn test_slow_server_is_a_timeout_network_failure() {
        // Accepts the connection and never answers.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        tokio::spawn(async move {
            let _connection = listener.accept().await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        });

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .unwrap();
        let executor = executor_with_http(http, url, Credential::new("T1", "R1"));
        let outcome = executor.execute(RequestSpec::get("/api/messages")).await;

        assert_eq!(
            outcome,
            RequestOutcome::NetworkFailure {
                message: TIMEOUT_MESSAGE.to_string()
            }
        );
        assert_eq!(executor.metrics().refresh_count("started"), 0);
    }

    #[tokio::test]
    async fn test_unbuildable_request_is_not_reported_as_connectivity() {
        let mut server = Server::new_async().await;
        let messages = server
            .mock("GET", "/api/messages")
            .expect(0)
            .create_async()
            .await;

        let executor = executor(server.url(), Credential::new("T1", "R1"));
        let outcome = executor
            .execute(RequestSpec::get("/api/messages").header("bad header", "x"))
            .await;

        messages.assert_async().await;
        match outcome {
            RequestOutcome::NetworkFailure { message } => {
                assert!(message.starts_with(INVALID_REQUEST_MESSAGE), "unexpected message: {}", message)
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }
}
