use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use super::exchange::TokenExchanger;
use crate::credentials::{Credential, CredentialStore};
use crate::metrics::{Metrics, MetricsRecorder};
use crate::utils::log_throttle::should_emit;

const JOIN_LOG_WINDOW: Duration = Duration::from_secs(10);

/// `Err(reason)` means the session cannot be refreshed and the user must log in again.
pub type RefreshResult = Result<Credential, String>;

enum RefreshState {
    Idle,
    /// Everyone waiting on the running exchange, initiator included.
    InFlight {
        waiters: Vec<oneshot::Sender<RefreshResult>>,
    },
}

/// Runs at most one token exchange at a time and hands its result to every
/// caller that asked for a fresh credential while it was running.
///
/// The exchange runs on its own task: callers that give up waiting are simply
/// dropped from the queue, the exchange itself always runs to completion.
#[derive(Clone)]
pub struct RefreshCoordinator {
    store: Arc<CredentialStore>,
    exchanger: Arc<dyn TokenExchanger>,
    state: Arc<Mutex<RefreshState>>,
    metrics: Metrics,
}

impl RefreshCoordinator {
    pub fn new(
        store: Arc<CredentialStore>,
        exchanger: Arc<dyn TokenExchanger>,
        metrics: Metrics,
    ) -> Self {
        info!(
            "Creating refresh coordinator with '{}' token exchanger",
            exchanger.get_name()
        );
        RefreshCoordinator {
            store,
            exchanger,
            state: Arc::new(Mutex::new(RefreshState::Idle)),
            metrics,
        }
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    pub fn is_refreshing(&self) -> bool {
        matches!(*self.lock_state(), RefreshState::InFlight { .. })
    }

    /// Number of callers still waiting on the running exchange.
    pub fn pending_waiters(&self) -> usize {
        match &*self.lock_state() {
            RefreshState::Idle => 0,
            RefreshState::InFlight { waiters } => {
                waiters.iter().filter(|w| !w.is_closed()).count()
            }
        }
    }

    /// Produces a fresh credential, starting a token exchange or joining the
    /// one already running.
    ///
    /// On failure the store has been cleared and subscribers were told to
    /// force a new login. Without a refresh token no exchange is attempted.
    pub async fn ensure_fresh_credential(&self) -> RefreshResult {
        let receiver = self.enqueue()?;
        receiver
            .await
            .unwrap_or_else(|_| Err("Token refresh ended without a result".to_string()))
    }

    fn lock_state(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn enqueue(&self) -> Result<oneshot::Receiver<RefreshResult>, String> {
        let (sender, receiver) = oneshot::channel();
        let mut state = self.lock_state();

        if let RefreshState::InFlight { waiters } = &mut *state {
            // Waiters whose callers were cancelled are dropped here.
            waiters.retain(|w| !w.is_closed());
            waiters.push(sender);
            let queued = waiters.len();
            drop(state);

            self.metrics.record_refresh("joined");
            if let Some(suppressed_count) = should_emit("refresh.join", JOIN_LOG_WINDOW) {
                debug!(
                    event_name = "refresh.join",
                    event_domain = "refresh",
                    queued,
                    suppressed_count,
                    "joined in-flight token refresh"
                );
            }
            return Ok(receiver);
        }

        let Some(refresh_token) = self.store.refresh_token() else {
            drop(state);
            self.metrics.record_refresh("skipped");
            warn!(
                event_name = "refresh.skipped",
                event_domain = "refresh",
                "no refresh token available; re-authentication required"
            );
            self.store.expire();
            return Err("No refresh token available".to_string());
        };

        *state = RefreshState::InFlight {
            waiters: vec![sender],
        };
        drop(state);

        self.metrics.record_refresh("started");
        info!(
            event_name = "refresh.start",
            event_domain = "refresh",
            exchanger = self.exchanger.get_name(),
            "starting token refresh"
        );
        self.spawn_exchange(refresh_token);
        Ok(receiver)
    }

    fn spawn_exchange(&self, refresh_token: String) {
        let coordinator = self.clone();
        let guard = SettleOnDrop {
            coordinator: Some(self.clone()),
        };
        tokio::spawn(async move {
            let started = Instant::now();
            let result = AssertUnwindSafe(coordinator.exchanger.exchange(&refresh_token))
                .catch_unwind()
                .await
                .unwrap_or_else(|_| Err("Token exchanger panicked".to_string()));
            coordinator
                .metrics
                .record_refresh_duration(started.elapsed().as_secs_f64());
            guard.settle(result);
        });
    }

    /// Publishes the exchange result: store first, then release every waiter.
    fn settle(&self, result: RefreshResult) {
        match &result {
            Ok(credential) => {
                self.store.set(credential.clone());
                self.metrics.record_refresh("success");
                info!(
                    event_name = "refresh.success",
                    event_domain = "refresh",
                    "token refresh succeeded"
                );
            }
            Err(reason) => {
                self.store.expire();
                self.metrics.record_refresh("failure");
                warn!(
                    event_name = "refresh.failure",
                    event_domain = "refresh",
                    reason = reason.as_str(),
                    "token refresh failed; re-authentication required"
                );
            }
        }

        // Taking the queue and going Idle happen under one lock, so nobody can
        // join a refresh whose result is already being handed out.
        let waiters = match std::mem::replace(&mut *self.lock_state(), RefreshState::Idle) {
            RefreshState::InFlight { waiters } => waiters,
            RefreshState::Idle => Vec::new(),
        };

        let released = waiters.len();
        for waiter in waiters {
            // A closed receiver belongs to a caller that stopped waiting.
            let _ = waiter.send(result.clone());
        }
        debug!("Released {} refresh waiter(s)", released);
    }
}

/// Settles the refresh as failed if the exchange task is dropped before it
/// finishes (e.g. its runtime shut down), so the coordinator never stays
/// `InFlight` with waiters nobody will answer.
struct SettleOnDrop {
    coordinator: Option<RefreshCoordinator>,
}

impl SettleOnDrop {
    fn settle(mut self, result: RefreshResult) {
        if let Some(coordinator) = self.coordinator.take() {
            coordinator.settle(result);
        }
    }
}

impl Drop for SettleOnDrop {
    fn drop(&mut self) {
        if let Some(coordinator) = self.coordinator.take() {
            warn!("Token refresh task dropped before finishing");
            coordinator.settle(Err("Token refresh was abandoned".to_string()));
        }
    }
}
