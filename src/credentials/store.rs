use std::sync::{PoisonError, RwLock};

use tokio::sync::broadcast;
use tracing::{debug, info};

use super::Credential;

const SESSION_EVENT_CAPACITY: usize = 16;

/// Session transitions observable by the surrounding application
/// (redirect to login, drop cached profile data, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionEvent {
    /// A credential was stored, by login or by a successful refresh.
    Authenticated,
    /// The credential was cleared on request (logout).
    SignedOut,
    /// A refresh could not produce a usable credential; the user must log in again.
    ReauthenticationRequired,
}

/// Holder of the single access/refresh pair used by a client.
///
/// Readers always see a complete pair: the whole credential is replaced under
/// one write lock and `get` clones it under one read lock.
pub struct CredentialStore {
    credential: RwLock<Credential>,
    events: broadcast::Sender<SessionEvent>,
}

impl CredentialStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::with_credential(Credential::default())
    }

    pub fn with_credential(credential: Credential) -> Self {
        let (events, _) = broadcast::channel(SESSION_EVENT_CAPACITY);
        CredentialStore {
            credential: RwLock::new(credential),
            events,
        }
    }

    /// Returns a copy of the current credential (empty when unauthenticated).
    pub fn get(&self) -> Credential {
        self.credential
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn access_token(&self) -> Option<String> {
        self.get().access_token
    }

    pub fn refresh_token(&self) -> Option<String> {
        self.get().refresh_token
    }

    /// Replaces the stored credential.
    pub fn set(&self, credential: Credential) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = credential;
        debug!("Credential stored");
        self.emit(SessionEvent::Authenticated);
    }

    /// Drops both tokens.
    pub fn clear(&self) {
        self.reset();
        info!("Credential cleared");
        self.emit(SessionEvent::SignedOut);
    }

    /// Drops both tokens after a failed refresh and tells subscribers to force a new login.
    pub(crate) fn expire(&self) {
        self.reset();
        info!("Credential expired; re-authentication required");
        self.emit(SessionEvent::ReauthenticationRequired);
    }

    /// Subscribes to session transitions. Events sent before subscribing are not replayed.
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    fn reset(&self) {
        *self
            .credential
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Credential::default();
    }

    fn emit(&self, event: SessionEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::new()
    }
}
