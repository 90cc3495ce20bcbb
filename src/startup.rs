//! Client construction from configuration.
//!
//! Wires the credential store, token exchanger, refresh coordinator and
//! request executor together so they all share one store and one registry.

use std::sync::Arc;

use tracing::info;

use crate::client::{Dispatcher, RequestExecutor};
use crate::config::ConfigV1;
use crate::credentials::{Credential, CredentialStore};
use crate::metrics::Metrics;
use crate::refresh::{HttpTokenExchanger, RefreshCoordinator};

/// Builds a ready-to-use executor.
///
/// The store is seeded from `config.credentials`; it starts empty when none are given.
///
/// # Errors
///
/// Returns an error if the HTTP client or the metrics registry cannot be built.
pub fn build_executor(config: &ConfigV1) -> Result<RequestExecutor, String> {
    let metrics = Metrics::new()?;
    let dispatcher = Dispatcher::from_config(&config.client)?;

    let credential = Credential::from(&config.credentials);
    if credential.is_empty() {
        info!("Starting without credentials");
    } else {
        info!("Seeding credential store from configuration");
    }
    let store = Arc::new(CredentialStore::with_credential(credential));

    let exchanger = Arc::new(HttpTokenExchanger::new(
        dispatcher.clone(),
        config.client.refresh_path.clone(),
    ));
    let coordinator = RefreshCoordinator::new(store, exchanger, metrics.clone());

    Ok(RequestExecutor::new(
        dispatcher,
        coordinator,
        &config.client.refresh_path,
        metrics,
    ))
}
