//! Library exports for authclient, shared between the binary and tests.

pub mod client;
pub mod config;
pub mod credentials;
pub mod metrics;
pub mod refresh;
pub mod startup;
pub mod utils;
