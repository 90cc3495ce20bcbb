pub mod credential;
pub mod store;

// Re-export the primary credential items so code outside can do
// "use crate::credentials::{Credential, CredentialStore};"
pub use credential::Credential;
pub use store::{CredentialStore, SessionEvent};
