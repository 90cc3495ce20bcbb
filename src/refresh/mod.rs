pub mod coordinator;
pub mod exchange;

// Re-export from coordinator.rs and exchange.rs so we can do "use crate::refresh::*;"
pub use coordinator::{RefreshCoordinator, RefreshResult};
pub use exchange::{HttpTokenExchanger, TokenExchanger};
