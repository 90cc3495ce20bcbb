//! The caller-facing side of the client: building requests, sending them with
//! the current credential attached, and classifying what came back.

pub mod classifier;
pub mod dispatch;
pub mod executor;
pub mod outcome;
pub mod request;

pub use classifier::FailureKind;
pub use dispatch::Dispatcher;
pub use executor::RequestExecutor;
pub use outcome::{Payload, RequestOutcome};
pub use request::{RequestBody, RequestSpec};
