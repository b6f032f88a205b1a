//! Backends implementing the auth service and step persistence contracts.

pub mod http;
pub mod mock;

pub use http::{HttpApi, HttpStepSaver};
pub use mock::MockApi;
