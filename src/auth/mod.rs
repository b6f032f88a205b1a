//! Session and authentication lifecycle.
//!
//! `SessionManager` is the only writer of the session. Everything else reads
//! snapshots or subscribes to transitions.

pub mod manager;
pub mod model;
pub mod service;

pub use manager::SessionManager;
pub use model::{
    AccessToken, AuthActivity, AuthOperation, AuthResponse, Readiness, Registration, Role, Session,
    User, UserStatus,
};
pub use service::AuthService;
