//! Auth service contract — the remote side of login, registration and logout.

use async_trait::async_trait;
use secrecy::SecretString;

use super::model::{AccessToken, AuthResponse, Registration, User};
use crate::error::AuthError;

/// Remote authentication backend.
#[async_trait]
pub trait AuthService: Send + Sync {
    /// Verify credentials and open a session.
    async fn login(&self, email: &str, password: &SecretString) -> Result<AuthResponse, AuthError>;

    /// Create an account with the caller-supplied role and open a session.
    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AuthError>;

    /// Resolve the identity behind a token.
    async fn current_user(&self, token: &AccessToken) -> Result<User, AuthError>;

    /// Best-effort server-side session teardown.
    async fn logout(&self, token: &AccessToken) -> Result<(), AuthError>;
}
