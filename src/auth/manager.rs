//! SessionManager — single writer of the session state.
//!
//! Owns the authenticated identity, restores it from the credential store at
//! startup, and publishes every transition through a `watch` channel so the
//! access guard and the UI always read a consistent `{token, user}` pair.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::model::{
    AccessToken, AuthActivity, AuthOperation, AuthResponse, Readiness, Registration, Session, User,
};
use super::service::AuthService;
use crate::config::ClientConfig;
use crate::credentials::{CredentialStore, keys};
use crate::error::{AuthError, StorageError};

/// Default bound on identity verification during `initialize()`.
const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(3);

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    auth: Arc<dyn AuthService>,
    state: watch::Sender<Session>,
    verify_cached_token: bool,
    init_timeout: Duration,
}

impl SessionManager {
    pub fn new(store: Arc<dyn CredentialStore>, auth: Arc<dyn AuthService>) -> Self {
        let (state, _rx) = watch::channel(Session::initializing());
        Self {
            store,
            auth,
            state,
            verify_cached_token: true,
            init_timeout: DEFAULT_INIT_TIMEOUT,
        }
    }

    pub fn from_config(
        store: Arc<dyn CredentialStore>,
        auth: Arc<dyn AuthService>,
        config: &ClientConfig,
    ) -> Self {
        Self::new(store, auth).with_token_verification(config.verify_cached_token, config.init_timeout)
    }

    /// Control whether a token without a cached user is verified remotely
    /// during `initialize()`, and how long that may take.
    pub fn with_token_verification(mut self, enabled: bool, timeout: Duration) -> Self {
        self.verify_cached_token = enabled;
        self.init_timeout = timeout;
        self
    }

    /// Subscribe to session transitions.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.state.subscribe()
    }

    /// Current session snapshot.
    pub fn snapshot(&self) -> Session {
        self.state.borrow().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    /// Restore the persisted session. Always ends in `Readiness::Ready`.
    pub async fn initialize(&self) -> Session {
        let restored = self.restore().await;

        self.state.send_modify(|session| {
            match restored {
                Some((token, user)) => session.establish(token, user),
                None => session.clear(),
            }
            session.set_readiness(Readiness::Ready);
        });

        let session = self.snapshot();
        match session.user() {
            Some(user) => info!(user_id = user.id, role = %user.role, "Session restored"),
            None => info!("No session to restore"),
        }
        session
    }

    /// Verify credentials with the auth service and open a session.
    ///
    /// On failure the prior state is left untouched.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<Session, AuthError> {
        let in_flight = self.begin(AuthOperation::Login)?;
        let result = self.auth.login(email, password).await;
        self.finish(AuthOperation::Login, in_flight, result)
    }

    /// Create an account and open a session for it.
    pub async fn register(&self, registration: &Registration) -> Result<Session, AuthError> {
        registration.validate()?;

        let in_flight = self.begin(AuthOperation::Register)?;
        let result = self
            .auth
            .register(registration)
            .await
            .and_then(|response| {
                if response.user.role != registration.role {
                    return Err(AuthError::service(format!(
                        "account created with role {} instead of {}",
                        response.user.role, registration.role
                    )));
                }
                Ok(response)
            });
        self.finish(AuthOperation::Register, in_flight, result)
    }

    /// Clear the session locally and notify the auth service in the background.
    ///
    /// Local state is cleared even if the notification fails. The returned
    /// handle resolves once the notification has been attempted.
    pub fn logout(&self) -> Option<JoinHandle<()>> {
        let token = self.state.borrow().token().cloned();

        self.purge();
        self.state.send_modify(Session::clear);
        info!("Logged out");

        let token = token?;
        let auth = Arc::clone(&self.auth);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => Some(handle.spawn(async move {
                if let Err(e) = auth.logout(&token).await {
                    warn!(error = %e, "Remote logout notification failed");
                }
            })),
            Err(_) => {
                debug!("No async runtime, skipping remote logout notification");
                None
            }
        }
    }

    // ── Internals ───────────────────────────────────────────────────

    /// Mark `op` in flight, or fail fast if another auth call is outstanding.
    fn begin(&self, op: AuthOperation) -> Result<InFlight<'_>, AuthError> {
        let mut busy = false;
        self.state.send_if_modified(|session| {
            if session.activity() != AuthActivity::Idle {
                busy = true;
                return false;
            }
            session.set_activity(AuthActivity::InFlight(op));
            true
        });

        if busy {
            debug!(operation = %op, "Rejected concurrent auth request");
            return Err(AuthError::Busy);
        }
        Ok(InFlight {
            state: &self.state,
            settled: false,
        })
    }

    fn finish(
        &self,
        op: AuthOperation,
        in_flight: InFlight<'_>,
        result: Result<AuthResponse, AuthError>,
    ) -> Result<Session, AuthError> {
        match result {
            Ok(AuthResponse { access_token, user }) => {
                self.persist(&access_token, &user);
                info!(operation = %op, user_id = user.id, role = %user.role, "Authenticated");
                in_flight.settle(|session| session.establish(access_token, user));
                Ok(self.snapshot())
            }
            Err(e) => {
                warn!(operation = %op, error = %e, "Authentication failed");
                drop(in_flight);
                Err(e)
            }
        }
    }

    async fn restore(&self) -> Option<(AccessToken, User)> {
        let token = match self.store.get(keys::TOKEN) {
            Ok(Some(token)) if !token.is_empty() => AccessToken::new(token),
            Ok(_) => {
                // A cached user without a token is stale.
                self.purge();
                return None;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read stored token");
                return None;
            }
        };

        match self.store.get(keys::USER_DATA) {
            Ok(Some(raw)) => match serde_json::from_str::<User>(&raw) {
                Ok(user) => Some((token, user)),
                Err(e) => {
                    let err = StorageError::Corrupted {
                        key: keys::USER_DATA.to_string(),
                        reason: e.to_string(),
                    };
                    warn!(error = %err, "Discarding stored session");
                    self.purge();
                    None
                }
            },
            Ok(None) => self.verify(token).await,
            Err(e) => {
                warn!(error = %e, "Failed to read cached user, discarding stored session");
                self.purge();
                None
            }
        }
    }

    /// Resolve a token that has no cached user, bounded by `init_timeout`.
    async fn verify(&self, token: AccessToken) -> Option<(AccessToken, User)> {
        if !self.verify_cached_token {
            debug!("Token without cached user and verification disabled");
            self.purge();
            return None;
        }

        match tokio::time::timeout(self.init_timeout, self.auth.current_user(&token)).await {
            Ok(Ok(user)) => {
                self.persist(&token, &user);
                Some((token, user))
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Stored token rejected");
                self.purge();
                None
            }
            Err(_) => {
                warn!(error = %AuthError::Timeout(self.init_timeout), "Token verification timed out");
                self.purge();
                None
            }
        }
    }

    fn persist(&self, token: &AccessToken, user: &User) {
        let user_json = match serde_json::to_string(user) {
            Ok(json) => json,
            Err(e) => {
                warn!(error = %e, "Failed to serialize user for credential store");
                return;
            }
        };
        if let Err(e) = self.store.set(keys::TOKEN, token.expose()) {
            warn!(error = %e, "Failed to persist token");
        }
        if let Err(e) = self.store.set(keys::USER_DATA, &user_json) {
            warn!(error = %e, "Failed to persist cached user");
        }
    }

    fn purge(&self) {
        for key in [keys::TOKEN, keys::USER_DATA] {
            if let Err(e) = self.store.remove(key) {
                warn!(key, error = %e, "Failed to purge credential");
            }
        }
    }
}

/// Clears the in-flight marker when dropped, whatever the outcome.
struct InFlight<'a> {
    state: &'a watch::Sender<Session>,
    settled: bool,
}

impl InFlight<'_> {
    /// Apply `f` and return to idle in one observable transition.
    fn settle(mut self, f: impl FnOnce(&mut Session)) {
        self.settled = true;
        self.state.send_modify(|session| {
            f(session);
            session.set_activity(AuthActivity::Idle);
        });
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if !self.settled {
            self.state
                .send_modify(|session| session.set_activity(AuthActivity::Idle));
        }
    }
}
