//! Portal — wires the session, guard, router and onboarding together.
//!
//! Owns the flows that cross components: the post-login redirect back to a
//! denied destination, guarded navigation, and opening the instructor
//! onboarding for the signed-in user. An open onboarding is bound to the
//! session that opened it and is closed when that session ends.

use std::sync::{Arc, Mutex};

use secrecy::SecretString;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::auth::{AuthService, Registration, Role, Session, SessionManager};
use crate::api::{HttpApi, MockApi};
use crate::config::{ClientConfig, RouteConfig};
use crate::credentials::FileCredentialStore;
use crate::error::{self, AuthError, PersistenceError};
use crate::guard::{AccessGuard, AccessRequirement, GuardDecision, NavigateOptions, Router, post_login_destination};
use crate::onboarding::{Advance, OnboardingWorkflow, PersistenceProvider, ValidationPolicy};
use crate::store::{DraftingProvider, LibSqlStepStore};

pub struct Portal {
    sessions: Arc<SessionManager>,
    router: Arc<dyn Router>,
    guard: AccessGuard,
    routes: RouteConfig,
    persistence: Arc<dyn PersistenceProvider>,
    policy: ValidationPolicy,
    onboarding: Mutex<Option<Arc<OnboardingWorkflow>>>,
}

impl Portal {
    pub fn new(
        sessions: Arc<SessionManager>,
        router: Arc<dyn Router>,
        persistence: Arc<dyn PersistenceProvider>,
        routes: RouteConfig,
    ) -> Self {
        Self {
            sessions,
            router,
            guard: AccessGuard::new(&routes),
            routes,
            persistence,
            policy: ValidationPolicy::default(),
            onboarding: Mutex::new(None),
        }
    }

    /// Wire a portal from configuration: the configured backend (HTTP or
    /// mock), local step drafts and the file credential store.
    pub async fn from_config(config: &ClientConfig, router: Arc<dyn Router>) -> error::Result<Self> {
        let (auth, remote) = match &config.api_base_url {
            Some(url) => single_backend(Arc::new(HttpApi::new(url.clone(), config.request_timeout)?)),
            None => single_backend(Arc::new(MockApi::new(config.mock_latency))),
        };

        let drafts = Arc::new(LibSqlStepStore::new_local(&config.drafts_db_path).await?);
        let persistence: Arc<dyn PersistenceProvider> = Arc::new(DraftingProvider::new(remote, drafts));

        let credentials = Arc::new(FileCredentialStore::open(config.credentials_path.clone())?);
        let sessions = Arc::new(SessionManager::from_config(credentials, auth, config));
        Ok(Self::new(sessions, router, persistence, config.routes.clone()))
    }

    pub fn with_validation_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn sessions(&self) -> &Arc<SessionManager> {
        &self.sessions
    }

    pub fn router(&self) -> &Arc<dyn Router> {
        &self.router
    }

    pub fn routes(&self) -> &RouteConfig {
        &self.routes
    }

    /// Protection on `path`, or `None` for public pages.
    pub fn requirement_for(&self, path: &str) -> Option<AccessRequirement> {
        if path == self.routes.onboarding {
            Some(AccessRequirement::roles([Role::Instructor]))
        } else if path == self.routes.landing {
            Some(AccessRequirement::authenticated())
        } else {
            None
        }
    }

    /// Navigate to `path` and run the guard on it.
    pub fn visit(&self, path: &str) -> GuardDecision {
        self.router.navigate(path, NavigateOptions::push());
        self.evaluate_current()
    }

    /// Guard the current path, redirecting if denied.
    ///
    /// Call again whenever the session changes while a `Pending` decision
    /// is on screen.
    pub fn evaluate_current(&self) -> GuardDecision {
        let path = self.router.current_path();
        match self.requirement_for(&path) {
            Some(requirement) => self
                .guard
                .enforce(&self.sessions.snapshot(), self.router.as_ref(), &requirement),
            None => {
                debug!(path = %path, "Public path");
                GuardDecision::Admit
            }
        }
    }

    /// Sign in, then return to the remembered destination or the landing page.
    ///
    /// The remembered destination is consumed only on success, so a failed
    /// attempt can be retried without losing it.
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<String, AuthError> {
        let session = self.sessions.login(email, password).await?;
        self.close_onboarding();
        let destination = post_login_destination(self.router.take_intent(), &self.routes.landing);
        info!(
            user_id = session.user().map(|u| u.id),
            path = %destination,
            "Signed in, redirecting"
        );
        self.router.navigate(&destination, NavigateOptions::replace());
        Ok(destination)
    }

    /// Create the account, then go to the landing page.
    pub async fn register(&self, registration: &Registration) -> Result<String, AuthError> {
        self.sessions.register(registration).await?;
        self.close_onboarding();
        let destination = self.routes.landing.clone();
        self.router.navigate(&destination, NavigateOptions::push());
        Ok(destination)
    }

    /// Clear the session, close any open onboarding and go home. The
    /// returned handle tracks the remote notification, which never affects
    /// the local outcome.
    pub fn logout(&self) -> Option<JoinHandle<()>> {
        self.close_onboarding();
        let notification = self.sessions.logout();
        self.router.navigate(&self.routes.home, NavigateOptions::push());
        notification
    }

    /// Navigate to the onboarding and, if admitted, start a fresh workflow
    /// bound to the signed-in user. A previously opened workflow is closed.
    pub fn open_onboarding(&self) -> Result<Arc<OnboardingWorkflow>, GuardDecision> {
        let decision = self.visit(&self.routes.onboarding);
        if decision != GuardDecision::Admit {
            return Err(decision);
        }
        let session = self.sessions.snapshot();
        let (Some(token), Some(user)) = (session.token(), session.user()) else {
            return Err(GuardDecision::Pending);
        };
        info!(user_id = user.id, "Onboarding opened");
        let persistence = self.persistence.for_session(token, user);
        let workflow = Arc::new(
            OnboardingWorkflow::new(persistence, self.routes.landing.clone()).with_policy(self.policy),
        );
        if let Some(previous) = self.lock_onboarding().replace(Arc::clone(&workflow)) {
            previous.close();
        }
        Ok(workflow)
    }

    /// Advance the workflow, following it to its destination on completion.
    ///
    /// Only the workflow opened for the current session may advance.
    pub async fn advance_onboarding(
        &self,
        workflow: &OnboardingWorkflow,
    ) -> Result<Advance, PersistenceError> {
        let current = self
            .lock_onboarding()
            .as_ref()
            .is_some_and(|active| std::ptr::eq(Arc::as_ptr(active), workflow));
        if !current {
            workflow.close();
            return Err(PersistenceError::SessionEnded);
        }
        let outcome = workflow.advance().await?;
        if let Advance::Completed { destination } = &outcome {
            self.router.navigate(destination, NavigateOptions::push());
        }
        Ok(outcome)
    }

    pub fn session(&self) -> Session {
        self.sessions.snapshot()
    }

    fn close_onboarding(&self) {
        if let Some(workflow) = self.lock_onboarding().take() {
            workflow.close();
        }
    }

    fn lock_onboarding(&self) -> std::sync::MutexGuard<'_, Option<Arc<OnboardingWorkflow>>> {
        self.onboarding.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Convenience for wiring a portal where one backend serves both contracts.
pub fn single_backend<B>(backend: Arc<B>) -> (Arc<dyn AuthService>, Arc<dyn PersistenceProvider>)
where
    B: AuthService + PersistenceProvider + 'static,
{
    let auth: Arc<dyn AuthService> = backend.clone();
    (auth, backend)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::MockApi;
    use crate::credentials::MemoryCredentialStore;
    use crate::guard::HistoryRouter;
    use crate::onboarding::OnboardingStep;

    fn portal(start: &str) -> (Portal, Arc<HistoryRouter>) {
        let (auth, persistence) = single_backend(Arc::new(MockApi::instant()));
        let sessions = Arc::new(SessionManager::new(Arc::new(MemoryCredentialStore::new()), auth));
        let router = Arc::new(HistoryRouter::new(start));
        let portal = Portal::new(sessions, router.clone(), persistence, RouteConfig::default());
        (portal, router)
    }

    fn password() -> SecretString {
        SecretString::from("secret1".to_string())
    }

    #[test]
    fn requirements_follow_route_table() {
        let (portal, _) = portal("/");
        assert_eq!(portal.requirement_for("/"), None);
        assert_eq!(portal.requirement_for("/login"), None);
        assert_eq!(
            portal.requirement_for("/dashboard"),
            Some(AccessRequirement::authenticated())
        );
        assert_eq!(
            portal.requirement_for("/dashboard/instructor/onboarding"),
            Some(AccessRequirement::roles([Role::Instructor]))
        );
    }

    #[tokio::test]
    async fn guard_is_pending_before_initialize() {
        let (portal, router) = portal("/");
        assert_eq!(portal.visit("/dashboard"), GuardDecision::Pending);
        assert_eq!(router.current_path(), "/dashboard");
    }

    #[tokio::test]
    async fn denied_visit_then_login_returns_to_destination() {
        let (portal, router) = portal("/");
        portal.sessions().initialize().await;

        let decision = portal.visit("/dashboard/instructor/onboarding");
        assert!(matches!(decision, GuardDecision::RedirectToLogin { .. }));
        assert_eq!(router.current_path(), "/login");

        let destination = portal.login("inst@tutorly.com", &password()).await.unwrap();
        assert_eq!(destination, "/dashboard/instructor/onboarding");
        assert_eq!(router.current_path(), "/dashboard/instructor/onboarding");
        assert_eq!(portal.evaluate_current(), GuardDecision::Admit);
    }

    #[tokio::test]
    async fn login_without_intent_lands_on_dashboard() {
        let (portal, router) = portal("/login");
        portal.sessions().initialize().await;
        portal.login("student@tutorly.com", &password()).await.unwrap();
        assert_eq!(router.current_path(), "/dashboard");
    }

    #[tokio::test]
    async fn open_onboarding_requires_instructor() {
        let (portal, router) = portal("/");
        portal.sessions().initialize().await;
        portal.login("student@tutorly.com", &password()).await.unwrap();

        let denied = portal.open_onboarding().unwrap_err();
        assert_eq!(denied, GuardDecision::RedirectHome);
        assert_eq!(router.current_path(), "/");
    }

    #[tokio::test]
    async fn completed_onboarding_navigates_to_dashboard() {
        let (portal, router) = portal("/");
        portal.sessions().initialize().await;
        portal.login("inst@tutorly.com", &password()).await.unwrap();

        let workflow = portal.open_onboarding().unwrap();
        assert_eq!(workflow.current_step(), OnboardingStep::About);
        for _ in 1..crate::onboarding::STEP_COUNT {
            portal.advance_onboarding(&workflow).await.unwrap();
        }
        let outcome = portal.advance_onboarding(&workflow).await.unwrap();
        assert!(matches!(outcome, Advance::Completed { .. }));
        assert_eq!(router.current_path(), "/dashboard");
    }

    #[tokio::test]
    async fn logout_goes_home() {
        let (portal, router) = portal("/");
        portal.sessions().initialize().await;
        portal.login("student@tutorly.com", &password()).await.unwrap();

        if let Some(handle) = portal.logout() {
            handle.await.unwrap();
        }
        assert!(!portal.session().is_authenticated());
        assert_eq!(router.current_path(), "/");
        assert!(matches!(portal.visit("/dashboard"), GuardDecision::RedirectToLogin { .. }));
    }

    #[tokio::test]
    async fn logout_closes_open_onboarding() {
        let (portal, _) = portal("/");
        portal.sessions().initialize().await;
        portal.login("inst@tutorly.com", &password()).await.unwrap();

        let workflow = portal.open_onboarding().unwrap();
        workflow.update(crate::onboarding::FieldUpdate::Country("UK".into()));
        portal.advance_onboarding(&workflow).await.unwrap();

        portal.logout();
        assert!(workflow.is_closed());
        assert_eq!(workflow.current_step(), OnboardingStep::About);
        let err = portal.advance_onboarding(&workflow).await.unwrap_err();
        assert!(matches!(err, PersistenceError::SessionEnded));
        assert_eq!(workflow.current_step(), OnboardingStep::About);
    }

    #[tokio::test]
    async fn reopening_closes_the_previous_workflow() {
        let (portal, _) = portal("/");
        portal.sessions().initialize().await;
        portal.login("inst@tutorly.com", &password()).await.unwrap();

        let first = portal.open_onboarding().unwrap();
        let second = portal.open_onboarding().unwrap();
        assert!(first.is_closed());
        assert!(!second.is_closed());
        assert!(matches!(
            portal.advance_onboarding(&first).await,
            Err(PersistenceError::SessionEnded)
        ));
        assert!(portal.advance_onboarding(&second).await.is_ok());
    }

    #[tokio::test]
    async fn from_config_wires_mock_backend_and_local_stores() {
        let dir = tempfile::tempdir().unwrap();
        let config = ClientConfig {
            credentials_path: dir.path().join("credentials.json"),
            drafts_db_path: dir.path().join("drafts.db"),
            mock_latency: std::time::Duration::ZERO,
            ..ClientConfig::default()
        };
        let router = Arc::new(HistoryRouter::new("/"));
        let portal = Portal::from_config(&config, router).await.unwrap();

        portal.sessions().initialize().await;
        portal.login("inst@tutorly.com", &password()).await.unwrap();
        assert!(dir.path().join("credentials.json").exists());
        assert!(dir.path().join("drafts.db").exists());
    }
}
