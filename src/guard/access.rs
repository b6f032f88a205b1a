//! Access guard — decides whether a protected destination may render.

use tracing::debug;

use super::router::{NavigateOptions, NavigationIntent, Router};
use crate::auth::{Role, Session};
use crate::config::RouteConfig;

/// What a protected destination demands of the session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccessRequirement {
    roles: Option<Vec<Role>>,
}

impl AccessRequirement {
    /// Any authenticated user.
    pub fn authenticated() -> Self {
        Self::default()
    }

    /// Authenticated user holding one of `roles`.
    pub fn roles(roles: impl IntoIterator<Item = Role>) -> Self {
        Self {
            roles: Some(roles.into_iter().collect()),
        }
    }

    pub fn permits(&self, role: Role) -> bool {
        self.roles.as_ref().is_none_or(|roles| roles.contains(&role))
    }
}

/// Outcome of one guard evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    /// Session not resolved yet. Render a neutral placeholder, do not route.
    Pending,
    /// Not authenticated. Go to login, remembering where the user wanted to go.
    RedirectToLogin { intent: NavigationIntent },
    /// Authenticated but lacking the role. Go home, silently.
    RedirectHome,
    /// Render the protected content.
    Admit,
}

impl GuardDecision {
    pub fn is_redirect(&self) -> bool {
        matches!(self, Self::RedirectToLogin { .. } | Self::RedirectHome)
    }
}

#[derive(Debug, Clone)]
pub struct AccessGuard {
    login_path: String,
    home_path: String,
}

impl AccessGuard {
    pub fn new(routes: &RouteConfig) -> Self {
        Self {
            login_path: routes.login.clone(),
            home_path: routes.home.clone(),
        }
    }

    /// Pure decision for `requested_path` under `session`.
    pub fn evaluate(
        &self,
        session: &Session,
        requested_path: &str,
        requirement: &AccessRequirement,
    ) -> GuardDecision {
        if session.is_loading() {
            return GuardDecision::Pending;
        }

        let Some(user) = session.user() else {
            return GuardDecision::RedirectToLogin {
                intent: NavigationIntent::new(requested_path),
            };
        };

        if !requirement.permits(user.role) {
            return GuardDecision::RedirectHome;
        }

        GuardDecision::Admit
    }

    /// Evaluate the router's current path and carry out any redirect.
    ///
    /// Redirects replace the denied entry so going back does not return to it.
    pub fn enforce(
        &self,
        session: &Session,
        router: &dyn Router,
        requirement: &AccessRequirement,
    ) -> GuardDecision {
        let path = router.current_path();
        let decision = self.evaluate(session, &path, requirement);
        debug!(path = %path, decision = ?decision, "Guard evaluated");

        match &decision {
            GuardDecision::RedirectToLogin { intent } => router.navigate(
                &self.login_path,
                NavigateOptions::replace().with_intent(intent.clone()),
            ),
            GuardDecision::RedirectHome => router.navigate(&self.home_path, NavigateOptions::replace()),
            GuardDecision::Pending | GuardDecision::Admit => {}
        }
        decision
    }
}

/// Where to go after a successful login: the remembered path, else `landing`.
pub fn post_login_destination(intent: Option<NavigationIntent>, landing: &str) -> String {
    intent
        .map(|i| i.requested_path)
        .filter(|path| !path.is_empty())
        .unwrap_or_else(|| landing.to_string())
}
