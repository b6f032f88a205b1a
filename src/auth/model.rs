//! Session and identity data models.

use std::sync::LazyLock;

use regex::Regex;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::AuthError;

/// Minimum password length accepted at registration.
pub const MIN_PASSWORD_LEN: usize = 6;

static EMAIL_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap());

/// Account role. Fixed at registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Instructor,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Student => write!(f, "student"),
            Self::Instructor => write!(f, "instructor"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "instructor" => Ok(Self::Instructor),
            other => Err(format!("unknown role: {other}")),
        }
    }
}

/// Account status as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UserStatus {
    #[default]
    Active,
    Pending,
    Suspended,
    #[serde(other)]
    Unknown,
}

/// Identity record of the authenticated actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub email: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub status: UserStatus,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
            .trim()
            .to_string()
    }
}

/// Opaque access token. Debug output is redacted.
pub struct AccessToken(SecretString);

impl AccessToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(SecretString::from(token.into()))
    }

    /// The raw token, for transport headers and the credential store only.
    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

impl Clone for AccessToken {
    fn clone(&self) -> Self {
        Self::new(self.expose().to_owned())
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AccessToken([REDACTED])")
    }
}

impl PartialEq for AccessToken {
    fn eq(&self, other: &Self) -> bool {
        self.expose() == other.expose()
    }
}

/// Successful login/registration result from the auth service.
#[derive(Debug, Clone)]
pub struct AuthResponse {
    pub access_token: AccessToken,
    pub user: User,
}

/// Account-creation input.
#[derive(Debug)]
pub struct Registration {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub password: SecretString,
    pub role: Role,
}

impl Registration {
    pub fn new(
        first_name: impl Into<String>,
        last_name: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: Role,
    ) -> Self {
        Self {
            first_name: first_name.into(),
            last_name: last_name.into(),
            email: email.into(),
            password: SecretString::from(password.into()),
            role,
        }
    }

    /// Client-side checks run before the auth service is contacted.
    pub fn validate(&self) -> Result<(), AuthError> {
        if self.first_name.trim().is_empty() {
            return Err(AuthError::validation("first_name", "is required"));
        }
        if self.last_name.trim().is_empty() {
            return Err(AuthError::validation("last_name", "is required"));
        }
        if !EMAIL_PATTERN.is_match(self.email.trim()) {
            return Err(AuthError::validation("email", "is not a valid address"));
        }
        if self.password.expose_secret().chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::validation(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }
        Ok(())
    }
}

/// Whether the persisted session has been consulted yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Readiness {
    #[default]
    Initializing,
    Ready,
}

/// Auth operation that can be in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOperation {
    Login,
    Register,
}

impl std::fmt::Display for AuthOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Login => write!(f, "login"),
            Self::Register => write!(f, "register"),
        }
    }
}

/// Async boundary state for login/register: `idle → in-flight → idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthActivity {
    #[default]
    Idle,
    InFlight(AuthOperation),
}

/// Snapshot of the authenticated-identity state.
///
/// `token` and `user` are only ever set or cleared together, so
/// `is_authenticated()` is exactly `user().is_some()`.
#[derive(Debug, Clone, Default)]
pub struct Session {
    token: Option<AccessToken>,
    user: Option<User>,
    readiness: Readiness,
    activity: AuthActivity,
}

impl Session {
    /// Empty session at process start.
    pub fn initializing() -> Self {
        Self::default()
    }

    /// Resolved session with no identity.
    pub fn anonymous() -> Self {
        Self {
            readiness: Readiness::Ready,
            ..Self::default()
        }
    }

    /// Resolved session for `user`.
    pub fn authenticated(token: AccessToken, user: User) -> Self {
        Self {
            token: Some(token),
            user: Some(user),
            readiness: Readiness::Ready,
            activity: AuthActivity::Idle,
        }
    }

    pub fn token(&self) -> Option<&AccessToken> {
        self.token.as_ref()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn role(&self) -> Option<Role> {
        self.user.as_ref().map(|u| u.role)
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn activity(&self) -> AuthActivity {
        self.activity
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// True while the session is unresolved or an auth request is in flight.
    /// Routing decisions must wait while this holds.
    pub fn is_loading(&self) -> bool {
        self.readiness == Readiness::Initializing || self.activity != AuthActivity::Idle
    }

    pub(crate) fn establish(&mut self, token: AccessToken, user: User) {
        self.token = Some(token);
        self.user = Some(user);
    }

    pub(crate) fn clear(&mut self) {
        self.token = None;
        self.user = None;
    }

    pub(crate) fn set_readiness(&mut self, readiness: Readiness) {
        self.readiness = readiness;
    }

    pub(crate) fn set_activity(&mut self, activity: AuthActivity) {
        self.activity = activity;
    }
}

#[cfg(test)]
pub(crate) fn test_user(id: u64, role: Role) -> User {
    User {
        id,
        email: format!("user{id}@tutorly.test"),
        role,
        first_name: "Alex".to_string(),
        last_name: "Morgan".to_string(),
        status: UserStatus::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_serde_matches_display() {
        for role in [Role::Student, Role::Instructor] {
            let json = serde_json::to_string(&role).unwrap();
            assert_eq!(json, format!("\"{role}\""));
            assert_eq!(role.to_string().parse::<Role>().unwrap(), role);
        }
        assert!("admin".parse::<Role>().is_err());
    }

    #[test]
    fn user_parses_backend_shape() {
        let json = r#"{
            "id": 1,
            "email": "demo@tutorly.com",
            "role": "instructor",
            "first_name": "Alex",
            "last_name": "Morgan",
            "status": "active"
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.role, Role::Instructor);
        assert_eq!(user.status, UserStatus::Active);
        assert_eq!(user.full_name(), "Alex Morgan");
    }

    #[test]
    fn unknown_status_does_not_fail_parsing() {
        let json = r#"{"id":2,"email":"a@b.c","role":"student","first_name":"A","last_name":"B","status":"archived"}"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.status, UserStatus::Unknown);
    }

    #[test]
    fn access_token_debug_is_redacted() {
        let token = AccessToken::new("super-secret");
        assert!(!format!("{token:?}").contains("super-secret"));
        assert_eq!(token.clone().expose(), "super-secret");
    }

    #[test]
    fn registration_validation() {
        let ok = Registration::new("Ada", "Lovelace", "ada@example.com", "hunter22", Role::Student);
        assert!(ok.validate().is_ok());

        let cases = [
            (Registration::new(" ", "L", "a@b.co", "secret1", Role::Student), "first_name"),
            (Registration::new("A", "", "a@b.co", "secret1", Role::Student), "last_name"),
            (Registration::new("A", "L", "not-an-email", "secret1", Role::Student), "email"),
            (Registration::new("A", "L", "a@b.co", "short", Role::Instructor), "password"),
        ];
        for (registration, expected_field) in cases {
            match registration.validate() {
                Err(AuthError::Validation { field, .. }) => assert_eq!(field, expected_field),
                other => panic!("expected validation error on {expected_field}, got {other:?}"),
            }
        }
    }

    #[test]
    fn session_authentication_tracks_user() {
        let mut session = Session::initializing();
        assert!(session.is_loading());
        assert!(!session.is_authenticated());

        session.set_readiness(Readiness::Ready);
        assert!(!session.is_loading());

        session.establish(AccessToken::new("t"), test_user(1, Role::Student));
        assert!(session.is_authenticated());
        assert!(session.token().is_some());
        assert_eq!(session.role(), Some(Role::Student));

        session.clear();
        assert!(!session.is_authenticated());
        assert!(session.token().is_none());
    }

    #[test]
    fn in_flight_activity_counts_as_loading() {
        let mut session = Session::anonymous();
        session.set_activity(AuthActivity::InFlight(AuthOperation::Login));
        assert!(session.is_loading());
    }
}
