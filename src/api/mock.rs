//! In-process demo backend with simulated latency.
//!
//! Accepts any credentials. Emails containing `inst` sign in as
//! instructors, everyone else as students.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use rand::Rng;
use secrecy::SecretString;
use tracing::{debug, info};

use crate::auth::model::{AccessToken, AuthResponse, Registration, Role, User, UserStatus};
use crate::auth::service::AuthService;
use crate::error::{AuthError, PersistenceError};
use crate::onboarding::model::{FormData, OnboardingStep};
use crate::onboarding::service::{PersistenceProvider, StepPersistence};

/// Default round-trip delay for auth calls.
pub const DEFAULT_MOCK_LATENCY: Duration = Duration::from_millis(800);

/// Upper bound (exclusive) of ids handed out at registration.
const MAX_REGISTERED_ID: u64 = 1000;

/// Demo backend for both the auth service and step persistence.
#[derive(Debug, Clone)]
pub struct MockApi {
    latency: Duration,
    save_latency: Duration,
}

impl Default for MockApi {
    fn default() -> Self {
        Self::new(DEFAULT_MOCK_LATENCY)
    }
}

impl MockApi {
    /// Auth calls take `latency`; step saves take five eighths of it.
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            save_latency: latency * 5 / 8,
        }
    }

    /// No simulated delay.
    pub fn instant() -> Self {
        Self::new(Duration::ZERO)
    }

    fn demo_user() -> User {
        User {
            id: 1,
            email: "demo@tutorly.com".to_string(),
            role: Role::Student,
            first_name: "Alex".to_string(),
            last_name: "Morgan".to_string(),
            status: UserStatus::Active,
        }
    }

    fn issue_token() -> AccessToken {
        AccessToken::new(format!("mock_jwt_token_{}", Utc::now().timestamp_millis()))
    }

    async fn pause(duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}

#[async_trait]
impl AuthService for MockApi {
    async fn login(&self, email: &str, _password: &SecretString) -> Result<AuthResponse, AuthError> {
        Self::pause(self.latency).await;
        let role = if email.contains("inst") {
            Role::Instructor
        } else {
            Role::Student
        };
        debug!(role = %role, "Mock login");
        Ok(AuthResponse {
            access_token: Self::issue_token(),
            user: User {
                email: email.to_string(),
                role,
                ..Self::demo_user()
            },
        })
    }

    async fn register(&self, registration: &Registration) -> Result<AuthResponse, AuthError> {
        Self::pause(self.latency).await;
        let id = rand::thread_rng().gen_range(0..MAX_REGISTERED_ID);
        debug!(user_id = id, role = %registration.role, "Mock registration");
        Ok(AuthResponse {
            access_token: Self::issue_token(),
            user: User {
                id,
                email: registration.email.clone(),
                role: registration.role,
                first_name: registration.first_name.clone(),
                last_name: registration.last_name.clone(),
                status: UserStatus::Active,
            },
        })
    }

    async fn current_user(&self, _token: &AccessToken) -> Result<User, AuthError> {
        Self::pause(self.latency / 2).await;
        Ok(Self::demo_user())
    }

    async fn logout(&self, _token: &AccessToken) -> Result<(), AuthError> {
        Self::pause(self.latency / 4).await;
        Ok(())
    }
}

#[async_trait]
impl StepPersistence for MockApi {
    async fn save_step(&self, step: OnboardingStep, payload: &FormData) -> Result<(), PersistenceError> {
        Self::pause(self.save_latency).await;
        info!(
            step = step.index(),
            country = %payload.country,
            subjects = payload.subjects.len(),
            "Saved onboarding step"
        );
        Ok(())
    }
}

impl PersistenceProvider for MockApi {
    fn for_session(&self, _token: &AccessToken, _user: &User) -> Arc<dyn StepPersistence> {
        Arc::new(self.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn password() -> SecretString {
        SecretString::from("hunter22".to_string())
    }

    #[tokio::test]
    async fn login_role_follows_email() {
        let api = MockApi::instant();
        let inst = api.login("inst@example.com", &password()).await.unwrap();
        assert_eq!(inst.user.role, Role::Instructor);
        assert_eq!(inst.user.email, "inst@example.com");

        let student = api.login("s@example.com", &password()).await.unwrap();
        assert_eq!(student.user.role, Role::Student);
        assert_eq!(student.user.first_name, "Alex");
    }

    #[tokio::test]
    async fn tokens_are_mock_jwts() {
        let api = MockApi::instant();
        let resp = api.login("a@b.co", &password()).await.unwrap();
        let token = resp.access_token.expose();
        let millis = token.strip_prefix("mock_jwt_token_").unwrap();
        assert!(millis.parse::<i64>().unwrap() > 0);
    }

    #[tokio::test]
    async fn register_echoes_fields_with_small_id() {
        let api = MockApi::instant();
        let registration = Registration::new("Sam", "Lee", "sam@example.com", "secret1", Role::Instructor);
        let resp = api.register(&registration).await.unwrap();
        assert!(resp.user.id < MAX_REGISTERED_ID);
        assert_eq!(resp.user.role, Role::Instructor);
        assert_eq!(resp.user.full_name(), "Sam Lee");
        assert_eq!(resp.user.email, "sam@example.com");
    }

    #[tokio::test]
    async fn save_step_succeeds() {
        let api = MockApi::instant();
        api.save_step(OnboardingStep::About, &FormData::default())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn latency_is_simulated() {
        let api = MockApi::new(Duration::from_millis(80));
        let started = std::time::Instant::now();
        api.save_step(OnboardingStep::About, &FormData::default())
            .await
            .unwrap();
        assert!(started.elapsed() >= Duration::from_millis(50));

        let started = std::time::Instant::now();
        api.login("a@b.co", &password()).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(80));
    }
}
