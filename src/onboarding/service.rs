//! Onboarding persistence contracts.

use std::sync::Arc;

use async_trait::async_trait;

use super::model::{FormData, OnboardingStep};
use crate::auth::model::{AccessToken, User};
use crate::error::PersistenceError;

/// Saves the profile form at the end of each step.
#[async_trait]
pub trait StepPersistence: Send + Sync {
    async fn save_step(&self, step: OnboardingStep, payload: &FormData) -> Result<(), PersistenceError>;
}

/// Hands out step persistence bound to the signed-in session.
pub trait PersistenceProvider: Send + Sync {
    fn for_session(&self, token: &AccessToken, user: &User) -> Arc<dyn StepPersistence>;
}
