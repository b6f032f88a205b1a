//! Step persistence backed by the local draft store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;

use super::libsql_backend::LibSqlStepStore;
use crate::auth::model::{AccessToken, User};
use crate::error::PersistenceError;
use crate::onboarding::model::{FormData, OnboardingStep};
use crate::onboarding::service::{PersistenceProvider, StepPersistence};

/// The draft store scoped to one user.
#[derive(Clone)]
pub struct UserDrafts {
    store: Arc<LibSqlStepStore>,
    user_id: String,
}

impl UserDrafts {
    pub fn new(store: Arc<LibSqlStepStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn store(&self) -> &LibSqlStepStore {
        &self.store
    }
}

#[async_trait]
impl StepPersistence for UserDrafts {
    async fn save_step(&self, step: OnboardingStep, payload: &FormData) -> Result<(), PersistenceError> {
        self.store
            .save_step(&self.user_id, step, payload)
            .await
            .map_err(|e| PersistenceError::SaveFailed {
                step: step.index(),
                reason: e.to_string(),
            })
    }
}

/// Saves remotely, then keeps a local draft of each successful save.
///
/// The remote result decides the outcome. A failed local write is logged
/// and otherwise ignored.
pub struct RecordingPersistence {
    remote: Arc<dyn StepPersistence>,
    drafts: UserDrafts,
}

impl RecordingPersistence {
    pub fn new(remote: Arc<dyn StepPersistence>, drafts: UserDrafts) -> Self {
        Self { remote, drafts }
    }
}

#[async_trait]
impl StepPersistence for RecordingPersistence {
    async fn save_step(&self, step: OnboardingStep, payload: &FormData) -> Result<(), PersistenceError> {
        self.remote.save_step(step, payload).await?;
        if let Err(e) = self.drafts.save_step(step, payload).await {
            warn!(user_id = %self.drafts.user_id(), step = %step, error = %e, "Failed to record step draft");
        }
        Ok(())
    }
}

/// Wraps another provider so every session also records local drafts.
pub struct DraftingProvider {
    remote: Arc<dyn PersistenceProvider>,
    store: Arc<LibSqlStepStore>,
}

impl DraftingProvider {
    pub fn new(remote: Arc<dyn PersistenceProvider>, store: Arc<LibSqlStepStore>) -> Self {
        Self { remote, store }
    }

    pub fn store(&self) -> &Arc<LibSqlStepStore> {
        &self.store
    }
}

impl PersistenceProvider for DraftingProvider {
    fn for_session(&self, token: &AccessToken, user: &User) -> Arc<dyn StepPersistence> {
        let drafts = UserDrafts::new(Arc::clone(&self.store), user.id.to_string());
        Arc::new(RecordingPersistence::new(self.remote.for_session(token, user), drafts))
    }
}
