//! OnboardingWorkflow — drives the step sequence, gating each forward move
//! on a successful step save.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::model::OnboardingStep;
use super::service::StepPersistence;
use super::state::{FieldUpdate, OnboardingState};
use crate::error::PersistenceError;

/// Default broadcast channel capacity.
const DEFAULT_EVENT_CAPACITY: usize = 64;

/// Whether `advance()` checks required fields before saving.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationPolicy {
    /// Every field is optional.
    #[default]
    Permissive,
    /// Refuse to save a step while one of its required fields is empty.
    RequireFields,
}

/// Save boundary state: `idle → in-flight → idle`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SavePhase {
    Idle,
    InFlight { step: OnboardingStep },
}

/// Successful result of `advance()`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advance {
    /// The step was saved and the workflow moved on.
    Moved { step: OnboardingStep },
    /// The last step was saved. The caller should navigate to `destination`.
    Completed { destination: String },
    /// The save finished after the workflow was reset or moved elsewhere;
    /// its result was dropped.
    Discarded,
}

/// Workflow transitions, for UI observers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    /// New step is active. Scroll and focus return to its top.
    StepChanged { step: OnboardingStep },
    SaveFailed { step: OnboardingStep, reason: String },
    Completed,
    Abandoned,
}

struct Inner {
    state: OnboardingState,
    phase: SavePhase,
    /// Bumped whenever the state is torn down, to orphan outstanding saves.
    epoch: u64,
    /// Set once the owning session ends. A closed workflow never saves again.
    closed: bool,
}

pub struct OnboardingWorkflow {
    persistence: Arc<dyn StepPersistence>,
    inner: Mutex<Inner>,
    policy: ValidationPolicy,
    completion_path: String,
    events: broadcast::Sender<WorkflowEvent>,
}

impl OnboardingWorkflow {
    /// Start a fresh workflow at the first step with an empty form.
    pub fn new(persistence: Arc<dyn StepPersistence>, completion_path: impl Into<String>) -> Self {
        let (events, _rx) = broadcast::channel(DEFAULT_EVENT_CAPACITY);
        Self {
            persistence,
            inner: Mutex::new(Inner {
                state: OnboardingState::new(),
                phase: SavePhase::Idle,
                epoch: 0,
                closed: false,
            }),
            policy: ValidationPolicy::default(),
            completion_path: completion_path.into(),
            events,
        }
    }

    pub fn with_policy(mut self, policy: ValidationPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.events.subscribe()
    }

    pub fn snapshot(&self) -> OnboardingState {
        self.lock().state.clone()
    }

    pub fn current_step(&self) -> OnboardingStep {
        self.lock().state.current_step()
    }

    pub fn save_phase(&self) -> SavePhase {
        self.lock().phase
    }

    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Merge a field edit into the form. Ignored once closed.
    pub fn update(&self, update: FieldUpdate) {
        let mut inner = self.lock();
        if !inner.closed {
            inner.state.apply(update);
        }
    }

    /// Save the current step, then move forward (or complete on the last step).
    ///
    /// A failed save leaves the step unchanged and is returned to the caller,
    /// who may retry. Only one save may be outstanding at a time.
    pub async fn advance(&self) -> Result<Advance, PersistenceError> {
        let (step, payload, epoch) = {
            let mut inner = self.lock();
            if inner.closed {
                return Err(PersistenceError::SessionEnded);
            }
            if let SavePhase::InFlight { step } = inner.phase {
                return Err(PersistenceError::InFlight { step: step.index() });
            }

            let step = inner.state.current_step();
            if self.policy == ValidationPolicy::RequireFields {
                if let Some(field) = inner.state.form().missing_field(step) {
                    return Err(PersistenceError::MissingField {
                        step: step.index(),
                        field,
                    });
                }
            }

            inner.phase = SavePhase::InFlight { step };
            (step, inner.state.form().clone(), inner.epoch)
        };

        let guard = SaveGuard {
            inner: &self.inner,
            epoch,
            settled: false,
        };
        debug!(step = %step, "Saving onboarding step");
        let result = self.persistence.save_step(step, &payload).await;
        guard.settle(|inner| self.conclude(inner, step, epoch, result))
    }

    /// Move back one step. Never saves, never loses form data.
    pub fn retreat(&self) -> OnboardingStep {
        let mut inner = self.lock();
        let before = inner.state.current_step();
        let step = inner.state.retreat();
        if step != before {
            debug!(step = %step, "Onboarding step retreated");
            let _ = self.events.send(WorkflowEvent::StepChanged { step });
        }
        step
    }

    /// Tear down progress. Outstanding saves will be discarded.
    pub fn abandon(&self) {
        let mut inner = self.lock();
        Self::reset(&mut inner);
        info!("Onboarding abandoned");
        let _ = self.events.send(WorkflowEvent::Abandoned);
    }

    /// Abandon for good: later `advance()` calls fail with `SessionEnded`.
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.closed {
            return;
        }
        Self::reset(&mut inner);
        inner.closed = true;
        info!("Onboarding closed");
        let _ = self.events.send(WorkflowEvent::Abandoned);
    }

    fn conclude(
        &self,
        inner: &mut Inner,
        step: OnboardingStep,
        epoch: u64,
        result: Result<(), PersistenceError>,
    ) -> Result<Advance, PersistenceError> {
        if inner.epoch != epoch {
            debug!(step = %step, "Discarding save result for torn-down workflow");
            return Ok(Advance::Discarded);
        }
        inner.phase = SavePhase::Idle;

        if let Err(e) = result {
            warn!(step = %step, error = %e, "Onboarding step save failed");
            let _ = self.events.send(WorkflowEvent::SaveFailed {
                step,
                reason: e.to_string(),
            });
            return Err(e);
        }

        if inner.state.current_step() != step {
            debug!(step = %step, current = %inner.state.current_step(), "Step changed during save");
            return Ok(Advance::Discarded);
        }

        match inner.state.step_forward() {
            Some(next) => {
                info!(from = %step, to = %next, "Onboarding step saved");
                let _ = self.events.send(WorkflowEvent::StepChanged { step: next });
                Ok(Advance::Moved { step: next })
            }
            None => {
                Self::reset(inner);
                info!("Onboarding completed");
                let _ = self.events.send(WorkflowEvent::Completed);
                Ok(Advance::Completed {
                    destination: self.completion_path.clone(),
                })
            }
        }
    }

    fn reset(inner: &mut Inner) {
        inner.state = OnboardingState::new();
        inner.phase = SavePhase::Idle;
        inner.epoch += 1;
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl std::fmt::Debug for OnboardingWorkflow {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.lock();
        f.debug_struct("OnboardingWorkflow")
            .field("step", &inner.state.current_step())
            .field("phase", &inner.phase)
            .field("epoch", &inner.epoch)
            .field("closed", &inner.closed)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

/// Returns the workflow to idle if an `advance()` is dropped mid-save.
struct SaveGuard<'a> {
    inner: &'a Mutex<Inner>,
    epoch: u64,
    settled: bool,
}

impl SaveGuard<'_> {
    fn settle<T>(mut self, f: impl FnOnce(&mut Inner) -> T) -> T {
        self.settled = true;
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        f(&mut inner)
    }
}

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        if inner.epoch == self.epoch {
            inner.phase = SavePhase::Idle;
        }
    }
}
