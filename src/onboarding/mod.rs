//! Instructor onboarding — a linear, multi-step profile wizard.
//!
//! The workflow walks a tutor through the steps in `model::OnboardingStep`,
//! saving the accumulated `FormData` at each forward move. A step only
//! advances once its save succeeds.

pub mod model;
pub mod service;
pub mod state;
pub mod workflow;

pub use model::{
    Education, FormData, LanguageSkill, MediaKind, OnboardingStep, Pricing, Proficiency, STEP_COUNT,
    StepContent, StepStatus, step_status,
};
pub use service::{PersistenceProvider, StepPersistence};
pub use state::{FieldUpdate, OnboardingState};
pub use workflow::{Advance, OnboardingWorkflow, SavePhase, ValidationPolicy, WorkflowEvent};
