//! Persistence layer — libSQL-backed drafts of onboarding step saves.

pub mod drafts;
pub mod libsql_backend;
pub mod migrations;

pub use drafts::{DraftingProvider, RecordingPersistence, UserDrafts};
pub use libsql_backend::{LibSqlStepStore, SavedStep};
