//! Tutorly: client core of a tutoring marketplace.
//!
//! Session lifecycle, role-guarded navigation, and the instructor
//! onboarding workflow, over abstract auth, routing and persistence
//! collaborators.

pub mod api;
pub mod auth;
pub mod config;
pub mod credentials;
pub mod error;
pub mod guard;
pub mod onboarding;
pub mod portal;
pub mod store;
