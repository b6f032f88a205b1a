//! Access guard and the router primitives it drives.

pub mod access;
pub mod router;

pub use access::{AccessGuard, AccessRequirement, GuardDecision, post_login_destination};
pub use router::{HistoryRouter, NavigateOptions, NavigationIntent, Router};
