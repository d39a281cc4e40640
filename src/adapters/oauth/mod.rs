//! CSRF-safe OAuth connect flow.

mod state_manager;

pub use state_manager::{OAuthFlowError, OAuthStateManager, StartedFlow};
