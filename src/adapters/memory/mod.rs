//! In-memory repository implementations for tests and local development.

mod connection_repository;
mod oauth_state_repository;

pub use connection_repository::InMemoryConnectionRepository;
pub use oauth_state_repository::InMemoryOAuthStateRepository;
