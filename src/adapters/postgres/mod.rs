//! PostgreSQL repository implementations.
//!
//! Expected schema:
//!
//! ```sql
//! CREATE TABLE gc_connections (
//!     tenant_id              TEXT PRIMARY KEY,
//!     environment            TEXT NOT NULL,
//!     encrypted_access_token TEXT NOT NULL,
//!     organisation_id        TEXT NOT NULL,
//!     status                 TEXT NOT NULL,
//!     verification_status    TEXT,
//!     verification_checked_at TIMESTAMPTZ,
//!     created_at             TIMESTAMPTZ NOT NULL,
//!     updated_at             TIMESTAMPTZ NOT NULL
//! );
//!
//! CREATE TABLE gc_oauth_states (
//!     token       TEXT PRIMARY KEY,
//!     tenant_id   TEXT NOT NULL,
//!     environment TEXT NOT NULL,
//!     expires_at  TIMESTAMPTZ NOT NULL,
//!     used_at     TIMESTAMPTZ,
//!     created_at  TIMESTAMPTZ NOT NULL
//! );
//! ```

mod connection_repository;
mod oauth_state_repository;

pub use connection_repository::PostgresConnectionRepository;
pub use oauth_state_repository::PostgresOAuthStateRepository;
