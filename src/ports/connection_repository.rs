//! Persistence port for tenant connections.

use async_trait::async_trait;

use crate::domain::connection::Connection;
use crate::domain::foundation::{StorageError, TenantId, Timestamp};

/// Port for the Connections record set, keyed uniquely by tenant id.
///
/// The "at most one active connection per tenant" invariant is enforced
/// here: `upsert` replaces any existing row for the tenant instead of
/// inserting a duplicate.
#[async_trait]
pub trait ConnectionRepository: Send + Sync {
    /// Create or replace the tenant's connection.
    ///
    /// Called on every successful OAuth completion; a reconnect rotates
    /// credentials under the same tenant key.
    async fn upsert(&self, connection: &Connection) -> Result<(), StorageError>;

    /// Fetch the tenant's connection, if it exists and is active.
    ///
    /// Revoked connections are not returned; the API client factory treats
    /// them the same as no connection at all.
    async fn find_active(&self, tenant_id: &TenantId) -> Result<Option<Connection>, StorageError>;

    /// Flip the tenant's connection to revoked after an external disconnect.
    async fn mark_revoked(&self, tenant_id: &TenantId) -> Result<(), StorageError>;

    /// Record a freshly fetched provider-side verification status.
    async fn cache_verification(
        &self,
        tenant_id: &TenantId,
        status: &str,
        checked_at: Timestamp,
    ) -> Result<(), StorageError>;
}
