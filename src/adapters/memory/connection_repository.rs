//! In-memory connection repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::connection::Connection;
use crate::domain::foundation::{StorageError, TenantId, Timestamp};
use crate::ports::ConnectionRepository;

/// HashMap-backed connection store, keyed by tenant id.
#[derive(Debug, Default)]
pub struct InMemoryConnectionRepository {
    rows: Arc<Mutex<HashMap<String, Connection>>>,
}

impl InMemoryConnectionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a connection regardless of status, for test assertions.
    pub async fn find_any(&self, tenant_id: &TenantId) -> Option<Connection> {
        let rows = self.rows.lock().await;
        rows.get(tenant_id.as_str()).cloned()
    }
}

#[async_trait]
impl ConnectionRepository for InMemoryConnectionRepository {
    async fn upsert(&self, connection: &Connection) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().await;
        rows.insert(
            connection.tenant_id.as_str().to_string(),
            connection.clone(),
        );
        Ok(())
    }

    async fn find_active(&self, tenant_id: &TenantId) -> Result<Option<Connection>, StorageError> {
        let rows = self.rows.lock().await;
        Ok(rows
            .get(tenant_id.as_str())
            .filter(|c| c.is_active())
            .cloned())
    }

    async fn mark_revoked(&self, tenant_id: &TenantId) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().await;
        let connection = rows.get_mut(tenant_id.as_str()).ok_or(StorageError::NotFound {
            entity: "connection",
        })?;
        connection.revoke();
        Ok(())
    }

    async fn cache_verification(
        &self,
        tenant_id: &TenantId,
        status: &str,
        checked_at: Timestamp,
    ) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().await;
        let connection = rows.get_mut(tenant_id.as_str()).ok_or(StorageError::NotFound {
            entity: "connection",
        })?;
        connection.cache_verification(status, checked_at);
        Ok(())
    }
}
