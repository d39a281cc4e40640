//! PostgreSQL implementation of ConnectionRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::connection::{Connection, ConnectionStatus, GcEnvironment};
use crate::domain::foundation::{StorageError, TenantId, Timestamp};
use crate::ports::ConnectionRepository;

/// PostgreSQL-backed connection store.
///
/// The tenant id is the primary key, so the upsert is a plain
/// `ON CONFLICT ... DO UPDATE` and the one-active-connection-per-tenant
/// invariant holds at the schema level.
pub struct PostgresConnectionRepository {
    pool: PgPool,
}

impl PostgresConnectionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a connection.
#[derive(Debug, sqlx::FromRow)]
struct ConnectionRow {
    tenant_id: String,
    environment: String,
    encrypted_access_token: String,
    organisation_id: String,
    status: String,
    verification_status: Option<String>,
    verification_checked_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ConnectionRow> for Connection {
    type Error = StorageError;

    fn try_from(row: ConnectionRow) -> Result<Self, Self::Error> {
        let tenant_id = TenantId::new(row.tenant_id).map_err(|e| StorageError::Corrupt {
            entity: "connection",
            reason: e.to_string(),
        })?;
        let environment =
            GcEnvironment::parse(&row.environment).map_err(|e| StorageError::Corrupt {
                entity: "connection",
                reason: e.to_string(),
            })?;
        let status = ConnectionStatus::parse(&row.status).map_err(|e| StorageError::Corrupt {
            entity: "connection",
            reason: e.to_string(),
        })?;

        Ok(Connection {
            tenant_id,
            environment,
            encrypted_access_token: row.encrypted_access_token,
            organisation_id: row.organisation_id,
            status,
            verification_status: row.verification_status,
            verification_checked_at: row.verification_checked_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
            updated_at: Timestamp::from_datetime(row.updated_at),
        })
    }
}

#[async_trait]
impl ConnectionRepository for PostgresConnectionRepository {
    async fn upsert(&self, connection: &Connection) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO gc_connections (
                tenant_id, environment, encrypted_access_token, organisation_id,
                status, verification_status, verification_checked_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (tenant_id) DO UPDATE SET
                environment = EXCLUDED.environment,
                encrypted_access_token = EXCLUDED.encrypted_access_token,
                organisation_id = EXCLUDED.organisation_id,
                status = EXCLUDED.status,
                verification_status = EXCLUDED.verification_status,
                verification_checked_at = EXCLUDED.verification_checked_at,
                updated_at = EXCLUDED.updated_at
            "#,
        )
        .bind(connection.tenant_id.as_str())
        .bind(connection.environment.as_str())
        .bind(&connection.encrypted_access_token)
        .bind(&connection.organisation_id)
        .bind(connection.status.as_str())
        .bind(&connection.verification_status)
        .bind(connection.verification_checked_at.map(|t| *t.as_datetime()))
        .bind(connection.created_at.as_datetime())
        .bind(connection.updated_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        Ok(())
    }

    async fn find_active(&self, tenant_id: &TenantId) -> Result<Option<Connection>, StorageError> {
        let row: Option<ConnectionRow> = sqlx::query_as(
            r#"
            SELECT tenant_id, environment, encrypted_access_token, organisation_id,
                   status, verification_status, verification_checked_at, created_at, updated_at
            FROM gc_connections
            WHERE tenant_id = $1 AND status = 'active'
            "#,
        )
        .bind(tenant_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        row.map(Connection::try_from).transpose()
    }

    async fn mark_revoked(&self, tenant_id: &TenantId) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE gc_connections
            SET status = 'revoked', updated_at = NOW()
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "connection",
            });
        }

        Ok(())
    }

    async fn cache_verification(
        &self,
        tenant_id: &TenantId,
        status: &str,
        checked_at: Timestamp,
    ) -> Result<(), StorageError> {
        let result = sqlx::query(
            r#"
            UPDATE gc_connections
            SET verification_status = $2,
                verification_checked_at = $3,
                updated_at = $3
            WHERE tenant_id = $1
            "#,
        )
        .bind(tenant_id.as_str())
        .bind(status)
        .bind(checked_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        if result.rows_affected() == 0 {
            return Err(StorageError::NotFound {
                entity: "connection",
            });
        }

        Ok(())
    }
}
