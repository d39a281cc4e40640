//! PostgreSQL implementation of OAuthStateRepository.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::connection::GcEnvironment;
use crate::domain::foundation::{StorageError, TenantId, Timestamp};
use crate::domain::oauth_state::OAuthState;
use crate::ports::OAuthStateRepository;

/// PostgreSQL-backed state store.
pub struct PostgresOAuthStateRepository {
    pool: PgPool,
}

impl PostgresOAuthStateRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Database row representation of a state token.
#[derive(Debug, sqlx::FromRow)]
struct OAuthStateRow {
    token: String,
    tenant_id: String,
    environment: String,
    expires_at: DateTime<Utc>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OAuthStateRow> for OAuthState {
    type Error = StorageError;

    fn try_from(row: OAuthStateRow) -> Result<Self, Self::Error> {
        let tenant_id = TenantId::new(row.tenant_id).map_err(|e| StorageError::Corrupt {
            entity: "oauth_state",
            reason: e.to_string(),
        })?;
        let environment =
            GcEnvironment::parse(&row.environment).map_err(|e| StorageError::Corrupt {
                entity: "oauth_state",
                reason: e.to_string(),
            })?;

        Ok(OAuthState {
            token: row.token,
            tenant_id,
            environment,
            expires_at: Timestamp::from_datetime(row.expires_at),
            used_at: row.used_at.map(Timestamp::from_datetime),
            created_at: Timestamp::from_datetime(row.created_at),
        })
    }
}

#[async_trait]
impl OAuthStateRepository for PostgresOAuthStateRepository {
    async fn insert(&self, state: &OAuthState) -> Result<(), StorageError> {
        sqlx::query(
            r#"
            INSERT INTO gc_oauth_states (
                token, tenant_id, environment, expires_at, used_at, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&state.token)
        .bind(state.tenant_id.as_str())
        .bind(state.environment.as_str())
        .bind(state.expires_at.as_datetime())
        .bind(state.used_at.map(|t| *t.as_datetime()))
        .bind(state.created_at.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<Option<OAuthState>, StorageError> {
        // One statement: the WHERE clause and the UPDATE are a single
        // atomic winner-takes-all, so two racing callbacks cannot both get
        // the row back.
        let row: Option<OAuthStateRow> = sqlx::query_as(
            r#"
            UPDATE gc_oauth_states
            SET used_at = NOW()
            WHERE token = $1 AND used_at IS NULL
            RETURNING token, tenant_id, environment, expires_at, used_at, created_at
            "#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::backend)?;

        row.map(OAuthState::try_from).transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(environment: &str, used: bool) -> OAuthStateRow {
        OAuthStateRow {
            token: "tok".to_string(),
            tenant_id: "acme".to_string(),
            environment: environment.to_string(),
            expires_at: Utc::now(),
            used_at: used.then(Utc::now),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn row_converts_to_state() {
        let state = OAuthState::try_from(row("live", true)).unwrap();
        assert_eq!(state.environment, GcEnvironment::Live);
        assert!(state.is_used());
    }

    #[test]
    fn corrupt_environment_is_reported() {
        let err = OAuthState::try_from(row("test", false)).unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { entity: "oauth_state", .. }));
    }
}
