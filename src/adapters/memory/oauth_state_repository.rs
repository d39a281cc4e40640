//! In-memory OAuth state repository.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::foundation::{StorageError, Timestamp};
use crate::domain::oauth_state::OAuthState;
use crate::ports::OAuthStateRepository;

/// HashMap-backed state store, keyed by the state token.
///
/// `consume` mirrors the single-statement SQL semantics: under one lock
/// acquisition it sets `used_at` iff the row is unused and returns the
/// updated row, so two racing callbacks cannot both win.
#[derive(Debug, Default)]
pub struct InMemoryOAuthStateRepository {
    rows: Arc<Mutex<HashMap<String, OAuthState>>>,
}

impl InMemoryOAuthStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a row without consuming it, for test assertions.
    pub async fn peek(&self, token: &str) -> Option<OAuthState> {
        let rows = self.rows.lock().await;
        rows.get(token).cloned()
    }
}

#[async_trait]
impl OAuthStateRepository for InMemoryOAuthStateRepository {
    async fn insert(&self, state: &OAuthState) -> Result<(), StorageError> {
        let mut rows = self.rows.lock().await;
        rows.insert(state.token.clone(), state.clone());
        Ok(())
    }

    async fn consume(&self, token: &str) -> Result<Option<OAuthState>, StorageError> {
        let mut rows = self.rows.lock().await;
        match rows.get_mut(token) {
            Some(state) if !state.is_used() => {
                state.used_at = Some(Timestamp::now());
                Ok(Some(state.clone()))
            }
            _ => Ok(None),
        }
    }
}
