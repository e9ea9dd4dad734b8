//! Bearer credential with single-flight refresh.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use crate::error::{Result, WeaveError};

/// A freshly issued access token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_at: Option<DateTime<Utc>>,
}

impl IssuedToken {
    pub fn new(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            expires_at: None,
        }
    }
}

/// Obtains a new access token after the current one was rejected.
#[async_trait]
pub trait CredentialRefresher: Send + Sync {
    async fn refresh(&self) -> Result<IssuedToken>;
}

#[derive(Debug, Clone)]
struct CredentialState {
    token: String,
    expires_at: Option<DateTime<Utc>>,
    generation: u64,
}

/// Snapshot of the credential used for one request.
#[derive(Debug, Clone)]
pub struct CredentialSnapshot {
    pub token: String,
    pub generation: u64,
}

/// Instance-scoped credential.
///
/// Concurrent callers that observe the same rejected generation share one
/// refresh: the first caller refreshes while the rest wait and reuse its
/// result.
pub struct Credential {
    state: RwLock<CredentialState>,
    refresh_lock: Mutex<()>,
    refresher: Option<Arc<dyn CredentialRefresher>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(CredentialState {
                token: token.into(),
                expires_at: None,
                generation: 0,
            }),
            refresh_lock: Mutex::new(()),
            refresher: None,
        }
    }

    pub fn with_refresher(mut self, refresher: Arc<dyn CredentialRefresher>) -> Self {
        self.refresher = Some(refresher);
        self
    }

    pub fn can_refresh(&self) -> bool {
        self.refresher.is_some()
    }

    pub async fn snapshot(&self) -> CredentialSnapshot {
        let state = self.state.read().await;
        CredentialSnapshot {
            token: state.token.clone(),
            generation: state.generation,
        }
    }

    pub async fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.expires_at
    }

    /// Refresh after `rejected` was turned down by the server.
    ///
    /// Returns the newer credential without refreshing again if another
    /// caller already replaced `rejected`.
    pub async fn refresh(&self, rejected: &CredentialSnapshot) -> Result<CredentialSnapshot> {
        let refresher = self.refresher.as_ref().ok_or_else(|| {
            WeaveError::Authentication("credential rejected and no refresher configured".into())
        })?;

        let _guard = self.refresh_lock.lock().await;
        {
            let state = self.state.read().await;
            if state.generation != rejected.generation {
                return Ok(CredentialSnapshot {
                    token: state.token.clone(),
                    generation: state.generation,
                });
            }
        }

        tracing::warn!(generation = rejected.generation, "refreshing rejected credential");
        let issued = refresher.refresh().await?;
        let mut state = self.state.write().await;
        state.token = issued.access_token;
        state.expires_at = issued.expires_at;
        state.generation += 1;
        Ok(CredentialSnapshot {
            token: state.token.clone(),
            generation: state.generation,
        })
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"..")
            .field("refresher", &self.refresher.as_ref().map(|_| ".."))
            .finish()
    }
}
