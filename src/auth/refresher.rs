use std::sync::Arc;

use tokio::sync::Mutex;

use super::device_flow::TokenRefresh;
use super::store::CredentialStore;
use super::token::AccessCredential;
use crate::error::{DecanterError, Result};

/// Hands out a usable credential by refreshing the stored one.
///
/// Every call performs load, refresh, save. Nothing is cached in memory, so
/// the store always holds the most recent credential. Concurrent callers are
/// serialized so two refreshes never race on the same refresh token.
pub struct TokenRefresher {
    store: Arc<dyn CredentialStore>,
    refresh: Arc<dyn TokenRefresh>,
    gate: Mutex<()>,
}

impl TokenRefresher {
    pub fn new(store: Arc<dyn CredentialStore>, refresh: Arc<dyn TokenRefresh>) -> Self {
        Self {
            store,
            refresh,
            gate: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn CredentialStore> {
        &self.store
    }

    // TODO: skip the round trip while `expiry` is more than a minute away.
    pub async fn token(&self) -> Result<AccessCredential> {
        let _guard = self.gate.lock().await;

        let current = self
            .store
            .load()
            .map_err(|e| DecanterError::TokenUnavailable(format!("failed to load credential: {e}")))?
            .ok_or_else(|| {
                DecanterError::TokenUnavailable(
                    "no stored credential, run `decanter setup` first".to_string(),
                )
            })?;

        let refreshed = self
            .refresh
            .refresh_token(&current)
            .await
            .map_err(|e| DecanterError::TokenUnavailable(e.to_string()))?;

        self.store
            .save(&refreshed)
            .map_err(|e| DecanterError::TokenUnavailable(format!("failed to save credential: {e}")))?;
        tracing::debug!(expiry = ?refreshed.expiry, "access token refreshed");
        Ok(refreshed)
    }
}

impl std::fmt::Debug for TokenRefresher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRefresher").finish_non_exhaustive()
    }
}
