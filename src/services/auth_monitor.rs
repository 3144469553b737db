use crate::error::SyncError;
use crate::store::KvStore;
use chrono::Utc;
use drive_auth::{evaluate_token, AccessToken, AuthState, ACCESS_TOKEN_KEYS, TOKEN_EXPIRY_KEY};
use std::sync::Arc;

/// Stateless view of the stored credential.
///
/// Every call re-reads the store, so clones can be shared freely between
/// the transport, the resolver and the scheduler.
#[derive(Clone)]
pub struct AuthStateMonitor {
    store: Arc<dyn KvStore>,
}

impl AuthStateMonitor {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    /// First non-empty token, current key before legacy key
    fn stored_token(&self) -> Option<String> {
        ACCESS_TOKEN_KEYS.iter().find_map(|key| match self.store.get(key) {
            Ok(Some(token)) if !token.trim().is_empty() => Some(token),
            Ok(_) => None,
            Err(e) => {
                log::warn!("Could not read credential key {}: {}", key, e);
                None
            }
        })
    }

    pub fn auth_state(&self) -> AuthState {
        let token = self.stored_token();
        let expiry = self.store.get(TOKEN_EXPIRY_KEY).unwrap_or_else(|e| {
            log::warn!("Could not read token expiry: {}", e);
            None
        });
        evaluate_token(token.as_deref(), expiry.as_deref(), Utc::now())
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_state().is_usable()
    }

    /// Token for an outgoing request, or `NotAuthenticated`
    pub fn access_token(&self) -> Result<String, SyncError> {
        if !self.is_authenticated() {
            return Err(SyncError::NotAuthenticated);
        }
        self.stored_token().ok_or(SyncError::NotAuthenticated)
    }

    /// Persists a freshly obtained credential under the current keys
    pub fn store_credential(&self, credential: &AccessToken) -> Result<(), SyncError> {
        self.store.set(drive_auth::ACCESS_TOKEN_KEY, &credential.token)?;
        match credential.expiry_value() {
            Some(expiry) => self.store.set(TOKEN_EXPIRY_KEY, &expiry)?,
            None => self.store.remove(TOKEN_EXPIRY_KEY)?,
        }
        log::info!("Stored Drive credential");
        Ok(())
    }

    /// Removes the credential under both current and legacy keys
    pub fn sign_out(&self) -> Result<(), SyncError> {
        for key in ACCESS_TOKEN_KEYS {
            self.store.remove(key)?;
        }
        self.store.remove(TOKEN_EXPIRY_KEY)?;
        log::info!("Signed out of Drive");
        Ok(())
    }
}
