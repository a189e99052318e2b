//! The analyst's session: storage, the auth gate and the current payload.

use std::sync::Arc;

use acutrace_core::error::{AuthError, Result};
use acutrace_core::models::AnalysisPayload;
use acutrace_data::normalizer::ResultNormalizer;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::auth::{AuthConfig, AuthGate, AuthState, CredentialVerifier, StaticCredentials};
use crate::storage::{SessionStorage, KEY_ANALYSIS_RESULTS};

// ── SessionStore ──────────────────────────────────────────────────────────────

/// Holds at most one analysis payload.
///
/// The payload is replaced wholesale and handed out behind an `Arc`, so
/// readers keep a consistent snapshot even across a replacement.
#[derive(Debug, Default)]
pub struct SessionStore {
    payload: Option<Arc<AnalysisPayload>>,
}

impl SessionStore {
    /// Rebuild from the persisted response, if there is a usable one.
    pub fn restore(storage: &SessionStorage) -> Self {
        let Some(text) = storage.get(KEY_ANALYSIS_RESULTS) else {
            return Self::default();
        };
        let payload = serde_json::from_str::<Value>(text)
            .map_err(|e| e.to_string())
            .and_then(|raw| ResultNormalizer::normalize(&raw).map_err(|e| e.to_string()));
        match payload {
            Ok(payload) => Self {
                payload: Some(Arc::new(payload)),
            },
            Err(error) => {
                warn!(%error, "stored analysis results ignored");
                Self::default()
            }
        }
    }

    pub fn current(&self) -> Option<Arc<AnalysisPayload>> {
        self.payload.clone()
    }

    /// Normalize `raw`, persist it, and make it the current payload.
    pub fn replace(&mut self, storage: &mut SessionStorage, raw: &Value) -> Result<Arc<AnalysisPayload>> {
        let payload = Arc::new(ResultNormalizer::normalize(raw)?);
        storage.set(KEY_ANALYSIS_RESULTS, serde_json::to_string(raw)?)?;
        self.payload = Some(Arc::clone(&payload));
        debug!(transactions = payload.transactions.len(), "session payload replaced");
        Ok(payload)
    }

    pub fn clear(&mut self, storage: &mut SessionStorage) -> Result<()> {
        self.payload = None;
        storage.remove(KEY_ANALYSIS_RESULTS)
    }
}

// ── Session ───────────────────────────────────────────────────────────────────

/// Explicitly owned session state.
///
/// Created authenticated by [`Session::login`], cleared by
/// [`Session::logout`]. Payload access requires an authenticated session.
#[derive(Debug)]
pub struct Session {
    storage: SessionStorage,
    auth: AuthGate,
    store: SessionStore,
}

impl Session {
    /// Restore whatever state `storage` holds.
    pub fn open(
        storage: SessionStorage,
        verifier: Box<dyn CredentialVerifier>,
        config: AuthConfig,
    ) -> Self {
        let mut auth = AuthGate::new(verifier, config);
        auth.restore(&storage);
        let store = if auth.is_authenticated() {
            SessionStore::restore(&storage)
        } else {
            SessionStore::default()
        };
        Self {
            storage,
            auth,
            store,
        }
    }

    /// [`Session::open`] with the built-in credentials and default latency.
    pub fn with_defaults(storage: SessionStorage) -> Self {
        Self::open(
            storage,
            Box::new(StaticCredentials::default()),
            AuthConfig::default(),
        )
    }

    pub fn auth_state(&self) -> &AuthState {
        self.auth.state()
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth.is_authenticated()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.auth.user_id()
    }

    pub fn storage(&self) -> &SessionStorage {
        &self.storage
    }

    pub async fn login(&mut self, identity: &str, secret: &str) -> Result<()> {
        self.auth.login(&mut self.storage, identity, secret).await?;
        self.store = SessionStore::restore(&self.storage);
        Ok(())
    }

    /// Clear the login and the stored payload.
    ///
    /// Both are attempted even if the first fails; the first error is
    /// returned.
    pub fn logout(&mut self) -> Result<()> {
        let auth_cleared = self.auth.logout(&mut self.storage);
        let store_cleared = self.store.clear(&mut self.storage);
        auth_cleared.and(store_cleared)?;
        info!("session cleared");
        Ok(())
    }

    /// The current payload, `None` if nothing was analysed yet.
    pub fn payload(&self) -> Result<Option<Arc<AnalysisPayload>>> {
        self.require_auth()?;
        Ok(self.store.current())
    }

    /// Replace the stored payload with a validated service response.
    pub fn store_response(&mut self, raw: &Value) -> Result<Arc<AnalysisPayload>> {
        self.require_auth()?;
        self.store.replace(&mut self.storage, raw)
    }

    fn require_auth(&self) -> Result<()> {
        if self.auth.is_authenticated() {
            Ok(())
        } else {
            Err(AuthError::NotAuthenticated.into())
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
