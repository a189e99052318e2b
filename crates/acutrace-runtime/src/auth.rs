//! Credential gate in front of the analysis session.
//!
//! `Unauthenticated -> Verifying -> {Authenticated, Unauthenticated}`.
//! Who is allowed in is decided by a [`CredentialVerifier`]; the gate only
//! drives the state machine and the persisted flag.

use std::time::Duration;

use acutrace_core::error::{AuthError, Result};
use tracing::{debug, info, warn};

use crate::storage::{SessionStorage, KEY_IS_AUTHENTICATED, KEY_USER_ID};

// ── Verification capability ───────────────────────────────────────────────────

/// Decides whether an identity/secret pair may open a session.
pub trait CredentialVerifier: Send + Sync {
    fn verify(&self, identity: &str, secret: &str) -> bool;
}

/// A single fixed identity. Placeholder until a real identity provider is
/// plugged in.
#[derive(Debug, Clone)]
pub struct StaticCredentials {
    identity: String,
    secret: String,
}

impl StaticCredentials {
    pub fn new(identity: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            identity: identity.into(),
            secret: secret.into(),
        }
    }
}

impl Default for StaticCredentials {
    fn default() -> Self {
        Self::new("admin", "admin")
    }
}

impl CredentialVerifier for StaticCredentials {
    fn verify(&self, identity: &str, secret: &str) -> bool {
        identity == self.identity && secret == self.secret
    }
}

// ── AuthState ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    /// Persisted state is being read, or a login is being checked.
    Verifying,
    Authenticated { user_id: String },
}

// ── AuthConfig ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
pub struct AuthConfig {
    /// Fixed delay applied to every login attempt.
    pub login_latency: Duration,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            login_latency: Duration::from_millis(800),
        }
    }
}

// ── AuthGate ──────────────────────────────────────────────────────────────────

pub struct AuthGate {
    state: AuthState,
    verifier: Box<dyn CredentialVerifier>,
    config: AuthConfig,
}

impl std::fmt::Debug for AuthGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthGate")
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl AuthGate {
    /// A gate that has not yet looked at persisted state.
    pub fn new(verifier: Box<dyn CredentialVerifier>, config: AuthConfig) -> Self {
        Self {
            state: AuthState::Verifying,
            verifier,
            config,
        }
    }

    pub fn state(&self) -> &AuthState {
        &self.state
    }

    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, AuthState::Authenticated { .. })
    }

    pub fn user_id(&self) -> Option<&str> {
        match &self.state {
            AuthState::Authenticated { user_id } => Some(user_id),
            _ => None,
        }
    }

    /// Resolve the startup `Verifying` state from the persisted flag. Only
    /// the exact string `"true"` counts as logged in.
    pub fn restore(&mut self, storage: &SessionStorage) -> &AuthState {
        self.state = match storage.get(KEY_IS_AUTHENTICATED) {
            Some("true") => AuthState::Authenticated {
                user_id: storage.get(KEY_USER_ID).unwrap_or_default().to_string(),
            },
            _ => AuthState::Unauthenticated,
        };
        debug!(state = ?self.state, "auth state restored");
        &self.state
    }

    /// Check credentials after the configured latency and persist the login.
    ///
    /// On any failure the gate returns to the state it had before the call
    /// and storage is left untouched.
    pub async fn login(
        &mut self,
        storage: &mut SessionStorage,
        identity: &str,
        secret: &str,
    ) -> Result<()> {
        let previous = std::mem::replace(&mut self.state, AuthState::Verifying);
        tokio::time::sleep(self.config.login_latency).await;

        if !self.verifier.verify(identity, secret) {
            self.state = previous;
            warn!("login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }

        if let Err(e) = storage.set_all([
            (KEY_IS_AUTHENTICATED, "true".to_string()),
            (KEY_USER_ID, identity.to_string()),
        ]) {
            self.state = previous;
            return Err(e);
        }

        self.state = AuthState::Authenticated {
            user_id: identity.to_string(),
        };
        info!(user = %identity, "logged in");
        Ok(())
    }

    /// Forget the login. Always ends in `Unauthenticated`, even if the
    /// persisted keys could not be removed.
    pub fn logout(&mut self, storage: &mut SessionStorage) -> Result<()> {
        self.state = AuthState::Unauthenticated;
        storage.remove_all([KEY_IS_AUTHENTICATED, KEY_USER_ID])?;
        info!("logged out");
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
