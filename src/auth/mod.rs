//! Identity provider client.
//!
//! `AuthSession` owns the current auth state and publishes every transition
//! on a `watch` channel. The state starts `Unresolved` until the persisted
//! session has been read, so the first screen can be a loading screen.

pub mod device;
pub mod local;
pub mod session;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::watch;

use quadrant_common::Identity;

use crate::config::{AuthProvider, QuadrantConfig};
use crate::errors::AuthError;

pub use device::{DeviceFlowConfig, DeviceFlowProvider};
pub use local::LocalProvider;
pub use session::{SessionStore, StoredSession};

#[derive(Debug, Clone, PartialEq)]
pub enum AuthState {
    /// The persisted session has not been read yet.
    Unresolved,
    SignedOut,
    SignedIn(Identity),
}

impl AuthState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            AuthState::SignedIn(identity) => Some(identity),
            _ => None,
        }
    }
}

/// What a successful sign-in yields.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub identity: Identity,
    pub access_token: Option<String>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Provider name recorded on identities, e.g. `google` or `local`.
    fn name(&self) -> &str;

    /// Run the interactive sign-in flow to completion.
    async fn sign_in(&self) -> Result<Credentials, AuthError>;

    async fn sign_out(&self, _credentials: &Credentials) -> Result<(), AuthError> {
        Ok(())
    }
}

/// Build the configured provider.
pub fn provider_from_config(config: &QuadrantConfig) -> Arc<dyn IdentityProvider> {
    match config.auth.provider {
        AuthProvider::Device => Arc::new(DeviceFlowProvider::new(config.auth.device_flow())),
        AuthProvider::Local => Arc::new(LocalProvider::new(
            config.auth.local_user(),
            config.auth.local_display_name.clone(),
        )),
    }
}

/// Auth session over the configured provider and session file.
pub fn session_from_config(config: &QuadrantConfig) -> AuthSession {
    AuthSession::new(
        provider_from_config(config),
        SessionStore::new(config.session_path()),
    )
}

pub struct AuthSession {
    provider: Arc<dyn IdentityProvider>,
    sessions: SessionStore,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    pub fn new(provider: Arc<dyn IdentityProvider>, sessions: SessionStore) -> Self {
        let (state, _rx) = watch::channel(AuthState::Unresolved);
        Self {
            provider,
            sessions,
            state,
        }
    }

    /// Stream of auth state changes. The receiver sees the current state first.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    pub fn current_identity(&self) -> Option<Identity> {
        self.state.borrow().identity().cloned()
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Resolve the initial state from the session file.
    ///
    /// A session written by a different provider is ignored.
    pub fn restore(&self) -> Result<Option<Identity>, AuthError> {
        let stored = match self.sessions.load() {
            Ok(stored) => stored,
            Err(e) => {
                self.state.send_replace(AuthState::SignedOut);
                return Err(e);
            }
        };
        let identity = stored
            .map(|s| s.identity)
            .filter(|identity| {
                let same = identity.provider == self.provider.name();
                if !same {
                    tracing::debug!(
                        stored = %identity.provider,
                        active = self.provider.name(),
                        "ignoring session from another provider"
                    );
                }
                same
            });
        match &identity {
            Some(identity) => {
                tracing::info!(uid = %identity.uid, "restored session");
                self.state.send_replace(AuthState::SignedIn(identity.clone()));
            }
            None => {
                self.state.send_replace(AuthState::SignedOut);
            }
        }
        Ok(identity)
    }

    /// Run the provider's sign-in flow and persist the result.
    ///
    /// On failure the state is `SignedOut` and the error is returned for
    /// the caller to show.
    pub async fn sign_in(&self) -> Result<Identity, AuthError> {
        let credentials = match self.provider.sign_in().await {
            Ok(credentials) => credentials,
            Err(e) => {
                tracing::warn!(provider = self.provider.name(), error = %e, "sign-in failed");
                self.state.send_replace(AuthState::SignedOut);
                return Err(e);
            }
        };
        let stored = StoredSession {
            identity: credentials.identity.clone(),
            access_token: credentials.access_token,
            signed_in_at: Utc::now(),
        };
        if let Err(e) = self.sessions.save(&stored) {
            self.state.send_replace(AuthState::SignedOut);
            return Err(e);
        }
        tracing::info!(uid = %stored.identity.uid, provider = self.provider.name(), "signed in");
        self.state
            .send_replace(AuthState::SignedIn(stored.identity.clone()));
        Ok(stored.identity)
    }

    /// Sign out and forget the persisted session. Idempotent.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(stored) = self.sessions.load()? {
            let credentials = Credentials {
                identity: stored.identity,
                access_token: stored.access_token,
            };
            if let Err(e) = self.provider.sign_out(&credentials).await {
                tracing::warn!(error = %e, "provider sign-out failed, clearing local session anyway");
            }
        }
        self.sessions.clear()?;
        self.state.send_replace(AuthState::SignedOut);
        tracing::info!("signed out");
        Ok(())
    }
}
