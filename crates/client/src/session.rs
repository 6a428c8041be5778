//! Session gate: the identity state machine.
//!
//! Exactly one [`SessionGate`] exists per running client. It owns the current
//! [`SessionIdentity`] and is the only component that mutates it. Every state
//! change is handed back as a discrete [`SessionTransition`] value; the
//! composition root dispatches each transition to the reconciliation engines
//! exactly once, so reconciliation is event-driven rather than polled.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tangelo_core::{Email, UserId};

use crate::api::{ApiError, AuthSession, CommerceApi};
use crate::store::{StateStore, clear_slice, keys, load_slice, save_slice};

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Operation requires an authenticated session.
    #[error("not authenticated")]
    NotAuthenticated,

    /// Backend call failed.
    #[error("api error: {0}")]
    Api(#[from] ApiError),
}

/// The current identity of the running client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionIdentity {
    /// Browsing without an account; cart and wishlist are local-only.
    Anonymous,
    /// Logged in; engines mirror mutations to the user's remote store.
    Authenticated {
        user_id: UserId,
        email: Email,
    },
}

impl SessionIdentity {
    /// Whether the client is authenticated.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// The authenticated user id, if any.
    #[must_use]
    pub const fn user_id(&self) -> Option<&UserId> {
        match self {
            Self::Authenticated { user_id, .. } => Some(user_id),
            Self::Anonymous => None,
        }
    }

    /// The authenticated email, if any.
    #[must_use]
    pub const fn email(&self) -> Option<&Email> {
        match self {
            Self::Authenticated { email, .. } => Some(email),
            Self::Anonymous => None,
        }
    }
}

/// A discrete identity transition, consumed once by the composition root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionTransition {
    /// App start with restorable credentials: `(none) -> authenticated`.
    Restored { user_id: UserId },
    /// App start without stored credentials: `(none) -> anonymous`.
    StayedAnonymous,
    /// `anonymous -> authenticated` after a successful remote identity call.
    LoggedIn { user_id: UserId },
    /// `authenticated -> anonymous`, local and unconditional.
    LoggedOut,
}

impl SessionTransition {
    /// The user the client became authenticated as, if this transition
    /// established an identity.
    #[must_use]
    pub const fn authenticated_user(&self) -> Option<&UserId> {
        match self {
            Self::Restored { user_id } | Self::LoggedIn { user_id } => Some(user_id),
            Self::StayedAnonymous | Self::LoggedOut => None,
        }
    }
}

/// Persisted credentials for restore-at-startup. Cleared on logout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredSession {
    user_id: UserId,
    email: Email,
    token: String,
}

/// The identity state machine.
pub struct SessionGate<A, S> {
    api: Arc<A>,
    store: Arc<S>,
    identity: SessionIdentity,
}

impl<A: CommerceApi, S: StateStore> SessionGate<A, S> {
    /// Create a gate in the `Anonymous` state. Call [`Self::restore`] once at
    /// startup to attempt credential restore.
    pub const fn new(api: Arc<A>, store: Arc<S>) -> Self {
        Self {
            api,
            store,
            identity: SessionIdentity::Anonymous,
        }
    }

    /// The current identity.
    #[must_use]
    pub const fn identity(&self) -> &SessionIdentity {
        &self.identity
    }

    /// Attempt to restore an authenticated session from the persisted slice.
    ///
    /// Falls back to `Anonymous` when nothing (or something corrupt) is
    /// stored. The token is not revalidated here; a stale token surfaces as
    /// `Unauthorized` on the next authenticated call.
    pub fn restore(&mut self) -> SessionTransition {
        let stored: Option<StoredSession> = load_slice(&*self.store, keys::SESSION);
        match stored {
            Some(session) => {
                tracing::debug!(user_id = %session.user_id, "restored persisted session");
                self.api.set_bearer(Some(&session.token));
                self.identity = SessionIdentity::Authenticated {
                    user_id: session.user_id.clone(),
                    email: session.email,
                };
                SessionTransition::Restored {
                    user_id: session.user_id,
                }
            }
            None => SessionTransition::StayedAnonymous,
        }
    }

    /// Log in against the backend.
    ///
    /// The state machine only advances after the remote identity call
    /// succeeds; on failure the identity is unchanged and the error is
    /// surfaced to the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` on rejection, or
    /// `AuthError::Api` for transport-level failures.
    pub async fn login(
        &mut self,
        email: &Email,
        password: &str,
    ) -> Result<SessionTransition, AuthError> {
        let session = self
            .api
            .login(email, password)
            .await
            .map_err(map_auth_error)?;
        Ok(self.install(session))
    }

    /// Register a new account; the backend logs the user in on success.
    ///
    /// # Errors
    ///
    /// Same failure surface as [`Self::login`].
    pub async fn register(
        &mut self,
        name: &str,
        email: &Email,
        password: &str,
    ) -> Result<SessionTransition, AuthError> {
        let session = self
            .api
            .register(name, email, password)
            .await
            .map_err(map_auth_error)?;
        Ok(self.install(session))
    }

    /// Log out, locally and unconditionally.
    ///
    /// No remote dependency can block this transition; the persisted session
    /// slice is cleared best-effort and the bearer token dropped.
    pub fn logout(&mut self) -> SessionTransition {
        clear_slice(&*self.store, keys::SESSION);
        self.api.set_bearer(None);
        self.identity = SessionIdentity::Anonymous;
        SessionTransition::LoggedOut
    }

    fn install(&mut self, session: AuthSession) -> SessionTransition {
        save_slice(
            &*self.store,
            keys::SESSION,
            &StoredSession {
                user_id: session.user_id.clone(),
                email: session.email.clone(),
                token: session.token.clone(),
            },
        );
        self.api.set_bearer(Some(&session.token));
        self.identity = SessionIdentity::Authenticated {
            user_id: session.user_id.clone(),
            email: session.email,
        };
        SessionTransition::LoggedIn {
            user_id: session.user_id,
        }
    }
}

fn map_auth_error(e: ApiError) -> AuthError {
    match e {
        ApiError::Unauthorized => AuthError::InvalidCredentials,
        other => AuthError::Api(other),
    }
}
