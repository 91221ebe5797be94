//! Session store — owns the token, the user profile, and every transition
//! between them.
//!
//! STATES
//! ======
//! ```text
//!   Anonymous ──login──▶ Authenticating{None} ──token──▶ Authenticating{T} ──me──▶ Authenticated{T, user}
//!       ▲                      │ exchange failed                 │ me failed               │
//!       │                      ▼                                 ▼                         │
//!       │               (previous state)                     Anonymous ◀──logout / 401─────┘
//!       │
//!   restore(T) ──▶ Unverified{T} ──fetch_me──▶ Authenticating{T} ──▶ Authenticated | Anonymous | Unverified
//! ```
//!
//! A user only exists inside `Authenticated`, so clearing the token drops the
//! user in the same transition.
//!
//! CONCURRENCY
//! ===========
//! Mutating operations take `&mut self`, so one store never runs two
//! transitions at once. Share a store between tasks behind
//! `Arc<tokio::sync::Mutex<SessionStore<_, _>>>`. Observers follow state
//! changes through [`SessionStore::subscribe`].
//!
//! A `login` or `fetch_me` future dropped mid-request rolls the store back:
//! to the state it started from while no token has arrived, to
//! `Unverified{T}` once the exchanged token has been persisted.

use std::fmt;

use tokio::sync::watch;

use crate::error::SessionError;
use crate::net::api::AuthApi;
use crate::net::types::{
    Credentials, Profile, ProfilePatch, ProfileUpdate, REDACTED, Registration,
};
use crate::storage::TokenStore;

/// Where the session currently is in its lifecycle.
///
/// `Debug` output never includes the token.
#[derive(Clone, PartialEq, Default)]
pub enum SessionState {
    /// No token held.
    #[default]
    Anonymous,
    /// Token held but identity not fetched yet (restored from storage or set
    /// directly).
    Unverified { token: String },
    /// A login or identity fetch is in flight. `token` is `None` until the
    /// credential exchange has returned.
    Authenticating { token: Option<String> },
    /// Token and profile both loaded.
    Authenticated { token: String, user: Profile },
}

impl SessionState {
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        match self {
            Self::Anonymous | Self::Authenticating { token: None } => None,
            Self::Unverified { token }
            | Self::Authenticating { token: Some(token) }
            | Self::Authenticated { token, .. } => Some(token),
        }
    }

    #[must_use]
    pub fn user(&self) -> Option<&Profile> {
        match self {
            Self::Authenticated { user, .. } => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Authenticating { .. })
    }

    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Anonymous => "anonymous",
            Self::Unverified { .. } => "unverified",
            Self::Authenticating { .. } => "authenticating",
            Self::Authenticated { .. } => "authenticated",
        }
    }
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Anonymous => f.write_str("Anonymous"),
            Self::Unverified { .. } => {
                f.debug_struct("Unverified").field("token", &REDACTED).finish()
            }
            Self::Authenticating { token } => f
                .debug_struct("Authenticating")
                .field("token", &token.as_ref().map(|_| REDACTED))
                .finish(),
            Self::Authenticated { user, .. } => f
                .debug_struct("Authenticated")
                .field("token", &REDACTED)
                .field("user", user)
                .finish(),
        }
    }
}

/// Outcome of the best-effort course enrichment step.
///
/// Callers may inspect it; nothing requires them to.
#[derive(Debug)]
pub enum Enrichment {
    /// Course fields were merged into the user.
    Merged,
    /// No identified user, nothing fetched.
    Skipped,
    /// The fetch failed; the user is unchanged.
    Failed(SessionError),
}

impl Enrichment {
    #[must_use]
    pub fn is_merged(&self) -> bool {
        matches!(self, Self::Merged)
    }
}

// =============================================================================
// STORE
// =============================================================================

pub struct SessionStore<A, S> {
    api: A,
    storage: S,
    state: SessionState,
    notify: watch::Sender<SessionState>,
}

impl<A: AuthApi, S: TokenStore> SessionStore<A, S> {
    /// Build a store from whatever token `storage` holds. A stored token
    /// starts the session `Unverified`; a missing or unreadable one starts it
    /// `Anonymous`.
    pub fn restore(api: A, storage: S) -> Self {
        let state = match storage.load() {
            Ok(Some(token)) => SessionState::Unverified { token },
            Ok(None) => SessionState::Anonymous,
            Err(e) => {
                tracing::warn!(error = %e, "token storage unreadable; starting anonymous");
                SessionState::Anonymous
            }
        };
        let (notify, _) = watch::channel(state.clone());
        Self { api, storage, state, notify }
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.state.token()
    }

    #[must_use]
    pub fn user(&self) -> Option<&Profile> {
        self.state.user()
    }

    #[must_use]
    pub fn has_token(&self) -> bool {
        self.token().is_some()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        matches!(self.state, SessionState::Authenticated { .. })
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.state.is_loading()
    }

    /// Receive every state transition from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.notify.subscribe()
    }

    #[must_use]
    pub fn api(&self) -> &A {
        &self.api
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn transition(&mut self, next: SessionState) {
        if self.state.label() != next.label() {
            tracing::debug!(from = self.state.label(), to = next.label(), "session transition");
        }
        self.state = next;
        self.notify.send_replace(self.state.clone());
    }

    /// Move into `Authenticating`, keeping the held token. The returned guard
    /// restores the prior state unless the operation settles it, including
    /// when the future driving the operation is dropped mid-request.
    fn begin_loading(&mut self) -> InFlight<'_, A, S> {
        let token = self.token().map(str::to_owned);
        let rollback = Some(self.state.clone());
        self.transition(SessionState::Authenticating { token });
        InFlight { store: self, rollback }
    }

    // =========================================================================
    // TOKEN
    // =========================================================================

    /// Set or clear the token and persist the change. Clearing drops the user
    /// in the same transition. No network call.
    ///
    /// Persistence failures are logged; the in-memory state still changes.
    pub fn set_token(&mut self, token: Option<String>) {
        match token {
            Some(token) => {
                if let Err(e) = self.storage.save(&token) {
                    tracing::warn!(error = %e, "failed to persist token");
                }
                self.transition(SessionState::Unverified { token });
            }
            None => {
                if let Err(e) = self.storage.clear() {
                    tracing::warn!(error = %e, "failed to clear persisted token");
                }
                self.transition(SessionState::Anonymous);
            }
        }
    }

    /// Clear token and user unconditionally.
    pub fn logout(&mut self) {
        tracing::info!(user_id = ?self.user().map(|u| u.user_id), "logout");
        self.set_token(None);
    }

    // =========================================================================
    // LOGIN / IDENTITY
    // =========================================================================

    /// Exchange credentials for a token, load the identity, then enrich it.
    ///
    /// # Errors
    ///
    /// - Credential exchange failure: returned as-is, session left as it was.
    /// - Identity fetch failure: the session is fully cleared, then the error
    ///   is returned.
    ///
    /// Enrichment failures are logged and never returned.
    pub async fn login(&mut self, email: &str, password: &str) -> Result<Profile, SessionError> {
        let credentials = Credentials { email: email.to_owned(), password: password.to_owned() };

        {
            let mut op = self.begin_loading();
            let exchanged = op.store.api.login(&credentials).await;
            let token = match exchanged {
                Ok(resp) => resp.access_token,
                Err(e) => {
                    tracing::warn!(error = %e, "credential exchange failed");
                    return Err(e);
                }
            };

            // The token is persisted from here on; abandoning the identity
            // fetch leaves it held but unverified.
            op.store.set_token(Some(token.clone()));
            op.rollback_to(SessionState::Unverified { token: token.clone() });
            op.store
                .transition(SessionState::Authenticating { token: Some(token.clone()) });

            let identity = op.store.api.me(&token).await;
            match identity {
                Ok(user) => {
                    tracing::info!(user_id = user.user_id, "logged in");
                    op.settle(SessionState::Authenticated { token, user });
                }
                Err(e) => {
                    tracing::warn!(error = %e, "identity fetch after login failed; clearing session");
                    op.clear();
                    return Err(e);
                }
            }
        }

        self.fetch_user_with_course_info().await;
        self.user().cloned().ok_or(SessionError::NotAuthenticated)
    }

    /// Reload the identity for the held token.
    ///
    /// Returns `None` without any request when no token is held. A 401 clears
    /// the session and returns `None`; other failures are logged, the
    /// previous state is kept, and `None` is returned.
    pub async fn fetch_me(&mut self) -> Option<Profile> {
        let Some(token) = self.token().map(str::to_owned) else {
            tracing::debug!("no token; skipping identity fetch");
            return None;
        };

        let loaded = {
            let op = self.begin_loading();
            let identity = op.store.api.me(&token).await;
            match identity {
                Ok(user) => {
                    tracing::info!(user_id = user.user_id, "identity loaded");
                    op.settle(SessionState::Authenticated { token, user });
                    true
                }
                Err(e) if e.is_unauthorized() => {
                    tracing::warn!("token rejected; clearing session");
                    op.clear();
                    false
                }
                Err(e) => {
                    tracing::error!(error = %e, "identity fetch failed");
                    false
                }
            }
        };
        if !loaded {
            return None;
        }

        self.fetch_user_with_course_info().await;
        self.user().cloned()
    }

    /// Best-effort merge of enrollment fields into the current user. Never
    /// fails the caller.
    pub async fn fetch_user_with_course_info(&mut self) -> Enrichment {
        let SessionState::Authenticated { token, user } = &self.state else {
            tracing::debug!("no identified user; skipping course info");
            return Enrichment::Skipped;
        };
        let user_id = user.user_id;

        match self.api.user_with_course(token, user_id).await {
            Ok(patch) => {
                self.update_user_data(patch);
                tracing::info!(
                    user_id,
                    role = ?self.user().and_then(Profile::role),
                    courses_count = ?self.user().and_then(Profile::courses_count),
                    "course info merged"
                );
                Enrichment::Merged
            }
            Err(e) => {
                tracing::warn!(user_id, error = %e, "course info fetch failed");
                Enrichment::Failed(e)
            }
        }
    }

    /// Startup hook: fetch the identity only if a token is held and no user
    /// is loaded. Safe to call repeatedly.
    pub async fn check_and_restore_auth(&mut self) -> Option<Profile> {
        match &self.state {
            SessionState::Unverified { .. } => {
                tracing::info!("token present without user; restoring session");
                self.fetch_me().await
            }
            SessionState::Authenticated { user, .. } => Some(user.clone()),
            SessionState::Anonymous | SessionState::Authenticating { .. } => None,
        }
    }

    /// Shallow-merge `patch` into the current user; no-op without one.
    pub fn update_user_data(&mut self, patch: ProfilePatch) {
        if let SessionState::Authenticated { user, .. } = &mut self.state {
            user.merge(patch);
            self.notify.send_replace(self.state.clone());
        }
    }

    // =========================================================================
    // ACCOUNT
    // =========================================================================

    /// Create an account. Does not log in and leaves the session untouched.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection (e.g. 400 for a taken email) or a
    /// transport error.
    pub async fn register(&self, form: &Registration) -> Result<Profile, SessionError> {
        let profile = self.api.register(form).await?;
        tracing::info!(user_id = profile.user_id, "account registered");
        Ok(profile)
    }

    /// Fetch any user's public profile. Leaves the session untouched.
    ///
    /// # Errors
    ///
    /// Returns the server's rejection or a transport error.
    pub async fn public_profile(&self, user_id: i64) -> Result<Profile, SessionError> {
        self.api.user(user_id).await
    }

    /// Save changes to the current user's profile and merge the server's copy
    /// back in. A 401 clears the session.
    ///
    /// # Errors
    ///
    /// `NotAuthenticated` without a loaded user; otherwise the server's
    /// rejection or a transport error.
    pub async fn update_profile(&mut self, update: &ProfileUpdate) -> Result<Profile, SessionError> {
        let SessionState::Authenticated { token, user } = &self.state else {
            return Err(SessionError::NotAuthenticated);
        };
        let user_id = user.user_id;

        match self.api.update_user(token, user_id, update).await {
            Ok(saved) => {
                let mut patch = saved.fields;
                patch.insert("user_id".into(), saved.user_id.into());
                self.update_user_data(patch);
                tracing::info!(user_id, "profile updated");
                self.user().cloned().ok_or(SessionError::NotAuthenticated)
            }
            Err(e) => {
                if e.is_unauthorized() {
                    tracing::warn!(user_id, "token rejected on profile update; clearing session");
                    self.set_token(None);
                }
                Err(e)
            }
        }
    }
}

// =============================================================================
// IN-FLIGHT GUARD
// =============================================================================

/// Exclusive hold on a store while a request is outstanding. Dropping it
/// without [`InFlight::settle`] or [`InFlight::clear`] puts the rollback state
/// back, so a cancelled operation never leaves the store `Authenticating`.
struct InFlight<'s, A: AuthApi, S: TokenStore> {
    store: &'s mut SessionStore<A, S>,
    rollback: Option<SessionState>,
}

impl<A: AuthApi, S: TokenStore> InFlight<'_, A, S> {
    fn rollback_to(&mut self, state: SessionState) {
        self.rollback = Some(state);
    }

    fn settle(mut self, state: SessionState) {
        self.rollback = None;
        self.store.transition(state);
    }

    fn clear(mut self) {
        self.rollback = None;
        self.store.set_token(None);
    }
}

impl<A: AuthApi, S: TokenStore> Drop for InFlight<'_, A, S> {
    fn drop(&mut self) {
        if let Some(state) = self.rollback.take() {
            tracing::debug!(to = state.label(), "session operation unsettled; rolling back");
            self.store.transition(state);
        }
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
