//! Observable session state

use std::sync::Arc;

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::watch;

use super::claims::AuthenticatedUser;
use super::error::AuthError;

/// Snapshot of the authentication session
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthSession {
    pub is_authenticated: bool,
    pub is_initialized: bool,
    pub is_loading: bool,
    pub user: Option<AuthenticatedUser>,
    pub error: Option<AuthError>,
}

impl Default for AuthSession {
    fn default() -> Self {
        Self {
            is_authenticated: false,
            is_initialized: false,
            is_loading: true,
            user: None,
            error: None,
        }
    }
}

impl AuthSession {
    /// Signed in as `user`, clearing any previous error
    #[must_use]
    pub fn signed_in(&self, user: AuthenticatedUser) -> Self {
        Self {
            is_authenticated: true,
            user: Some(user),
            error: None,
            ..self.clone()
        }
    }

    /// Anonymous, optionally recording why
    #[must_use]
    pub fn signed_out(&self, error: Option<AuthError>) -> Self {
        Self {
            is_authenticated: false,
            user: None,
            error,
            ..self.clone()
        }
    }
}

/// Lifecycle phase of a session controller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Authenticated,
    /// Authenticated with a token refresh in flight
    Refreshing,
    Anonymous,
    InitFailed,
}

/// Holder of the current session with atomic replace and change notification.
///
/// Reads are lock-free. Writers are serialized so that every update sees the
/// snapshot produced by the previous one.
pub struct SessionStore {
    current: ArcSwap<AuthSession>,
    writer: Mutex<()>,
    changes: watch::Sender<Arc<AuthSession>>,
}

impl SessionStore {
    pub fn new() -> Self {
        let initial = Arc::new(AuthSession::default());
        let (changes, _) = watch::channel(Arc::clone(&initial));
        Self {
            current: ArcSwap::from(initial),
            writer: Mutex::new(()),
            changes,
        }
    }

    pub fn snapshot(&self) -> Arc<AuthSession> {
        self.current.load_full()
    }

    /// Replace the session with the result of `f` applied to the current one
    pub fn update<F>(&self, f: F) -> Arc<AuthSession>
    where
        F: FnOnce(&AuthSession) -> AuthSession,
    {
        let _guard = self.writer.lock();
        let current = self.current.load_full();
        let mut next = f(&current);

        // Initialization is one-way and authentication requires a user
        next.is_initialized |= current.is_initialized;
        if next.user.is_none() {
            next.is_authenticated = false;
        }

        let next = Arc::new(next);
        self.current.store(Arc::clone(&next));
        self.changes.send_replace(Arc::clone(&next));
        next
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthSession>> {
        self.changes.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("current", &self.current.load())
            .finish_non_exhaustive()
    }
}
