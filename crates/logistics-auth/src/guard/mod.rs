//! Navigation guards
//!
//! A [`Guard`] decides whether navigation to a route may proceed. Guards read
//! the session through [`AuthSessionController`](crate::auth::AuthSessionController)
//! and the route's metadata through [`RouteData`]. They never fail: every
//! problem becomes a denial, optionally with a redirect target.

mod builtin;
mod compose;
mod route;

use std::future::Future;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

pub use builtin::{ActorGuard, ActorTypeGuard, AuthGuard, GuardSet, NoAuthGuard, RoleGuard};
pub use compose::{ComposedGuard, compose_guards};
pub use route::RouteData;

/// Decision of a guard
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "target", rename_all = "lowercase")]
pub enum GuardOutcome {
    Allow,
    Deny,
    /// Deny and navigate to the given path instead
    Redirect(String),
}

impl GuardOutcome {
    pub const fn is_allowed(&self) -> bool {
        matches!(self, Self::Allow)
    }

    pub fn redirect_target(&self) -> Option<&str> {
        match self {
            Self::Redirect(target) => Some(target),
            _ => None,
        }
    }
}

impl From<bool> for GuardOutcome {
    fn from(allowed: bool) -> Self {
        if allowed { Self::Allow } else { Self::Deny }
    }
}

/// What a guard sees about the navigation in progress
#[derive(Debug, Clone, Default)]
pub struct GuardContext {
    pub route: RouteData,
    /// Absolute URL being navigated to, when known
    pub location: Option<Url>,
}

impl GuardContext {
    pub const fn new(route: RouteData) -> Self {
        Self {
            route,
            location: None,
        }
    }

    #[must_use]
    pub fn with_location(mut self, location: Url) -> Self {
        self.location = Some(location);
        self
    }

    /// Location without query or fragment
    pub fn location_path_uri(&self) -> Option<String> {
        self.location.as_ref().map(|location| {
            let mut uri = location.clone();
            uri.set_query(None);
            uri.set_fragment(None);
            uri.to_string()
        })
    }
}

#[async_trait]
pub trait Guard: Send + Sync {
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome;
}

/// Guard from a synchronous closure
pub struct FnGuard<F>(F);

impl<F> std::fmt::Debug for FnGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("FnGuard")
    }
}

/// Wrap a synchronous decision function as a guard
pub const fn guard_fn<F>(f: F) -> FnGuard<F>
where
    F: Fn(&GuardContext) -> GuardOutcome + Send + Sync,
{
    FnGuard(f)
}

#[async_trait]
impl<F> Guard for FnGuard<F>
where
    F: Fn(&GuardContext) -> GuardOutcome + Send + Sync,
{
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        (self.0)(ctx)
    }
}

/// Guard from an asynchronous closure
pub struct AsyncFnGuard<F>(F);

impl<F> std::fmt::Debug for AsyncFnGuard<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("AsyncFnGuard")
    }
}

/// Wrap an asynchronous decision function as a guard. The closure receives
/// its own copy of the context.
pub const fn async_guard_fn<F, Fut>(f: F) -> AsyncFnGuard<F>
where
    F: Fn(GuardContext) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome> + Send,
{
    AsyncFnGuard(f)
}

#[async_trait]
impl<F, Fut> Guard for AsyncFnGuard<F>
where
    F: Fn(GuardContext) -> Fut + Send + Sync,
    Fut: Future<Output = GuardOutcome> + Send,
{
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        (self.0)(ctx.clone()).await
    }
}
