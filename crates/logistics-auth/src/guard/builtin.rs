use std::sync::Arc;

use async_trait::async_trait;

use super::{Guard, GuardContext, GuardOutcome};
use crate::auth::{ActorType, AuthSessionController};
use crate::config::Config;

/// Requires a session, starting a login redirect otherwise.
///
/// Waits for initialization so the decision is never made on a session that
/// is still loading.
#[derive(Debug)]
pub struct AuthGuard {
    session: Arc<AuthSessionController>,
}

impl AuthGuard {
    pub const fn new(session: Arc<AuthSessionController>) -> Self {
        Self { session }
    }
}

#[async_trait]
impl Guard for AuthGuard {
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        self.session.init().await;
        if self.session.is_authenticated() {
            return GuardOutcome::Allow;
        }

        let redirect_uri = ctx
            .location_path_uri()
            .unwrap_or_else(|| self.session.config().origin());
        tracing::debug!(redirect_uri = %redirect_uri, "Not authenticated, starting login");
        if let Err(e) = self.session.login(Some(&redirect_uri)).await {
            tracing::warn!(error = %e, "Login redirect failed");
        }
        GuardOutcome::Deny
    }
}

/// Requires any of the route's `roles`. Routes without roles are open.
#[derive(Debug)]
pub struct RoleGuard {
    session: Arc<AuthSessionController>,
    unauthorized_path: String,
}

impl RoleGuard {
    pub const fn new(session: Arc<AuthSessionController>, unauthorized_path: String) -> Self {
        Self {
            session,
            unauthorized_path,
        }
    }
}

#[async_trait]
impl Guard for RoleGuard {
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        let required = ctx.route.roles();
        if required.is_empty() {
            return GuardOutcome::Allow;
        }
        if self.session.is_authenticated() && self.session.has_any_role(&required) {
            return GuardOutcome::Allow;
        }
        tracing::debug!(required = ?required, "Missing required role");
        GuardOutcome::Redirect(self.unauthorized_path.clone())
    }
}

/// Requires the route's `actorType`. Routes without one are open.
#[derive(Debug)]
pub struct ActorTypeGuard {
    session: Arc<AuthSessionController>,
    unauthorized_path: String,
}

impl ActorTypeGuard {
    pub const fn new(session: Arc<AuthSessionController>, unauthorized_path: String) -> Self {
        Self {
            session,
            unauthorized_path,
        }
    }
}

#[async_trait]
impl Guard for ActorTypeGuard {
    async fn check(&self, ctx: &GuardContext) -> GuardOutcome {
        let Some(required) = ctx.route.actor_type() else {
            return GuardOutcome::Allow;
        };
        if self.session.is_authenticated() && self.session.actor_type() == Some(required) {
            return GuardOutcome::Allow;
        }
        GuardOutcome::Redirect(self.unauthorized_path.clone())
    }
}

/// Requires a fixed actor type regardless of route metadata
#[derive(Debug)]
pub struct ActorGuard {
    session: Arc<AuthSessionController>,
    required: ActorType,
    unauthorized_path: String,
}

impl ActorGuard {
    pub const fn new(
        session: Arc<AuthSessionController>,
        required: ActorType,
        unauthorized_path: String,
    ) -> Self {
        Self {
            session,
            required,
            unauthorized_path,
        }
    }

    fn matches(&self) -> bool {
        match self.required {
            ActorType::AgencyEmployee => self.session.is_agency_employee(),
            ActorType::PlatformAdmin => self.session.is_platform_admin(),
            ActorType::Customer => self.session.is_customer(),
        }
    }
}

#[async_trait]
impl Guard for ActorGuard {
    async fn check(&self, _ctx: &GuardContext) -> GuardOutcome {
        if self.session.is_authenticated() && self.matches() {
            GuardOutcome::Allow
        } else {
            GuardOutcome::Redirect(self.unauthorized_path.clone())
        }
    }
}

/// Only for visitors without a session, e.g. landing and sign-up pages
#[derive(Debug)]
pub struct NoAuthGuard {
    session: Arc<AuthSessionController>,
    authenticated_home: String,
}

impl NoAuthGuard {
    pub const fn new(session: Arc<AuthSessionController>, authenticated_home: String) -> Self {
        Self {
            session,
            authenticated_home,
        }
    }
}

#[async_trait]
impl Guard for NoAuthGuard {
    async fn check(&self, _ctx: &GuardContext) -> GuardOutcome {
        if self.session.is_authenticated() {
            GuardOutcome::Redirect(self.authenticated_home.clone())
        } else {
            GuardOutcome::Allow
        }
    }
}

/// Factory for the built-in guards bound to one session
#[derive(Debug, Clone)]
pub struct GuardSet {
    session: Arc<AuthSessionController>,
    unauthorized_path: String,
    authenticated_home: String,
}

impl GuardSet {
    pub fn new(session: Arc<AuthSessionController>, config: &Config) -> Self {
        Self {
            session,
            unauthorized_path: config.unauthorized_path.clone(),
            authenticated_home: config.authenticated_home.clone(),
        }
    }

    pub fn auth(&self) -> Arc<dyn Guard> {
        Arc::new(AuthGuard::new(Arc::clone(&self.session)))
    }

    pub fn role(&self) -> Arc<dyn Guard> {
        Arc::new(RoleGuard::new(
            Arc::clone(&self.session),
            self.unauthorized_path.clone(),
        ))
    }

    pub fn actor_type(&self) -> Arc<dyn Guard> {
        Arc::new(ActorTypeGuard::new(
            Arc::clone(&self.session),
            self.unauthorized_path.clone(),
        ))
    }

    pub fn agency_employee(&self) -> Arc<dyn Guard> {
        self.actor(ActorType::AgencyEmployee)
    }

    pub fn platform_admin(&self) -> Arc<dyn Guard> {
        self.actor(ActorType::PlatformAdmin)
    }

    pub fn customer(&self) -> Arc<dyn Guard> {
        self.actor(ActorType::Customer)
    }

    pub fn no_auth(&self) -> Arc<dyn Guard> {
        Arc::new(NoAuthGuard::new(
            Arc::clone(&self.session),
            self.authenticated_home.clone(),
        ))
    }

    fn actor(&self, required: ActorType) -> Arc<dyn Guard> {
        Arc::new(ActorGuard::new(
            Arc::clone(&self.session),
            required,
            self.unauthorized_path.clone(),
        ))
    }
}
