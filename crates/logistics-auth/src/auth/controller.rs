//! Session lifecycle controller

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use super::claims::{ActorType, AuthenticatedUser, JwtClaims};
use super::error::{AuthError, AuthErrorCode};
use super::provider::{IdentityClient, IdentityEvent, InitOptions};
use super::refresh::{RefreshHandle, TokenRefreshTask};
use super::session::{AuthSession, SessionPhase, SessionStore};
use crate::config::Config;
use crate::constants::FORCE_REFRESH_MIN_VALIDITY;
use crate::{Error, Result};

/// Where the controller runs.
///
/// A headless context has no user agent to drive redirects, so the identity
/// handshake is skipped and the session stays anonymous.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    #[default]
    Interactive,
    Headless,
}

type InitFlight = Shared<BoxFuture<'static, bool>>;

/// Owner of the authentication session.
///
/// Wraps an [`IdentityClient`], publishes [`AuthSession`] snapshots and keeps
/// the token fresh in the background once a session exists.
pub struct AuthSessionController {
    client: Arc<dyn IdentityClient>,
    config: Config,
    context: ExecutionContext,
    store: SessionStore,
    init_flight: Mutex<Option<InitFlight>>,
    handshake_started: AtomicBool,
    refreshes_in_flight: AtomicUsize,
    refresh_task: Mutex<Option<RefreshHandle>>,
    shutdown: CancellationToken,
}

impl std::fmt::Debug for AuthSessionController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSessionController")
            .field("context", &self.context)
            .field("session", &self.store)
            .field("refresh_timer", &self.is_refresh_timer_running())
            .finish_non_exhaustive()
    }
}

impl AuthSessionController {
    pub fn new(
        client: Arc<dyn IdentityClient>,
        config: Config,
        context: ExecutionContext,
    ) -> Arc<Self> {
        Arc::new(Self {
            client,
            config,
            context,
            store: SessionStore::new(),
            init_flight: Mutex::new(None),
            handshake_started: AtomicBool::new(false),
            refreshes_in_flight: AtomicUsize::new(0),
            refresh_task: Mutex::new(None),
            shutdown: CancellationToken::new(),
        })
    }

    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// Initialize with options derived from configuration
    pub async fn init(self: &Arc<Self>) -> bool {
        self.init_with(InitOptions::for_config(&self.config)).await
    }

    /// Initialize the identity client at most once.
    ///
    /// Concurrent and repeated callers share the first handshake and observe
    /// its result. Never fails; failures are recorded on the session.
    pub async fn init_with(self: &Arc<Self>, options: InitOptions) -> bool {
        let flight = {
            let mut slot = self.init_flight.lock();
            if let Some(flight) = slot.as_ref() {
                flight.clone()
            } else {
                let weak = Arc::downgrade(self);
                let flight = async move {
                    match weak.upgrade() {
                        Some(controller) => controller.run_handshake(options).await,
                        None => false,
                    }
                }
                .boxed()
                .shared();
                *slot = Some(flight.clone());
                flight
            }
        };
        flight.await
    }

    async fn run_handshake(self: Arc<Self>, options: InitOptions) -> bool {
        if self.context == ExecutionContext::Headless {
            tracing::warn!("Skipping identity handshake in headless context");
            self.store.update(|s| AuthSession {
                is_initialized: true,
                is_loading: false,
                ..s.clone()
            });
            return false;
        }

        let (events_tx, events_rx) = mpsc::unbounded_channel();
        self.spawn_event_pump(events_rx);
        self.handshake_started.store(true, Ordering::Release);

        tracing::debug!(
            realm = %self.config.identity_provider.realm,
            client_id = %self.config.identity_provider.client_id,
            on_load = ?options.on_load,
            "Initializing identity client"
        );

        match self
            .client
            .init(&self.config.identity_provider, &options, events_tx)
            .await
        {
            Ok(authenticated) => {
                let user = if authenticated {
                    self.client.token_parsed().map(|c| AuthenticatedUser::from_claims(&c))
                } else {
                    None
                };
                let session = self.store.update(|s| {
                    let next = match user {
                        Some(user) => s.signed_in(user),
                        None => s.signed_out(s.error.clone()),
                    };
                    AuthSession {
                        is_initialized: true,
                        is_loading: false,
                        ..next
                    }
                });

                if session.is_authenticated {
                    self.start_refresh_timer();
                }
                tracing::info!(
                    authenticated = session.is_authenticated,
                    "Identity client initialized"
                );
                session.is_authenticated
            }
            Err(e) => {
                tracing::error!(error = %e, "Identity client initialization failed");
                self.store.update(|s| AuthSession {
                    is_initialized: true,
                    is_loading: false,
                    ..s.signed_out(Some(AuthError::initialization_failed(e.to_string())))
                });
                false
            }
        }
    }

    fn spawn_event_pump(self: &Arc<Self>, mut events: mpsc::UnboundedReceiver<IdentityEvent>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    event = events.recv() => {
                        let Some(event) = event else { break };
                        let Some(controller) = weak.upgrade() else { break };
                        controller.handle_event(event).await;
                    }
                    () = shutdown.cancelled() => break,
                }
            }
        });
    }

    /// Apply an identity client lifecycle event to the session
    pub async fn handle_event(&self, event: IdentityEvent) {
        tracing::debug!(event = ?event, "Identity event");
        match event {
            IdentityEvent::AuthSuccess | IdentityEvent::AuthRefreshSuccess => {
                self.apply_current_claims();
            }
            IdentityEvent::AuthError(details) => {
                self.store.update(|s| {
                    s.signed_out(Some(
                        AuthError::new(AuthErrorCode::LoginFailed, "Authentication error")
                            .with_details(details),
                    ))
                });
            }
            IdentityEvent::AuthRefreshError => self.handle_refresh_failure(),
            IdentityEvent::TokenExpired => {
                tracing::warn!("Token expired, attempting refresh");
                self.refresh_token(true).await;
            }
            IdentityEvent::AuthLogout => {
                self.stop_refresh_timer();
                self.store.update(|s| s.signed_out(None));
            }
        }
    }

    /// Start the identity provider login redirect.
    ///
    /// Redirects back to `redirect_uri`, or the application origin.
    pub async fn login(&self, redirect_uri: Option<&str>) -> Result<()> {
        self.ensure_handshake_started()?;
        self.store.update(|s| AuthSession {
            is_loading: true,
            ..s.clone()
        });

        let target = redirect_uri.map_or_else(|| self.config.origin(), ToString::to_string);
        tracing::info!(redirect_uri = %target, "Starting login");

        if let Err(e) = self.client.login(&target).await {
            tracing::error!(error = %e, "Login failed");
            let err = AuthError::login_failed(e.to_string());
            self.store.update(|s| AuthSession {
                is_loading: false,
                error: Some(err.clone()),
                ..s.clone()
            });
            return Err(err.into());
        }
        Ok(())
    }

    /// End the session locally and at the identity provider
    pub async fn logout(&self, redirect_uri: Option<&str>) -> Result<()> {
        self.ensure_handshake_started()?;
        self.stop_refresh_timer();
        self.store.update(|s| AuthSession {
            is_loading: false,
            ..s.signed_out(None)
        });

        let target = redirect_uri.map_or_else(|| self.config.origin(), ToString::to_string);
        tracing::info!(redirect_uri = %target, "Logging out");
        self.client.logout(&target).await?;
        Ok(())
    }

    /// Current access token, refreshed first if it is about to expire.
    ///
    /// Returns `None` when there is no session or the refresh failed; a failed
    /// refresh also ends the session.
    pub async fn get_token(&self) -> Option<String> {
        if !self.handshake_started() || !self.client.authenticated() {
            return None;
        }

        let result = {
            let _refreshing = self.begin_refresh();
            self.client
                .update_token(self.config.token_refresh_threshold_secs)
                .await
        };
        match result {
            Ok(refreshed) => {
                if refreshed {
                    self.apply_current_claims();
                }
                self.client.token()
            }
            Err(e) => {
                tracing::warn!(error = %e, "Token refresh failed");
                self.handle_refresh_failure();
                None
            }
        }
    }

    /// Refresh the token, unconditionally when `force` is set.
    ///
    /// Returns true on success even if no refresh was needed.
    pub async fn refresh_token(&self, force: bool) -> bool {
        if !self.handshake_started() {
            return false;
        }

        let min_validity = if force {
            FORCE_REFRESH_MIN_VALIDITY
        } else {
            self.config.token_refresh_threshold_secs
        };

        let result = {
            let _refreshing = self.begin_refresh();
            self.client.update_token(min_validity).await
        };
        match result {
            Ok(refreshed) => {
                if refreshed {
                    tracing::debug!("Token refreshed");
                    self.apply_current_claims();
                }
                true
            }
            Err(e) => {
                tracing::warn!(error = %e, force, "Token refresh failed");
                self.handle_refresh_failure();
                false
            }
        }
    }

    /// One tick of the background refresh. Failures are logged only.
    pub(crate) async fn periodic_refresh(&self) {
        if !self.client.authenticated() {
            return;
        }
        let result = {
            let _refreshing = self.begin_refresh();
            self.client
                .update_token(self.config.token_refresh_threshold_secs)
                .await
        };
        match result {
            Ok(true) => {
                tracing::debug!("Token refreshed in background");
                self.apply_current_claims();
            }
            Ok(false) => {}
            Err(e) => tracing::warn!(error = %e, "Background token refresh failed"),
        }
    }

    fn begin_refresh(&self) -> RefreshInFlight<'_> {
        self.refreshes_in_flight.fetch_add(1, Ordering::AcqRel);
        RefreshInFlight(&self.refreshes_in_flight)
    }

    fn apply_current_claims(&self) {
        let Some(claims) = self.client.token_parsed() else {
            return;
        };
        let user = AuthenticatedUser::from_claims(&claims);
        tracing::debug!(
            user_id = %user.id,
            actor_type = %user.actor_type,
            "Session user updated"
        );
        self.store.update(|s| s.signed_in(user));
    }

    fn handle_refresh_failure(&self) {
        self.stop_refresh_timer();
        self.store
            .update(|s| s.signed_out(Some(AuthError::refresh_failed())));
    }

    fn start_refresh_timer(self: &Arc<Self>) {
        let handle = TokenRefreshTask::new(Arc::downgrade(self), self.config.refresh_interval)
            .spawn(self.shutdown.child_token());
        if let Some(previous) = self.refresh_task.lock().replace(handle) {
            previous.stop();
        }
    }

    fn stop_refresh_timer(&self) {
        if let Some(handle) = self.refresh_task.lock().take() {
            handle.stop();
            tracing::debug!("Token refresh timer stopped");
        }
    }

    pub fn is_refresh_timer_running(&self) -> bool {
        self.refresh_task
            .lock()
            .as_ref()
            .is_some_and(RefreshHandle::is_running)
    }

    fn handshake_started(&self) -> bool {
        self.handshake_started.load(Ordering::Acquire)
    }

    fn ensure_handshake_started(&self) -> Result<()> {
        if self.handshake_started() {
            Ok(())
        } else {
            Err(Error::NotInitialized)
        }
    }

    /// Stop background work. The controller stays readable afterwards.
    pub fn dispose(&self) {
        self.stop_refresh_timer();
        self.shutdown.cancel();
    }

    pub fn state(&self) -> Arc<AuthSession> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<AuthSession>> {
        self.store.subscribe()
    }

    pub fn phase(&self) -> SessionPhase {
        let session = self.state();
        if !session.is_initialized {
            return if self.init_flight.lock().is_some() {
                SessionPhase::Initializing
            } else {
                SessionPhase::Uninitialized
            };
        }
        if session.is_authenticated {
            if self.refreshes_in_flight.load(Ordering::Acquire) > 0 {
                SessionPhase::Refreshing
            } else {
                SessionPhase::Authenticated
            }
        } else if session
            .error
            .as_ref()
            .is_some_and(|e| e.code == AuthErrorCode::InitializationFailed)
        {
            SessionPhase::InitFailed
        } else {
            SessionPhase::Anonymous
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().is_authenticated
    }

    pub fn is_initialized(&self) -> bool {
        self.state().is_initialized
    }

    pub fn is_loading(&self) -> bool {
        self.state().is_loading
    }

    pub fn user(&self) -> Option<AuthenticatedUser> {
        self.state().user.clone()
    }

    pub fn error(&self) -> Option<AuthError> {
        self.state().error.clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.state().user.as_ref().map(|u| u.id.clone())
    }

    pub fn actor_type(&self) -> Option<ActorType> {
        self.state().user.as_ref().map(|u| u.actor_type)
    }

    pub fn agency_id(&self) -> Option<String> {
        self.state().user.as_ref().and_then(|u| u.agency_id.clone())
    }

    pub fn roles(&self) -> Vec<String> {
        self.state()
            .user
            .as_ref()
            .map(|u| u.roles.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.state().user.as_ref().is_some_and(|u| u.has_role(role))
    }

    pub fn has_any_role<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.state()
            .user
            .as_ref()
            .is_some_and(|u| u.has_any_role(roles))
    }

    pub fn has_all_roles<S: AsRef<str>>(&self, roles: &[S]) -> bool {
        self.state()
            .user
            .as_ref()
            .is_some_and(|u| u.has_all_roles(roles))
    }

    pub fn belongs_to_agency(&self, agency_id: &str) -> bool {
        self.state()
            .user
            .as_ref()
            .is_some_and(|u| u.belongs_to_agency(agency_id))
    }

    pub fn is_agency_employee(&self) -> bool {
        self.actor_type() == Some(ActorType::AgencyEmployee)
    }

    pub fn is_platform_admin(&self) -> bool {
        self.actor_type() == Some(ActorType::PlatformAdmin)
    }

    pub fn is_customer(&self) -> bool {
        self.actor_type() == Some(ActorType::Customer)
    }

    pub fn refresh_token_value(&self) -> Option<String> {
        self.client.refresh_token()
    }

    pub fn token_claims(&self) -> Option<JwtClaims> {
        self.client.token_parsed()
    }
}

/// Marks a token refresh as in flight until dropped
struct RefreshInFlight<'a>(&'a AtomicUsize);

impl Drop for RefreshInFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::AcqRel);
    }
}

impl Drop for AuthSessionController {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
