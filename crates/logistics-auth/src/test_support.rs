//! Shared fixtures for unit tests

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header};
use parking_lot::Mutex;
use tracing_subscriber::fmt::MakeWriter;

use crate::auth::{
    ActorType, AuthSessionController, EventSender, ExecutionContext, IdentityClient,
    IdentityEvent, IdentityProviderError, InitOptions, JwtClaims,
};
use crate::config::{Config, IdentityProviderConfig};
use crate::transport::{ApiRequest, ApiResponse, HttpFailure, Transport};

/// Serializes tests that touch process environment variables
pub static ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());

pub fn test_config() -> Config {
    Config::builder()
        .api_url("http://localhost:8081".parse().unwrap())
        .app_origin("http://localhost:4200".parse().unwrap())
        .identity_provider_url("http://localhost:8080".parse().unwrap())
        .realm("logistics")
        .client_id("logistics-frontend")
        .build()
        .unwrap()
}

pub fn valid_claims() -> JwtClaims {
    let now = Utc::now().timestamp();
    JwtClaims {
        sub: "u1".to_string(),
        exp: now + 3600,
        iat: Some(now),
        iss: Some("http://localhost:8080/realms/logistics".to_string()),
        azp: Some("logistics-frontend".to_string()),
        actor_type: Some(ActorType::AgencyEmployee),
        agency_id: Some("ag-7".to_string()),
        roles: Some(vec!["AGENCY_ADMIN".to_string()]),
    }
}

pub fn encode_token(claims: &JwtClaims) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(b"test-secret"),
    )
    .unwrap()
}

/// Controller over `client` that has already completed its handshake
pub async fn session_for(client: &Arc<ScriptedIdentityClient>) -> Arc<AuthSessionController> {
    let session = AuthSessionController::new(
        Arc::clone(client) as Arc<dyn IdentityClient>,
        test_config(),
        ExecutionContext::Interactive,
    );
    session.init().await;
    session
}

/// Identity client whose answers are scripted by the test
#[derive(Debug)]
pub struct ScriptedIdentityClient {
    init_result: Result<bool, IdentityProviderError>,
    init_delay: Duration,
    refresh_delay: Duration,
    login_error: Option<IdentityProviderError>,
    claims: Mutex<JwtClaims>,
    refresh_results: Mutex<VecDeque<Result<bool, IdentityProviderError>>>,
    authenticated: AtomicBool,
    refreshes: AtomicUsize,
    init_calls: AtomicUsize,
    login_calls: AtomicUsize,
    logout_calls: AtomicUsize,
    min_validities: Mutex<Vec<i64>>,
    redirects: Mutex<Vec<String>>,
    events: Mutex<Option<EventSender>>,
}

impl ScriptedIdentityClient {
    fn with_init(init_result: Result<bool, IdentityProviderError>, claims: JwtClaims) -> Self {
        Self {
            init_result,
            init_delay: Duration::ZERO,
            refresh_delay: Duration::ZERO,
            login_error: None,
            claims: Mutex::new(claims),
            refresh_results: Mutex::new(VecDeque::new()),
            authenticated: AtomicBool::new(false),
            refreshes: AtomicUsize::new(0),
            init_calls: AtomicUsize::new(0),
            login_calls: AtomicUsize::new(0),
            logout_calls: AtomicUsize::new(0),
            min_validities: Mutex::new(Vec::new()),
            redirects: Mutex::new(Vec::new()),
            events: Mutex::new(None),
        }
    }

    pub fn authenticated(claims: JwtClaims) -> Self {
        Self::with_init(Ok(true), claims)
    }

    pub fn anonymous() -> Self {
        Self::with_init(Ok(false), valid_claims())
    }

    pub fn failing_init(error: IdentityProviderError) -> Self {
        Self::with_init(Err(error), valid_claims())
    }

    pub fn with_init_delay(mut self, delay: Duration) -> Self {
        self.init_delay = delay;
        self
    }

    pub fn with_refresh_delay(mut self, delay: Duration) -> Self {
        self.refresh_delay = delay;
        self
    }

    /// Results returned by successive `update_token` calls; `Ok(false)` once exhausted
    pub fn with_refresh_results(self, results: Vec<Result<bool, IdentityProviderError>>) -> Self {
        *self.refresh_results.lock() = results.into();
        self
    }

    pub fn with_login_error(mut self, error: IdentityProviderError) -> Self {
        self.login_error = Some(error);
        self
    }

    pub fn set_claims(&self, claims: JwtClaims) {
        *self.claims.lock() = claims;
    }

    pub fn emit(&self, event: IdentityEvent) {
        if let Some(events) = self.events.lock().as_ref() {
            events.send(event).unwrap();
        }
    }

    pub fn init_calls(&self) -> usize {
        self.init_calls.load(Ordering::SeqCst)
    }

    pub fn update_calls(&self) -> usize {
        self.min_validities.lock().len()
    }

    pub fn login_calls(&self) -> usize {
        self.login_calls.load(Ordering::SeqCst)
    }

    pub fn logout_calls(&self) -> usize {
        self.logout_calls.load(Ordering::SeqCst)
    }

    pub fn min_validities(&self) -> Vec<i64> {
        self.min_validities.lock().clone()
    }

    pub fn redirects(&self) -> Vec<String> {
        self.redirects.lock().clone()
    }
}

#[async_trait]
impl IdentityClient for ScriptedIdentityClient {
    async fn init(
        &self,
        _provider: &IdentityProviderConfig,
        _options: &InitOptions,
        events: EventSender,
    ) -> Result<bool, IdentityProviderError> {
        self.init_calls.fetch_add(1, Ordering::SeqCst);
        *self.events.lock() = Some(events);
        if !self.init_delay.is_zero() {
            tokio::time::sleep(self.init_delay).await;
        }
        let result = self.init_result.clone();
        self.authenticated
            .store(matches!(result, Ok(true)), Ordering::SeqCst);
        result
    }

    async fn login(&self, redirect_uri: &str) -> Result<(), IdentityProviderError> {
        self.login_calls.fetch_add(1, Ordering::SeqCst);
        self.redirects.lock().push(redirect_uri.to_string());
        match &self.login_error {
            Some(error) => Err(error.clone()),
            None => Ok(()),
        }
    }

    async fn logout(&self, redirect_uri: &str) -> Result<(), IdentityProviderError> {
        self.logout_calls.fetch_add(1, Ordering::SeqCst);
        self.authenticated.store(false, Ordering::SeqCst);
        self.redirects.lock().push(redirect_uri.to_string());
        Ok(())
    }

    async fn update_token(&self, min_validity_secs: i64) -> Result<bool, IdentityProviderError> {
        self.min_validities.lock().push(min_validity_secs);
        if !self.refresh_delay.is_zero() {
            tokio::time::sleep(self.refresh_delay).await;
        }
        let result = self
            .refresh_results
            .lock()
            .pop_front()
            .unwrap_or(Ok(false));
        if matches!(result, Ok(true)) {
            self.refreshes.fetch_add(1, Ordering::SeqCst);
        }
        result
    }

    fn authenticated(&self) -> bool {
        self.authenticated.load(Ordering::SeqCst)
    }

    fn token(&self) -> Option<String> {
        self.authenticated()
            .then(|| format!("token-{}", self.refreshes.load(Ordering::SeqCst)))
    }

    fn refresh_token(&self) -> Option<String> {
        self.authenticated().then(|| "refresh-0".to_string())
    }

    fn token_parsed(&self) -> Option<JwtClaims> {
        self.authenticated().then(|| self.claims.lock().clone())
    }
}

/// Transport that records requests and replays queued responses
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<ApiResponse, HttpFailure>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, response: Result<ApiResponse, HttpFailure>) {
        self.responses.lock().push_back(response);
    }

    pub fn push_ok(&self, body: serde_json::Value) {
        self.push(Ok(ApiResponse::ok(serde_json::to_vec(&body).unwrap())));
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(&self, request: ApiRequest) -> Result<ApiResponse, HttpFailure> {
        self.requests.lock().push(request);
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| Ok(ApiResponse::ok(Vec::new())))
    }
}

/// In-memory log sink for scoped subscribers
#[derive(Debug, Clone, Default)]
pub struct LogCapture(Arc<Mutex<Vec<u8>>>);

impl LogCapture {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

impl std::io::Write for LogCapture {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for LogCapture {
    type Writer = Self;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}
