use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;

use super::{Interceptor, Next, PipelineError};
use crate::auth::AuthSessionController;
use crate::config::Config;
use crate::constants::STATIC_ASSETS_PATH;
use crate::transport::{ApiRequest, ApiResponse};

/// Attaches the session bearer token and recovers once from a 401.
///
/// On a 401 the token is force-refreshed and the original request retried a
/// single time. If the refresh fails, a login redirect is started and the
/// original failure is returned.
#[derive(Debug)]
pub struct BearerTokenInterceptor {
    session: Arc<AuthSessionController>,
    excluded: Vec<String>,
}

impl BearerTokenInterceptor {
    pub const fn new(session: Arc<AuthSessionController>, excluded: Vec<String>) -> Self {
        Self { session, excluded }
    }

    /// Excludes static assets and the identity provider itself
    pub fn for_config(session: Arc<AuthSessionController>, config: &Config) -> Self {
        let excluded = vec![
            STATIC_ASSETS_PATH.to_string(),
            config.identity_provider.url.as_str().to_string(),
        ];
        Self::new(session, excluded)
    }

    fn is_excluded(&self, url: &str) -> bool {
        self.excluded.iter().any(|fragment| url.contains(fragment.as_str()))
    }

    async fn retry_after_refresh(
        &self,
        request: ApiRequest,
        next: Next<'_>,
        original: PipelineError,
    ) -> Result<ApiResponse, PipelineError> {
        tracing::debug!(url = %request.url, "Received 401, forcing token refresh");

        if !self.session.refresh_token(true).await {
            tracing::warn!("Token refresh after 401 failed, redirecting to login");
            if let Err(e) = self.session.login(None).await {
                tracing::warn!(error = %e, "Login redirect failed");
            }
            return Err(original);
        }

        match self.session.get_token().await {
            Some(token) => next.run(with_bearer(request, &token)).await,
            None => Err(original),
        }
    }
}

fn with_bearer(mut request: ApiRequest, token: &str) -> ApiRequest {
    request.set_header(AUTHORIZATION.as_str(), &format!("Bearer {token}"));
    request
}

#[async_trait]
impl Interceptor for BearerTokenInterceptor {
    fn name(&self) -> &'static str {
        "bearer-token"
    }

    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, PipelineError> {
        if self.is_excluded(request.url.as_str()) || !self.session.is_authenticated() {
            return next.run(request).await;
        }

        let outgoing = match self.session.get_token().await {
            Some(token) => with_bearer(request.clone(), &token),
            None => request.clone(),
        };

        match next.run(outgoing).await {
            Err(err) if err.status() == 401 => self.retry_after_refresh(request, next, err).await,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use url::Url;

    use super::*;
    use crate::auth::IdentityProviderError;
    use crate::pipeline::RequestPipeline;
    use crate::test_support::{
        ScriptedIdentityClient, ScriptedTransport, session_for, test_config, valid_claims,
    };
    use crate::transport::{HttpFailure, Method};

    fn pipeline(
        session: &Arc<AuthSessionController>,
        transport: &Arc<ScriptedTransport>,
    ) -> RequestPipeline {
        RequestPipeline::builder(transport.clone())
            .stage(Arc::new(BearerTokenInterceptor::for_config(
                Arc::clone(session),
                &test_config(),
            )))
            .build()
    }

    fn get(url: &str) -> ApiRequest {
        ApiRequest::new(Method::GET, Url::parse(url).unwrap())
    }

    #[tokio::test]
    async fn test_attaches_bearer_token() {
        let client = Arc::new(ScriptedIdentityClient::authenticated(valid_claims()));
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());

        pipeline(&session, &transport)
            .send(get("http://localhost:8081/shipments"))
            .await
            .unwrap();
        assert_eq!(
            transport.requests()[0].header("authorization"),
            Some("Bearer token-0")
        );
    }

    #[tokio::test]
    async fn test_excluded_urls_carry_no_token() {
        let client = Arc::new(ScriptedIdentityClient::authenticated(valid_claims()));
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());
        let pipeline = pipeline(&session, &transport);

        pipeline
            .send(get("http://localhost:4200/assets/i18n/en.json"))
            .await
            .unwrap();
        pipeline
            .send(get(
                "http://localhost:8080/realms/logistics/protocol/openid-connect/token",
            ))
            .await
            .unwrap();

        assert!(
            transport
                .requests()
                .iter()
                .all(|r| r.header("authorization").is_none())
        );
        assert_eq!(client.update_calls(), 0);
    }

    #[tokio::test]
    async fn test_anonymous_request_unmodified() {
        let client = Arc::new(ScriptedIdentityClient::anonymous());
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());

        pipeline(&session, &transport)
            .send(get("http://localhost:8081/tracking/T-1"))
            .await
            .unwrap();
        assert!(transport.requests()[0].header("authorization").is_none());
    }

    #[tokio::test]
    async fn test_401_refreshes_and_retries_once() {
        let client = Arc::new(
            ScriptedIdentityClient::authenticated(valid_claims())
                .with_refresh_results(vec![Ok(false), Ok(true), Ok(false)]),
        );
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(HttpFailure::new(401, "http://localhost:8081/shipments")));

        let response = pipeline(&session, &transport)
            .send(get("http://localhost:8081/shipments"))
            .await
            .unwrap();
        assert_eq!(response.status, 200);

        let sent = transport.requests();
        assert_eq!(sent.len(), 2);
        assert_eq!(sent[0].header("authorization"), Some("Bearer token-0"));
        assert_eq!(sent[1].header("authorization"), Some("Bearer token-1"));
        assert_eq!(client.min_validities(), vec![60, -1, 60]);
    }

    #[tokio::test]
    async fn test_second_401_is_not_retried() {
        let client = Arc::new(
            ScriptedIdentityClient::authenticated(valid_claims())
                .with_refresh_results(vec![Ok(false), Ok(true), Ok(false)]),
        );
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(HttpFailure::new(401, "http://localhost:8081/shipments")));
        transport.push(Err(HttpFailure::new(401, "http://localhost:8081/shipments")));

        let err = pipeline(&session, &transport)
            .send(get("http://localhost:8081/shipments"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_failed_refresh_starts_login_and_fails() {
        let client = Arc::new(
            ScriptedIdentityClient::authenticated(valid_claims()).with_refresh_results(vec![
                Ok(false),
                Err(IdentityProviderError::RefreshFailed("invalid_grant".into())),
            ]),
        );
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(HttpFailure::new(401, "http://localhost:8081/shipments")));

        let err = pipeline(&session, &transport)
            .send(get("http://localhost:8081/shipments"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 401);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(client.login_calls(), 1);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_other_errors_pass_through() {
        let client = Arc::new(ScriptedIdentityClient::authenticated(valid_claims()));
        let session = session_for(&client).await;
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(HttpFailure::new(403, "http://localhost:8081/admin")));

        let err = pipeline(&session, &transport)
            .send(get("http://localhost:8081/admin"))
            .await
            .unwrap_err();
        assert_eq!(err.status, 403);
        assert_eq!(transport.requests().len(), 1);
        assert_eq!(client.min_validities(), vec![60]);
    }
}
