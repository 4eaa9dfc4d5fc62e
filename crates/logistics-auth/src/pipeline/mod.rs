//! Outbound request pipeline
//!
//! Requests pass through an ordered chain of [`Interceptor`] stages before
//! reaching the [`Transport`]. The standard chain is, outermost first:
//!
//! 1. request logging (non-production only)
//! 2. bearer credential attach with one refresh-and-retry on 401
//! 3. tenant header for API-bound requests
//! 4. error normalization
//!
//! Whatever the chain returns, callers only ever see an [`ApiError`] on
//! failure.

mod error;
mod logging;
mod tenant;
mod token;

use std::sync::Arc;

use async_trait::async_trait;

pub use error::{ApiError, ErrorNormalizationInterceptor, message_for_status};
pub use logging::LoggingInterceptor;
pub use tenant::TenantHeaderInterceptor;
pub use token::BearerTokenInterceptor;

use crate::auth::{AuthSessionController, TenantContextResolver};
use crate::config::Config;
use crate::transport::{ApiRequest, ApiResponse, HttpFailure, Transport};

/// Failure travelling back up the chain
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Http(HttpFailure),
    #[error(transparent)]
    Api(ApiError),
}

impl PipelineError {
    pub const fn status(&self) -> u16 {
        match self {
            Self::Http(failure) => failure.status,
            Self::Api(err) => err.status,
        }
    }

    pub fn into_api_error(self) -> ApiError {
        match self {
            Self::Http(failure) => ApiError::from_failure(&failure),
            Self::Api(err) => err,
        }
    }
}

impl From<HttpFailure> for PipelineError {
    fn from(failure: HttpFailure) -> Self {
        Self::Http(failure)
    }
}

/// One stage of the request chain
#[async_trait]
pub trait Interceptor: Send + Sync {
    fn name(&self) -> &'static str;

    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, PipelineError>;
}

/// Remainder of the chain after the current stage
#[derive(Clone, Copy)]
pub struct Next<'a> {
    stages: &'a [Arc<dyn Interceptor>],
    transport: &'a dyn Transport,
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Next")
            .field("remaining", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl Next<'_> {
    /// Pass the request to the next stage, or the transport at the end
    pub async fn run(self, request: ApiRequest) -> Result<ApiResponse, PipelineError> {
        match self.stages.split_first() {
            Some((stage, rest)) => {
                let next = Next {
                    stages: rest,
                    transport: self.transport,
                };
                stage.intercept(request, next).await
            }
            None => self.transport.send(request).await.map_err(PipelineError::from),
        }
    }
}

/// Ordered chain of interceptors in front of a transport
pub struct RequestPipeline {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for RequestPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<_> = self.stages.iter().map(|s| s.name()).collect();
        f.debug_struct("RequestPipeline")
            .field("stages", &names)
            .finish_non_exhaustive()
    }
}

impl RequestPipeline {
    pub fn builder(transport: Arc<dyn Transport>) -> PipelineBuilder {
        PipelineBuilder {
            stages: Vec::new(),
            transport,
        }
    }

    /// Standard chain for the platform API
    pub fn standard(
        session: &Arc<AuthSessionController>,
        config: &Config,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::builder(transport)
            .stage_if(!config.production, Arc::new(LoggingInterceptor))
            .stage(Arc::new(BearerTokenInterceptor::for_config(
                Arc::clone(session),
                config,
            )))
            .stage(Arc::new(TenantHeaderInterceptor::new(
                TenantContextResolver::new(Arc::clone(session)),
                &config.api_url,
            )))
            .stage(Arc::new(ErrorNormalizationInterceptor::new(
                !config.production,
            )))
            .build()
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse, ApiError> {
        let next = Next {
            stages: &self.stages,
            transport: self.transport.as_ref(),
        };
        next.run(request).await.map_err(PipelineError::into_api_error)
    }
}

pub struct PipelineBuilder {
    stages: Vec<Arc<dyn Interceptor>>,
    transport: Arc<dyn Transport>,
}

impl std::fmt::Debug for PipelineBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineBuilder")
            .field("stages", &self.stages.len())
            .finish_non_exhaustive()
    }
}

impl PipelineBuilder {
    #[must_use]
    pub fn stage(mut self, stage: Arc<dyn Interceptor>) -> Self {
        self.stages.push(stage);
        self
    }

    #[must_use]
    pub fn stage_if(self, enabled: bool, stage: Arc<dyn Interceptor>) -> Self {
        if enabled { self.stage(stage) } else { self }
    }

    pub fn build(self) -> RequestPipeline {
        RequestPipeline {
            stages: self.stages,
            transport: self.transport,
        }
    }
}
