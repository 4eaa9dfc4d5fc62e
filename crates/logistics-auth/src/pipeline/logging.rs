use std::time::Instant;

use async_trait::async_trait;

use super::{Interceptor, Next, PipelineError};
use crate::transport::{ApiRequest, ApiResponse};

/// Logs failed requests with timing. Successful requests and headers are
/// never logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingInterceptor;

#[async_trait]
impl Interceptor for LoggingInterceptor {
    fn name(&self) -> &'static str {
        "logging"
    }

    async fn intercept(
        &self,
        request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, PipelineError> {
        let started = Instant::now();
        let method = request.method.clone();
        let url = request.url.clone();

        let result = next.run(request).await;
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        if let Err(err) = &result {
            tracing::warn!(
                method = %method,
                url = %url,
                status = err.status(),
                duration_ms,
                "HTTP request failed"
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use url::Url;

    use super::*;
    use crate::pipeline::RequestPipeline;
    use crate::test_support::{LogCapture, ScriptedTransport};
    use crate::transport::{HttpFailure, Method};

    #[tokio::test]
    async fn test_passes_result_through() {
        let transport = Arc::new(ScriptedTransport::new());
        transport.push(Err(HttpFailure::new(500, "http://localhost:8081/x")));
        let pipeline = RequestPipeline::builder(transport.clone())
            .stage(Arc::new(LoggingInterceptor))
            .build();
        let request = ApiRequest::new(Method::GET, Url::parse("http://localhost:8081/x").unwrap());

        let err = pipeline.send(request.clone()).await.unwrap_err();
        assert_eq!(err.status, 500);
        assert!(pipeline.send(request).await.is_ok());
        assert_eq!(transport.requests().len(), 2);
    }

    #[tokio::test]
    async fn test_logs_only_failed_requests() {
        let logs = LogCapture::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_ansi(false)
            .with_writer(logs.clone())
            .finish();
        let _default = tracing::subscriber::set_default(subscriber);

        let transport = Arc::new(ScriptedTransport::new());
        let pipeline = RequestPipeline::builder(transport.clone())
            .stage(Arc::new(LoggingInterceptor))
            .build();
        let request = ApiRequest::new(Method::GET, Url::parse("http://localhost:8081/x").unwrap());

        pipeline.send(request.clone()).await.unwrap();
        assert!(logs.contents().is_empty());

        transport.push(Err(HttpFailure::new(503, "http://localhost:8081/x")));
        pipeline.send(request).await.unwrap_err();
        let output = logs.contents();
        assert!(output.contains("HTTP request failed"));
        assert!(output.contains("status=503"));
        assert!(!output.contains("Authorization"));
    }
}
