use async_trait::async_trait;
use url::Url;

use super::{Interceptor, Next, PipelineError};
use crate::auth::TenantContextResolver;
use crate::constants::TENANT_HEADER;
use crate::transport::{ApiRequest, ApiResponse};

/// Adds the tenant header to requests bound for the platform API
#[derive(Debug)]
pub struct TenantHeaderInterceptor {
    tenant: TenantContextResolver,
    api_prefix: String,
}

impl TenantHeaderInterceptor {
    pub fn new(tenant: TenantContextResolver, api_url: &Url) -> Self {
        Self {
            tenant,
            api_prefix: api_url.as_str().to_string(),
        }
    }
}

#[async_trait]
impl Interceptor for TenantHeaderInterceptor {
    fn name(&self) -> &'static str {
        "tenant-header"
    }

    async fn intercept(
        &self,
        mut request: ApiRequest,
        next: Next<'_>,
    ) -> Result<ApiResponse, PipelineError> {
        if request.url.as_str().starts_with(&self.api_prefix)
            && let Some(agency_id) = self.tenant.current_agency_id()
        {
            request.set_header(TENANT_HEADER, &agency_id);
        }
        next.run(request).await
    }
}
