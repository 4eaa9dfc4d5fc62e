//! Tenant (agency) resolution for the current session

use std::sync::Arc;

use serde::Serialize;

use super::claims::ActorType;
use super::controller::AuthSessionController;
use crate::{Error, Result};

/// Tenant scoping applied to outbound API calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiTenantContext {
    pub agency_id: Option<String>,
    pub enforced: bool,
}

/// Derives the effective tenant from the session.
///
/// Only agency employees are scoped to an agency. Customers and platform
/// administrators have no tenant and see data across agencies.
#[derive(Debug, Clone)]
pub struct TenantContextResolver {
    session: Arc<AuthSessionController>,
}

impl TenantContextResolver {
    #[must_use]
    pub const fn new(session: Arc<AuthSessionController>) -> Self {
        Self { session }
    }

    pub fn current_agency_id(&self) -> Option<String> {
        let user = self.session.user()?;
        if user.actor_type == ActorType::AgencyEmployee {
            user.agency_id
        } else {
            None
        }
    }

    pub fn has_tenant_context(&self) -> bool {
        self.current_agency_id().is_some()
    }

    pub fn is_multi_tenant(&self) -> bool {
        self.session.is_platform_admin()
    }

    pub fn api_tenant_context(&self) -> ApiTenantContext {
        let agency_id = self.current_agency_id();
        ApiTenantContext {
            enforced: agency_id.is_some(),
            agency_id,
        }
    }

    /// Whether the session may access data belonging to `agency_id`
    pub fn validate_tenant_access(&self, agency_id: &str) -> bool {
        if self.is_multi_tenant() {
            return true;
        }
        self.current_agency_id().as_deref() == Some(agency_id)
    }

    /// Agency to stamp on a newly created tenant-scoped resource
    pub fn create_tenant_id(&self) -> Result<String> {
        self.current_agency_id().ok_or(Error::NoTenantContext)
    }
}
