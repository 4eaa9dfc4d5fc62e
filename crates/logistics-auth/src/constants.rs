//! Constants for session management and request shaping

use std::time::Duration;

/// Interval of the background token refresh check
pub const TOKEN_REFRESH_INTERVAL: Duration = Duration::from_secs(30);

/// Seconds before expiry at which a token is refreshed on demand
pub const DEFAULT_TOKEN_REFRESH_THRESHOLD_SECS: i64 = 60;

/// Minimum validity passed to the identity client to force a refresh
pub const FORCE_REFRESH_MIN_VALIDITY: i64 = -1;

/// Header carrying the resolved agency for API requests
pub const TENANT_HEADER: &str = "x-tenant-id";

/// Path fragment of static assets, never sent with credentials
pub const STATIC_ASSETS_PATH: &str = "/assets/";

/// Route shown when an authenticated user lacks access
pub const DEFAULT_UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Landing route for authenticated users
pub const DEFAULT_AUTHENTICATED_HOME: &str = "/dashboard";

/// Page used by the identity provider for silent session checks
pub const DEFAULT_SILENT_CHECK_SSO_PATH: &str = "/silent-check-sso.html";

/// Default timeout for outbound API requests
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Default multipart field name for file uploads
pub const DEFAULT_UPLOAD_FIELD: &str = "file";

/// Route metadata key holding the required roles
pub const ROUTE_ROLES_KEY: &str = "roles";

/// Route metadata key holding the required actor type
pub const ROUTE_ACTOR_TYPE_KEY: &str = "actorType";
