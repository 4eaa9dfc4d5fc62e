use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use logistics_auth::auth::{
    AuthSessionController, ExecutionContext, StaticTokenClient, TenantContextResolver,
};
use logistics_auth::config::{self, Config};
use logistics_auth::guard::{GuardContext, GuardOutcome, GuardSet, RouteData, compose_guards};
use logistics_auth::observability::init_observability;
use logistics_auth::pipeline::RequestPipeline;
use logistics_auth::transport::{ApiClient, Method, ReqwestTransport, RequestBody};
use logistics_auth::{ActorType, Guard, RequestOptions};
use serde_json::json;
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "logistics-auth")]
#[command(about = "Inspect and exercise a logistics platform session", long_about = None)]
#[command(version)]
struct Args {
    /// Configuration file path
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Platform API base URL
    #[arg(long)]
    api_url: Option<Url>,

    /// Access token issued by the identity provider
    #[arg(long, env = "LOGISTICS_ACCESS_TOKEN", hide_env_values = true)]
    token: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable JSON logging output
    #[arg(long)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the session and tenant context derived from the token
    Whoami,
    /// Evaluate route guards against the session
    Authorize {
        /// Roles the route requires (any of)
        #[arg(long, value_delimiter = ',')]
        roles: Vec<String>,

        /// Actor type the route requires
        #[arg(long)]
        actor_type: Option<ActorType>,

        /// Agency whose data the route exposes
        #[arg(long)]
        agency: Option<String>,
    },
    /// Send a request to the platform API through the standard pipeline
    Request {
        /// HTTP method
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,

        /// Endpoint relative to the API base URL
        path: String,

        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    // Precedence: env > file > CLI > defaults
    let mut base = Config::builder().json_logs(args.json_logs);
    if let Some(url) = args.api_url.clone() {
        base = base.api_url(url);
    }
    if args.verbose {
        base = base.log_level("debug".to_string());
    }
    let builder = match &args.config {
        Some(path) => config::load_config_from_path(path, base)?,
        None => config::load_config(base)?,
    };
    let config = builder.build()?;

    init_observability(&config.telemetry)?;

    let client = Arc::new(StaticTokenClient::new(args.token.as_str())?);
    let session = AuthSessionController::new(client, config.clone(), ExecutionContext::Interactive);
    let authenticated = session.init().await;
    tracing::info!(authenticated, api_url = %config.api_url, "Session initialized");

    let result = run(args.command, &session, &config).await;
    session.dispose();
    result
}

async fn run(
    command: Command,
    session: &Arc<AuthSessionController>,
    config: &Config,
) -> anyhow::Result<ExitCode> {
    match command {
        Command::Whoami => {
            let tenant = TenantContextResolver::new(Arc::clone(session));
            let report = json!({
                "phase": session.phase(),
                "session": *session.state(),
                "tenant": tenant.api_tenant_context(),
                "multiTenant": tenant.is_multi_tenant(),
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
            Ok(ExitCode::SUCCESS)
        }
        Command::Authorize {
            roles,
            actor_type,
            agency,
        } => {
            let mut route = RouteData::new();
            if !roles.is_empty() {
                route = route.with_roles(roles);
            }
            if let Some(actor_type) = actor_type {
                route = route.with_actor_type(actor_type);
            }

            let guards = GuardSet::new(Arc::clone(session), config);
            let guard = compose_guards([guards.auth(), guards.role(), guards.actor_type()]);
            let mut outcome = guard.check(&GuardContext::new(route)).await;

            if outcome.is_allowed()
                && let Some(agency) = &agency
                && !TenantContextResolver::new(Arc::clone(session)).validate_tenant_access(agency)
            {
                tracing::debug!(agency = %agency, "Tenant access denied");
                outcome = GuardOutcome::Redirect(config.unauthorized_path.clone());
            }

            println!("{}", serde_json::to_string_pretty(&outcome)?);
            Ok(if outcome.is_allowed() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
        Command::Request { method, path, body } => {
            let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
                .with_context(|| format!("Invalid HTTP method: {method}"))?;
            let body = match body {
                Some(raw) => RequestBody::Json(
                    serde_json::from_str(&raw).context("Request body is not valid JSON")?,
                ),
                None => RequestBody::Empty,
            };

            let transport = Arc::new(ReqwestTransport::new(config.request_timeout)?);
            let pipeline = Arc::new(RequestPipeline::standard(session, config, transport));
            let api = ApiClient::new(&config.api_url, pipeline);

            let response = api
                .execute(method, &path, body, &RequestOptions::new())
                .await?;
            let value: serde_json::Value = response.json()?;
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}
