use anyhow::{Context, Result};
use axum::{
    Router,
    extract::{Json, Path, Request, State},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::auth::{ConfigUserStore, TokenAuthority, UserStore};
use crate::core::config::Config;
use crate::ufw::{CommandRunner, RuleSpec, SudoCommandRunner, UfwManager};

/// REST service
pub struct RestService {
    /// The loaded configuration
    config: Config,
}

/// Shared handler state: the ufw adapter plus the auth boundary.
pub struct AppState<R: CommandRunner> {
    /// The ufw adapter
    pub manager: UfwManager<R>,

    /// Token mint/verify
    pub tokens: TokenAuthority,

    /// Credential verification capability
    pub users: Arc<dyn UserStore>,
}

impl AppState<SudoCommandRunner> {
    /// Build the production state from the configuration.
    pub fn from_config(config: &Config) -> Self {
        let runner = SudoCommandRunner::new(config.ufw.sudo_path.as_str());
        let manager = UfwManager::new(
            runner,
            config.ufw.ufw_path.as_str(),
            Duration::from_secs(config.ufw.command_timeout_secs),
        );

        Self {
            manager,
            tokens: TokenAuthority::new(&config.auth),
            users: Arc::new(ConfigUserStore::new(config.auth.users.clone())),
        }
    }
}

/// API error response
#[derive(Debug, Serialize)]
struct ErrorResponse {
    /// Error message
    message: String,
}

/// Login request body
#[derive(Debug, Deserialize)]
struct LoginRequest {
    username: String,
    password: String,
}

impl RestService {
    /// Create a new REST service
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run the service
    pub async fn run(self) -> Result<()> {
        if !self.config.services.rest.enabled {
            info!("REST API service is disabled");
            return Ok(());
        }

        let bind_address = &self.config.services.rest.bind_address;
        let port = self.config.services.rest.port;
        let addr = format!("{}:{}", bind_address, port)
            .parse::<SocketAddr>()
            .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

        info!("Starting REST API service on {}", addr);

        let state = Arc::new(AppState::from_config(&self.config));
        let app = router(state, &self.config.services.rest.allowed_origins);

        let listener = TcpListener::bind(&addr)
            .await
            .with_context(|| format!("Failed to bind {}", addr))?;
        axum::serve(listener, app).await?;

        Ok(())
    }
}

/// Build the application router. Everything under /api sits behind the
/// bearer-token gate; the liveness probe and the login route do not.
pub fn router<R: CommandRunner>(state: Arc<AppState<R>>, allowed_origins: &[String]) -> Router {
    let protected = Router::new()
        .route("/api/status", get(get_status::<R>))
        .route("/api/rules", get(get_rules::<R>).post(add_rule::<R>))
        .route("/api/rules/{id}", delete(delete_rule::<R>))
        .route("/api/enable", post(enable::<R>))
        .route("/api/disable", post(disable::<R>))
        .route_layer(middleware::from_fn_with_state(
            state.tokens.clone(),
            require_auth,
        ));

    Router::new()
        .route("/", get(liveness))
        .route("/token", post(login::<R>))
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(allowed_origins))
        .with_state(state)
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("Ignoring invalid CORS origin: {}", origin);
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true)
}

/// Reject any request without a valid bearer token.
async fn require_auth(
    State(tokens): State<TokenAuthority>,
    request: Request,
    next: Next,
) -> Response {
    let verified = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .is_some_and(|token| tokens.verify(token).is_ok());

    if verified {
        next.run(request).await
    } else {
        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(ErrorResponse {
                message: "Invalid or missing bearer token".to_string(),
            }),
        )
            .into_response()
    }
}

/// Unauthenticated liveness probe
async fn liveness() -> impl IntoResponse {
    Json(json!({"service": "ufw-bridge", "status": "ok"}))
}

/// Exchange credentials for a bearer token
async fn login<R: CommandRunner>(
    State(state): State<Arc<AppState<R>>>,
    Json(request): Json<LoginRequest>,
) -> Response {
    match state.users.verify(&request.username, &request.password) {
        Some(principal) => match state.tokens.issue(&principal) {
            Ok(token) => Json(token).into_response(),
            Err(e) => {
                warn!("Token issuance failed for {}: {}", principal, e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(ErrorResponse {
                        message: e.to_string(),
                    }),
                )
                    .into_response()
            }
        },
        None => (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            Json(ErrorResponse {
                message: "Invalid username or password".to_string(),
            }),
        )
            .into_response(),
    }
}

/// Query firewall status
async fn get_status<R: CommandRunner>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    Json(state.manager.status().await)
}

/// List the numbered rule table
async fn get_rules<R: CommandRunner>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    Json(state.manager.rules().await)
}

/// Add a rule
async fn add_rule<R: CommandRunner>(
    State(state): State<Arc<AppState<R>>>,
    Json(spec): Json<RuleSpec>,
) -> impl IntoResponse {
    Json(state.manager.add_rule(&spec).await)
}

/// Delete a rule by its current position
async fn delete_rule<R: CommandRunner>(
    State(state): State<Arc<AppState<R>>>,
    Path(rule_number): Path<u32>,
) -> impl IntoResponse {
    Json(state.manager.delete_rule(rule_number).await)
}

/// Enable the firewall
async fn enable<R: CommandRunner>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    Json(state.manager.enable().await)
}

/// Disable the firewall
async fn disable<R: CommandRunner>(State(state): State<Arc<AppState<R>>>) -> impl IntoResponse {
    Json(state.manager.disable().await)
}
