//! Tagwise Web Server
//!
//! Axum-based REST API over the classification engine: categories,
//! suggestions, learned patterns, metrics, one shared review session and the
//! decision log.
//!
//! Security features:
//! - Bearer API-key authentication (secure by default, use --no-auth for local dev)
//! - Restrictive CORS policy
//! - Sanitized error responses

use std::sync::{Arc, Mutex, MutexGuard};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{cors::CorsLayer, set_header::SetResponseHeaderLayer, trace::TraceLayer};
use tracing::{error, info, warn};

use tagwise_core::{Database, LearningConfig, PatternStore, ReviewQueue};

mod handlers;

/// Maximum number of decisions returned by one listing
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Maximum descriptions per suggestion request
pub const MAX_SUGGEST_BATCH: usize = 1000;

/// Authorization header for API key auth
const AUTHORIZATION_HEADER: &str = "authorization";

/// Server configuration
#[derive(Clone)]
pub struct ServerConfig {
    /// Whether authentication is required (secure by default)
    pub require_auth: bool,
    /// Allowed CORS origins (empty = same-origin only)
    pub allowed_origins: Vec<String>,
    /// API keys accepted as "Bearer <key>" in the Authorization header
    pub api_keys: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            require_auth: true,
            allowed_origins: vec![],
            api_keys: vec![],
        }
    }
}

/// Shared application state
pub struct AppState {
    pub db: Arc<Database>,
    pub store: Arc<PatternStore>,
    pub config: ServerConfig,
    /// The single review session served by `/api/review`
    review: Mutex<ReviewQueue>,
}

impl AppState {
    /// Open the pattern store over `db` and start with an empty review session
    pub fn new(db: Database, learning: LearningConfig, config: ServerConfig) -> anyhow::Result<Self> {
        let db = Arc::new(db);
        let store = Arc::new(PatternStore::open(db.clone(), learning)?);
        let review = ReviewQueue::new(store.clone(), db.clone()).with_recorder(db.clone());
        Ok(Self {
            db,
            store,
            config,
            review: Mutex::new(review),
        })
    }

    /// Lock the review session
    pub(crate) fn review(&self) -> Result<MutexGuard<'_, ReviewQueue>, AppError> {
        self.review
            .lock()
            .map_err(|_| AppError::internal("Review session is unavailable"))
    }
}

/// Authentication middleware - validates bearer API keys
///
/// Keys are compared in constant time.
async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.require_auth {
        return next.run(request).await;
    }

    let api_key_valid = request
        .headers()
        .get(AUTHORIZATION_HEADER)
        .and_then(|v| v.to_str().ok())
        .and_then(|auth| auth.strip_prefix("Bearer "))
        .map(|key| validate_api_key(key, &state.config.api_keys))
        .unwrap_or(false);

    if api_key_valid {
        info!(user = "api-key", path = %request.uri().path(), "Authenticated via API key");
        return next.run(request).await;
    }

    warn!(path = %request.uri().path(), "Unauthorized request - no valid auth");
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({
            "error": "Authentication required"
        })),
    )
        .into_response()
}

/// Validate an API key against the configured keys using constant-time comparison
fn validate_api_key(provided: &str, valid_keys: &[String]) -> bool {
    use subtle::ConstantTimeEq;

    let provided_bytes = provided.as_bytes();

    valid_keys.iter().any(|key| {
        let key_bytes = key.as_bytes();
        // Only compare if lengths match (constant-time for same-length keys)
        provided_bytes.len() == key_bytes.len() && bool::from(provided_bytes.ct_eq(key_bytes))
    })
}

/// Parse a comma-separated key list (e.g. from `TAGWISE_API_KEYS`)
pub fn parse_api_keys(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Build the application router
pub fn create_router(
    db: Database,
    learning: LearningConfig,
    config: ServerConfig,
) -> anyhow::Result<Router> {
    let state = Arc::new(AppState::new(db, learning, config)?);
    Ok(router_with_state(state))
}

fn router_with_state(state: Arc<AppState>) -> Router {
    let config = state.config.clone();

    let api_routes = Router::new()
        // Categories
        .route(
            "/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route("/categories/:id", delete(handlers::delete_category))
        // Suggestions and learned patterns
        .route("/suggest", post(handlers::suggest))
        .route("/patterns", get(handlers::list_patterns))
        .route("/metrics", get(handlers::get_metrics))
        // Review session
        .route(
            "/review",
            get(handlers::get_review).post(handlers::load_review),
        )
        .route("/review/current", get(handlers::get_current_candidate))
        .route("/review/candidates", get(handlers::list_candidates))
        .route("/review/accept", post(handlers::accept_candidate))
        .route("/review/reject", post(handlers::reject_candidate))
        .route("/review/classify", post(handlers::classify_candidate))
        .route("/review/defer", post(handlers::defer_candidate))
        // Decision log
        .route("/decisions", get(handlers::list_decisions))
        .route("/decisions/stats", get(handlers::get_decision_stats));

    let methods = [Method::GET, Method::POST, Method::DELETE, Method::OPTIONS];
    let cors = if config.allowed_origins.is_empty() {
        // Restrictive default: only allow same-origin
        CorsLayer::new()
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    } else {
        let origins: Vec<HeaderValue> = config
            .allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
    };

    Router::new()
        .nest("/api", api_routes)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        // Security headers
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::X_FRAME_OPTIONS,
            HeaderValue::from_static("DENY"),
        ))
        .layer(SetResponseHeaderLayer::overriding(
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_static("default-src 'none'; frame-ancestors 'none'"),
        ))
}

/// Start the server
pub async fn serve(
    db: Database,
    learning: LearningConfig,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if !config.require_auth {
        warn!("⚠️  Authentication disabled - do not expose to network!");
    } else if config.api_keys.is_empty() {
        warn!("⚠️  Authentication required but no API keys configured - every request will be rejected");
    }

    let app = create_router(db, learning, config)?;
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    pub fn bad_request(msg: &str) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn not_found(msg: &str) -> Self {
        Self {
            status: StatusCode::NOT_FOUND,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn internal(msg: &str) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn conflict(msg: &str) -> Self {
        Self {
            status: StatusCode::CONFLICT,
            message: msg.to_string(),
            internal: None,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        use tagwise_core::Error as CoreError;

        let err = err.into();
        let (status, message) = match err.downcast_ref::<CoreError>() {
            Some(CoreError::NotFound(what)) => (StatusCode::NOT_FOUND, format!("Not found: {}", what)),
            Some(CoreError::NoSuggestionToAccept) => (
                StatusCode::CONFLICT,
                "Current candidate has no suggestion to accept".to_string(),
            ),
            Some(e @ (CoreError::InvalidData(_) | CoreError::InvalidCategory(_) | CoreError::Import(_))) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            Some(e) if e.is_retryable() => (
                StatusCode::SERVICE_UNAVAILABLE,
                "Storage temporarily unavailable, retry the request".to_string(),
            ),
            _ => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "An internal error occurred".to_string(),
            ),
        };

        // Keep the full error for logging on server-side failures
        let internal = status.is_server_error().then_some(err);
        Self {
            status,
            message,
            internal,
        }
    }
}

#[cfg(test)]
mod tests;
