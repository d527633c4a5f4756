//! Dashboard HTTP API.
//!
//! Exposes the search core and credential management as a JSON API for the
//! web dashboard. The dashboard's own rendering, authentication screens,
//! and team management live elsewhere; this server only needs a user id on
//! each request to scope credentials.
//!
//! # Endpoints
//!
//! | Method   | Path | Description |
//! |----------|------|-------------|
//! | `GET`    | `/health` | Health check (returns version) |
//! | `GET`    | `/spaces` | Connected spaces for a user (tokens redacted) |
//! | `POST`   | `/spaces` | Verify a credential remotely, then connect it |
//! | `PATCH`  | `/spaces/{id}` | Rename a connected space |
//! | `DELETE` | `/spaces/{id}` | Disconnect a space |
//! | `GET`    | `/spaces/{id}/content-types` | Content types, sorted by name |
//! | `POST`   | `/search` | Cross-space search, returns a result page |
//!
//! # Error Contract
//!
//! All error responses use the envelope:
//!
//! ```json
//! { "error": { "code": "invalid_credentials", "message": "..." } }
//! ```
//!
//! Codes: `bad_request` (400), `invalid_credentials` (401), `not_found`
//! (404), `conflict` (409), `search_failed` (502), `rate_limited` (503),
//! `internal` (500). Partial-store failure during a search is not an
//! error: the response is a degraded 200 page with whatever succeeded.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support the
//! browser-based dashboard.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{delete, get, patch, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tracing::info;

use crate::client::{ContentApi, ContentfulClient};
use crate::config::Config;
use crate::credentials::{CredentialStore, NewCredential, SqliteCredentialStore};
use crate::db;
use crate::error::{ClientError, SearchError, StoreError};
use crate::models::{
    ContentTypeSummary, SearchRequest, SearchResultPage, SpaceSummary,
};
use crate::pagination::{page_window, PageItem};
use crate::search::search_spaces;

/// Shared application state passed to all route handlers.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    client: Arc<dyn ContentApi>,
    credentials: Arc<dyn CredentialStore>,
}

/// Start the dashboard API server with the real content API client and
/// SQLite credential store.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let pool = db::connect(config).await?;
    let client: Arc<dyn ContentApi> = Arc::new(ContentfulClient::new(&config.api));
    let credentials: Arc<dyn CredentialStore> = Arc::new(SqliteCredentialStore::new(pool));
    run_server_with_client(config, client, credentials).await
}

/// Start the server with injected collaborators. Used by tests to run the
/// full HTTP surface against an in-memory content API.
pub async fn run_server_with_client(
    config: &Config,
    client: Arc<dyn ContentApi>,
    credentials: Arc<dyn CredentialStore>,
) -> anyhow::Result<()> {
    let bind_addr = config.server.bind.clone();
    let state = AppState {
        config: Arc::new(config.clone()),
        client,
        credentials,
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/spaces", get(handle_list_spaces))
        .route("/spaces", post(handle_connect_space))
        .route("/spaces/{id}", patch(handle_rename_space))
        .route("/spaces/{id}", delete(handle_disconnect_space))
        .route("/spaces/{id}/content-types", get(handle_content_types))
        .route("/search", post(handle_search))
        .layer(cors)
        .with_state(state);

    info!("dashboard API listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

/// JSON error envelope.
#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

/// Internal error type that converts into an HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn app_error(status: StatusCode, code: &str, message: impl Into<String>) -> AppError {
    AppError {
        status,
        code: code.to_string(),
        message: message.into(),
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    app_error(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn not_found(message: impl Into<String>) -> AppError {
    app_error(StatusCode::NOT_FOUND, "not_found", message)
}

impl From<ClientError> for AppError {
    fn from(error: ClientError) -> Self {
        match &error {
            ClientError::Unauthorized { .. } => app_error(
                StatusCode::UNAUTHORIZED,
                "invalid_credentials",
                format!("{}. Please check your credentials.", error),
            ),
            ClientError::NotFound { .. } => not_found(error.to_string()),
            ClientError::RateLimited { .. } | ClientError::RetriesExhausted { .. } => {
                app_error(StatusCode::SERVICE_UNAVAILABLE, "rate_limited", error.to_string())
            }
            _ => app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", error.to_string()),
        }
    }
}

impl From<StoreError> for AppError {
    fn from(error: StoreError) -> Self {
        match &error {
            StoreError::Duplicate(_) => {
                app_error(StatusCode::CONFLICT, "conflict", error.to_string())
            }
            StoreError::NotFound(_) => not_found(error.to_string()),
            _ => app_error(StatusCode::INTERNAL_SERVER_ERROR, "internal", error.to_string()),
        }
    }
}

impl From<SearchError> for AppError {
    fn from(error: SearchError) -> Self {
        match &error {
            SearchError::AllSourcesFailed { .. } => {
                app_error(StatusCode::BAD_GATEWAY, "search_failed", error.to_string())
            }
            SearchError::UnknownSpace(_) => not_found(error.to_string()),
        }
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ GET /spaces ============

#[derive(Deserialize)]
struct UserQuery {
    user_id: String,
}

#[derive(Serialize)]
struct SpacesResponse {
    spaces: Vec<SpaceSummary>,
}

async fn handle_list_spaces(
    State(state): State<AppState>,
    Query(user): Query<UserQuery>,
) -> Result<Json<SpacesResponse>, AppError> {
    let credentials = state.credentials.list(&user.user_id).await?;
    Ok(Json(SpacesResponse {
        spaces: credentials.iter().map(SpaceSummary::from).collect(),
    }))
}

// ============ POST /spaces ============

#[derive(Deserialize)]
struct ConnectSpaceRequest {
    user_id: String,
    space_id: String,
    access_token: String,
    /// Display name; defaults to the space name reported by the remote API.
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    default_locale: Option<String>,
}

async fn handle_connect_space(
    State(state): State<AppState>,
    Json(request): Json<ConnectSpaceRequest>,
) -> Result<(StatusCode, Json<SpaceSummary>), AppError> {
    if request.space_id.trim().is_empty() || request.access_token.trim().is_empty() {
        return Err(bad_request("space_id and access_token must not be empty"));
    }

    // Verify against the remote API before persisting anything, so a typo
    // surfaces as "check your credentials" rather than a broken search.
    let candidate = crate::models::SpaceCredential {
        id: String::new(),
        name: String::new(),
        space_id: request.space_id.clone(),
        access_token: request.access_token.clone(),
        user_id: request.user_id.clone(),
        default_locale: request.default_locale.clone(),
        created_at: chrono::Utc::now(),
    };
    let space = state.client.resolve_space(&candidate).await?;

    let credential = state
        .credentials
        .add(
            &request.user_id,
            NewCredential {
                name: request.name.unwrap_or(space.name),
                space_id: request.space_id,
                access_token: request.access_token,
                default_locale: request.default_locale,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(SpaceSummary::from(&credential))))
}

// ============ PATCH /spaces/{id} ============

#[derive(Deserialize)]
struct RenameSpaceRequest {
    user_id: String,
    name: String,
}

async fn handle_rename_space(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<RenameSpaceRequest>,
) -> Result<Json<SpaceSummary>, AppError> {
    if request.name.trim().is_empty() {
        return Err(bad_request("name must not be empty"));
    }

    let credential = state
        .credentials
        .rename(&request.user_id, &id, request.name.trim())
        .await?;
    Ok(Json(SpaceSummary::from(&credential)))
}

// ============ DELETE /spaces/{id} ============

async fn handle_disconnect_space(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
) -> Result<StatusCode, AppError> {
    state.credentials.remove(&user.user_id, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ============ GET /spaces/{id}/content-types ============

#[derive(Serialize)]
struct ContentTypesResponse {
    content_types: Vec<ContentTypeSummary>,
}

async fn handle_content_types(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(user): Query<UserQuery>,
) -> Result<Json<ContentTypesResponse>, AppError> {
    let credentials = state.credentials.list(&user.user_id).await?;
    let credential = credentials
        .iter()
        .find(|c| c.id == id || c.space_id == id)
        .ok_or_else(|| not_found(format!("no connected space with id {}", id)))?;

    let space = state.client.resolve_space(credential).await?;
    let environment = state
        .client
        .resolve_environment(&space, &state.config.api.environment)
        .await?;
    let mut content_types = state
        .client
        .list_content_types(&environment, state.config.search.content_type_limit)
        .await?;

    content_types.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(Json(ContentTypesResponse { content_types }))
}

// ============ POST /search ============

#[derive(Deserialize)]
struct SearchApiRequest {
    user_id: String,
    #[serde(flatten)]
    request: SearchRequest,
}

/// A result page plus the page window the dashboard renders underneath it.
#[derive(Serialize)]
struct SearchResponse {
    #[serde(flatten)]
    page: SearchResultPage,
    pages: Vec<PageItem>,
}

async fn handle_search(
    State(state): State<AppState>,
    Json(body): Json<SearchApiRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if body.request.page < 1 {
        return Err(bad_request("page must be >= 1"));
    }
    if body.request.page_size < 1 {
        return Err(bad_request("page_size must be >= 1"));
    }

    let credentials = state.credentials.list(&body.user_id).await?;
    let page = search_spaces(
        state.client.clone(),
        &credentials,
        &body.request,
        &state.config.api.environment,
    )
    .await?;

    let pages = page_window(page.current_page, page.total_pages);
    Ok(Json(SearchResponse { page, pages }))
}
