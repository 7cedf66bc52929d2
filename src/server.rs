//! HTTP API over the same operations as the CLI.
//!
//! `/api/auth` is open; every other route needs a valid `roadmap-session`
//! cookie, as issued by `POST /api/auth`.

use axum::{
    Json, Router,
    extract::{Path as AxumPath, Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
};
use chrono::Local;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::auth::{self, SESSION_COOKIE_NAME};
use crate::cli::ProjectFields;
use crate::commands::{self, Context};
use crate::storage::{ProjectRepository, Storage};
use crate::{Error, Result};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Storage behind a mutex; SQLite connections are not shared across threads
    pub storage: Arc<Mutex<Storage>>,
    pub context: Arc<Context>,
}

impl AppState {
    pub fn new(storage: Storage, context: Context) -> Self {
        Self {
            storage: Arc::new(Mutex::new(storage)),
            context: Arc::new(context),
        }
    }

    /// Context dated today.
    fn context(&self) -> Context {
        self.context.on(Local::now().date_naive())
    }
}

/// Build the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/auth", get(check_auth).post(post_auth))
        .route("/api/features", get(get_features))
        .route("/api/reference", get(get_reference))
        .route("/api/projects", post(create_project))
        .route(
            "/api/projects/:id",
            delete(delete_project).put(update_project),
        )
        .with_state(state)
}

/// Start the API server.
pub async fn serve(context: Context, host: &str, port: u16) -> Result<()> {
    let storage = Storage::open(&context.data_dir)?;
    let app = router(AppState::new(storage, context));

    let host_addr: std::net::IpAddr = host
        .parse()
        .map_err(|e| Error::InvalidInput(format!("Invalid host address '{}': {}", host, e)))?;
    let addr = SocketAddr::from((host_addr, port));
    info!(%addr, "starting roadmap API");
    eprintln!("Serving roadmap API at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Error body `{"error": "..."}` with a status derived from the error kind.
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl From<Error> for ApiError {
    fn from(e: Error) -> Self {
        let status = match &e {
            Error::NotFound(_) => StatusCode::NOT_FOUND,
            Error::InvalidInput(_) | Error::InvalidDate(_) => StatusCode::BAD_REQUEST,
            Error::InvalidCredentials | Error::Unauthenticated => StatusCode::UNAUTHORIZED,
            Error::NotInitialized => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status,
            Json(serde_json::json!({ "error": self.message })),
        )
            .into_response()
    }
}

type ApiResult<T> = std::result::Result<T, ApiError>;

fn session_cookie(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE_NAME)
        .map(|(_, value)| value)
}

fn is_authenticated(state: &AppState, headers: &HeaderMap) -> bool {
    session_cookie(headers).is_some_and(|value| state.context.gate().validate_cookie(value))
}

fn authorize(state: &AppState, headers: &HeaderMap) -> ApiResult<()> {
    if is_authenticated(state, headers) {
        Ok(())
    } else {
        Err(Error::Unauthenticated.into())
    }
}

async fn check_auth(State(state): State<AppState>, headers: HeaderMap) -> Json<serde_json::Value> {
    Json(serde_json::json!({ "authenticated": is_authenticated(&state, &headers) }))
}

#[derive(Debug, Deserialize)]
struct AuthRequest {
    username: Option<String>,
    password: Option<String>,
    action: Option<String>,
}

async fn post_auth(State(state): State<AppState>, Json(request): Json<AuthRequest>) -> Response {
    if request.action.as_deref() == Some("logout") {
        return (
            [(header::SET_COOKIE, auth::clear_cookie_header())],
            Json(serde_json::json!({ "success": true, "message": "Logged out successfully" })),
        )
            .into_response();
    }

    let username = request.username.unwrap_or_default();
    let password = request.password.unwrap_or_default();
    match state.context.gate().authenticate(&username, &password) {
        Ok(token) => {
            info!(username, "logged in over HTTP");
            (
                [(header::SET_COOKIE, token.set_cookie_header())],
                Json(serde_json::json!({ "success": true, "message": "Login successful" })),
            )
                .into_response()
        }
        Err(_) => (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "success": false, "message": "Invalid credentials" })),
        )
            .into_response(),
    }
}

#[derive(Debug, Default, Deserialize)]
struct ScreenQuery {
    screen: Option<String>,
    /// Comma-separated stream names
    stream: Option<String>,
}

impl ScreenQuery {
    fn backlog(&self) -> bool {
        self.screen
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("backlog"))
    }

    fn streams(&self) -> Vec<String> {
        self.stream
            .as_deref()
            .map(|s| {
                s.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

async fn get_features(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ScreenQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&state, &headers)?;
    let storage = state.storage.lock().await;
    let result = commands::list_in(&state.context(), &storage, query.backlog(), &query.streams())?;
    Ok(Json(serde_json::json!({ "features": result.features })))
}

async fn get_reference(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&state, &headers)?;
    let storage = state.storage.lock().await;
    let reference = storage.fetch_reference_data()?;
    Ok(Json(serde_json::to_value(reference).map_err(Error::from)?))
}

/// Project form as posted by a client. Names, not ids.
#[derive(Debug, Default, Deserialize)]
struct ProjectRequest {
    name: Option<String>,
    description: Option<String>,
    stream: Option<String>,
    status: Option<String>,
    owner: Option<String>,
    start_date: Option<String>,
    end_date: Option<String>,
    screen: Option<String>,
}

impl ProjectRequest {
    fn backlog(&self) -> bool {
        self.screen
            .as_deref()
            .is_some_and(|s| s.eq_ignore_ascii_case("backlog"))
    }

    fn fields(&self) -> ProjectFields {
        ProjectFields {
            stream: self.stream.clone(),
            status: self.status.clone(),
            owner: self.owner.clone(),
            description: self.description.clone(),
            start: self.start_date.clone(),
            end: self.end_date.clone(),
        }
    }
}

async fn create_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(request): Json<ProjectRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    authorize(&state, &headers)?;
    let mut storage = state.storage.lock().await;
    let result = commands::create_in(
        &state.context(),
        &mut storage,
        request.name.as_deref().unwrap_or_default(),
        &request.fields(),
        request.backlog(),
    )?;
    Ok((
        StatusCode::CREATED,
        Json(serde_json::json!({ "feature": result.feature, "on_screen": result.on_screen })),
    ))
}

async fn update_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Json(request): Json<ProjectRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&state, &headers)?;
    let mut storage = state.storage.lock().await;
    let result = commands::update_in(
        &state.context(),
        &mut storage,
        &id,
        request.name.as_deref(),
        &request.fields(),
        request.backlog(),
    )?;
    Ok(Json(
        serde_json::json!({ "feature": result.feature, "on_screen": result.on_screen }),
    ))
}

/// The client confirmed before sending the request.
async fn delete_project(
    State(state): State<AppState>,
    headers: HeaderMap,
    AxumPath(id): AxumPath<String>,
    Query(query): Query<ScreenQuery>,
) -> ApiResult<Json<serde_json::Value>> {
    authorize(&state, &headers)?;
    let mut storage = state.storage.lock().await;
    let result = commands::delete_in(
        &state.context(),
        &mut storage,
        &id,
        query.backlog(),
        &|_: &str| true,
    )
    .inspect_err(|e| warn!(id, error = %e, "delete over HTTP failed"))?;
    Ok(Json(
        serde_json::json!({ "id": result.id, "deleted": result.deleted }),
    ))
}
