// Axum API server
//
// JSON endpoints over the diagnosis pipeline and diagnosis history.
// The signed-in user arrives in the `X-User-Id` header set by the auth proxy.

#[cfg(feature = "api")]
use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};

#[cfg(feature = "api")]
use tower_http::{compression::CompressionLayer, cors::CorsLayer, trace::TraceLayer};

#[cfg(feature = "api")]
use moka::future::Cache;

#[cfg(feature = "api")]
use serde::Deserialize;

#[cfg(feature = "api")]
use std::sync::Arc;

#[cfg(feature = "api")]
use std::time::Duration;

#[cfg(feature = "api")]
use crate::config::AppConfig;

#[cfg(feature = "api")]
use crate::diagnosis::{Anonymous, Diagnoser, Session, UserSession};

#[cfg(feature = "api")]
use crate::error::{DiagnosisError, StoreError};

#[cfg(feature = "api")]
use crate::history::HistorySort;

#[cfg(feature = "api")]
use crate::labels::normalize;

/// Header carrying the authenticated user id
pub const USER_HEADER: &str = "x-user-id";

#[cfg(feature = "api")]
const DEFAULT_HISTORY_LIMIT: usize = 10;

#[cfg(feature = "api")]
const MAX_HISTORY_LIMIT: usize = 100;

#[cfg(feature = "api")]
const MAX_BATCH_SIZE: usize = 256;

// ============================================================================
// Application State
// ============================================================================

#[cfg(feature = "api")]
#[derive(Clone)]
pub struct AppState {
    pub diagnoser: Arc<Diagnoser>,
    /// Remediation responses keyed by raw label
    pub cache: Cache<String, serde_json::Value>,
}

#[cfg(feature = "api")]
impl AppState {
    pub fn new(config: &AppConfig) -> anyhow::Result<Self> {
        tracing::info!("Loading label set and knowledge base...");
        let diagnoser = config.build_diagnoser()?;
        tracing::info!(
            "Diagnoser ready: {} labels, locale {:?}, history backend {:?}",
            diagnoser.context().labels.len(),
            config.display.locale,
            config.history.backend
        );
        Ok(Self::with_diagnoser(diagnoser))
    }

    pub fn with_diagnoser(diagnoser: Diagnoser) -> Self {
        tracing::info!("Initializing Moka cache...");
        let cache = Cache::builder()
            .max_capacity(1_000)
            .time_to_live(Duration::from_secs(300))
            .build();

        Self {
            diagnoser: Arc::new(diagnoser),
            cache,
        }
    }
}

// ============================================================================
// Router
// ============================================================================

#[cfg(feature = "api")]
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        // Diagnosis
        .route("/api/diagnose", post(diagnose))
        .route("/api/diagnose/batch", post(diagnose_batch))
        // Reference data
        .route("/api/labels", get(list_labels))
        .route("/api/remediation/:label", get(get_remediation))
        // History (stats before :id)
        .route("/api/history", get(get_history))
        .route("/api/history/stats", get(get_history_stats))
        .route("/api/history/:id", get(get_history_record).delete(delete_history_record))
        // Middleware (applied in reverse order)
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

// ============================================================================
// Request Types
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
pub struct DiagnoseRequest {
    pub probabilities: Vec<f64>,
}

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
pub struct BatchDiagnoseRequest {
    pub vectors: Vec<Vec<f64>>,
}

#[cfg(feature = "api")]
#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
    /// newest (default), oldest, confidence_desc, confidence_asc
    pub sort: Option<HistorySort>,
}

// ============================================================================
// Endpoint Handlers
// ============================================================================

#[cfg(feature = "api")]
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "timestamp": chrono::Utc::now().to_rfc3339()
    }))
}

#[cfg(feature = "api")]
fn user_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(feature = "api")]
fn session(headers: &HeaderMap) -> Box<dyn Session> {
    match user_id(headers) {
        Some(id) => Box::new(UserSession::new(id)),
        None => Box::new(Anonymous),
    }
}

#[cfg(feature = "api")]
fn require_user(headers: &HeaderMap) -> Result<String, AppError> {
    user_id(headers).ok_or_else(|| AppError::Unauthorized("sign in to access diagnosis history".to_string()))
}

/// Run store or pipeline work off the async runtime
#[cfg(feature = "api")]
async fn blocking<T, F>(f: F) -> Result<T, AppError>
where
    F: FnOnce() -> Result<T, AppError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AppError::Internal(format!("Task join error: {}", e)))?
}

#[cfg(feature = "api")]
async fn diagnose(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<DiagnoseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    let session = session(&headers);
    let diagnoser = state.diagnoser.clone();

    let outcome = blocking(move || {
        diagnoser
            .diagnose_probabilities(&payload.probabilities, session.as_ref())
            .map_err(AppError::from)
    })
    .await?;

    Ok(Json(serde_json::to_value(outcome).map_err(|e| AppError::Internal(e.to_string()))?))
}

#[cfg(feature = "api")]
async fn diagnose_batch(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<BatchDiagnoseRequest>,
) -> Result<Json<serde_json::Value>, AppError> {
    if payload.vectors.len() > MAX_BATCH_SIZE {
        return Err(AppError::BadRequest(format!(
            "batch of {} vectors exceeds the limit of {}",
            payload.vectors.len(),
            MAX_BATCH_SIZE
        )));
    }

    let session = session(&headers);
    let diagnoser = state.diagnoser.clone();
    tracing::info!("Diagnosing batch of {} vectors", payload.vectors.len());

    let outcomes = blocking(move || Ok(diagnoser.diagnose_batch(&payload.vectors, session.as_ref()))).await?;

    let data: Vec<serde_json::Value> = outcomes
        .into_iter()
        .map(|outcome| match outcome {
            Ok(outcome) => serde_json::to_value(outcome).unwrap_or_else(|e| {
                serde_json::json!({ "status": "error", "error": e.to_string() })
            }),
            Err(e) => serde_json::json!({ "status": "error", "error": e.to_string() }),
        })
        .collect();

    Ok(Json(serde_json::Value::Array(data)))
}

#[cfg(feature = "api")]
async fn list_labels(State(state): State<AppState>) -> Json<serde_json::Value> {
    let ctx = state.diagnoser.context();
    let labels: Vec<serde_json::Value> = ctx
        .labels
        .iter()
        .enumerate()
        .map(|(index, raw)| {
            let normalized = normalize(raw);
            let display = ctx.presenter.present(&normalized);
            serde_json::json!({
                "index": index,
                "raw_label": raw,
                "plant_name": display.plant_name,
                "disease_name": display.disease_name,
                "is_healthy": normalized.is_healthy(),
            })
        })
        .collect();

    Json(serde_json::json!({
        "count": labels.len(),
        "labels": labels,
    }))
}

#[cfg(feature = "api")]
async fn get_remediation(
    State(state): State<AppState>,
    Path(label): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    if let Some(cached) = state.cache.get(&label).await {
        tracing::debug!("Cache hit for remediation: {}", label);
        return Ok(Json(cached));
    }

    let record = state
        .diagnoser
        .context()
        .remediation
        .lookup(&label)
        .ok_or_else(|| AppError::NotFound(format!("No remediation available for {}", label)))?;

    let response = serde_json::json!({
        "label": label,
        "remediation": record,
    });
    state.cache.insert(label, response.clone()).await;

    Ok(Json(response))
}

#[cfg(feature = "api")]
async fn get_history(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(params): Query<HistoryQuery>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    let limit = params.limit.unwrap_or(DEFAULT_HISTORY_LIMIT).min(MAX_HISTORY_LIMIT);
    let sort = params.sort.unwrap_or_default();
    let diagnoser = state.diagnoser.clone();

    let records = blocking(move || {
        diagnoser
            .store()
            .query_sorted(&user_id, limit, sort)
            .map_err(AppError::from)
    })
    .await?;

    Ok(Json(serde_json::json!({
        "rows": records.len(),
        "sort": sort,
        "data": records,
    })))
}

#[cfg(feature = "api")]
async fn get_history_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(record_id): Path<String>,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    let diagnoser = state.diagnoser.clone();

    let record = blocking(move || diagnoser.store().get(&record_id, &user_id).map_err(AppError::from)).await?;

    Ok(Json(serde_json::to_value(record).map_err(|e| AppError::Internal(e.to_string()))?))
}

#[cfg(feature = "api")]
async fn get_history_stats(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, AppError> {
    let user_id = require_user(&headers)?;
    let diagnoser = state.diagnoser.clone();

    let stats = blocking(move || diagnoser.store().statistics(&user_id).map_err(AppError::from)).await?;

    Ok(Json(serde_json::to_value(stats).map_err(|e| AppError::Internal(e.to_string()))?))
}

#[cfg(feature = "api")]
async fn delete_history_record(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(record_id): Path<String>,
) -> Result<StatusCode, AppError> {
    let user_id = require_user(&headers)?;
    let diagnoser = state.diagnoser.clone();

    blocking(move || diagnoser.store().delete(&record_id, &user_id).map_err(AppError::from)).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Error Handling
// ============================================================================

#[cfg(feature = "api")]
#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Internal(String),
}

#[cfg(feature = "api")]
impl From<DiagnosisError> for AppError {
    fn from(e: DiagnosisError) -> Self {
        match e {
            DiagnosisError::Classifier(_) => AppError::Internal(e.to_string()),
            _ => AppError::BadRequest(e.to_string()),
        }
    }
}

#[cfg(feature = "api")]
impl From<StoreError> for AppError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => AppError::NotFound(e.to_string()),
            StoreError::NotOwner(_) => AppError::Forbidden(e.to_string()),
            StoreError::Backend(_) => AppError::Internal(e.to_string()),
        }
    }
}

#[cfg(feature = "api")]
impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };

        let body = Json(serde_json::json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
