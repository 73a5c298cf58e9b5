use std::{net::SocketAddr, sync::Arc};

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::Deserialize;
use server_api::{dashboard, get_processo, report, save_processo, ApiContext};
use shared::{
    domain::{ProcessId, ProcessRecord},
    error::{ApiError, ErrorCode},
    protocol::{AnexoUploadResponse, DashboardSnapshot, ProcessoFields, ReportView},
};
use storage::Storage;
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{error, info};

mod config;

use config::{load_settings, prepare_database_url};

#[derive(Clone)]
struct AppState {
    api: ApiContext,
}

#[derive(Debug, Deserialize)]
struct AnexoUploadQuery {
    filename: Option<String>,
    mime_type: Option<String>,
}

/// Inline-encoding bound: the attachment travels inside the saved document
/// as a data URL, so the binary payload is capped well below the store's
/// document size limit.
const MAX_ANEXO_BYTES: usize = 500 * 1024;
const MAX_FILENAME_BYTES: usize = 180;
/// Router-wide body cap; leaves room for a save request carrying an
/// already-encoded attachment (base64 inflates by 4/3).
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();

    let settings = load_settings();
    let database_url = prepare_database_url(&settings.database_url)?;
    let storage = Storage::new(&database_url).await.map_err(|error| {
        error!(
            %database_url,
            %error,
            "failed to open SQLite database; verify parent directory exists and permissions are correct"
        );
        error
    })?;
    let api = ApiContext { storage };

    let state = AppState { api };
    let app = build_router(Arc::new(state));

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, "server listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/processos", get(http_dashboard).post(http_create_processo))
        .route(
            "/processos/:processo_id",
            get(http_get_processo).put(http_update_processo),
        )
        .route("/relatorio", get(http_report))
        .route("/anexos", post(upload_anexo))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .with_state(state)
}

async fn healthz() -> &'static str {
    "ok"
}

async fn http_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardSnapshot>, (StatusCode, Json<ApiError>)> {
    let snapshot = dashboard(&state.api).await.map_err(reject)?;
    Ok(Json(snapshot))
}

async fn http_report(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReportView>, (StatusCode, Json<ApiError>)> {
    let view = report(&state.api).await.map_err(reject)?;
    Ok(Json(view))
}

async fn http_get_processo(
    State(state): State<Arc<AppState>>,
    Path(processo_id): Path<i64>,
) -> Result<Json<ProcessRecord>, (StatusCode, Json<ApiError>)> {
    let record = get_processo(&state.api, ProcessId(processo_id))
        .await
        .map_err(reject)?;
    Ok(Json(record))
}

async fn http_create_processo(
    State(state): State<Arc<AppState>>,
    Json(fields): Json<ProcessoFields>,
) -> Result<(StatusCode, Json<ProcessRecord>), (StatusCode, Json<ApiError>)> {
    let record = save_processo(&state.api, None, fields)
        .await
        .map_err(reject)?;
    Ok((StatusCode::CREATED, Json(record)))
}

async fn http_update_processo(
    State(state): State<Arc<AppState>>,
    Path(processo_id): Path<i64>,
    Json(fields): Json<ProcessoFields>,
) -> Result<Json<ProcessRecord>, (StatusCode, Json<ApiError>)> {
    let record = save_processo(&state.api, Some(ProcessId(processo_id)), fields)
        .await
        .map_err(reject)?;
    Ok(Json(record))
}

/// Encodes an uploaded attachment as an inline `data:` URL. The size
/// precondition runs before anything is stored or encoded; an oversized
/// payload must never reach a save request.
async fn upload_anexo(
    Query(q): Query<AnexoUploadQuery>,
    body: Bytes,
) -> Result<Json<AnexoUploadResponse>, (StatusCode, Json<ApiError>)> {
    if body.is_empty() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ApiError::new(
                ErrorCode::Validation,
                "attachment body cannot be empty",
            )),
        ));
    }
    if body.len() > MAX_ANEXO_BYTES {
        return Err((
            StatusCode::PAYLOAD_TOO_LARGE,
            Json(ApiError::new(
                ErrorCode::PayloadTooLarge,
                format!("attachment exceeds {} bytes", MAX_ANEXO_BYTES),
            )),
        ));
    }

    let filename = q
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty());
    if let Some(name) = filename {
        if name.len() > MAX_FILENAME_BYTES {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(ErrorCode::Validation, "filename is too long")),
            ));
        }
        if name.contains('/') || name.contains('\\') {
            return Err((
                StatusCode::BAD_REQUEST,
                Json(ApiError::new(
                    ErrorCode::Validation,
                    "filename must not contain path separators",
                )),
            ));
        }
    }

    let mime = q
        .mime_type
        .as_deref()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .unwrap_or("application/octet-stream");

    let anexo_url = format!("data:{mime};base64,{}", STANDARD.encode(&body));
    Ok(Json(AnexoUploadResponse {
        anexo_url,
        size_bytes: body.len(),
    }))
}

fn reject(err: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match err.code {
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::NotFound => StatusCode::NOT_FOUND,
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
        ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(err))
}
