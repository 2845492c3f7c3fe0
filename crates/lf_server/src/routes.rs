//! HTTP surface.
//!
//! Command routes (all `GET`, so tablets can fire them from plain links):
//!  - `/command/{since}`, `/command/{type}/{since}`, `/command/{type}/{uuid}/{since}`
//!  - `/command/{type}/{uuid}/add/{num}`
//!  - `/command/{type}/{uuid}/clear`
//!
//! Drawing routes: `GET /drawing` (new), `POST /drawing` (save canvas),
//! `GET /drawing/{uuid}`, `GET /drawing/{uuid}/{action}`, the index feed
//! `GET /drawingindex/{since}` and approved PNGs under `/img/drawings/approved/`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{Path, Request, State};
use axum::http::{header, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use lf_protocol::{CommandKind, DrawingInfo, DrawingUpdate, IndexResponse, PollResponse};
use tokio::sync::Mutex;

use crate::db::{now_ms, Database};
use crate::drawings::DrawingAction;
use crate::error::ApiError;

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<Mutex<Database>>,
    pub image_dir: PathBuf,
    pub auto_approve: bool,
}

impl AppState {
    pub fn new(db: Database, image_dir: PathBuf, auto_approve: bool) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            image_dir,
            auto_approve,
        }
    }
}

pub fn router(state: AppState) -> Router {
    // The router wants one parameter name per path position, hence the
    // positional names on the overlapping command routes.
    Router::new()
        .route("/command/:p1", get(query_all))
        .route("/command/:p1/:p2", get(query_kind))
        .route("/command/:p1/:p2/:p3", get(query_subject))
        .route("/command/:p1/:p2/clear", get(clear_command))
        .route("/command/:p1/:p2/add/:p4", get(add_command))
        .route("/drawing", get(create_drawing).post(update_drawing))
        .route("/drawing/:uuid", get(get_drawing))
        .route("/drawing/:uuid/:action", get(drawing_action))
        .route("/drawingindex/:since", get(drawing_index))
        .route("/img/drawings/approved/:file", get(approved_image))
        .layer(middleware::from_fn(log_requests))
        .with_state(state)
}

async fn log_requests(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let started = Instant::now();
    let response = next.run(req).await;
    log::info!(
        "{method} {path} -> {} ({:.1}ms)",
        response.status().as_u16(),
        started.elapsed().as_secs_f64() * 1000.0
    );
    response
}

fn parse_kind(raw: &str) -> Result<CommandKind, ApiError> {
    raw.parse().map_err(|_| ApiError::InvalidCommandType)
}

fn parse_since(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid timestamp '{raw}'")))
}

async fn query(
    state: &AppState,
    kind: Option<CommandKind>,
    uuid: Option<&str>,
    since: i64,
) -> Json<PollResponse> {
    let db = state.db.lock().await;
    let time = now_ms();
    let commands = db.data.commands.query(kind, uuid, since);
    Json(PollResponse { time, commands })
}

pub async fn query_all(
    State(state): State<AppState>,
    Path(since): Path<String>,
) -> Result<Json<PollResponse>, ApiError> {
    let since = parse_since(&since)?;
    Ok(query(&state, None, None, since).await)
}

pub async fn query_kind(
    State(state): State<AppState>,
    Path((kind, since)): Path<(String, String)>,
) -> Result<Json<PollResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let since = parse_since(&since)?;
    Ok(query(&state, Some(kind), None, since).await)
}

pub async fn query_subject(
    State(state): State<AppState>,
    Path((kind, uuid, since)): Path<(String, String, String)>,
) -> Result<Json<PollResponse>, ApiError> {
    let kind = parse_kind(&kind)?;
    let since = parse_since(&since)?;
    Ok(query(&state, Some(kind), Some(&uuid), since).await)
}

pub async fn add_command(
    State(state): State<AppState>,
    Path((kind, uuid, num)): Path<(String, String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let num: u32 = num
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid count '{num}'")))?;
    let mut db = state.db.lock().await;
    if !db.data.drawings.contains(&uuid) {
        return Err(ApiError::InvalidDrawingUuid);
    }
    let total = db.data.commands.add(&uuid, kind, num, now_ms());
    db.save()?;
    log::debug!("{kind} x{num} for {uuid} (pending {total})");
    Ok(StatusCode::OK)
}

pub async fn clear_command(
    State(state): State<AppState>,
    Path((kind, uuid)): Path<(String, String)>,
) -> Result<StatusCode, ApiError> {
    let kind = parse_kind(&kind)?;
    let mut db = state.db.lock().await;
    if !db.data.drawings.contains(&uuid) {
        return Err(ApiError::InvalidDrawingUuid);
    }
    let pending = db.data.commands.clear(&uuid, kind, now_ms());
    db.save()?;
    log::debug!("Cleared {kind} for {uuid} ({pending} were pending)");
    Ok(StatusCode::OK)
}

pub async fn create_drawing(State(state): State<AppState>) -> Result<Json<DrawingInfo>, ApiError> {
    let mut db = state.db.lock().await;
    let info = {
        let mut rng = rand::thread_rng();
        db.data.drawings.create(&mut rng, now_ms()).info()
    };
    db.save()?;
    Ok(Json(info))
}

pub async fn get_drawing(
    State(state): State<AppState>,
    Path(uuid): Path<String>,
) -> Result<Json<DrawingInfo>, ApiError> {
    let db = state.db.lock().await;
    db.data
        .drawings
        .get(&uuid)
        .map(|drawing| Json(drawing.info()))
        .ok_or(ApiError::InvalidDrawingUuid)
}

pub async fn update_drawing(
    State(state): State<AppState>,
    Json(body): Json<DrawingUpdate>,
) -> Result<StatusCode, ApiError> {
    let mut db = state.db.lock().await;
    db.data
        .drawings
        .update(&body.uuid, body.json, body.dimensions, now_ms())?;
    db.save()?;
    Ok(StatusCode::OK)
}

pub async fn drawing_action(
    State(state): State<AppState>,
    Path((uuid, action)): Path<(String, String)>,
) -> Result<Json<DrawingInfo>, ApiError> {
    let action: DrawingAction = action.parse().map_err(ApiError::BadRequest)?;
    let mut db = state.db.lock().await;
    db.data
        .drawings
        .apply(&uuid, action, state.auto_approve, now_ms())?;
    db.save()?;
    db.data
        .drawings
        .get(&uuid)
        .map(|drawing| Json(drawing.info()))
        .ok_or(ApiError::InvalidDrawingUuid)
}

pub async fn drawing_index(
    State(state): State<AppState>,
    Path(since): Path<String>,
) -> Result<Json<IndexResponse>, ApiError> {
    let since = parse_since(&since)?;
    let db = state.db.lock().await;
    let time = now_ms();
    Ok(Json(IndexResponse {
        time,
        changes: db.data.drawings.index_since(since),
    }))
}

pub async fn approved_image(
    State(state): State<AppState>,
    Path(file): Path<String>,
) -> Result<Response, ApiError> {
    let Some(stem) = file.strip_suffix(".png") else {
        return Err(ApiError::NotFound);
    };
    if stem.is_empty() || !stem.chars().all(|c| c.is_ascii_alphanumeric() || c == '-') {
        return Err(ApiError::NotFound);
    }
    {
        let db = state.db.lock().await;
        let approved = db
            .data
            .drawings
            .get(stem)
            .is_some_and(|d| d.status == lf_protocol::DrawingStatus::Approved);
        if !approved {
            return Err(ApiError::NotFound);
        }
    }
    let path = state.image_dir.join(&file);
    match tokio::fs::read(&path).await {
        Ok(bytes) => Ok(([(header::CONTENT_TYPE, "image/png")], bytes).into_response()),
        Err(err) => {
            log::warn!("Approved image '{}' unavailable: {err}", path.display());
            Err(ApiError::NotFound)
        }
    }
}
