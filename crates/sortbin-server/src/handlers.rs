//! REST handlers for the CRUD surface and the dustbin command actions.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use sortbin_core::{DustbinId, RequestId, UserId, WasteId};
use sortbin_store::dustbins::DustbinRepo;
use sortbin_store::users::UserRepo;
use sortbin_store::wastes::{WasteCategory, WasteRepo};

use crate::error::ApiError;
use crate::server::AppState;

/// How many recent wastes are scanned when resolving a miscategorization
/// report.
const REPORT_SCAN_DEPTH: u32 = 5;

pub async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "healthy" }))
}

// ── Users ────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserBody {
    pub username: String,
    pub name: String,
}

pub async fn create_user(
    State(state): State<AppState>,
    Json(body): Json<CreateUserBody>,
) -> Result<impl IntoResponse, ApiError> {
    if body.username.is_empty() {
        return Err(ApiError::BadRequest("username must not be empty".into()));
    }
    let user = UserRepo::new(state.db.clone()).create(&body.username, &body.name)?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn list_users(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let users = UserRepo::new(state.db.clone()).list()?;
    Ok(Json(users))
}

pub async fn get_user(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserRepo::new(state.db.clone()).get_by_username(&username)?;
    Ok(Json(user))
}

// ── Dustbins ─────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDustbinBody {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

pub async fn create_dustbin(
    State(state): State<AppState>,
    Json(body): Json<CreateDustbinBody>,
) -> Result<impl IntoResponse, ApiError> {
    let bin = DustbinRepo::new(state.db.clone()).create(&body.name, body.latitude, body.longitude)?;
    Ok((StatusCode::CREATED, Json(bin)))
}

pub async fn list_dustbins(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let bins = DustbinRepo::new(state.db.clone()).list()?;
    Ok(Json(bins))
}

pub async fn get_dustbin(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let bin = DustbinRepo::new(state.db.clone()).get(DustbinId::new(id))?;
    Ok(Json(bin))
}

// ── Device commands ──────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLidBody {
    pub user_id: i64,
}

/// Synthesize a lid-open command and push it down the device's channel.
/// The recorded request is returned so the caller can poll its status.
pub async fn open_lid(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Json(body): Json<OpenLidBody>,
) -> Result<impl IntoResponse, ApiError> {
    let dustbin_id = DustbinId::new(id);
    // The dustbin must exist in the catalog before we talk to it.
    DustbinRepo::new(state.db.clone()).get(dustbin_id)?;

    let req = state
        .router
        .generate_new_request(UserId::new(body.user_id), dustbin_id);
    state.router.send_request(&req)?;
    Ok((StatusCode::CREATED, Json(req)))
}

pub async fn get_device_request(
    State(state): State<AppState>,
    Path((id, request_id)): Path<(i64, i64)>,
) -> Result<impl IntoResponse, ApiError> {
    let req = state
        .router
        .get_request(DustbinId::new(id), RequestId::new(request_id))?;
    Ok(Json(req))
}

// ── Wastes ───────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateWasteBody {
    pub username: String,
    pub dustbin_id: i64,
    pub category: WasteCategory,
    pub weight: f64,
    #[serde(default)]
    pub time: Option<String>,
}

pub async fn create_waste(
    State(state): State<AppState>,
    Json(body): Json<CreateWasteBody>,
) -> Result<impl IntoResponse, ApiError> {
    let user = UserRepo::new(state.db.clone()).get_by_username(&body.username)?;
    let bin = DustbinRepo::new(state.db.clone()).get(DustbinId::new(body.dustbin_id))?;

    let time = match body.time {
        Some(raw) => Some(parse_time(&raw)?.to_rfc3339()),
        None => None,
    };
    let waste =
        WasteRepo::new(state.db.clone()).add(user.id, bin.id, body.category, body.weight, time)?;
    Ok((StatusCode::CREATED, Json(waste)))
}

pub async fn list_wastes(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let wastes = WasteRepo::new(state.db.clone()).list()?;
    Ok(Json(wastes))
}

pub async fn get_waste(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let waste = WasteRepo::new(state.db.clone()).get(WasteId::new(id))?;
    Ok(Json(waste))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportIncorrectParams {
    pub dustbin_id: i64,
    #[serde(default)]
    pub time: Option<String>,
}

/// Flag the waste most plausibly meant by a miscategorization report:
/// the newest entry in the dustbin submitted before the reported time,
/// looking at the last few submissions only.
pub async fn report_incorrect_categorization(
    State(state): State<AppState>,
    Query(params): Query<ReportIncorrectParams>,
) -> Result<impl IntoResponse, ApiError> {
    let reported_at = match params.time {
        Some(raw) if !raw.is_empty() => parse_time(&raw)?,
        _ => Utc::now(),
    };

    let repo = WasteRepo::new(state.db.clone());
    let recent = repo.recent_by_dustbin(DustbinId::new(params.dustbin_id), REPORT_SCAN_DEPTH)?;
    for waste in recent {
        let submitted = parse_time(&waste.time)?;
        if reported_at > submitted {
            repo.mark_incorrectly_categorized(waste.id)?;
            let flagged = repo.get(waste.id)?;
            return Ok((StatusCode::CREATED, Json(flagged)));
        }
    }

    Err(ApiError::NotFound(format!(
        "no waste in dustbin {} predates the report",
        params.dustbin_id
    )))
}

fn parse_time(raw: &str) -> Result<DateTime<Utc>, ApiError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|_| ApiError::BadRequest(format!("invalid RFC 3339 time: {raw}")))
}
