use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::OffsetDateTime;

use super::{AppError, AppState};
use crate::{
    sort_by_rating, Filters, Location, MatchResult, MatchRule, NewSwipe, Session, SessionId,
    SessionStatus, SwipeStats,
};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSessionRequest {
    pub max_distance: Option<u32>,
    pub category: Option<String>,
    pub price_levels: Option<Vec<u8>>,
    pub location: Option<Location>,
}

#[derive(Debug, Deserialize)]
pub struct JoinRequest {
    pub key: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub key: String,
    pub filters: Filters,
    pub location: Location,
    pub participant_count: usize,
    pub status: SessionStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<Session> for SessionSummary {
    fn from(session: Session) -> Self {
        Self {
            participant_count: session.participant_count(),
            session_id: session.id,
            key: session.key,
            filters: session.filters,
            location: session.location,
            status: session.status,
            created_at: session.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct MatchesResponse {
    pub matches: Vec<MatchResult>,
    pub count: usize,
}

pub async fn create_session(
    State(state): State<AppState>,
    payload: Result<Json<CreateSessionRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SessionSummary>), AppError> {
    let Json(payload) = payload?;
    let location = payload
        .location
        .ok_or_else(|| AppError::BadRequest("Location (lat, lng) is required".into()))?;

    let defaults = Filters::default();
    let filters = Filters {
        max_distance: payload.max_distance.unwrap_or(defaults.max_distance),
        category: payload.category.unwrap_or(defaults.category),
        price_levels: payload.price_levels.unwrap_or(defaults.price_levels),
    };

    let session = state.sessions().create_session(filters, location).await?;
    Ok((StatusCode::CREATED, Json(session.into())))
}

/// Looks a session up by join key without admitting the caller.
pub async fn join_by_key(
    State(state): State<AppState>,
    payload: Result<Json<JoinRequest>, JsonRejection>,
) -> Result<Json<SessionSummary>, AppError> {
    let Json(payload) = payload?;
    let session = state.sessions().join_by_key(&payload.key).await?;
    Ok(Json(session.into()))
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionSummary>, AppError> {
    let session = state.sessions().get_session(&id.parse()?).await?;
    Ok(Json(session.into()))
}

pub async fn record_swipe(
    State(state): State<AppState>,
    payload: Result<Json<NewSwipe>, JsonRejection>,
) -> Result<(StatusCode, Json<Value>), AppError> {
    let Json(payload) = payload?;
    let record = state.sessions().record_swipe(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({ "success": true, "swipeId": record.id })),
    ))
}

/// Matches of a session, best rated first.
pub async fn matches(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MatchesResponse>, AppError> {
    let mut matches = state
        .sessions()
        .matches(&id.parse()?, &MatchRule::default())
        .await?;
    sort_by_rating(&mut matches);

    Ok(Json(MatchesResponse {
        count: matches.len(),
        matches,
    }))
}

pub async fn swipe_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SwipeStats>, AppError> {
    Ok(Json(state.sessions().swipe_stats(&id.parse()?).await?))
}

pub async fn health() -> Json<Value> {
    let timestamp = OffsetDateTime::now_utc()
        .format(&time::format_description::well_known::Rfc3339)
        .unwrap_or_default();
    Json(json!({ "status": "ok", "timestamp": timestamp }))
}
