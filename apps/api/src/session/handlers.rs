//! Axum route handlers for the Session API.

use std::collections::BTreeMap;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::errors::AppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SessionQuery {
    pub session_id: String,
}

#[derive(Debug, Deserialize)]
pub struct SessionDeleteQuery {
    pub session_id: String,
    #[serde(default)]
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SessionDataResponse {
    pub status: &'static str,
    pub session_id: Uuid,
    pub data: BTreeMap<String, Value>,
}

#[derive(Debug, Serialize)]
pub struct SessionUpdateResponse {
    pub status: &'static str,
    pub session_id: Uuid,
}

/// Parses a client-supplied session id.
pub fn parse_session_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim())
        .map_err(|_| AppError::Validation(format!("'{raw}' is not a valid session id")))
}

/// Parses an optional session id taken from a request body.
pub fn parse_optional_session_id(raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    raw.map(parse_session_id).transpose()
}

/// GET /api/session?session_id=
pub async fn handle_get_session(
    State(state): State<AppState>,
    Query(query): Query<SessionQuery>,
) -> Result<Json<SessionDataResponse>, AppError> {
    let session_id = parse_session_id(&query.session_id)?;
    let data = state
        .sessions
        .get_all(session_id)
        .ok_or_else(|| AppError::NotFound("Session not found".to_string()))?;

    Ok(Json(SessionDataResponse {
        status: "success",
        session_id,
        data,
    }))
}

/// POST /api/session
///
/// Body is a JSON object. `session_id` selects the session (created if absent);
/// every other key is merged into it.
pub async fn handle_update_session(
    State(state): State<AppState>,
    Json(mut body): Json<Map<String, Value>>,
) -> Result<Json<SessionUpdateResponse>, AppError> {
    let requested = match body.remove("session_id") {
        None | Some(Value::Null) => None,
        Some(Value::String(raw)) => Some(parse_session_id(&raw)?),
        Some(other) => {
            return Err(AppError::Validation(format!(
                "session_id must be a string, got {other}"
            )))
        }
    };

    let session = state.sessions.resolve(requested);
    for (key, value) in body {
        state.sessions.set(&session, &key, value);
    }

    Ok(Json(SessionUpdateResponse {
        status: "success",
        session_id: session.id,
    }))
}

/// DELETE /api/session?session_id=[&key=]
///
/// Removes one key, or every value when `key` is omitted. The session id stays valid.
pub async fn handle_clear_session(
    State(state): State<AppState>,
    Query(query): Query<SessionDeleteQuery>,
) -> Result<Json<SessionUpdateResponse>, AppError> {
    let session_id = parse_session_id(&query.session_id)?;
    if !state.sessions.exists(session_id) {
        return Err(AppError::NotFound("Session not found".to_string()));
    }

    match query.key.as_deref() {
        Some(key) => {
            state.sessions.remove(session_id, key);
        }
        None => state.sessions.clear(session_id),
    }

    Ok(Json(SessionUpdateResponse {
        status: "success",
        session_id,
    }))
}
