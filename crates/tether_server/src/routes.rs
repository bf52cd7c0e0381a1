//! HTTP pairing surface.
//!
//! Thin transport over the orchestrator: validation happens at this
//! boundary, everything stateful lives behind [`AppState`].

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tether_core::{AccountId, SessionId, SessionSnapshot, SessionStatus};
use tower_http::trace::TraceLayer;

use crate::error::ApiError;
use crate::state::AppState;

/// Build the pairing router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}/status", get(session_status))
        .route("/sessions/{id}/disconnect", post(disconnect_session))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct CreateSessionRequest {
    account: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateSessionResponse {
    id: SessionId,
    /// Absent when the session resumed from staged credentials.
    #[serde(skip_serializing_if = "Option::is_none")]
    pairing_code: Option<String>,
    account: AccountId,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SessionStatusResponse {
    status: SessionStatus,
    account: AccountId,
    connected_at: Option<DateTime<Utc>>,
    remote_artifact_location: Option<String>,
}

impl From<SessionSnapshot> for SessionStatusResponse {
    fn from(snapshot: SessionSnapshot) -> Self {
        SessionStatusResponse {
            status: snapshot.status,
            account: snapshot.account,
            connected_at: snapshot.connected_at,
            remote_artifact_location: snapshot.remote_artifact_location,
        }
    }
}

#[derive(Debug, Serialize)]
struct SessionsListResponse {
    sessions: Vec<ConnectedSessionEntry>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ConnectedSessionEntry {
    id: SessionId,
    account: AccountId,
    connected_at: Option<DateTime<Utc>>,
    remote_artifact_location: Option<String>,
}

impl From<SessionSnapshot> for ConnectedSessionEntry {
    fn from(snapshot: SessionSnapshot) -> Self {
        ConnectedSessionEntry {
            id: snapshot.id,
            account: snapshot.account,
            connected_at: snapshot.connected_at,
            remote_artifact_location: snapshot.remote_artifact_location,
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let account = AccountId::parse(request.account)?;
    let ticket = state.orchestrator.create_session(account.clone()).await?;
    Ok(Json(CreateSessionResponse {
        id: ticket.id,
        pairing_code: ticket.pairing_code,
        account,
    }))
}

async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let id: SessionId = id.parse()?;
    let snapshot = state.orchestrator.status(&id)?;
    Ok(Json(snapshot.into()))
}

async fn list_sessions(State(state): State<AppState>) -> Json<SessionsListResponse> {
    let sessions = state
        .orchestrator
        .list_connected()
        .into_iter()
        .map(ConnectedSessionEntry::from)
        .collect();
    Json(SessionsListResponse { sessions })
}

async fn disconnect_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<SessionStatusResponse>, ApiError> {
    let id: SessionId = id.parse()?;
    let snapshot = state.orchestrator.disconnect(&id).await?;
    Ok(Json(snapshot.into()))
}
