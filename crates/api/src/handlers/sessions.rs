//! Handlers for HTTP sessions.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use crate::error::AppResult;
use crate::middleware::session::CsrfProtected;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// POST /sessions
// ---------------------------------------------------------------------------

/// Open an HTTP session. The returned id and CSRF token must accompany
/// every subsequent request.
pub async fn open_session(State(state): State<AppState>) -> AppResult<impl IntoResponse> {
    let opened = state.sessions.open().await;
    tracing::info!(session_id = %opened.session_id, "Session opened");
    Ok((StatusCode::CREATED, Json(DataResponse { data: opened })))
}

// ---------------------------------------------------------------------------
// DELETE /sessions
// ---------------------------------------------------------------------------

/// Close the caller's session, discarding every flow stored in it.
pub async fn close_session(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
) -> AppResult<StatusCode> {
    state.sessions.close(&session.id).await;
    tracing::info!(session_id = %session.id, "Session closed");
    Ok(StatusCode::NO_CONTENT)
}
