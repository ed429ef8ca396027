use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::session::{ScopedSessionStore, CSRF_TOKEN_HEADER, SESSION_ID_HEADER};
use crate::state::AppState;

/// The caller's HTTP session, from the `x-session-id` header.
///
/// ```ignore
/// async fn my_handler(session: Session) -> AppResult<Json<()>> {
///     state.lifecycle.load(&session.store, &id).await?;
///     Ok(Json(()))
/// }
/// ```
#[derive(Clone)]
pub struct Session {
    pub id: String,
    /// Key/value store scoped to this session.
    pub store: ScopedSessionStore,
}

impl FromRequestParts<AppState> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let id = header(parts, SESSION_ID_HEADER)
            .ok_or_else(|| AppError::Unauthorized(format!("Missing {SESSION_ID_HEADER} header")))?;

        if !state.sessions.touch(id).await {
            return Err(AppError::Unauthorized("Unknown or closed session".into()));
        }

        let id = id.to_string();
        Ok(Session {
            store: ScopedSessionStore::new(state.sessions.clone(), id.clone()),
            id,
        })
    }
}

/// A [`Session`] whose request carried the matching `x-csrf-token`.
///
/// Required by every mutating endpoint. A mismatch is rejected outright.
#[derive(Clone)]
pub struct CsrfProtected(pub Session);

impl FromRequestParts<AppState> for CsrfProtected {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let session = Session::from_request_parts(parts, state).await?;
        let token = header(parts, CSRF_TOKEN_HEADER).unwrap_or_default();

        if let Err(err) = state.sessions.verify_csrf(&session.id, token).await {
            tracing::warn!(session_id = %session.id, "CSRF token mismatch");
            return Err(err.into());
        }

        Ok(CsrfProtected(session))
    }
}

fn header<'a>(parts: &'a Parts, name: &str) -> Option<&'a str> {
    parts
        .headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
}
