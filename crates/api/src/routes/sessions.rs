//! Mounted at `/sessions` by `api_routes()`.
//!
//! ```text
//! POST   /        open_session
//! DELETE /        close_session
//! ```

use axum::routing::post;
use axum::Router;

use crate::handlers::sessions;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/",
        post(sessions::open_session).delete(sessions::close_session),
    )
}
