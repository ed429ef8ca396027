pub mod apply;
pub mod health;
pub mod sessions;

use axum::routing::get;
use axum::Router;

use crate::handlers;
use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /sessions                                         open, close (POST, DELETE)
///
/// /apply                                            start a flow (POST)
/// /apply/{id}                                       load, clear (GET, DELETE)
/// /apply/{id}/steps/{step}                          submit a step form (POST)
/// /apply/{id}/children                              add child (POST)
/// /apply/{id}/children/{child_id}                   remove child (DELETE)
/// /apply/{id}/children/{child_id}/steps/{step}      submit a child step form (POST)
/// /apply/{id}/review                                review, enters edit mode (GET)
/// /apply/{id}/exit-edit-mode                        leave edit mode (POST)
/// /apply/{id}/submit                                review + map + submit (POST)
/// /apply/{id}/confirmation                          submission info (GET)
///
/// /client-applications/{sin}                        application on file (GET)
/// ```
///
/// Every request except `POST /sessions` needs `x-session-id`; mutating
/// requests also need `x-csrf-token`.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/sessions", sessions::router())
        .nest("/apply", apply::router())
        .route(
            "/client-applications/{sin}",
            get(handlers::client_application::get_client_application),
        )
}
