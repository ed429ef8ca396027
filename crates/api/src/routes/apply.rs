//! Route definitions for the apply wizard.
//!
//! Mounted at `/apply` by `api_routes()`.
//!
//! ```text
//! POST   /                                         start_flow
//! GET    /{id}                                     get_flow
//! DELETE /{id}                                     clear_flow
//! POST   /{id}/steps/{step}                        submit_step
//! POST   /{id}/children                            add_child
//! DELETE /{id}/children/{child_id}                 remove_child
//! POST   /{id}/children/{child_id}/steps/{step}    submit_child_step
//! GET    /{id}/review                              review_flow
//! POST   /{id}/exit-edit-mode                      exit_edit_mode
//! POST   /{id}/submit                              submit_application
//! GET    /{id}/confirmation                        confirmation
//! ```

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::apply;
use crate::state::AppState;

/// Apply wizard routes -- mounted at `/apply`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(apply::start_flow))
        .route("/{id}", get(apply::get_flow).delete(apply::clear_flow))
        .route("/{id}/steps/{step}", post(apply::submit_step))
        .route("/{id}/children", post(apply::add_child))
        .route("/{id}/children/{child_id}", delete(apply::remove_child))
        .route(
            "/{id}/children/{child_id}/steps/{step}",
            post(apply::submit_child_step),
        )
        .route("/{id}/review", get(apply::review_flow))
        .route("/{id}/exit-edit-mode", post(apply::exit_edit_mode))
        .route("/{id}/submit", post(apply::submit_application))
        .route("/{id}/confirmation", get(apply::confirmation))
}
