//! Handler for looking up an application already on file.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::Json;

use cdcp_core::apply::forms;
use cdcp_core::mapping::client_application;

use crate::error::{AppError, AppResult};
use crate::middleware::session::Session;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// GET /client-applications/{sin}
// ---------------------------------------------------------------------------

/// Fetch the application on file for a SIN and flatten it.
///
/// The SIN is validated locally before anything is sent downstream, and is
/// never logged. Request spans redact it from the path.
pub async fn get_client_application(
    State(state): State<AppState>,
    session: Session,
    Path(sin): Path<String>,
) -> AppResult<impl IntoResponse> {
    let sin = forms::normalize_sin(&sin)
        .filter(|sin| forms::is_valid_sin(sin))
        .ok_or_else(|| AppError::BadRequest("Invalid social insurance number".into()))?;

    let entity = state
        .benefit_api
        .find_client_application(&sin)
        .await?
        .ok_or_else(|| AppError::NotFound("No application on file".into()))?;

    let dto = client_application::to_client_application_dto(&entity, &state.codes)?;

    tracing::info!(
        session_id = %session.id,
        type_of_application = dto.type_of_application.as_str(),
        "Client application retrieved"
    );
    Ok(Json(DataResponse { data: dto }))
}
