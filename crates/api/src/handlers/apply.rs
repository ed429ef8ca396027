//! Handlers for the apply wizard.
//!
//! Every handler re-loads the flow from the caller's session, so a request
//! always sees the latest saved snapshot. Redirects are navigation outcomes
//! and are returned with status 200 inside a [`Navigation`] payload; only
//! genuine failures become an [`AppError`].

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use cdcp_core::apply::forms::{self, FormContext};
use cdcp_core::apply::lifecycle::ApplyStatePatch;
use cdcp_core::apply::review::{self, ReviewOutcome};
use cdcp_core::apply::state::{ApplicationType, ApplyState, SubmissionInfo};
use cdcp_core::apply::steps::{ApplyStep, RouteTarget};
use cdcp_core::error::CoreError;
use cdcp_core::mapping::submission;
use cdcp_core::types::{ChildId, FlowId};

use crate::error::{AppError, AppResult};
use crate::middleware::session::{CsrfProtected, Session};
use crate::navigation::{Navigation, RouteView};
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Response payloads
// ---------------------------------------------------------------------------

/// A saved snapshot and the page to show next.
#[derive(Debug, Serialize)]
pub struct StepSaved {
    pub state: ApplyState,
    pub next: RouteView,
}

#[derive(Debug, Serialize)]
pub struct ChildAdded {
    pub child_id: ChildId,
    pub state: ApplyState,
    pub next: RouteView,
}

#[derive(Debug, Serialize)]
pub struct Submitted {
    pub submission_info: SubmissionInfo,
    pub next: RouteView,
}

/// What the confirmation page shows.
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub type_of_application: Option<ApplicationType>,
    pub submission_info: SubmissionInfo,
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn parse_child_id(raw: &str) -> Result<ChildId, CoreError> {
    ChildId::parse_str(raw).map_err(|_| CoreError::InvalidIdentifier(raw.to_string()))
}

/// Form context of `apply`: today's date and the applicant SIN on file.
fn form_context(state: &AppState, apply: &ApplyState) -> FormContext {
    FormContext::new(state.lifecycle.today()).with_applicant_sin(
        apply
            .applicant_information
            .as_ref()
            .map(|info| info.social_insurance_number.clone()),
    )
}

/// Where to send a request that tries to change `apply`, if anywhere.
///
/// Submitted flows are frozen and go to the confirmation page. Section steps
/// need an application type first.
fn edit_guard(apply: &ApplyState, step: ApplyStep) -> Option<RouteTarget> {
    if let Err(target) = review::ensure_not_submitted(apply) {
        return Some(target);
    }
    if !step.is_shared() && apply.type_of_application.is_none() {
        return Some(RouteTarget::start(apply.id));
    }
    None
}

fn navigate<T: Serialize>(nav: Navigation<T>) -> Json<DataResponse<Navigation<T>>> {
    Json(DataResponse { data: nav })
}

// ---------------------------------------------------------------------------
// POST /apply
// ---------------------------------------------------------------------------

/// Start a new flow in the caller's session.
pub async fn start_flow(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
) -> AppResult<impl IntoResponse> {
    let id = FlowId::new_v4();
    let apply = state
        .lifecycle
        .start(&session.store, &id.to_string(), ApplyStatePatch::default())
        .await?;

    tracing::info!(flow_id = %id, session_id = %session.id, "Apply flow started");

    let saved = StepSaved {
        next: RouteTarget::start(apply.id).into(),
        state: apply,
    };
    Ok((StatusCode::CREATED, Json(DataResponse { data: saved })))
}

// ---------------------------------------------------------------------------
// GET /apply/{id}
// ---------------------------------------------------------------------------

/// Current snapshot of a flow, or the confirmation page once submitted.
pub async fn get_flow(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let apply = state.lifecycle.load(&session.store, &id).await?;

    let nav = match review::ensure_not_submitted(&apply) {
        Ok(()) => Navigation::Ok { value: apply },
        Err(target) => Navigation::redirect(target),
    };
    Ok(navigate(nav))
}

// ---------------------------------------------------------------------------
// DELETE /apply/{id}
// ---------------------------------------------------------------------------

/// Discard a flow. Idempotent.
pub async fn clear_flow(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    state.lifecycle.clear(&session.store, &id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// POST /apply/{id}/steps/{step}
// ---------------------------------------------------------------------------

/// Validate and save one applicant-level step.
///
/// Invalid input is answered with 422 and the field errors; nothing is saved.
pub async fn submit_step(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path((id, step)): Path<(String, String)>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let step = ApplyStep::from_slug(&step)?;
    let apply = state.lifecycle.load(&session.store, &id).await?;

    if let Some(target) = edit_guard(&apply, step) {
        return Ok(navigate(Navigation::<StepSaved>::redirect(target)));
    }

    let ctx = form_context(&state, &apply);
    let update = match forms::parse_step(step, body, &ctx) {
        Ok(update) => update,
        Err(err) => {
            tracing::debug!(flow_id = %apply.id, step = step.slug(), error = %err, "Step rejected");
            return Err(err.into());
        }
    };

    let saved = state
        .lifecycle
        .save(&session.store, &id, update.patch, &update.remove)
        .await?;
    let next = review::next_step(&saved, step, ctx.today);

    tracing::info!(
        flow_id = %saved.id,
        step = step.slug(),
        next = next.step.slug(),
        "Step saved"
    );

    Ok(navigate(Navigation::Ok {
        value: StepSaved {
            state: saved,
            next: next.into(),
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /apply/{id}/children
// ---------------------------------------------------------------------------

/// Append an empty child and point at its first step.
pub async fn add_child(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let apply = state.lifecycle.load(&session.store, &id).await?;

    if let Some(target) = edit_guard(&apply, ApplyStep::Children) {
        return Ok((StatusCode::OK, navigate(Navigation::<ChildAdded>::redirect(target))));
    }
    let section = match apply.type_of_application {
        Some(section) if section.requires_children() => section,
        _ => {
            return Err(AppError::BadRequest(
                "This type of application does not include children".into(),
            ))
        }
    };

    let (saved, child_id) = state.lifecycle.add_child(&session.store, &id).await?;
    let next = RouteTarget::for_child(ApplyStep::ChildInformation, section, saved.id, child_id);

    Ok((
        StatusCode::CREATED,
        navigate(Navigation::Ok {
            value: ChildAdded {
                child_id,
                state: saved,
                next: next.into(),
            },
        }),
    ))
}

// ---------------------------------------------------------------------------
// DELETE /apply/{id}/children/{child_id}
// ---------------------------------------------------------------------------

/// Remove a child. Removing an unknown child is not an error.
pub async fn remove_child(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path((id, child_id)): Path<(String, String)>,
) -> AppResult<impl IntoResponse> {
    let child_id = parse_child_id(&child_id)?;
    let apply = state.lifecycle.load(&session.store, &id).await?;

    if let Some(target) = edit_guard(&apply, ApplyStep::Children) {
        return Ok(navigate(Navigation::<StepSaved>::redirect(target)));
    }

    let saved = state
        .lifecycle
        .remove_child(&session.store, &id, child_id)
        .await?;
    let next = RouteTarget::new(ApplyStep::Children, saved.type_of_application, saved.id);

    Ok(navigate(Navigation::Ok {
        value: StepSaved {
            state: saved,
            next: next.into(),
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /apply/{id}/children/{child_id}/steps/{step}
// ---------------------------------------------------------------------------

/// Validate and save one step of one child.
pub async fn submit_child_step(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path((id, child_id, step)): Path<(String, String, String)>,
    Json(body): Json<serde_json::Value>,
) -> AppResult<impl IntoResponse> {
    let step = ApplyStep::from_child_slug(&step)?;
    let child_id = parse_child_id(&child_id)?;
    let apply = state.lifecycle.load(&session.store, &id).await?;

    if let Some(target) = edit_guard(&apply, step) {
        return Ok(navigate(Navigation::<StepSaved>::redirect(target)));
    }
    if apply.find_child(child_id).is_none() {
        return Err(CoreError::NotFound {
            entity: "Child",
            id: child_id,
        }
        .into());
    }

    let ctx = form_context(&state, &apply);
    let patch = forms::parse_child_step(step, body, &ctx)?;
    let saved = state
        .lifecycle
        .save_child(&session.store, &id, child_id, patch)
        .await?;
    let next = review::next_child_step(&saved, child_id, step, ctx.today);

    tracing::info!(
        flow_id = %saved.id,
        child_id = %child_id,
        step = step.slug(),
        next = next.step.slug(),
        "Child step saved"
    );

    Ok(navigate(Navigation::Ok {
        value: StepSaved {
            state: saved,
            next: next.into(),
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /apply/{id}/review
// ---------------------------------------------------------------------------

/// Gate the review page. A complete flow enters edit mode; an incomplete
/// one is redirected to its first missing step.
pub async fn review_flow(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.lifecycle.review(&session.store, &id).await?;
    Ok(navigate(Navigation::from(outcome)))
}

// ---------------------------------------------------------------------------
// POST /apply/{id}/exit-edit-mode
// ---------------------------------------------------------------------------

/// Leave edit mode so the next saved step continues forward again.
pub async fn exit_edit_mode(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let apply = state.lifecycle.load(&session.store, &id).await?;
    if let Err(target) = review::ensure_not_submitted(&apply) {
        return Ok(navigate(Navigation::<StepSaved>::redirect(target)));
    }

    let saved = state
        .lifecycle
        .set_edit_mode(&session.store, &id, false)
        .await?;
    let next = review::review_target(&saved);

    Ok(navigate(Navigation::Ok {
        value: StepSaved {
            state: saved,
            next: next.into(),
        },
    }))
}

// ---------------------------------------------------------------------------
// POST /apply/{id}/submit
// ---------------------------------------------------------------------------

/// Review, map and submit a flow, then freeze it with the confirmation code.
///
/// A flow that is not reviewable is redirected, leaves edit mode, and nothing
/// is sent. A flow that was already submitted is redirected to its
/// confirmation page.
pub async fn submit_application(
    State(state): State<AppState>,
    CsrfProtected(session): CsrfProtected,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let apply = state.lifecycle.load(&session.store, &id).await?;

    let reviewed = match review::validate_for_review(&apply, state.lifecycle.today()) {
        ReviewOutcome::Ok(reviewed) => reviewed,
        ReviewOutcome::Redirect(target) => {
            if apply.edit_mode && !apply.is_submitted() {
                state
                    .lifecycle
                    .set_edit_mode(&session.store, &id, false)
                    .await?;
            }
            return Ok(navigate(Navigation::<Submitted>::redirect(target)));
        }
    };

    let request = submission::to_submission_request(&reviewed, &state.codes)?;
    let response = state.benefit_api.submit_application(&request).await?;
    let submission_info = submission::to_submission_info(&response, state.clock.now())?;

    let patch = ApplyStatePatch {
        edit_mode: Some(false),
        submission_info: Some(submission_info.clone()),
        ..Default::default()
    };
    let saved = state.lifecycle.save(&session.store, &id, patch, &[]).await?;

    tracing::info!(
        flow_id = %saved.id,
        type_of_application = reviewed.type_of_application.as_str(),
        children = reviewed.children.len(),
        confirmation_code = %submission_info.confirmation_code,
        "Application submitted"
    );

    let next = RouteTarget::new(ApplyStep::Confirmation, saved.type_of_application, saved.id);
    Ok(navigate(Navigation::Ok {
        value: Submitted {
            submission_info,
            next: next.into(),
        },
    }))
}

// ---------------------------------------------------------------------------
// GET /apply/{id}/confirmation
// ---------------------------------------------------------------------------

/// Submission receipt. Flows not yet submitted are sent back to review.
pub async fn confirmation(
    State(state): State<AppState>,
    session: Session,
    Path(id): Path<String>,
) -> AppResult<impl IntoResponse> {
    let apply = state.lifecycle.load(&session.store, &id).await?;

    let nav = match apply.submission_info {
        Some(submission_info) => Navigation::Ok {
            value: Confirmation {
                type_of_application: apply.type_of_application,
                submission_info,
            },
        },
        None => {
            tracing::debug!(flow_id = %apply.id, "Confirmation requested before submission");
            Navigation::redirect(review::review_target(&apply))
        }
    };
    Ok(navigate(nav))
}
