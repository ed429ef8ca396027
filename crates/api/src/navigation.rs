//! Rendering of wizard routes and navigation outcomes.
//!
//! The core decides *which* page comes next as a [`RouteTarget`]; this module
//! turns it into the concrete page path the front end navigates to:
//!
//! ```text
//! /apply/{id}/{step}                                  shared steps
//! /apply/{id}/{section}/{step}                        applicant steps
//! /apply/{id}/{section}/children/{child_id}/{step}    child steps
//! ```

use cdcp_core::apply::review::ReviewOutcome;
use cdcp_core::apply::state::ApplicationType;
use cdcp_core::apply::steps::{ApplyStep, RouteParams, RouteTarget};
use serde::Serialize;

/// Concrete page path of `target`.
pub fn resolve_path(target: &RouteTarget) -> String {
    let id = target.params.id;
    let slug = target.step.slug();

    match (target.section, target.params.child_id) {
        (Some(section), Some(child_id)) if target.step.is_child_step() => format!(
            "/apply/{id}/{}/children/{child_id}/{slug}",
            section.as_str()
        ),
        (Some(section), _) if !target.step.is_shared() => {
            format!("/apply/{id}/{}/{slug}", section.as_str())
        }
        _ => format!("/apply/{id}/{slug}"),
    }
}

/// A [`RouteTarget`] together with its rendered path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteView {
    pub step: ApplyStep,
    pub section: Option<ApplicationType>,
    pub params: RouteParams,
    pub path: String,
}

impl From<RouteTarget> for RouteView {
    fn from(target: RouteTarget) -> Self {
        Self {
            path: resolve_path(&target),
            step: target.step,
            section: target.section,
            params: target.params,
        }
    }
}

/// Either the requested payload or the page the user must go to instead.
///
/// Serialized as `{ "kind": "ok", "value": ... }` or
/// `{ "kind": "redirect", "target": { ... } }`.
#[derive(Debug, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Navigation<T: Serialize> {
    Ok { value: T },
    Redirect { target: RouteView },
}

impl<T: Serialize> Navigation<T> {
    pub fn redirect(target: RouteTarget) -> Self {
        Self::Redirect {
            target: target.into(),
        }
    }
}

impl<T: Serialize> From<ReviewOutcome<T>> for Navigation<T> {
    fn from(outcome: ReviewOutcome<T>) -> Self {
        match outcome {
            ReviewOutcome::Ok(value) => Self::Ok { value },
            ReviewOutcome::Redirect(target) => Self::redirect(target),
        }
    }
}
