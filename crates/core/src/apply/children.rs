//! Per-child prerequisite chain.
//!
//! The same ordered-rule pattern as the applicant review, applied once per
//! [`ChildState`]. Redirects carry the failing child's id so the user lands on
//! that child's page, whatever its position in the list.

use chrono::NaiveDate;
use serde::Serialize;

use super::review::{first_failure, Rule};
use super::state::{ApplicationType, ChildInformation, ChildState, DentalBenefits};
use super::steps::{ApplyStep, RouteTarget};
use crate::types::{ChildId, FlowId};

fn has_information(child: &ChildState, _: NaiveDate) -> bool {
    child.information.is_some()
}

fn has_dental_insurance(child: &ChildState, _: NaiveDate) -> bool {
    child.dental_insurance.is_some()
}

fn answered_federal_provincial_territorial_benefits(child: &ChildState, _: NaiveDate) -> bool {
    child.has_federal_provincial_territorial_benefits.is_some()
}

fn federal_provincial_territorial_benefits_detailed(child: &ChildState, _: NaiveDate) -> bool {
    child.has_federal_provincial_territorial_benefits != Some(true)
        || child.dental_benefits.is_some()
}

pub const CHILD_RULES: &[Rule<ChildState>] = &[
    Rule { step: ApplyStep::ChildInformation, check: has_information },
    Rule { step: ApplyStep::ChildDentalInsurance, check: has_dental_insurance },
    Rule {
        step: ApplyStep::ChildConfirmFederalProvincialTerritorialBenefits,
        check: answered_federal_provincial_territorial_benefits,
    },
    Rule {
        step: ApplyStep::ChildFederalProvincialTerritorialBenefits,
        check: federal_provincial_territorial_benefits_detailed,
    },
];

/// The steps of [`CHILD_RULES`], in order.
pub const CHILD_STEPS: &[ApplyStep] = &[
    ApplyStep::ChildInformation,
    ApplyStep::ChildDentalInsurance,
    ApplyStep::ChildConfirmFederalProvincialTerritorialBenefits,
    ApplyStep::ChildFederalProvincialTerritorialBenefits,
];

/// A child in which every field the submission needs is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedChild {
    pub id: ChildId,
    pub information: ChildInformation,
    pub dental_insurance: bool,
    /// Present only when the child has federal/provincial benefits.
    pub dental_benefits: Option<DentalBenefits>,
}

/// First unanswered step of `child`, if any.
pub fn first_incomplete_step(child: &ChildState, today: NaiveDate) -> Option<ApplyStep> {
    first_failure(CHILD_RULES, child, today).map(|rule| rule.step)
}

/// Redirect to the first incomplete step of the first incomplete child.
pub fn first_incomplete_child(
    children: &[ChildState],
    section: ApplicationType,
    flow_id: FlowId,
    today: NaiveDate,
) -> Option<RouteTarget> {
    children.iter().find_map(|child| {
        first_incomplete_step(child, today)
            .map(|step| RouteTarget::for_child(step, section, flow_id, child.id))
    })
}

/// Validate every child, in list order.
///
/// Returns the reviewed children, or the redirect for the first child that
/// still has an unanswered step.
pub fn validate_children(
    children: &[ChildState],
    section: ApplicationType,
    flow_id: FlowId,
    today: NaiveDate,
) -> Result<Vec<ReviewedChild>, RouteTarget> {
    if let Some(target) = first_incomplete_child(children, section, flow_id, today) {
        return Err(target);
    }
    children
        .iter()
        .map(|child| {
            project_child(child).ok_or_else(|| {
                RouteTarget::for_child(ApplyStep::ChildInformation, section, flow_id, child.id)
            })
        })
        .collect()
}

/// Project a child whose rules all pass. Stale benefit details are dropped
/// when the child has no federal/provincial benefits.
pub fn project_child(child: &ChildState) -> Option<ReviewedChild> {
    let has_benefits = child.has_federal_provincial_territorial_benefits?;
    let dental_benefits = if has_benefits {
        Some(child.dental_benefits.clone()?)
    } else {
        None
    };
    Some(ReviewedChild {
        id: child.id,
        information: child.information.clone()?,
        dental_insurance: child.dental_insurance?,
        dental_benefits,
    })
}

/// The next unanswered step of `child` that comes after `completed`.
pub fn next_child_step_after(
    child: &ChildState,
    completed: ApplyStep,
    today: NaiveDate,
) -> Option<ApplyStep> {
    let skip = CHILD_RULES
        .iter()
        .position(|rule| rule.step == completed)
        .map_or(0, |index| index + 1);
    first_failure(&CHILD_RULES[skip..], child, today).map(|rule| rule.step)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn information(first_name: &str) -> ChildInformation {
        ChildInformation {
            first_name: first_name.into(),
            last_name: "Doe".into(),
            date_of_birth: NaiveDate::from_ymd_opt(2016, 2, 2).unwrap(),
            is_parent: true,
            has_social_insurance_number: false,
            social_insurance_number: None,
        }
    }

    fn complete(first_name: &str) -> ChildState {
        ChildState {
            id: ChildId::new_v4(),
            information: Some(information(first_name)),
            dental_insurance: Some(true),
            has_federal_provincial_territorial_benefits: Some(false),
            dental_benefits: None,
        }
    }

    #[test]
    fn redirect_carries_the_incomplete_childs_id() {
        let a = complete("A");
        let mut b = complete("B");
        b.dental_insurance = None;
        let flow_id = FlowId::new_v4();

        let target =
            validate_children(&[a.clone(), b.clone()], ApplicationType::Child, flow_id, today())
                .unwrap_err();

        assert_eq!(target.step, ApplyStep::ChildDentalInsurance);
        assert_eq!(target.params.child_id, Some(b.id));
        assert_ne!(target.params.child_id, Some(a.id));
        assert_eq!(target.params.id, flow_id);
    }

    #[test]
    fn new_child_redirects_to_information() {
        let child = ChildState::new(ChildId::new_v4());
        assert_eq!(
            first_incomplete_step(&child, today()),
            Some(ApplyStep::ChildInformation)
        );
    }

    #[test]
    fn benefits_details_required_only_when_flag_true() {
        let mut child = complete("A");
        child.has_federal_provincial_territorial_benefits = Some(true);
        assert_eq!(
            first_incomplete_step(&child, today()),
            Some(ApplyStep::ChildFederalProvincialTerritorialBenefits)
        );

        child.has_federal_provincial_territorial_benefits = Some(false);
        child.dental_benefits = Some(DentalBenefits {
            has_federal_benefits: true,
            federal_social_program: Some("stale".into()),
            has_provincial_territorial_benefits: false,
            province: None,
            provincial_territorial_social_program: None,
        });
        let reviewed = project_child(&child).unwrap();
        assert_eq!(reviewed.dental_benefits, None);
    }

    #[test]
    fn complete_children_project_in_order() {
        let children = [complete("A"), complete("B")];
        let reviewed =
            validate_children(&children, ApplicationType::AdultChild, FlowId::new_v4(), today())
                .unwrap();
        let names: Vec<_> = reviewed.iter().map(|c| c.information.first_name.as_str()).collect();
        assert_eq!(names, ["A", "B"]);
    }

    #[test]
    fn next_step_after_unknown_step_starts_over() {
        let child = ChildState::new(ChildId::new_v4());
        assert_eq!(
            next_child_step_after(&child, ApplyStep::MaritalStatus, today()),
            Some(ApplyStep::ChildInformation)
        );
    }
}
