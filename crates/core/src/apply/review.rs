//! Step dependency and review validation.
//!
//! Each application type owns an ordered [`ReviewPlan`]: a list of
//! `(step, predicate)` rules evaluated by a single "first failing rule wins"
//! interpreter. A failing rule is not an error; it is a redirect to the step
//! that has to be (re)completed. Only when every rule passes is the state
//! projected into a [`ReviewedApplyState`], the sole input accepted by the
//! submission mapper.

use chrono::NaiveDate;
use serde::Serialize;

use super::children::{self, ReviewedChild};
use super::state::{
    AgeCategory, ApplicantInformation, ApplicationType, ApplyState, CommunicationPreferences,
    ContactInformation, DentalBenefits, MaritalStatus, PartnerInformation, TermsAndConditions,
};
use super::steps::{ApplyStep, RouteTarget};
use crate::types::{ChildId, FlowId};

// ---------------------------------------------------------------------------
// Rules
// ---------------------------------------------------------------------------

/// One prerequisite: when `check` fails the user is sent to `step`.
pub struct Rule<S> {
    pub step: ApplyStep,
    pub check: fn(&S, NaiveDate) -> bool,
}

/// Return the first rule `subject` does not satisfy, in declaration order.
pub fn first_failure<'r, S>(
    rules: &'r [Rule<S>],
    subject: &S,
    today: NaiveDate,
) -> Option<&'r Rule<S>> {
    rules.iter().find(|rule| !(rule.check)(subject, today))
}

/// An entry of an applicant-level plan.
pub enum PlanEntry {
    Rule(Rule<ApplyState>),
    /// Run the per-child rules against every child, in list order.
    EachChild,
}

/// The ordered prerequisite chain of one application type.
pub struct ReviewPlan {
    pub section: ApplicationType,
    segments: &'static [&'static [PlanEntry]],
}

impl ReviewPlan {
    pub fn for_type(type_of_application: ApplicationType) -> &'static ReviewPlan {
        match type_of_application {
            ApplicationType::Adult => &ADULT_PLAN,
            ApplicationType::AdultChild => &ADULT_CHILD_PLAN,
            ApplicationType::Child => &CHILD_PLAN,
            ApplicationType::Delegate => &DELEGATE_PLAN,
        }
    }

    pub fn entries(&self) -> impl Iterator<Item = &'static PlanEntry> {
        self.segments.iter().flat_map(|segment| segment.iter())
    }

    /// Steps a plan can redirect to, in order, without duplicates.
    pub fn steps(&self) -> Vec<ApplyStep> {
        let mut steps = Vec::new();
        for entry in self.entries() {
            let entry_steps: &[ApplyStep] = match entry {
                PlanEntry::Rule(rule) => std::slice::from_ref(&rule.step),
                PlanEntry::EachChild => children::CHILD_STEPS,
            };
            for step in entry_steps {
                if !steps.contains(step) {
                    steps.push(*step);
                }
            }
        }
        steps
    }

    /// Evaluate entries from position `skip` onward.
    fn first_failure_from(
        &self,
        state: &ApplyState,
        today: NaiveDate,
        skip: usize,
    ) -> Option<RouteTarget> {
        for entry in self.entries().skip(skip) {
            match entry {
                PlanEntry::Rule(rule) => {
                    if !(rule.check)(state, today) {
                        return Some(RouteTarget::new(rule.step, Some(self.section), state.id));
                    }
                }
                PlanEntry::EachChild => {
                    if let Some(target) = children::first_incomplete_child(
                        &state.children,
                        self.section,
                        state.id,
                        today,
                    ) {
                        return Some(target);
                    }
                }
            }
        }
        None
    }

    /// Position just past the last entry that redirects to `step`.
    fn position_after(&self, step: ApplyStep) -> usize {
        self.entries()
            .enumerate()
            .filter(|(_, entry)| match entry {
                PlanEntry::Rule(rule) => rule.step == step,
                PlanEntry::EachChild => step.is_child_step(),
            })
            .map(|(index, _)| index + 1)
            .last()
            .unwrap_or(0)
    }
}

// -- predicates --

fn has_type(state: &ApplyState, _: NaiveDate) -> bool {
    state.type_of_application.is_some()
}

fn has_terms(state: &ApplyState, _: NaiveDate) -> bool {
    state.terms_and_conditions.is_some()
}

fn has_tax_filing(state: &ApplyState, _: NaiveDate) -> bool {
    state.tax_filing.is_some()
}

fn filed_taxes(state: &ApplyState, _: NaiveDate) -> bool {
    state.tax_filing != Some(false)
}

fn has_date_of_birth(state: &ApplyState, _: NaiveDate) -> bool {
    state.date_of_birth.is_some()
}

fn applicant_not_a_child(state: &ApplyState, today: NaiveDate) -> bool {
    state.age_category(today) != Some(AgeCategory::Children)
}

fn youth_answered_living_independently(state: &ApplyState, today: NaiveDate) -> bool {
    state.age_category(today) != Some(AgeCategory::Youth) || state.living_independently.is_some()
}

fn youth_lives_independently(state: &ApplyState, today: NaiveDate) -> bool {
    state.age_category(today) != Some(AgeCategory::Youth)
        || state.living_independently != Some(false)
}

fn adult_answered_disability_tax_credit(state: &ApplyState, today: NaiveDate) -> bool {
    state.age_category(today) != Some(AgeCategory::Adults) || state.disability_tax_credit.is_some()
}

fn adult_has_disability_tax_credit(state: &ApplyState, today: NaiveDate) -> bool {
    state.age_category(today) != Some(AgeCategory::Adults)
        || state.disability_tax_credit != Some(false)
}

fn has_applicant_information(state: &ApplyState, _: NaiveDate) -> bool {
    state.applicant_information.is_some()
}

fn has_marital_status(state: &ApplyState, _: NaiveDate) -> bool {
    state.marital_status.is_some()
}

/// Partner information is present exactly when the marital status calls for it.
fn partner_matches_marital_status(state: &ApplyState, _: NaiveDate) -> bool {
    let needs_partner = state.marital_status.is_some_and(|status| status.has_partner());
    needs_partner == state.partner_information.is_some()
}

fn has_contact_information(state: &ApplyState, _: NaiveDate) -> bool {
    state.contact_information.is_some()
}

fn has_communication_preferences(state: &ApplyState, _: NaiveDate) -> bool {
    state.communication_preferences.is_some()
}

fn has_dental_insurance(state: &ApplyState, _: NaiveDate) -> bool {
    state.dental_insurance.is_some()
}

fn answered_federal_provincial_territorial_benefits(state: &ApplyState, _: NaiveDate) -> bool {
    state.has_federal_provincial_territorial_benefits.is_some()
}

/// Benefit details are required only when the applicant said they have some.
fn federal_provincial_territorial_benefits_detailed(state: &ApplyState, _: NaiveDate) -> bool {
    state.has_federal_provincial_territorial_benefits != Some(true)
        || state.dental_benefits.is_some()
}

fn has_children(state: &ApplyState, _: NaiveDate) -> bool {
    !state.children.is_empty()
}

fn never(_: &ApplyState, _: NaiveDate) -> bool {
    false
}

// -- plan segments --

const TYPE_AND_TERMS: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::TypeOfApplication, check: has_type }),
    PlanEntry::Rule(Rule { step: ApplyStep::TermsAndConditions, check: has_terms }),
];

const TAX_FILING: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::TaxFiling, check: has_tax_filing }),
    PlanEntry::Rule(Rule { step: ApplyStep::FileTaxes, check: filed_taxes }),
];

const ADULT_ELIGIBILITY: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::DateOfBirth, check: has_date_of_birth }),
    PlanEntry::Rule(Rule { step: ApplyStep::ParentOrGuardian, check: applicant_not_a_child }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::LivingIndependently,
        check: youth_answered_living_independently,
    }),
    PlanEntry::Rule(Rule { step: ApplyStep::ParentOrGuardian, check: youth_lives_independently }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::DisabilityTaxCredit,
        check: adult_answered_disability_tax_credit,
    }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::DobEligibility,
        check: adult_has_disability_tax_credit,
    }),
];

const APPLICANT_INFORMATION: &[PlanEntry] = &[PlanEntry::Rule(Rule {
    step: ApplyStep::ApplicantInformation,
    check: has_applicant_information,
})];

const PARENT_ELIGIBILITY: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::DateOfBirth, check: has_date_of_birth }),
    PlanEntry::Rule(Rule { step: ApplyStep::ContactApplyChild, check: applicant_not_a_child }),
];

const HOUSEHOLD: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::MaritalStatus, check: has_marital_status }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::MaritalStatus,
        check: partner_matches_marital_status,
    }),
    PlanEntry::Rule(Rule { step: ApplyStep::ContactInformation, check: has_contact_information }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::CommunicationPreference,
        check: has_communication_preferences,
    }),
];

const ADULT_COVERAGE: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::DentalInsurance, check: has_dental_insurance }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::ConfirmFederalProvincialTerritorialBenefits,
        check: answered_federal_provincial_territorial_benefits,
    }),
    PlanEntry::Rule(Rule {
        step: ApplyStep::FederalProvincialTerritorialBenefits,
        check: federal_provincial_territorial_benefits_detailed,
    }),
];

const CHILDREN: &[PlanEntry] = &[
    PlanEntry::Rule(Rule { step: ApplyStep::Children, check: has_children }),
    PlanEntry::EachChild,
];

// Delegate applications are not taken online.
const DELEGATE_GATE: &[PlanEntry] = &[PlanEntry::Rule(Rule {
    step: ApplyStep::ApplicationDelegate,
    check: never,
})];

static ADULT_PLAN: ReviewPlan = ReviewPlan {
    section: ApplicationType::Adult,
    segments: &[
        TYPE_AND_TERMS,
        TAX_FILING,
        ADULT_ELIGIBILITY,
        APPLICANT_INFORMATION,
        HOUSEHOLD,
        ADULT_COVERAGE,
    ],
};

static ADULT_CHILD_PLAN: ReviewPlan = ReviewPlan {
    section: ApplicationType::AdultChild,
    segments: &[
        TYPE_AND_TERMS,
        TAX_FILING,
        ADULT_ELIGIBILITY,
        APPLICANT_INFORMATION,
        HOUSEHOLD,
        ADULT_COVERAGE,
        CHILDREN,
    ],
};

static CHILD_PLAN: ReviewPlan = ReviewPlan {
    section: ApplicationType::Child,
    segments: &[
        TYPE_AND_TERMS,
        TAX_FILING,
        CHILDREN,
        APPLICANT_INFORMATION,
        PARENT_ELIGIBILITY,
        HOUSEHOLD,
    ],
};

static DELEGATE_PLAN: ReviewPlan = ReviewPlan {
    section: ApplicationType::Delegate,
    segments: &[TYPE_AND_TERMS, DELEGATE_GATE],
};

// ---------------------------------------------------------------------------
// Review outcome
// ---------------------------------------------------------------------------

/// Result of gating a step: either the value or the page to go to instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReviewOutcome<T> {
    Ok(T),
    Redirect(RouteTarget),
}

impl<T> ReviewOutcome<T> {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn redirect_target(&self) -> Option<&RouteTarget> {
        match self {
            Self::Ok(_) => None,
            Self::Redirect(target) => Some(target),
        }
    }
}

/// A state in which every field the submission needs is present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReviewedApplyState {
    pub id: FlowId,
    pub edit_mode: bool,
    /// Never [`ApplicationType::Delegate`].
    pub type_of_application: ApplicationType,
    pub terms_and_conditions: TermsAndConditions,
    pub date_of_birth: NaiveDate,
    pub living_independently: Option<bool>,
    pub disability_tax_credit: Option<bool>,
    pub applicant_information: ApplicantInformation,
    pub marital_status: MaritalStatus,
    pub partner_information: Option<PartnerInformation>,
    pub contact_information: ContactInformation,
    pub communication_preferences: CommunicationPreferences,
    /// Asked of adult applicants only.
    pub dental_insurance: Option<bool>,
    /// Present only when the applicant declared federal/provincial benefits.
    pub dental_benefits: Option<DentalBenefits>,
    pub children: Vec<ReviewedChild>,
}

/// Redirect to the confirmation page when the flow was already submitted.
pub fn ensure_not_submitted(state: &ApplyState) -> Result<(), RouteTarget> {
    if state.is_submitted() {
        return Err(RouteTarget::new(
            ApplyStep::Confirmation,
            state.type_of_application,
            state.id,
        ));
    }
    Ok(())
}

/// Gate the review/submit step.
pub fn validate_for_review(state: &ApplyState, today: NaiveDate) -> ReviewOutcome<ReviewedApplyState> {
    if let Err(target) = ensure_not_submitted(state) {
        return ReviewOutcome::Redirect(target);
    }

    let Some(type_of_application) = state.type_of_application else {
        return ReviewOutcome::Redirect(RouteTarget::start(state.id));
    };
    let plan = ReviewPlan::for_type(type_of_application);

    if let Some(target) = plan.first_failure_from(state, today, 0) {
        tracing::debug!(
            flow_id = %state.id,
            step = target.step.slug(),
            child_id = ?target.params.child_id,
            "Apply state not ready for review"
        );
        return ReviewOutcome::Redirect(target);
    }

    match project(state, plan.section, today) {
        Ok(reviewed) => ReviewOutcome::Ok(reviewed),
        Err(target) => {
            tracing::warn!(
                flow_id = %state.id,
                step = target.step.slug(),
                "Review projection disagrees with rule table"
            );
            ReviewOutcome::Redirect(target)
        }
    }
}

/// Re-assert every required field while building the projection.
fn project(
    state: &ApplyState,
    section: ApplicationType,
    today: NaiveDate,
) -> Result<ReviewedApplyState, RouteTarget> {
    let missing = |step| RouteTarget::new(step, Some(section), state.id);

    let marital_status = state
        .marital_status
        .ok_or_else(|| missing(ApplyStep::MaritalStatus))?;
    let partner_information = if marital_status.has_partner() {
        Some(
            state
                .partner_information
                .clone()
                .ok_or_else(|| missing(ApplyStep::MaritalStatus))?,
        )
    } else {
        None
    };

    let (dental_insurance, dental_benefits) = if section == ApplicationType::Child {
        (None, None)
    } else {
        let insurance = state
            .dental_insurance
            .ok_or_else(|| missing(ApplyStep::DentalInsurance))?;
        let has_benefits = state
            .has_federal_provincial_territorial_benefits
            .ok_or_else(|| missing(ApplyStep::ConfirmFederalProvincialTerritorialBenefits))?;
        let benefits = if has_benefits {
            Some(
                state
                    .dental_benefits
                    .clone()
                    .ok_or_else(|| missing(ApplyStep::FederalProvincialTerritorialBenefits))?,
            )
        } else {
            None
        };
        (Some(insurance), benefits)
    };

    let children = if section.requires_children() {
        if state.children.is_empty() {
            return Err(missing(ApplyStep::Children));
        }
        children::validate_children(&state.children, section, state.id, today)?
    } else {
        Vec::new()
    };

    Ok(ReviewedApplyState {
        id: state.id,
        edit_mode: state.edit_mode,
        type_of_application: section,
        terms_and_conditions: state
            .terms_and_conditions
            .clone()
            .ok_or_else(|| missing(ApplyStep::TermsAndConditions))?,
        date_of_birth: state
            .date_of_birth
            .ok_or_else(|| missing(ApplyStep::DateOfBirth))?,
        living_independently: state.living_independently,
        disability_tax_credit: state.disability_tax_credit,
        applicant_information: state
            .applicant_information
            .clone()
            .ok_or_else(|| missing(ApplyStep::ApplicantInformation))?,
        marital_status,
        partner_information,
        contact_information: state
            .contact_information
            .clone()
            .ok_or_else(|| missing(ApplyStep::ContactInformation))?,
        communication_preferences: state
            .communication_preferences
            .clone()
            .ok_or_else(|| missing(ApplyStep::CommunicationPreference))?,
        dental_insurance,
        dental_benefits,
        children,
    })
}

// ---------------------------------------------------------------------------
// Forward navigation
// ---------------------------------------------------------------------------

/// The review page of the flow's section.
pub fn review_target(state: &ApplyState) -> RouteTarget {
    match state.type_of_application {
        Some(section) => RouteTarget::new(ApplyStep::ReviewInformation, Some(section), state.id),
        None => RouteTarget::start(state.id),
    }
}

/// Where to send the user after `completed` was saved.
///
/// In edit mode this is always the review page. Otherwise it is the first
/// unsatisfied rule that comes after `completed` in the plan, or the review
/// page when nothing after it is missing.
pub fn next_step(state: &ApplyState, completed: ApplyStep, today: NaiveDate) -> RouteTarget {
    let Some(type_of_application) = state.type_of_application else {
        return RouteTarget::start(state.id);
    };
    if state.edit_mode {
        return review_target(state);
    }

    let plan = ReviewPlan::for_type(type_of_application);
    let skip = plan.position_after(completed);
    plan.first_failure_from(state, today, skip)
        .unwrap_or_else(|| review_target(state))
}

/// Where to send the user after a step of child `child_id` was saved.
///
/// Continues with the same child's next missing answer, then returns to the
/// children list.
pub fn next_child_step(
    state: &ApplyState,
    child_id: ChildId,
    completed: ApplyStep,
    today: NaiveDate,
) -> RouteTarget {
    let Some(section) = state.type_of_application else {
        return RouteTarget::start(state.id);
    };
    if state.edit_mode {
        return review_target(state);
    }

    state
        .find_child(child_id)
        .and_then(|child| children::next_child_step_after(child, completed, today))
        .map(|step| RouteTarget::for_child(step, section, state.id, child_id))
        .unwrap_or_else(|| RouteTarget::new(ApplyStep::Children, Some(section), state.id))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
