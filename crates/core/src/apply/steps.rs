//! Wizard step identifiers and redirect targets.
//!
//! A [`RouteTarget`] is an abstract route (step + section) plus the
//! substitution parameters (flow id, optional child id). Turning it into a
//! concrete URL is the router's job.

use serde::{Deserialize, Serialize};

use super::state::ApplicationType;
use crate::error::CoreError;
use crate::types::{ChildId, FlowId};

/// Every page of the apply wizard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplyStep {
    // Shared by all application types.
    TypeOfApplication,
    TermsAndConditions,
    TaxFiling,
    FileTaxes,
    ApplicationDelegate,

    // Applicant steps, mounted under a section.
    DateOfBirth,
    ParentOrGuardian,
    LivingIndependently,
    DisabilityTaxCredit,
    DobEligibility,
    ContactApplyChild,
    ApplicantInformation,
    MaritalStatus,
    ContactInformation,
    CommunicationPreference,
    DentalInsurance,
    ConfirmFederalProvincialTerritorialBenefits,
    FederalProvincialTerritorialBenefits,
    Children,
    ReviewInformation,
    Confirmation,

    // Per-child steps, mounted under `children/{child_id}`.
    ChildInformation,
    ChildDentalInsurance,
    ChildConfirmFederalProvincialTerritorialBenefits,
    ChildFederalProvincialTerritorialBenefits,
}

impl ApplyStep {
    const ALL: [ApplyStep; 25] = [
        Self::TypeOfApplication,
        Self::TermsAndConditions,
        Self::TaxFiling,
        Self::FileTaxes,
        Self::ApplicationDelegate,
        Self::DateOfBirth,
        Self::ParentOrGuardian,
        Self::LivingIndependently,
        Self::DisabilityTaxCredit,
        Self::DobEligibility,
        Self::ContactApplyChild,
        Self::ApplicantInformation,
        Self::MaritalStatus,
        Self::ContactInformation,
        Self::CommunicationPreference,
        Self::DentalInsurance,
        Self::ConfirmFederalProvincialTerritorialBenefits,
        Self::FederalProvincialTerritorialBenefits,
        Self::Children,
        Self::ReviewInformation,
        Self::Confirmation,
        Self::ChildInformation,
        Self::ChildDentalInsurance,
        Self::ChildConfirmFederalProvincialTerritorialBenefits,
        Self::ChildFederalProvincialTerritorialBenefits,
    ];

    /// Path segment of the step.
    pub fn slug(self) -> &'static str {
        match self {
            Self::TypeOfApplication => "type-application",
            Self::TermsAndConditions => "terms-and-conditions",
            Self::TaxFiling => "tax-filing",
            Self::FileTaxes => "file-taxes",
            Self::ApplicationDelegate => "application-delegate",
            Self::DateOfBirth => "date-of-birth",
            Self::ParentOrGuardian => "parent-or-guardian",
            Self::LivingIndependently => "living-independently",
            Self::DisabilityTaxCredit => "disability-tax-credit",
            Self::DobEligibility => "dob-eligibility",
            Self::ContactApplyChild => "contact-apply-child",
            Self::ApplicantInformation => "applicant-information",
            Self::MaritalStatus => "marital-status",
            Self::ContactInformation => "contact-information",
            Self::CommunicationPreference => "communication-preference",
            Self::DentalInsurance | Self::ChildDentalInsurance => "dental-insurance",
            Self::ConfirmFederalProvincialTerritorialBenefits
            | Self::ChildConfirmFederalProvincialTerritorialBenefits => {
                "confirm-federal-provincial-territorial-benefits"
            }
            Self::FederalProvincialTerritorialBenefits
            | Self::ChildFederalProvincialTerritorialBenefits => {
                "federal-provincial-territorial-benefits"
            }
            Self::Children => "children",
            Self::ReviewInformation => "review-information",
            Self::Confirmation => "confirmation",
            Self::ChildInformation => "information",
        }
    }

    /// Parse an applicant-level step from its path segment.
    pub fn from_slug(slug: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .filter(|step| !step.is_child_step())
            .find(|step| step.slug() == slug)
            .ok_or_else(|| CoreError::Validation(format!("Unknown step '{slug}'")))
    }

    /// Parse a per-child step from its path segment.
    pub fn from_child_slug(slug: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .filter(|step| step.is_child_step())
            .find(|step| step.slug() == slug)
            .ok_or_else(|| CoreError::Validation(format!("Unknown child step '{slug}'")))
    }

    /// Steps mounted directly under the flow, before a section is chosen.
    pub fn is_shared(self) -> bool {
        matches!(
            self,
            Self::TypeOfApplication
                | Self::TermsAndConditions
                | Self::TaxFiling
                | Self::FileTaxes
                | Self::ApplicationDelegate
        )
    }

    pub fn is_child_step(self) -> bool {
        matches!(
            self,
            Self::ChildInformation
                | Self::ChildDentalInsurance
                | Self::ChildConfirmFederalProvincialTerritorialBenefits
                | Self::ChildFederalProvincialTerritorialBenefits
        )
    }
}

/// Substitution parameters of a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteParams {
    pub id: FlowId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_id: Option<ChildId>,
}

/// Where the user has to go next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RouteTarget {
    pub step: ApplyStep,
    /// Section the step is mounted under; `None` for shared steps.
    pub section: Option<ApplicationType>,
    pub params: RouteParams,
}

impl RouteTarget {
    pub fn new(step: ApplyStep, section: Option<ApplicationType>, id: FlowId) -> Self {
        let section = if step.is_shared() { None } else { section };
        Self {
            step,
            section,
            params: RouteParams { id, child_id: None },
        }
    }

    pub fn for_child(
        step: ApplyStep,
        section: ApplicationType,
        id: FlowId,
        child_id: ChildId,
    ) -> Self {
        Self {
            step,
            section: Some(section),
            params: RouteParams {
                id,
                child_id: Some(child_id),
            },
        }
    }

    /// The first page of every flow.
    pub fn start(id: FlowId) -> Self {
        Self::new(ApplyStep::TypeOfApplication, None, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugs_roundtrip_per_scope() {
        for step in ApplyStep::ALL {
            let parsed = if step.is_child_step() {
                ApplyStep::from_child_slug(step.slug())
            } else {
                ApplyStep::from_slug(step.slug())
            };
            assert_eq!(parsed.unwrap(), step);
        }
    }

    #[test]
    fn child_and_applicant_dental_insurance_share_slug() {
        assert_eq!(
            ApplyStep::from_slug("dental-insurance").unwrap(),
            ApplyStep::DentalInsurance
        );
        assert_eq!(
            ApplyStep::from_child_slug("dental-insurance").unwrap(),
            ApplyStep::ChildDentalInsurance
        );
    }

    #[test]
    fn unknown_slug_is_rejected() {
        assert!(ApplyStep::from_slug("nope").is_err());
        assert!(ApplyStep::from_child_slug("marital-status").is_err());
    }

    #[test]
    fn shared_steps_drop_section() {
        let id = FlowId::new_v4();
        let target = RouteTarget::new(
            ApplyStep::TermsAndConditions,
            Some(ApplicationType::Adult),
            id,
        );
        assert_eq!(target.section, None);
        let target = RouteTarget::new(ApplyStep::MaritalStatus, Some(ApplicationType::Adult), id);
        assert_eq!(target.section, Some(ApplicationType::Adult));
    }
}
