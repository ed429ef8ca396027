//! Apply wizard state model.
//!
//! [`ApplyState`] is the canonical partially-filled record of one apply flow.
//! Every sub-record is optional until its step has been completed; the step
//! forms guarantee a present sub-record is internally complete.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::{ChildId, FlowId, Timestamp};

// ---------------------------------------------------------------------------
// Discriminants
// ---------------------------------------------------------------------------

/// Who the application is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApplicationType {
    /// The applicant alone.
    Adult,
    /// The applicant and their children.
    AdultChild,
    /// The applicant's children only.
    Child,
    /// Someone applying on behalf of another person.
    Delegate,
}

impl ApplicationType {
    /// Parse a form value.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "adult" => Ok(Self::Adult),
            "adult-child" => Ok(Self::AdultChild),
            "child" => Ok(Self::Child),
            "delegate" => Ok(Self::Delegate),
            _ => Err(CoreError::Validation(format!(
                "Invalid type of application '{s}'. Must be one of: adult, adult-child, child, delegate"
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Adult => "adult",
            Self::AdultChild => "adult-child",
            Self::Child => "child",
            Self::Delegate => "delegate",
        }
    }

    /// Whether the application covers at least one dependant.
    pub fn requires_children(&self) -> bool {
        matches!(self, Self::AdultChild | Self::Child)
    }
}

/// Applicant marital status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MaritalStatus {
    Single,
    Married,
    CommonLaw,
    Separated,
    Divorced,
    Widowed,
}

impl MaritalStatus {
    pub const ALL: [MaritalStatus; 6] = [
        Self::Single,
        Self::Married,
        Self::CommonLaw,
        Self::Separated,
        Self::Divorced,
        Self::Widowed,
    ];

    /// Parse a form value.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| CoreError::Validation(format!("Invalid marital status '{s}'")))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Single => "single",
            Self::Married => "married",
            Self::CommonLaw => "common-law",
            Self::Separated => "separated",
            Self::Divorced => "divorced",
            Self::Widowed => "widowed",
        }
    }

    /// Married and common-law applicants must declare a partner.
    pub fn has_partner(&self) -> bool {
        matches!(self, Self::Married | Self::CommonLaw)
    }
}

/// Age bracket of a person relative to a reference date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AgeCategory {
    /// Under 16.
    Children,
    /// 16 and 17.
    Youth,
    /// 18 to 64.
    Adults,
    /// 65 and over.
    Seniors,
}

impl AgeCategory {
    pub fn from_date_of_birth(date_of_birth: NaiveDate, today: NaiveDate) -> Self {
        match age_in_years(date_of_birth, today) {
            i32::MIN..=15 => Self::Children,
            16..=17 => Self::Youth,
            18..=64 => Self::Adults,
            _ => Self::Seniors,
        }
    }
}

/// Completed years between `date_of_birth` and `today`.
pub fn age_in_years(date_of_birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - date_of_birth.year();
    if (today.month(), today.day()) < (date_of_birth.month(), date_of_birth.day()) {
        age -= 1;
    }
    age
}

// ---------------------------------------------------------------------------
// Step sub-records
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAndConditions {
    pub acknowledge_terms: bool,
    pub acknowledge_privacy: bool,
    pub share_data: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantInformation {
    pub first_name: String,
    pub last_name: String,
    /// Nine digits, no separators.
    pub social_insurance_number: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartnerInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    pub social_insurance_number: String,
    /// The applicant confirmed the partner consents to sharing their data.
    pub confirm: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInformation {
    pub phone_number: Option<String>,
    pub phone_number_alt: Option<String>,
    pub mailing_address: String,
    pub mailing_apartment: Option<String>,
    pub mailing_city: String,
    pub mailing_country: String,
    pub mailing_province: Option<String>,
    pub mailing_postal_code: Option<String>,
    /// The home address is the mailing address.
    pub copy_mailing_address: bool,
    pub home_address: Option<String>,
    pub home_apartment: Option<String>,
    pub home_city: Option<String>,
    pub home_country: Option<String>,
    pub home_province: Option<String>,
    pub home_postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommunicationPreferences {
    /// Reference data id of the preferred language.
    pub preferred_language: String,
    /// Reference data id of the preferred communication method.
    pub preferred_method: String,
    pub email: Option<String>,
}

/// Federal and provincial/territorial dental programs the person is covered by.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DentalBenefits {
    pub has_federal_benefits: bool,
    pub federal_social_program: Option<String>,
    pub has_provincial_territorial_benefits: bool,
    pub province: Option<String>,
    pub provincial_territorial_social_program: Option<String>,
}

impl DentalBenefits {
    /// Program ids selected, federal first.
    pub fn program_ids(&self) -> Vec<String> {
        let mut ids = Vec::new();
        if self.has_federal_benefits {
            ids.extend(self.federal_social_program.clone());
        }
        if self.has_provincial_territorial_benefits {
            ids.extend(self.provincial_territorial_social_program.clone());
        }
        ids
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildInformation {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: NaiveDate,
    /// The applicant attests to being the child's parent or legal guardian.
    pub is_parent: bool,
    pub has_social_insurance_number: bool,
    pub social_insurance_number: Option<String>,
}

/// Receipt of a successful submission. Its presence freezes the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionInfo {
    pub confirmation_code: String,
    pub submitted_on: Timestamp,
}

// ---------------------------------------------------------------------------
// Child state
// ---------------------------------------------------------------------------

/// One dependant declared in the flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildState {
    pub id: ChildId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub information: Option<ChildInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_insurance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_federal_provincial_territorial_benefits: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_benefits: Option<DentalBenefits>,
}

impl ChildState {
    pub fn new(id: ChildId) -> Self {
        Self {
            id,
            information: None,
            dental_insurance: None,
            has_federal_provincial_territorial_benefits: None,
            dental_benefits: None,
        }
    }

    /// A child is "new" until its information, dental insurance and benefits
    /// answers have all been given.
    pub fn is_new(&self) -> bool {
        self.information.is_none()
            || self.dental_insurance.is_none()
            || self.has_federal_provincial_territorial_benefits.is_none()
    }
}

// ---------------------------------------------------------------------------
// Apply state
// ---------------------------------------------------------------------------

/// Persisted state of one apply flow instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyState {
    pub id: FlowId,
    pub last_updated_on: Timestamp,
    #[serde(default)]
    pub edit_mode: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_of_application: Option<ApplicationType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions: Option<TermsAndConditions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tax_filing: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living_independently: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_tax_credit: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_information: Option<ApplicantInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub marital_status: Option<MaritalStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub partner_information: Option<PartnerInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_information: Option<ContactInformation>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub communication_preferences: Option<CommunicationPreferences>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_insurance: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_federal_provincial_territorial_benefits: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dental_benefits: Option<DentalBenefits>,
    #[serde(default)]
    pub children: Vec<ChildState>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub submission_info: Option<SubmissionInfo>,
}

impl ApplyState {
    /// A fresh state: no sub-records, no children.
    pub fn new(id: FlowId, now: Timestamp) -> Self {
        Self {
            id,
            last_updated_on: now,
            edit_mode: false,
            type_of_application: None,
            terms_and_conditions: None,
            tax_filing: None,
            date_of_birth: None,
            living_independently: None,
            disability_tax_credit: None,
            applicant_information: None,
            marital_status: None,
            partner_information: None,
            contact_information: None,
            communication_preferences: None,
            dental_insurance: None,
            has_federal_provincial_territorial_benefits: None,
            dental_benefits: None,
            children: Vec::new(),
            submission_info: None,
        }
    }

    /// Once submitted the state is read-only.
    pub fn is_submitted(&self) -> bool {
        self.submission_info.is_some()
    }

    pub fn find_child(&self, child_id: ChildId) -> Option<&ChildState> {
        self.children.iter().find(|child| child.id == child_id)
    }

    /// Children shown on list views: every child whose core answers are all given.
    pub fn completed_children(&self) -> impl Iterator<Item = &ChildState> {
        self.children.iter().filter(|child| !child.is_new())
    }

    /// Applicant age category, once the date of birth is known.
    pub fn age_category(&self, today: NaiveDate) -> Option<AgeCategory> {
        self.date_of_birth
            .map(|dob| AgeCategory::from_date_of_birth(dob, today))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
