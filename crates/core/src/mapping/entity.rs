//! Wire schema of the downstream benefits system.
//!
//! Field names are PascalCase on the wire; acronyms (`ID`, `SIN`) are spelled
//! out with explicit renames. Repeated elements are arrays whose meaning is
//! carried by a category tag, see [`super::find_by_category`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Envelope of a benefit application, both as submitted and as retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BenefitApplicationEntity {
    pub benefit_application: BenefitApplication,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BenefitApplication {
    pub applicant: Applicant,
    pub benefit_application_category_code: ReferenceCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub benefit_application_channel_code: Option<ReferenceCode>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub benefit_application_identification: Vec<Identification>,
}

/// Reference data value: an opaque id and/or a human-readable name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceCode {
    #[serde(rename = "ReferenceDataID", default, skip_serializing_if = "Option::is_none")]
    pub reference_data_id: Option<String>,
    #[serde(rename = "ReferenceDataName", default, skip_serializing_if = "Option::is_none")]
    pub reference_data_name: Option<String>,
}

impl ReferenceCode {
    pub fn id(id: impl Into<String>) -> Self {
        Self {
            reference_data_id: Some(id.into()),
            reference_data_name: None,
        }
    }

    pub fn name(name: impl Into<String>) -> Self {
        Self {
            reference_data_id: None,
            reference_data_name: Some(name.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identification {
    #[serde(rename = "IdentificationID")]
    pub identification_id: String,
    #[serde(
        rename = "IdentificationCategoryText",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub identification_category_text: Option<String>,
}

impl Identification {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            identification_id: id.into(),
            identification_category_text: None,
        }
    }

    pub fn tagged(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            identification_id: id.into(),
            identification_category_text: Some(category.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BirthDate {
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonName {
    #[serde(default)]
    pub person_given_name: Vec<String>,
    pub person_sur_name: String,
}

impl PersonName {
    pub fn new(first_name: &str, last_name: &str) -> Self {
        Self {
            person_given_name: vec![first_name.to_string()],
            person_sur_name: last_name.to_string(),
        }
    }

    pub fn first_name(&self) -> Option<&str> {
        self.person_given_name.first().map(String::as_str)
    }
}

// ---------------------------------------------------------------------------
// Applicant
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Applicant {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_birth_date: Option<BirthDate>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person_contact_information: Vec<PersonContactInformation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub person_language: Vec<PersonLanguage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_marital_status: Option<PersonMaritalStatus>,
    #[serde(default)]
    pub person_name: Vec<PersonName>,
    #[serde(rename = "PersonSINIdentification")]
    pub person_sin_identification: Identification,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mailing_same_as_home_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_method_communication_code: Option<ReferenceCode>,
    #[serde(default)]
    pub applicant_detail: ApplicantDetail,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_person: Vec<RelatedPerson>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub client_identification: Vec<Identification>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonContactInformation {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub address: Vec<Address>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub email_address: Vec<EmailAddress>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub telephone_number: Vec<TelephoneNumber>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Address {
    /// `"Mailing"` or `"Home"` in `ReferenceDataName`. May be absent upstream.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_category_code: Option<ReferenceCode>,
    pub address_street: AddressStreet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_secondary_unit_text: Option<String>,
    pub address_city_name: String,
    pub address_country: AddressCountry,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_province: Option<AddressProvince>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address_postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressStreet {
    pub street_name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressCountry {
    pub country_code: ReferenceCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AddressProvince {
    pub province_code: ReferenceCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailAddress {
    #[serde(rename = "EmailAddressID")]
    pub email_address_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TelephoneNumber {
    #[serde(rename = "TelephoneNumberFullID")]
    pub telephone_number_full_id: String,
    /// `"Primary"` or `"Alternate"` in `ReferenceDataName`.
    #[serde(rename = "TelephoneNumberCategoryCode")]
    pub telephone_number_category_code: ReferenceCode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonLanguage {
    pub communication_category_code: ReferenceCode,
    #[serde(default)]
    pub preferred_indicator: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PersonMaritalStatus {
    pub status_code: ReferenceCode,
}

/// Yes/no answers and coverage of one person.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ApplicantDetail {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_dental_insurance_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub disability_tax_credit_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub living_independently_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub terms_and_conditions_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privacy_statement_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consent_to_share_personal_information_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attest_parent_or_guardian_indicator: Option<bool>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub insurance_plan: Vec<InsurancePlan>,
}

impl ApplicantDetail {
    /// Program ids of every insurance plan, in order.
    pub fn program_ids(&self) -> Vec<String> {
        self.insurance_plan
            .iter()
            .flat_map(|plan| plan.insurance_plan_identification.iter())
            .map(|identification| identification.identification_id.clone())
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InsurancePlan {
    #[serde(default)]
    pub insurance_plan_identification: Vec<Identification>,
}

/// Spouse or dependant of the applicant, told apart by `PersonRelationshipCode`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RelatedPerson {
    pub person_relationship_code: ReferenceCode,
    #[serde(default)]
    pub person_name: Vec<PersonName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person_birth_date: Option<BirthDate>,
    #[serde(
        rename = "PersonSINIdentification",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub person_sin_identification: Option<Identification>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applicant_detail: Option<ApplicantDetail>,
}

// ---------------------------------------------------------------------------
// Submission response
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BenefitApplicationResponseEntity {
    pub benefit_application: BenefitApplicationResponse,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BenefitApplicationResponse {
    #[serde(default)]
    pub benefit_application_identification: Vec<Identification>,
}
