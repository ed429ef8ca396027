//! Flat DTOs on the wizard side of the mapper.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::apply::state::{
    ApplicantInformation, ApplicationType, ChildInformation, CommunicationPreferences,
    ContactInformation, MaritalStatus, PartnerInformation, TermsAndConditions,
};

// ---------------------------------------------------------------------------
// Submission
// ---------------------------------------------------------------------------

/// Everything the downstream system needs from a reviewed apply flow.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitApplicationDto {
    pub application_category_code: String,
    pub application_channel_code: String,
    pub applicant_information: ApplicantInformation,
    pub date_of_birth: NaiveDate,
    pub disability_tax_credit: Option<bool>,
    pub living_independently: Option<bool>,
    pub marital_status_code: String,
    pub partner_information: Option<PartnerInformation>,
    pub contact_information: ContactInformation,
    pub communication_preferences: CommunicationPreferences,
    pub dental_insurance: Option<bool>,
    /// Ids of the federal and provincial/territorial programs.
    pub dental_benefits: Vec<String>,
    pub terms_and_conditions: TermsAndConditions,
    pub children: Vec<BenefitApplicationChildDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitApplicationChildDto {
    pub information: ChildInformation,
    pub dental_insurance: bool,
    pub dental_benefits: Vec<String>,
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

/// An application already on file, flattened for the wizard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientApplicationDto {
    /// Derived from `application_category_code`.
    pub type_of_application: ApplicationType,
    pub application_category_code: String,
    pub applicant_information: ClientApplicantInformationDto,
    pub date_of_birth: NaiveDate,
    pub marital_status: Option<MaritalStatus>,
    pub partner_information: Option<ClientPartnerInformationDto>,
    pub contact_information: ClientContactInformationDto,
    pub communication_preferences: ClientCommunicationPreferencesDto,
    pub dental_insurance: Option<bool>,
    pub disability_tax_credit: Option<bool>,
    pub living_independently: Option<bool>,
    pub dental_benefits: Vec<String>,
    pub children: Vec<ClientChildDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientApplicantInformationDto {
    pub first_name: String,
    pub last_name: String,
    pub social_insurance_number: String,
    pub client_id: String,
    pub client_number: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientPartnerInformationDto {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub social_insurance_number: Option<String>,
    pub consent_to_share_personal_information: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContactInformationDto {
    pub phone_number: Option<String>,
    pub phone_number_alt: Option<String>,
    pub email: Option<String>,
    pub copy_mailing_address: bool,
    pub mailing_address: ClientAddressDto,
    pub home_address: Option<ClientAddressDto>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAddressDto {
    pub address: String,
    pub apartment: Option<String>,
    pub city: String,
    pub country: String,
    pub province: Option<String>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientCommunicationPreferencesDto {
    pub preferred_language: Option<String>,
    pub preferred_method: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientChildDto {
    pub first_name: String,
    pub last_name: String,
    pub date_of_birth: Option<NaiveDate>,
    pub social_insurance_number: Option<String>,
    pub is_parent: Option<bool>,
    pub dental_insurance: Option<bool>,
    pub dental_benefits: Vec<String>,
}
