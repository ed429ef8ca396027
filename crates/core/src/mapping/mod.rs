//! Translation between the wizard's flat records and the nested wire schema.
//!
//! Every function here is pure. Lookups into tagged arrays go through
//! [`find_by_category`]; a structurally required element that cannot be found
//! is reported as [`MappingError::MalformedUpstreamData`] instead of being
//! defaulted.

pub mod client_application;
pub mod dto;
pub mod entity;
pub mod submission;

use serde::{Deserialize, Serialize};

use crate::apply::state::{ApplicationType, MaritalStatus};

/// Address category of the mailing address.
pub const ADDRESS_MAILING: &str = "Mailing";
/// Address category of the home address.
pub const ADDRESS_HOME: &str = "Home";
/// Identification category of the client id.
pub const IDENTIFICATION_CLIENT_ID: &str = "Client ID";
/// Identification category of the client number.
pub const IDENTIFICATION_CLIENT_NUMBER: &str = "Client Number";
/// Identification category of the confirmation code of a submission.
pub const IDENTIFICATION_CONFIRMATION_NUMBER: &str = "Confirmation Number";
pub const TELEPHONE_PRIMARY: &str = "Primary";
pub const TELEPHONE_ALTERNATE: &str = "Alternate";
/// Relationship code of the applicant's partner.
pub const RELATIONSHIP_SPOUSE: &str = "Spouse";
/// Relationship code of a child covered by the application.
pub const RELATIONSHIP_DEPENDANT: &str = "Dependant";

#[derive(Debug, thiserror::Error)]
pub enum MappingError {
    /// A structurally required element is missing from upstream data.
    #[error("Malformed upstream data: {0}")]
    MalformedUpstreamData(String),

    #[error("Application type '{}' cannot be submitted", .0.as_str())]
    UnsupportedApplicationType(ApplicationType),
}

impl MappingError {
    pub(crate) fn missing(what: &str) -> Self {
        Self::MalformedUpstreamData(format!("missing {what}"))
    }
}

/// First element of `items` whose category, as extracted by `category`,
/// equals `tag`. Elements without a category never match.
pub fn find_by_category<'a, T>(
    items: &'a [T],
    tag: &str,
    category: impl Fn(&T) -> Option<&str>,
) -> Option<&'a T> {
    items.iter().find(|item| category(item) == Some(tag))
}

// ---------------------------------------------------------------------------
// Reference data codes
// ---------------------------------------------------------------------------

/// Reference data ids of the downstream system.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenefitCodes {
    pub applicant_category_individual: String,
    pub applicant_category_dependent_only: String,
    pub applicant_category_family: String,
    pub application_channel_online: String,
    pub marital_status: MaritalStatusCodes,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaritalStatusCodes {
    pub single: String,
    pub married: String,
    pub common_law: String,
    pub separated: String,
    pub divorced: String,
    pub widowed: String,
}

impl Default for BenefitCodes {
    fn default() -> Self {
        Self {
            applicant_category_individual: "775170000".into(),
            applicant_category_family: "775170001".into(),
            applicant_category_dependent_only: "775170002".into(),
            application_channel_online: "775170001".into(),
            marital_status: MaritalStatusCodes::default(),
        }
    }
}

impl Default for MaritalStatusCodes {
    fn default() -> Self {
        Self {
            single: "775170000".into(),
            married: "775170001".into(),
            common_law: "775170002".into(),
            divorced: "775170003".into(),
            separated: "775170004".into(),
            widowed: "775170005".into(),
        }
    }
}

impl BenefitCodes {
    /// Application type of a `BenefitApplicationCategoryCode` id.
    ///
    /// Any id other than the individual and dependent-only codes is treated
    /// as a family application, including ids this service does not know.
    pub fn classify(&self, category_id: &str) -> ApplicationType {
        if category_id == self.applicant_category_individual {
            ApplicationType::Adult
        } else if category_id == self.applicant_category_dependent_only {
            ApplicationType::Child
        } else {
            ApplicationType::AdultChild
        }
    }

    /// Category id submitted for an application type.
    pub fn category_code(&self, type_of_application: ApplicationType) -> Result<&str, MappingError> {
        match type_of_application {
            ApplicationType::Adult => Ok(&self.applicant_category_individual),
            ApplicationType::AdultChild => Ok(&self.applicant_category_family),
            ApplicationType::Child => Ok(&self.applicant_category_dependent_only),
            ApplicationType::Delegate => {
                Err(MappingError::UnsupportedApplicationType(type_of_application))
            }
        }
    }

    pub fn marital_status_code(&self, status: MaritalStatus) -> &str {
        let codes = &self.marital_status;
        match status {
            MaritalStatus::Single => &codes.single,
            MaritalStatus::Married => &codes.married,
            MaritalStatus::CommonLaw => &codes.common_law,
            MaritalStatus::Separated => &codes.separated,
            MaritalStatus::Divorced => &codes.divorced,
            MaritalStatus::Widowed => &codes.widowed,
        }
    }

    pub fn marital_status_from_code(&self, code: &str) -> Option<MaritalStatus> {
        MaritalStatus::ALL
            .into_iter()
            .find(|status| self.marital_status_code(*status) == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_known_codes() {
        let codes = BenefitCodes::default();
        assert_eq!(codes.classify("775170000"), ApplicationType::Adult);
        assert_eq!(codes.classify("775170002"), ApplicationType::Child);
        assert_eq!(codes.classify("775170001"), ApplicationType::AdultChild);
    }

    #[test]
    fn classify_unknown_code_defaults_to_adult_child() {
        let codes = BenefitCodes::default();
        assert_eq!(codes.classify("not-a-code"), ApplicationType::AdultChild);
        assert_eq!(codes.classify(""), ApplicationType::AdultChild);
    }

    #[test]
    fn delegate_has_no_category_code() {
        let codes = BenefitCodes::default();
        assert!(matches!(
            codes.category_code(ApplicationType::Delegate),
            Err(MappingError::UnsupportedApplicationType(ApplicationType::Delegate))
        ));
        for ty in [ApplicationType::Adult, ApplicationType::AdultChild, ApplicationType::Child] {
            let code = codes.category_code(ty).unwrap();
            assert_eq!(codes.classify(code), ty);
        }
    }

    #[test]
    fn marital_status_codes_roundtrip() {
        let codes = BenefitCodes::default();
        for status in MaritalStatus::ALL {
            let code = codes.marital_status_code(status).to_string();
            assert_eq!(codes.marital_status_from_code(&code), Some(status));
        }
        assert_eq!(codes.marital_status_from_code("0"), None);
    }

    #[test]
    fn find_by_category_skips_untagged() {
        let items = [(None, 1), (Some("Home"), 2), (Some("Mailing"), 3)];
        let found = find_by_category(&items, "Mailing", |(tag, _)| *tag);
        assert_eq!(found.map(|(_, n)| *n), Some(3));
        assert!(find_by_category(&items, "Other", |(tag, _)| *tag).is_none());
    }
}
