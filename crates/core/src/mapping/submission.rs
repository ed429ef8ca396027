//! Submission path: reviewed state to request entity, response to receipt.

use super::client_application::{
    address_entity, email_addresses, insurance_plans, preferred_language, telephone_numbers,
};
use super::dto::{BenefitApplicationChildDto, BenefitApplicationDto, ClientAddressDto};
use super::entity::{
    Applicant, ApplicantDetail, BenefitApplication, BenefitApplicationEntity,
    BenefitApplicationResponseEntity, BirthDate, Identification, PersonContactInformation,
    PersonMaritalStatus, PersonName, ReferenceCode, RelatedPerson,
};
use super::{
    find_by_category, BenefitCodes, MappingError, ADDRESS_HOME, ADDRESS_MAILING,
    IDENTIFICATION_CONFIRMATION_NUMBER, RELATIONSHIP_DEPENDANT, RELATIONSHIP_SPOUSE,
};
use crate::apply::review::ReviewedApplyState;
use crate::apply::state::{ContactInformation, SubmissionInfo};
use crate::types::Timestamp;

/// Flatten a reviewed state into the submission DTO.
pub fn to_benefit_application_dto(
    reviewed: &ReviewedApplyState,
    codes: &BenefitCodes,
) -> Result<BenefitApplicationDto, MappingError> {
    Ok(BenefitApplicationDto {
        application_category_code: codes.category_code(reviewed.type_of_application)?.to_string(),
        application_channel_code: codes.application_channel_online.clone(),
        applicant_information: reviewed.applicant_information.clone(),
        date_of_birth: reviewed.date_of_birth,
        disability_tax_credit: reviewed.disability_tax_credit,
        living_independently: reviewed.living_independently,
        marital_status_code: codes.marital_status_code(reviewed.marital_status).to_string(),
        partner_information: reviewed.partner_information.clone(),
        contact_information: reviewed.contact_information.clone(),
        communication_preferences: reviewed.communication_preferences.clone(),
        dental_insurance: reviewed.dental_insurance,
        dental_benefits: reviewed
            .dental_benefits
            .as_ref()
            .map(|benefits| benefits.program_ids())
            .unwrap_or_default(),
        terms_and_conditions: reviewed.terms_and_conditions.clone(),
        children: reviewed
            .children
            .iter()
            .map(|child| BenefitApplicationChildDto {
                information: child.information.clone(),
                dental_insurance: child.dental_insurance,
                dental_benefits: child
                    .dental_benefits
                    .as_ref()
                    .map(|benefits| benefits.program_ids())
                    .unwrap_or_default(),
            })
            .collect(),
    })
}

fn mailing_address(contact: &ContactInformation) -> ClientAddressDto {
    ClientAddressDto {
        address: contact.mailing_address.clone(),
        apartment: contact.mailing_apartment.clone(),
        city: contact.mailing_city.clone(),
        country: contact.mailing_country.clone(),
        province: contact.mailing_province.clone(),
        postal_code: contact.mailing_postal_code.clone(),
    }
}

/// The home address, when the form captured one.
fn home_address(contact: &ContactInformation) -> Option<ClientAddressDto> {
    Some(ClientAddressDto {
        address: contact.home_address.clone()?,
        apartment: contact.home_apartment.clone(),
        city: contact.home_city.clone()?,
        country: contact.home_country.clone()?,
        province: contact.home_province.clone(),
        postal_code: contact.home_postal_code.clone(),
    })
}

/// Build the request body of a submission. Total.
pub fn to_submission_entity(dto: &BenefitApplicationDto) -> BenefitApplicationEntity {
    let contact = &dto.contact_information;
    let mut addresses = vec![address_entity(ADDRESS_MAILING, &mailing_address(contact))];
    addresses.extend(home_address(contact).map(|home| address_entity(ADDRESS_HOME, &home)));

    let mut related_person: Vec<RelatedPerson> = dto
        .partner_information
        .iter()
        .map(|partner| RelatedPerson {
            person_relationship_code: ReferenceCode::name(RELATIONSHIP_SPOUSE),
            person_name: vec![PersonName::new(&partner.first_name, &partner.last_name)],
            person_birth_date: Some(BirthDate {
                date: partner.date_of_birth,
            }),
            person_sin_identification: Some(Identification::new(&partner.social_insurance_number)),
            applicant_detail: Some(ApplicantDetail {
                consent_to_share_personal_information_indicator: Some(partner.confirm),
                ..Default::default()
            }),
        })
        .collect();
    related_person.extend(dto.children.iter().map(|child| {
        let info = &child.information;
        RelatedPerson {
            person_relationship_code: ReferenceCode::name(RELATIONSHIP_DEPENDANT),
            person_name: vec![PersonName::new(&info.first_name, &info.last_name)],
            person_birth_date: Some(BirthDate {
                date: info.date_of_birth,
            }),
            person_sin_identification: info
                .social_insurance_number
                .as_deref()
                .map(Identification::new),
            applicant_detail: Some(ApplicantDetail {
                private_dental_insurance_indicator: Some(child.dental_insurance),
                attest_parent_or_guardian_indicator: Some(info.is_parent),
                insurance_plan: insurance_plans(&child.dental_benefits),
                ..Default::default()
            }),
        }
    }));

    let info = &dto.applicant_information;
    let terms = &dto.terms_and_conditions;
    let preferences = &dto.communication_preferences;

    BenefitApplicationEntity {
        benefit_application: BenefitApplication {
            applicant: Applicant {
                person_birth_date: Some(BirthDate {
                    date: dto.date_of_birth,
                }),
                person_contact_information: vec![PersonContactInformation {
                    address: addresses,
                    email_address: email_addresses(preferences.email.as_deref()),
                    telephone_number: telephone_numbers(
                        contact.phone_number.as_deref(),
                        contact.phone_number_alt.as_deref(),
                    ),
                }],
                person_language: vec![preferred_language(&preferences.preferred_language)],
                person_marital_status: Some(PersonMaritalStatus {
                    status_code: ReferenceCode::id(&dto.marital_status_code),
                }),
                person_name: vec![PersonName::new(&info.first_name, &info.last_name)],
                person_sin_identification: Identification::new(&info.social_insurance_number),
                mailing_same_as_home_indicator: Some(contact.copy_mailing_address),
                preferred_method_communication_code: Some(ReferenceCode::id(
                    &preferences.preferred_method,
                )),
                applicant_detail: ApplicantDetail {
                    private_dental_insurance_indicator: dto.dental_insurance,
                    disability_tax_credit_indicator: dto.disability_tax_credit,
                    living_independently_indicator: dto.living_independently,
                    terms_and_conditions_indicator: Some(terms.acknowledge_terms),
                    privacy_statement_indicator: Some(terms.acknowledge_privacy),
                    consent_to_share_personal_information_indicator: Some(terms.share_data),
                    attest_parent_or_guardian_indicator: None,
                    insurance_plan: insurance_plans(&dto.dental_benefits),
                },
                related_person,
                client_identification: Vec::new(),
            },
            benefit_application_category_code: ReferenceCode::id(&dto.application_category_code),
            benefit_application_channel_code: Some(ReferenceCode::id(&dto.application_channel_code)),
            benefit_application_identification: Vec::new(),
        },
    }
}

/// Reviewed state straight to the request body.
pub fn to_submission_request(
    reviewed: &ReviewedApplyState,
    codes: &BenefitCodes,
) -> Result<BenefitApplicationEntity, MappingError> {
    to_benefit_application_dto(reviewed, codes).map(|dto| to_submission_entity(&dto))
}

/// Extract the confirmation code of a submission response.
pub fn to_submission_info(
    response: &BenefitApplicationResponseEntity,
    submitted_on: Timestamp,
) -> Result<SubmissionInfo, MappingError> {
    let confirmation = find_by_category(
        &response.benefit_application.benefit_application_identification,
        IDENTIFICATION_CONFIRMATION_NUMBER,
        |identification| identification.identification_category_text.as_deref(),
    )
    .ok_or_else(|| MappingError::missing("confirmation number"))?;

    Ok(SubmissionInfo {
        confirmation_code: confirmation.identification_id.clone(),
        submitted_on,
    })
}
