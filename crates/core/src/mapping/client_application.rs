//! Existing client applications: nested entity to flat DTO and back.

use super::dto::{
    ClientAddressDto, ClientApplicantInformationDto, ClientApplicationDto, ClientChildDto,
    ClientCommunicationPreferencesDto, ClientContactInformationDto, ClientPartnerInformationDto,
};
use super::entity::{
    Address, AddressCountry, AddressProvince, AddressStreet, Applicant, ApplicantDetail,
    BenefitApplication, BenefitApplicationEntity, BirthDate, EmailAddress, Identification,
    InsurancePlan, PersonContactInformation, PersonLanguage, PersonMaritalStatus, PersonName,
    ReferenceCode, RelatedPerson, TelephoneNumber,
};
use super::{
    find_by_category, BenefitCodes, MappingError, ADDRESS_HOME, ADDRESS_MAILING,
    IDENTIFICATION_CLIENT_ID, IDENTIFICATION_CLIENT_NUMBER, RELATIONSHIP_DEPENDANT,
    RELATIONSHIP_SPOUSE, TELEPHONE_ALTERNATE, TELEPHONE_PRIMARY,
};

fn reference_name(code: &ReferenceCode) -> Option<&str> {
    code.reference_data_name.as_deref()
}

fn address_category(address: &Address) -> Option<&str> {
    address.address_category_code.as_ref().and_then(reference_name)
}

fn identification_category(identification: &Identification) -> Option<&str> {
    identification.identification_category_text.as_deref()
}

// ---------------------------------------------------------------------------
// Entity -> DTO
// ---------------------------------------------------------------------------

/// Flatten a retrieved application.
///
/// The mailing address, client id, contact entry, applicant name and birth
/// date are required. Home address, phones, email, client number and spouse
/// are optional. Addresses with no or an unknown category are ignored.
pub fn to_client_application_dto(
    entity: &BenefitApplicationEntity,
    codes: &BenefitCodes,
) -> Result<ClientApplicationDto, MappingError> {
    let application = &entity.benefit_application;
    let applicant = &application.applicant;

    let category_code = application
        .benefit_application_category_code
        .reference_data_id
        .clone()
        .ok_or_else(|| MappingError::missing("benefit application category code"))?;

    let name = applicant
        .person_name
        .first()
        .ok_or_else(|| MappingError::missing("applicant name"))?;
    let client_id = find_by_category(
        &applicant.client_identification,
        IDENTIFICATION_CLIENT_ID,
        identification_category,
    )
    .ok_or_else(|| MappingError::missing("client id"))?;
    let client_number = find_by_category(
        &applicant.client_identification,
        IDENTIFICATION_CLIENT_NUMBER,
        identification_category,
    );

    let date_of_birth = applicant
        .person_birth_date
        .as_ref()
        .map(|birth| birth.date)
        .ok_or_else(|| MappingError::missing("applicant birth date"))?;

    let marital_status = match &applicant.person_marital_status {
        Some(status) => {
            let code = status
                .status_code
                .reference_data_id
                .as_deref()
                .ok_or_else(|| MappingError::missing("marital status code"))?;
            Some(codes.marital_status_from_code(code).ok_or_else(|| {
                MappingError::MalformedUpstreamData(format!("unknown marital status code '{code}'"))
            })?)
        }
        None => None,
    };

    let spouse = find_by_category(&applicant.related_person, RELATIONSHIP_SPOUSE, |person| {
        reference_name(&person.person_relationship_code)
    });
    let partner_information = spouse.map(to_partner_dto).transpose()?;

    let children = applicant
        .related_person
        .iter()
        .filter(|person| {
            reference_name(&person.person_relationship_code) == Some(RELATIONSHIP_DEPENDANT)
        })
        .map(to_child_dto)
        .collect::<Result<Vec<_>, _>>()?;

    let preferred_language = applicant
        .person_language
        .iter()
        .find(|language| language.preferred_indicator)
        .or_else(|| applicant.person_language.first())
        .and_then(|language| language.communication_category_code.reference_data_id.clone());

    Ok(ClientApplicationDto {
        type_of_application: codes.classify(&category_code),
        application_category_code: category_code,
        applicant_information: ClientApplicantInformationDto {
            first_name: name.first_name().unwrap_or_default().to_string(),
            last_name: name.person_sur_name.clone(),
            social_insurance_number: applicant.person_sin_identification.identification_id.clone(),
            client_id: client_id.identification_id.clone(),
            client_number: client_number.map(|n| n.identification_id.clone()),
        },
        date_of_birth,
        marital_status,
        partner_information,
        contact_information: to_contact_dto(applicant)?,
        communication_preferences: ClientCommunicationPreferencesDto {
            preferred_language,
            preferred_method: applicant
                .preferred_method_communication_code
                .as_ref()
                .and_then(|code| code.reference_data_id.clone()),
        },
        dental_insurance: applicant.applicant_detail.private_dental_insurance_indicator,
        disability_tax_credit: applicant.applicant_detail.disability_tax_credit_indicator,
        living_independently: applicant.applicant_detail.living_independently_indicator,
        dental_benefits: applicant.applicant_detail.program_ids(),
        children,
    })
}

fn to_contact_dto(applicant: &Applicant) -> Result<ClientContactInformationDto, MappingError> {
    let contact = applicant
        .person_contact_information
        .first()
        .ok_or_else(|| MappingError::missing("contact information"))?;

    let mailing = find_by_category(&contact.address, ADDRESS_MAILING, address_category)
        .ok_or_else(|| MappingError::missing("mailing address"))?;
    let home = find_by_category(&contact.address, ADDRESS_HOME, address_category);

    let phone = |tag: &str| {
        find_by_category(&contact.telephone_number, tag, |phone| {
            reference_name(&phone.telephone_number_category_code)
        })
        .map(|phone| phone.telephone_number_full_id.clone())
    };

    Ok(ClientContactInformationDto {
        phone_number: phone(TELEPHONE_PRIMARY),
        phone_number_alt: phone(TELEPHONE_ALTERNATE),
        email: contact
            .email_address
            .first()
            .map(|email| email.email_address_id.clone()),
        copy_mailing_address: applicant.mailing_same_as_home_indicator.unwrap_or(false),
        mailing_address: to_address_dto(mailing),
        home_address: home.map(to_address_dto),
    })
}

fn to_address_dto(address: &Address) -> ClientAddressDto {
    ClientAddressDto {
        address: address.address_street.street_name.clone(),
        apartment: address.address_secondary_unit_text.clone(),
        city: address.address_city_name.clone(),
        country: address
            .address_country
            .country_code
            .reference_data_id
            .clone()
            .unwrap_or_default(),
        province: address
            .address_province
            .as_ref()
            .and_then(|province| province.province_code.reference_data_id.clone()),
        postal_code: address.address_postal_code.clone(),
    }
}

fn to_partner_dto(spouse: &RelatedPerson) -> Result<ClientPartnerInformationDto, MappingError> {
    let name = spouse
        .person_name
        .first()
        .ok_or_else(|| MappingError::missing("spouse name"))?;
    Ok(ClientPartnerInformationDto {
        first_name: name.first_name().unwrap_or_default().to_string(),
        last_name: name.person_sur_name.clone(),
        date_of_birth: spouse.person_birth_date.as_ref().map(|birth| birth.date),
        social_insurance_number: spouse
            .person_sin_identification
            .as_ref()
            .map(|sin| sin.identification_id.clone()),
        consent_to_share_personal_information: spouse
            .applicant_detail
            .as_ref()
            .and_then(|detail| detail.consent_to_share_personal_information_indicator),
    })
}

fn to_child_dto(child: &RelatedPerson) -> Result<ClientChildDto, MappingError> {
    let name = child
        .person_name
        .first()
        .ok_or_else(|| MappingError::missing("dependant name"))?;
    let detail = child.applicant_detail.as_ref();
    Ok(ClientChildDto {
        first_name: name.first_name().unwrap_or_default().to_string(),
        last_name: name.person_sur_name.clone(),
        date_of_birth: child.person_birth_date.as_ref().map(|birth| birth.date),
        social_insurance_number: child
            .person_sin_identification
            .as_ref()
            .map(|sin| sin.identification_id.clone()),
        is_parent: detail.and_then(|d| d.attest_parent_or_guardian_indicator),
        dental_insurance: detail.and_then(|d| d.private_dental_insurance_indicator),
        dental_benefits: detail.map(ApplicantDetail::program_ids).unwrap_or_default(),
    })
}

// ---------------------------------------------------------------------------
// DTO -> Entity
// ---------------------------------------------------------------------------

/// Build the nested entity of a client application. Total: optional DTO
/// fields become absent branches.
pub fn to_benefit_application_entity(
    dto: &ClientApplicationDto,
    codes: &BenefitCodes,
) -> BenefitApplicationEntity {
    let contact = &dto.contact_information;

    let mut addresses = vec![address_entity(ADDRESS_MAILING, &contact.mailing_address)];
    addresses.extend(
        contact
            .home_address
            .as_ref()
            .map(|home| address_entity(ADDRESS_HOME, home)),
    );

    let mut related_person: Vec<RelatedPerson> = dto
        .partner_information
        .iter()
        .map(|partner| RelatedPerson {
            person_relationship_code: ReferenceCode::name(RELATIONSHIP_SPOUSE),
            person_name: vec![PersonName::new(&partner.first_name, &partner.last_name)],
            person_birth_date: partner.date_of_birth.map(|date| BirthDate { date }),
            person_sin_identification: partner.social_insurance_number.as_deref().map(Identification::new),
            applicant_detail: partner.consent_to_share_personal_information.map(|consent| {
                ApplicantDetail {
                    consent_to_share_personal_information_indicator: Some(consent),
                    ..Default::default()
                }
            }),
        })
        .collect();
    related_person.extend(dto.children.iter().map(|child| {
        let detail = ApplicantDetail {
            private_dental_insurance_indicator: child.dental_insurance,
            attest_parent_or_guardian_indicator: child.is_parent,
            insurance_plan: insurance_plans(&child.dental_benefits),
            ..Default::default()
        };
        RelatedPerson {
            person_relationship_code: ReferenceCode::name(RELATIONSHIP_DEPENDANT),
            person_name: vec![PersonName::new(&child.first_name, &child.last_name)],
            person_birth_date: child.date_of_birth.map(|date| BirthDate { date }),
            person_sin_identification: child.social_insurance_number.as_deref().map(Identification::new),
            applicant_detail: (detail != ApplicantDetail::default()).then_some(detail),
        }
    }));

    let info = &dto.applicant_information;
    let mut client_identification =
        vec![Identification::tagged(&info.client_id, IDENTIFICATION_CLIENT_ID)];
    client_identification.extend(
        info.client_number
            .as_deref()
            .map(|number| Identification::tagged(number, IDENTIFICATION_CLIENT_NUMBER)),
    );

    BenefitApplicationEntity {
        benefit_application: BenefitApplication {
            applicant: Applicant {
                person_birth_date: Some(BirthDate { date: dto.date_of_birth }),
                person_contact_information: vec![PersonContactInformation {
                    address: addresses,
                    email_address: email_addresses(contact.email.as_deref()),
                    telephone_number: telephone_numbers(
                        contact.phone_number.as_deref(),
                        contact.phone_number_alt.as_deref(),
                    ),
                }],
                person_language: dto
                    .communication_preferences
                    .preferred_language
                    .as_deref()
                    .map(preferred_language)
                    .into_iter()
                    .collect(),
                person_marital_status: dto.marital_status.map(|status| PersonMaritalStatus {
                    status_code: ReferenceCode::id(codes.marital_status_code(status)),
                }),
                person_name: vec![PersonName::new(&info.first_name, &info.last_name)],
                person_sin_identification: Identification::new(&info.social_insurance_number),
                mailing_same_as_home_indicator: Some(contact.copy_mailing_address),
                preferred_method_communication_code: dto
                    .communication_preferences
                    .preferred_method
                    .as_deref()
                    .map(ReferenceCode::id),
                applicant_detail: ApplicantDetail {
                    private_dental_insurance_indicator: dto.dental_insurance,
                    disability_tax_credit_indicator: dto.disability_tax_credit,
                    living_independently_indicator: dto.living_independently,
                    insurance_plan: insurance_plans(&dto.dental_benefits),
                    ..Default::default()
                },
                related_person,
                client_identification,
            },
            benefit_application_category_code: ReferenceCode::id(&dto.application_category_code),
            benefit_application_channel_code: None,
            benefit_application_identification: Vec::new(),
        },
    }
}

// -- shared entity builders --

pub(crate) fn address_entity(category: &str, address: &ClientAddressDto) -> Address {
    Address {
        address_category_code: Some(ReferenceCode::name(category)),
        address_street: AddressStreet {
            street_name: address.address.clone(),
        },
        address_secondary_unit_text: address.apartment.clone(),
        address_city_name: address.city.clone(),
        address_country: AddressCountry {
            country_code: ReferenceCode::id(&address.country),
        },
        address_province: address.province.as_deref().map(|province| AddressProvince {
            province_code: ReferenceCode::id(province),
        }),
        address_postal_code: address.postal_code.clone(),
    }
}

pub(crate) fn insurance_plans(program_ids: &[String]) -> Vec<InsurancePlan> {
    if program_ids.is_empty() {
        return Vec::new();
    }
    vec![InsurancePlan {
        insurance_plan_identification: program_ids.iter().map(Identification::new).collect(),
    }]
}

pub(crate) fn email_addresses(email: Option<&str>) -> Vec<EmailAddress> {
    email
        .map(|email| EmailAddress {
            email_address_id: email.to_string(),
        })
        .into_iter()
        .collect()
}

pub(crate) fn telephone_numbers(primary: Option<&str>, alternate: Option<&str>) -> Vec<TelephoneNumber> {
    [(primary, TELEPHONE_PRIMARY), (alternate, TELEPHONE_ALTERNATE)]
        .into_iter()
        .filter_map(|(number, tag)| {
            number.map(|number| TelephoneNumber {
                telephone_number_full_id: number.to_string(),
                telephone_number_category_code: ReferenceCode::name(tag),
            })
        })
        .collect()
}

pub(crate) fn preferred_language(language_id: &str) -> PersonLanguage {
    PersonLanguage {
        communication_category_code: ReferenceCode::id(language_id),
        preferred_indicator: true,
    }
}
