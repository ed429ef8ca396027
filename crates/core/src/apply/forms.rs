//! Step form validators.
//!
//! Each editable step has a form struct. Shape checks (required, lengths,
//! email) are declared with `validator`; cross-field rules run in the
//! form's `into_update`. A form either produces the typed, normalized update
//! for the state or a [`FieldErrors`] map. Forms never touch the store.

use std::borrow::Cow;
use std::collections::BTreeMap;
use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError, ValidationErrors};

use super::lifecycle::{ApplyField, ApplyStatePatch};
use super::state::{
    AgeCategory, ApplicantInformation, ApplicationType, ChildInformation, ChildState,
    CommunicationPreferences, ContactInformation, DentalBenefits, MaritalStatus,
    PartnerInformation, TermsAndConditions,
};
use super::steps::ApplyStep;

/// Country code requiring a Canadian postal code and a province.
pub const COUNTRY_CODE_CANADA: &str = "CAN";
/// Country code requiring a ZIP code and a state.
pub const COUNTRY_CODE_USA: &str = "USA";
/// Preferred communication method that requires an email address.
pub const COMMUNICATION_METHOD_EMAIL: &str = "email";

static POSTAL_CODE_CANADA_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[ABCEGHJ-NPRSTVXY][0-9][ABCEGHJ-NPRSTV-Z] ?[0-9][ABCEGHJ-NPRSTV-Z][0-9]$")
        .expect("valid regex")
});
static ZIP_CODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{5}(-[0-9]{4})?$").expect("valid regex"));
static PHONE_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\+?[0-9 ().\-]+$").expect("valid regex"));

// ---------------------------------------------------------------------------
// Field errors
// ---------------------------------------------------------------------------

/// Field name to error messages. Ordered so responses are stable.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(field: &str, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// `Ok(value)` when no error was recorded.
    pub fn into_result<T>(self, value: T) -> Result<T, FieldErrors> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl From<ValidationErrors> for FieldErrors {
    fn from(errors: ValidationErrors) -> Self {
        let mut out = FieldErrors::new();
        for (field, field_errors) in errors.field_errors() {
            for error in field_errors.iter() {
                let message = error
                    .message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| error.code.to_string());
                out.add(&field, message);
            }
        }
        out
    }
}

/// Why a step submission was rejected.
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    /// The step is informational and takes no input.
    #[error("Step '{0}' does not accept a form")]
    NoForm(&'static str),

    #[error("Form has {} invalid field(s)", .0.len())]
    Invalid(FieldErrors),
}

impl From<FieldErrors> for FormError {
    fn from(errors: FieldErrors) -> Self {
        Self::Invalid(errors)
    }
}

// ---------------------------------------------------------------------------
// Context and outputs
// ---------------------------------------------------------------------------

/// Values outside the submitted form that some rules depend on.
#[derive(Debug, Clone)]
pub struct FormContext {
    pub today: NaiveDate,
    /// Applicant SIN already on file, used for uniqueness checks.
    pub applicant_sin: Option<String>,
}

impl FormContext {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today,
            applicant_sin: None,
        }
    }

    pub fn with_applicant_sin(mut self, sin: Option<String>) -> Self {
        self.applicant_sin = sin;
        self
    }
}

/// What an applicant-level step writes: a patch plus fields to drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepUpdate {
    pub patch: ApplyStatePatch,
    pub remove: Vec<ApplyField>,
}

impl StepUpdate {
    fn from_patch(patch: ApplyStatePatch) -> Self {
        Self {
            patch,
            remove: Vec::new(),
        }
    }

    fn removing(mut self, fields: &[ApplyField]) -> Self {
        self.remove.extend_from_slice(fields);
        self
    }
}

/// What a child step writes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChildStatePatch {
    pub information: Option<ChildInformation>,
    pub dental_insurance: Option<bool>,
    pub has_federal_provincial_territorial_benefits: Option<bool>,
    pub dental_benefits: Option<DentalBenefits>,
    /// Drop stale benefit details.
    pub clear_dental_benefits: bool,
}

impl ChildStatePatch {
    pub fn apply_to(self, child: &mut ChildState) {
        if let Some(information) = self.information {
            child.information = Some(information);
        }
        if let Some(dental_insurance) = self.dental_insurance {
            child.dental_insurance = Some(dental_insurance);
        }
        if let Some(flag) = self.has_federal_provincial_territorial_benefits {
            child.has_federal_provincial_territorial_benefits = Some(flag);
        }
        if self.clear_dental_benefits {
            child.dental_benefits = None;
        }
        if let Some(benefits) = self.dental_benefits {
            child.dental_benefits = Some(benefits);
        }
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

fn decode<F: DeserializeOwned + Validate>(body: serde_json::Value) -> Result<F, FieldErrors> {
    let form: F = serde_json::from_value(body)
        .map_err(|e| FieldErrors::single("form", format!("Malformed form: {e}")))?;
    form.validate()?;
    Ok(form)
}

/// Whether `step` takes input. Informational pages do not.
pub fn accepts_form(step: ApplyStep) -> bool {
    !matches!(
        step,
        ApplyStep::FileTaxes
            | ApplyStep::ApplicationDelegate
            | ApplyStep::ParentOrGuardian
            | ApplyStep::DobEligibility
            | ApplyStep::ContactApplyChild
            | ApplyStep::Children
            | ApplyStep::ReviewInformation
            | ApplyStep::Confirmation
    )
}

/// Validate the form of an applicant-level step.
pub fn parse_step(
    step: ApplyStep,
    body: serde_json::Value,
    ctx: &FormContext,
) -> Result<StepUpdate, FormError> {
    let update = match step {
        ApplyStep::TypeOfApplication => decode::<TypeOfApplicationForm>(body)?.into_update()?,
        ApplyStep::TermsAndConditions => decode::<TermsAndConditionsForm>(body)?.into_update()?,
        ApplyStep::TaxFiling => decode::<TaxFilingForm>(body)?.into_update(),
        ApplyStep::DateOfBirth => decode::<DateOfBirthForm>(body)?.into_update(ctx)?,
        ApplyStep::LivingIndependently => decode::<LivingIndependentlyForm>(body)?.into_update(),
        ApplyStep::DisabilityTaxCredit => decode::<DisabilityTaxCreditForm>(body)?.into_update(),
        ApplyStep::ApplicantInformation => {
            decode::<ApplicantInformationForm>(body)?.into_update()?
        }
        ApplyStep::MaritalStatus => decode::<MaritalStatusForm>(body)?.into_update(ctx)?,
        ApplyStep::ContactInformation => decode::<ContactInformationForm>(body)?.into_update()?,
        ApplyStep::CommunicationPreference => {
            decode::<CommunicationPreferenceForm>(body)?.into_update()?
        }
        ApplyStep::DentalInsurance => {
            let form = decode::<DentalInsuranceForm>(body)?;
            StepUpdate::from_patch(ApplyStatePatch {
                dental_insurance: form.dental_insurance,
                ..Default::default()
            })
        }
        ApplyStep::ConfirmFederalProvincialTerritorialBenefits => {
            let form = decode::<ConfirmBenefitsForm>(body)?;
            let update = StepUpdate::from_patch(ApplyStatePatch {
                has_federal_provincial_territorial_benefits: form
                    .has_federal_provincial_territorial_benefits,
                ..Default::default()
            });
            if form.has_federal_provincial_territorial_benefits == Some(false) {
                update.removing(&[ApplyField::DentalBenefits])
            } else {
                update
            }
        }
        ApplyStep::FederalProvincialTerritorialBenefits => {
            let benefits = decode::<DentalBenefitsForm>(body)?.into_benefits()?;
            StepUpdate::from_patch(ApplyStatePatch {
                dental_benefits: Some(benefits),
                ..Default::default()
            })
        }
        other => return Err(FormError::NoForm(other.slug())),
    };
    Ok(update)
}

/// Validate the form of a per-child step.
pub fn parse_child_step(
    step: ApplyStep,
    body: serde_json::Value,
    ctx: &FormContext,
) -> Result<ChildStatePatch, FormError> {
    let patch = match step {
        ApplyStep::ChildInformation => ChildStatePatch {
            information: Some(decode::<ChildInformationForm>(body)?.into_information(ctx)?),
            ..Default::default()
        },
        ApplyStep::ChildDentalInsurance => ChildStatePatch {
            dental_insurance: decode::<DentalInsuranceForm>(body)?.dental_insurance,
            ..Default::default()
        },
        ApplyStep::ChildConfirmFederalProvincialTerritorialBenefits => {
            let flag = decode::<ConfirmBenefitsForm>(body)?.has_federal_provincial_territorial_benefits;
            ChildStatePatch {
                has_federal_provincial_territorial_benefits: flag,
                clear_dental_benefits: flag == Some(false),
                ..Default::default()
            }
        }
        ApplyStep::ChildFederalProvincialTerritorialBenefits => ChildStatePatch {
            dental_benefits: Some(decode::<DentalBenefitsForm>(body)?.into_benefits()?),
            ..Default::default()
        },
        other => return Err(FormError::NoForm(other.slug())),
    };
    Ok(patch)
}

// ---------------------------------------------------------------------------
// Shared checks
// ---------------------------------------------------------------------------

/// Strip separators from a SIN. `None` unless nine digits remain.
pub fn normalize_sin(raw: &str) -> Option<String> {
    let digits: String = raw.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    (digits.len() == 9 && digits.bytes().all(|b| b.is_ascii_digit())).then_some(digits)
}

/// Nine digits passing the Luhn checksum, not all zero.
pub fn is_valid_sin(raw: &str) -> bool {
    let Some(sin) = normalize_sin(raw) else {
        return false;
    };
    if sin.bytes().all(|b| b == b'0') {
        return false;
    }
    let sum: u32 = sin
        .bytes()
        .map(|b| u32::from(b - b'0'))
        .enumerate()
        .map(|(index, digit)| {
            if index % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 { doubled - 9 } else { doubled }
            } else {
                digit
            }
        })
        .sum();
    sum % 10 == 0
}

fn validate_sin(value: &str) -> Result<(), ValidationError> {
    if is_valid_sin(value) {
        Ok(())
    } else {
        Err(ValidationError::new("sin")
            .with_message(Cow::Borrowed("Enter a valid social insurance number")))
    }
}

fn validate_phone_number(value: &str) -> Result<(), ValidationError> {
    let digits = value.chars().filter(char::is_ascii_digit).count();
    if PHONE_NUMBER_RE.is_match(value) && (10..=15).contains(&digits) {
        Ok(())
    } else {
        Err(ValidationError::new("phone").with_message(Cow::Borrowed("Enter a valid phone number")))
    }
}

/// Parse a `YYYY-MM-DD` date that is not in the future.
fn parse_past_date(
    errors: &mut FieldErrors,
    field: &str,
    raw: &str,
    today: NaiveDate,
) -> Option<NaiveDate> {
    let Ok(date) = NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d") else {
        errors.add(field, "Enter a valid date (YYYY-MM-DD)");
        return None;
    };
    if date > today {
        errors.add(field, "Date must not be in the future");
        return None;
    }
    if date < NaiveDate::from_ymd_opt(1900, 1, 1)? {
        errors.add(field, "Date must be after 1900-01-01");
        return None;
    }
    Some(date)
}

fn trimmed(value: &str) -> String {
    value.trim().to_string()
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn require(errors: &mut FieldErrors, field: &str, value: &Option<String>, message: &str) {
    if value.as_deref().map_or(true, |v| v.trim().is_empty()) {
        errors.add(field, message);
    }
}

/// Names are checked again after trimming; the derive only sees the raw input.
fn require_name(errors: &mut FieldErrors, field: &str, value: &str, message: &str) {
    if value.trim().is_empty() {
        errors.add(field, message);
    }
}

/// Validate an address postal code for `country` and normalize it.
fn check_postal_code(
    errors: &mut FieldErrors,
    field: &str,
    country: &str,
    postal_code: Option<String>,
) -> Option<String> {
    let postal_code = non_blank(postal_code).map(|p| p.to_uppercase());
    match country {
        COUNTRY_CODE_CANADA => match postal_code {
            Some(code) if POSTAL_CODE_CANADA_RE.is_match(&code) => {
                let compact: Vec<char> = code.chars().filter(|c| !c.is_whitespace()).collect();
                let (head, tail) = compact.split_at(3);
                Some(format!(
                    "{} {}",
                    head.iter().collect::<String>(),
                    tail.iter().collect::<String>()
                ))
            }
            Some(_) => {
                errors.add(field, "Enter a valid Canadian postal code");
                None
            }
            None => {
                errors.add(field, "Postal code is required");
                None
            }
        },
        COUNTRY_CODE_USA => match postal_code {
            Some(code) if ZIP_CODE_RE.is_match(&code) => Some(code),
            Some(_) => {
                errors.add(field, "Enter a valid ZIP code");
                None
            }
            None => {
                errors.add(field, "ZIP code is required");
                None
            }
        },
        _ => postal_code,
    }
}

// ---------------------------------------------------------------------------
// Applicant forms
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TypeOfApplicationForm {
    #[validate(length(min = 1, message = "Select the type of application"))]
    pub type_of_application: String,
}

impl TypeOfApplicationForm {
    fn into_update(self) -> Result<StepUpdate, FieldErrors> {
        let type_of_application = ApplicationType::parse(&self.type_of_application)
            .map_err(|_| FieldErrors::single("type_of_application", "Select a valid type of application"))?;
        Ok(StepUpdate::from_patch(ApplyStatePatch {
            type_of_application: Some(type_of_application),
            ..Default::default()
        }))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TermsAndConditionsForm {
    pub acknowledge_terms: bool,
    pub acknowledge_privacy: bool,
    pub share_data: bool,
}

impl TermsAndConditionsForm {
    fn into_update(self) -> Result<StepUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        if !self.acknowledge_terms {
            errors.add("acknowledge_terms", "You must acknowledge the terms and conditions");
        }
        if !self.acknowledge_privacy {
            errors.add("acknowledge_privacy", "You must acknowledge the privacy notice");
        }
        if !self.share_data {
            errors.add("share_data", "You must consent to sharing your data");
        }
        errors.into_result(StepUpdate::from_patch(ApplyStatePatch {
            terms_and_conditions: Some(TermsAndConditions {
                acknowledge_terms: true,
                acknowledge_privacy: true,
                share_data: true,
            }),
            ..Default::default()
        }))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct TaxFilingForm {
    #[validate(required(message = "Select whether you filed your taxes"))]
    pub tax_filing: Option<bool>,
}

impl TaxFilingForm {
    fn into_update(self) -> StepUpdate {
        StepUpdate::from_patch(ApplyStatePatch {
            tax_filing: self.tax_filing,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DateOfBirthForm {
    #[validate(length(min = 1, message = "Date of birth is required"))]
    pub date_of_birth: String,
}

impl DateOfBirthForm {
    /// Answers that no longer apply to the new age category are dropped.
    fn into_update(self, ctx: &FormContext) -> Result<StepUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let date_of_birth = parse_past_date(&mut errors, "date_of_birth", &self.date_of_birth, ctx.today);
        let Some(date_of_birth) = date_of_birth else {
            return Err(errors);
        };

        let update = StepUpdate::from_patch(ApplyStatePatch {
            date_of_birth: Some(date_of_birth),
            ..Default::default()
        });
        let stale: &[ApplyField] = match AgeCategory::from_date_of_birth(date_of_birth, ctx.today) {
            AgeCategory::Youth => &[ApplyField::DisabilityTaxCredit],
            AgeCategory::Adults => &[ApplyField::LivingIndependently],
            AgeCategory::Children | AgeCategory::Seniors => {
                &[ApplyField::LivingIndependently, ApplyField::DisabilityTaxCredit]
            }
        };
        Ok(update.removing(stale))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct LivingIndependentlyForm {
    #[validate(required(message = "Select whether you live independently"))]
    pub living_independently: Option<bool>,
}

impl LivingIndependentlyForm {
    fn into_update(self) -> StepUpdate {
        StepUpdate::from_patch(ApplyStatePatch {
            living_independently: self.living_independently,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DisabilityTaxCreditForm {
    #[validate(required(message = "Select whether you receive the disability tax credit"))]
    pub disability_tax_credit: Option<bool>,
}

impl DisabilityTaxCreditForm {
    fn into_update(self) -> StepUpdate {
        StepUpdate::from_patch(ApplyStatePatch {
            disability_tax_credit: self.disability_tax_credit,
            ..Default::default()
        })
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ApplicantInformationForm {
    #[validate(length(min = 1, max = 100, message = "First name is required (100 characters max)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required (100 characters max)"))]
    pub last_name: String,
    #[validate(custom(function = "validate_sin"))]
    pub social_insurance_number: String,
}

impl ApplicantInformationForm {
    fn into_update(self) -> Result<StepUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        require_name(&mut errors, "first_name", &self.first_name, "First name is required");
        require_name(&mut errors, "last_name", &self.last_name, "Last name is required");
        let Some(sin) = normalize_sin(&self.social_insurance_number) else {
            errors.add("social_insurance_number", "Enter a valid social insurance number");
            return Err(errors);
        };
        errors.into_result(StepUpdate::from_patch(ApplyStatePatch {
            applicant_information: Some(ApplicantInformation {
                first_name: trimmed(&self.first_name),
                last_name: trimmed(&self.last_name),
                social_insurance_number: sin,
            }),
            ..Default::default()
        }))
    }
}

/// Marital status with the partner fields inline; partner fields are
/// required only for statuses that have a partner.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct MaritalStatusForm {
    #[validate(length(min = 1, message = "Select your marital status"))]
    pub marital_status: String,
    pub partner_first_name: Option<String>,
    pub partner_last_name: Option<String>,
    pub partner_date_of_birth: Option<String>,
    pub partner_social_insurance_number: Option<String>,
    pub partner_confirm: bool,
}

impl MaritalStatusForm {
    fn into_update(self, ctx: &FormContext) -> Result<StepUpdate, FieldErrors> {
        let marital_status = MaritalStatus::parse(&self.marital_status)
            .map_err(|_| FieldErrors::single("marital_status", "Select a valid marital status"))?;

        if !marital_status.has_partner() {
            return Ok(StepUpdate::from_patch(ApplyStatePatch {
                marital_status: Some(marital_status),
                ..Default::default()
            })
            .removing(&[ApplyField::PartnerInformation]));
        }

        let mut errors = FieldErrors::new();
        require(&mut errors, "partner_first_name", &self.partner_first_name, "Partner first name is required");
        require(&mut errors, "partner_last_name", &self.partner_last_name, "Partner last name is required");

        let date_of_birth = match self.partner_date_of_birth.as_deref() {
            Some(raw) if !raw.trim().is_empty() => {
                parse_past_date(&mut errors, "partner_date_of_birth", raw, ctx.today)
            }
            _ => {
                errors.add("partner_date_of_birth", "Partner date of birth is required");
                None
            }
        };

        let sin = self
            .partner_social_insurance_number
            .as_deref()
            .filter(|raw| is_valid_sin(raw))
            .and_then(normalize_sin);
        match &sin {
            None => errors.add(
                "partner_social_insurance_number",
                "Enter a valid social insurance number",
            ),
            Some(sin) if ctx.applicant_sin.as_deref() == Some(sin.as_str()) => errors.add(
                "partner_social_insurance_number",
                "Partner social insurance number must differ from yours",
            ),
            Some(_) => {}
        }

        if !self.partner_confirm {
            errors.add("partner_confirm", "You must confirm your partner's consent");
        }

        let (Some(date_of_birth), Some(sin)) = (date_of_birth, sin) else {
            return Err(errors);
        };
        errors.into_result(StepUpdate::from_patch(ApplyStatePatch {
            marital_status: Some(marital_status),
            partner_information: Some(PartnerInformation {
                first_name: non_blank(self.partner_first_name).unwrap_or_default(),
                last_name: non_blank(self.partner_last_name).unwrap_or_default(),
                date_of_birth,
                social_insurance_number: sin,
                confirm: true,
            }),
            ..Default::default()
        }))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ContactInformationForm {
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number: Option<String>,
    #[validate(custom(function = "validate_phone_number"))]
    pub phone_number_alt: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Mailing address is required"))]
    pub mailing_address: String,
    pub mailing_apartment: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Mailing city is required"))]
    pub mailing_city: String,
    #[validate(length(min = 1, message = "Mailing country is required"))]
    pub mailing_country: String,
    pub mailing_province: Option<String>,
    pub mailing_postal_code: Option<String>,
    pub copy_mailing_address: bool,
    pub home_address: Option<String>,
    pub home_apartment: Option<String>,
    pub home_city: Option<String>,
    pub home_country: Option<String>,
    pub home_province: Option<String>,
    pub home_postal_code: Option<String>,
}

impl ContactInformationForm {
    /// With `copy_mailing_address` the home address is the mailing address.
    fn into_update(self) -> Result<StepUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let mailing_country = trimmed(&self.mailing_country).to_uppercase();
        let needs_province = matches!(mailing_country.as_str(), COUNTRY_CODE_CANADA | COUNTRY_CODE_USA);
        if needs_province {
            require(&mut errors, "mailing_province", &self.mailing_province, "Mailing province is required");
        }
        let mailing_postal_code =
            check_postal_code(&mut errors, "mailing_postal_code", &mailing_country, self.mailing_postal_code);
        let mailing_province = if needs_province { non_blank(self.mailing_province) } else { None };

        let mailing_address = trimmed(&self.mailing_address);
        let mailing_apartment = non_blank(self.mailing_apartment);
        let mailing_city = trimmed(&self.mailing_city);

        let (home_address, home_apartment, home_city, home_country, home_province, home_postal_code) =
            if self.copy_mailing_address {
                (
                    Some(mailing_address.clone()),
                    mailing_apartment.clone(),
                    Some(mailing_city.clone()),
                    Some(mailing_country.clone()),
                    mailing_province.clone(),
                    mailing_postal_code.clone(),
                )
            } else {
                require(&mut errors, "home_address", &self.home_address, "Home address is required");
                require(&mut errors, "home_city", &self.home_city, "Home city is required");
                require(&mut errors, "home_country", &self.home_country, "Home country is required");
                let home_country = non_blank(self.home_country).map(|c| c.to_uppercase());
                let country = home_country.clone().unwrap_or_default();
                let needs_home_province =
                    matches!(country.as_str(), COUNTRY_CODE_CANADA | COUNTRY_CODE_USA);
                if needs_home_province {
                    require(&mut errors, "home_province", &self.home_province, "Home province is required");
                }
                let postal_code =
                    check_postal_code(&mut errors, "home_postal_code", &country, self.home_postal_code);
                (
                    non_blank(self.home_address),
                    non_blank(self.home_apartment),
                    non_blank(self.home_city),
                    home_country,
                    if needs_home_province { non_blank(self.home_province) } else { None },
                    postal_code,
                )
            };

        errors.into_result(StepUpdate::from_patch(ApplyStatePatch {
            contact_information: Some(ContactInformation {
                phone_number: non_blank(self.phone_number),
                phone_number_alt: non_blank(self.phone_number_alt),
                mailing_address,
                mailing_apartment,
                mailing_city,
                mailing_country,
                mailing_province,
                mailing_postal_code,
                copy_mailing_address: self.copy_mailing_address,
                home_address,
                home_apartment,
                home_city,
                home_country,
                home_province,
                home_postal_code,
            }),
            ..Default::default()
        }))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct CommunicationPreferenceForm {
    #[validate(length(min = 1, message = "Select your preferred language"))]
    pub preferred_language: String,
    #[validate(length(min = 1, message = "Select your preferred method of communication"))]
    pub preferred_method: String,
    #[validate(email(message = "Enter a valid email address"))]
    pub email: Option<String>,
    pub confirm_email: Option<String>,
}

impl CommunicationPreferenceForm {
    fn into_update(self) -> Result<StepUpdate, FieldErrors> {
        let mut errors = FieldErrors::new();
        let email = non_blank(self.email).map(|e| e.to_lowercase());
        let confirm_email = non_blank(self.confirm_email).map(|e| e.to_lowercase());

        if self.preferred_method == COMMUNICATION_METHOD_EMAIL && email.is_none() {
            errors.add("email", "Email is required when email is the preferred method");
        }
        if email.is_some() && email != confirm_email {
            errors.add("confirm_email", "Email addresses must match");
        }

        errors.into_result(StepUpdate::from_patch(ApplyStatePatch {
            communication_preferences: Some(CommunicationPreferences {
                preferred_language: trimmed(&self.preferred_language),
                preferred_method: trimmed(&self.preferred_method),
                email,
            }),
            ..Default::default()
        }))
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DentalInsuranceForm {
    #[validate(required(message = "Select whether you have access to dental insurance"))]
    pub dental_insurance: Option<bool>,
}

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ConfirmBenefitsForm {
    #[validate(required(message = "Select whether you have federal, provincial or territorial dental benefits"))]
    pub has_federal_provincial_territorial_benefits: Option<bool>,
}

/// Federal and provincial/territorial benefit details.
///
/// Selecting a federal benefit requires its program; selecting a
/// provincial/territorial benefit requires both the province and the program.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct DentalBenefitsForm {
    #[validate(required(message = "Select whether you have federal dental benefits"))]
    pub has_federal_benefits: Option<bool>,
    pub federal_social_program: Option<String>,
    #[validate(required(message = "Select whether you have provincial or territorial dental benefits"))]
    pub has_provincial_territorial_benefits: Option<bool>,
    pub province: Option<String>,
    pub provincial_territorial_social_program: Option<String>,
}

impl DentalBenefitsForm {
    fn into_benefits(self) -> Result<DentalBenefits, FieldErrors> {
        let mut errors = FieldErrors::new();
        let has_federal_benefits = self.has_federal_benefits.unwrap_or(false);
        let has_provincial_territorial_benefits =
            self.has_provincial_territorial_benefits.unwrap_or(false);

        if has_federal_benefits {
            require(&mut errors, "federal_social_program", &self.federal_social_program, "Select a federal program");
        }
        if has_provincial_territorial_benefits {
            require(&mut errors, "province", &self.province, "Select a province or territory");
            require(
                &mut errors,
                "provincial_territorial_social_program",
                &self.provincial_territorial_social_program,
                "Select a provincial or territorial program",
            );
        }

        errors.into_result(DentalBenefits {
            has_federal_benefits,
            federal_social_program: non_blank(self.federal_social_program)
                .filter(|_| has_federal_benefits),
            has_provincial_territorial_benefits,
            province: non_blank(self.province).filter(|_| has_provincial_territorial_benefits),
            provincial_territorial_social_program: non_blank(
                self.provincial_territorial_social_program,
            )
            .filter(|_| has_provincial_territorial_benefits),
        })
    }
}

// ---------------------------------------------------------------------------
// Child forms
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Deserialize, Validate)]
#[serde(default)]
pub struct ChildInformationForm {
    #[validate(length(min = 1, max = 100, message = "First name is required (100 characters max)"))]
    pub first_name: String,
    #[validate(length(min = 1, max = 100, message = "Last name is required (100 characters max)"))]
    pub last_name: String,
    #[validate(length(min = 1, message = "Date of birth is required"))]
    pub date_of_birth: String,
    #[validate(required(message = "Select whether you are the parent or legal guardian"))]
    pub is_parent: Option<bool>,
    #[validate(required(message = "Select whether the child has a social insurance number"))]
    pub has_social_insurance_number: Option<bool>,
    pub social_insurance_number: Option<String>,
}

impl ChildInformationForm {
    fn into_information(self, ctx: &FormContext) -> Result<ChildInformation, FieldErrors> {
        let mut errors = FieldErrors::new();
        require_name(&mut errors, "first_name", &self.first_name, "First name is required");
        require_name(&mut errors, "last_name", &self.last_name, "Last name is required");
        let date_of_birth = parse_past_date(&mut errors, "date_of_birth", &self.date_of_birth, ctx.today);

        if self.is_parent == Some(false) {
            errors.add("is_parent", "Only a parent or legal guardian can apply for a child");
        }

        let has_social_insurance_number = self.has_social_insurance_number.unwrap_or(false);
        let social_insurance_number = if has_social_insurance_number {
            let sin = self
                .social_insurance_number
                .as_deref()
                .filter(|raw| is_valid_sin(raw))
                .and_then(normalize_sin);
            match &sin {
                None => errors.add("social_insurance_number", "Enter a valid social insurance number"),
                Some(sin) if ctx.applicant_sin.as_deref() == Some(sin.as_str()) => errors.add(
                    "social_insurance_number",
                    "Child social insurance number must differ from yours",
                ),
                Some(_) => {}
            }
            sin
        } else {
            None
        };

        let Some(date_of_birth) = date_of_birth else {
            return Err(errors);
        };
        errors.into_result(ChildInformation {
            first_name: trimmed(&self.first_name),
            last_name: trimmed(&self.last_name),
            date_of_birth,
            is_parent: true,
            has_social_insurance_number,
            social_insurance_number,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    fn ctx() -> FormContext {
        FormContext::new(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    fn invalid(result: Result<StepUpdate, FormError>) -> FieldErrors {
        match result {
            Err(FormError::Invalid(errors)) => errors,
            other => panic!("expected field errors, got {other:?}"),
        }
    }

    #[test]
    fn sin_checksum() {
        assert!(is_valid_sin("046 454 286"));
        assert!(is_valid_sin("800-000-002"));
        assert!(!is_valid_sin("046454287"));
        assert!(!is_valid_sin("000000000"));
        assert!(!is_valid_sin("12345678"));
        assert_eq!(normalize_sin("046 454 286").as_deref(), Some("046454286"));
    }

    #[test]
    fn informational_steps_take_no_form() {
        assert!(!accepts_form(ApplyStep::FileTaxes));
        assert!(accepts_form(ApplyStep::TaxFiling));
        assert_matches!(
            parse_step(ApplyStep::DobEligibility, json!({}), &ctx()),
            Err(FormError::NoForm("dob-eligibility"))
        );
    }

    #[test]
    fn malformed_body_is_a_field_error() {
        let errors = invalid(parse_step(ApplyStep::TaxFiling, json!({ "tax_filing": "yes" }), &ctx()));
        assert!(errors.contains("form"));
    }

    #[test]
    fn terms_must_all_be_acknowledged() {
        let errors = invalid(parse_step(
            ApplyStep::TermsAndConditions,
            json!({ "acknowledge_terms": true }),
            &ctx(),
        ));
        assert!(!errors.contains("acknowledge_terms"));
        assert!(errors.contains("acknowledge_privacy"));
        assert!(errors.contains("share_data"));
    }

    #[test]
    fn required_boolean_reports_field() {
        let errors = invalid(parse_step(ApplyStep::TaxFiling, json!({}), &ctx()));
        assert_eq!(errors.messages("tax_filing"), ["Select whether you filed your taxes"]);
    }

    #[test]
    fn date_of_birth_drops_answers_of_other_age_categories() {
        let update =
            parse_step(ApplyStep::DateOfBirth, json!({ "date_of_birth": "1990-04-04" }), &ctx()).unwrap();
        assert_eq!(update.patch.date_of_birth, NaiveDate::from_ymd_opt(1990, 4, 4));
        assert_eq!(update.remove, vec![ApplyField::LivingIndependently]);
    }

    #[test]
    fn date_of_birth_rejects_future_and_garbage() {
        let errors = invalid(parse_step(ApplyStep::DateOfBirth, json!({ "date_of_birth": "2030-01-01" }), &ctx()));
        assert!(errors.contains("date_of_birth"));
        let errors = invalid(parse_step(ApplyStep::DateOfBirth, json!({ "date_of_birth": "01/02/1990" }), &ctx()));
        assert!(errors.contains("date_of_birth"));
    }

    #[test]
    fn applicant_information_normalizes_sin() {
        let update = parse_step(
            ApplyStep::ApplicantInformation,
            json!({ "first_name": " Jane ", "last_name": "Doe", "social_insurance_number": "046 454 286" }),
            &ctx(),
        )
        .unwrap();
        let info = update.patch.applicant_information.unwrap();
        assert_eq!(info.first_name, "Jane");
        assert_eq!(info.social_insurance_number, "046454286");
    }

    #[test]
    fn applicant_information_rejects_bad_sin() {
        let errors = invalid(parse_step(
            ApplyStep::ApplicantInformation,
            json!({ "first_name": "Jane", "last_name": "", "social_insurance_number": "123" }),
            &ctx(),
        ));
        assert!(errors.contains("last_name"));
        assert!(errors.contains("social_insurance_number"));
    }

    #[test]
    fn single_status_removes_partner() {
        let update =
            parse_step(ApplyStep::MaritalStatus, json!({ "marital_status": "single" }), &ctx()).unwrap();
        assert_eq!(update.patch.marital_status, Some(MaritalStatus::Single));
        assert_eq!(update.remove, vec![ApplyField::PartnerInformation]);
    }

    #[test]
    fn married_status_requires_partner_fields() {
        let errors = invalid(parse_step(ApplyStep::MaritalStatus, json!({ "marital_status": "married" }), &ctx()));
        for field in [
            "partner_first_name",
            "partner_last_name",
            "partner_date_of_birth",
            "partner_social_insurance_number",
            "partner_confirm",
        ] {
            assert!(errors.contains(field), "{field}");
        }
    }

    #[test]
    fn partner_sin_must_differ_from_applicant() {
        let ctx = ctx().with_applicant_sin(Some("046454286".into()));
        let errors = invalid(parse_step(
            ApplyStep::MaritalStatus,
            json!({
                "marital_status": "common-law",
                "partner_first_name": "Sam",
                "partner_last_name": "Doe",
                "partner_date_of_birth": "1980-01-01",
                "partner_social_insurance_number": "046-454-286",
                "partner_confirm": true
            }),
            &ctx,
        ));
        assert_eq!(errors.len(), 1);
        assert!(errors.contains("partner_social_insurance_number"));
    }

    #[test]
    fn contact_information_copies_mailing_to_home() {
        let update = parse_step(
            ApplyStep::ContactInformation,
            json!({
                "mailing_address": "1 Main St",
                "mailing_city": "Ottawa",
                "mailing_country": "can",
                "mailing_province": "ON",
                "mailing_postal_code": "k1a0b1",
                "copy_mailing_address": true
            }),
            &ctx(),
        )
        .unwrap();
        let contact = update.patch.contact_information.unwrap();
        assert_eq!(contact.mailing_postal_code.as_deref(), Some("K1A 0B1"));
        assert_eq!(contact.home_address.as_deref(), Some("1 Main St"));
        assert_eq!(contact.home_postal_code.as_deref(), Some("K1A 0B1"));
    }

    #[test]
    fn contact_information_requires_home_unless_copied() {
        let errors = invalid(parse_step(
            ApplyStep::ContactInformation,
            json!({
                "mailing_address": "1 Main St",
                "mailing_city": "Ottawa",
                "mailing_country": "CAN",
                "mailing_province": "ON",
                "mailing_postal_code": "123"
            }),
            &ctx(),
        ));
        assert!(errors.contains("mailing_postal_code"));
        assert!(errors.contains("home_address"));
        assert!(errors.contains("home_city"));
    }

    #[test]
    fn contact_information_rejects_bad_phone_number() {
        let errors = invalid(parse_step(
            ApplyStep::ContactInformation,
            json!({
                "phone_number": "call me",
                "mailing_address": "1 Main St",
                "mailing_city": "Paris",
                "mailing_country": "FRA",
                "copy_mailing_address": true
            }),
            &ctx(),
        ));
        assert_eq!(errors.messages("phone_number"), ["Enter a valid phone number"]);
    }

    #[test]
    fn postal_codes_accept_ascii_digits_only() {
        let errors = invalid(parse_step(
            ApplyStep::ContactInformation,
            json!({
                "mailing_address": "1 Main St",
                "mailing_city": "Ottawa",
                "mailing_country": "CAN",
                "mailing_province": "ON",
                "mailing_postal_code": "K\u{0966}A \u{0966}B\u{0966}",
                "copy_mailing_address": true
            }),
            &ctx(),
        ));
        assert_eq!(errors.messages("mailing_postal_code"), ["Enter a valid Canadian postal code"]);

        let errors = invalid(parse_step(
            ApplyStep::ContactInformation,
            json!({
                "mailing_address": "1 Main St",
                "mailing_city": "Buffalo",
                "mailing_country": "USA",
                "mailing_province": "NY",
                "mailing_postal_code": "1420\u{0663}",
                "copy_mailing_address": true
            }),
            &ctx(),
        ));
        assert_eq!(errors.messages("mailing_postal_code"), ["Enter a valid ZIP code"]);
    }

    #[test]
    fn blank_names_are_rejected_after_trimming() {
        let errors = invalid(parse_step(
            ApplyStep::ApplicantInformation,
            json!({ "first_name": "   ", "last_name": "Doe", "social_insurance_number": "046 454 286" }),
            &ctx(),
        ));
        assert_eq!(errors.messages("first_name"), ["First name is required"]);
        assert!(!errors.contains("last_name"));

        let errors = match parse_child_step(
            ApplyStep::ChildInformation,
            json!({
                "first_name": "Kid",
                "last_name": " \t ",
                "date_of_birth": "2016-02-02",
                "is_parent": true,
                "has_social_insurance_number": false
            }),
            &ctx(),
        ) {
            Err(FormError::Invalid(errors)) => errors,
            other => panic!("expected invalid form, got {other:?}"),
        };
        assert_eq!(errors.messages("last_name"), ["Last name is required"]);
    }

    #[test]
    fn email_method_requires_matching_email() {
        let errors = invalid(parse_step(
            ApplyStep::CommunicationPreference,
            json!({ "preferred_language": "1033", "preferred_method": "email" }),
            &ctx(),
        ));
        assert!(errors.contains("email"));

        let errors = invalid(parse_step(
            ApplyStep::CommunicationPreference,
            json!({
                "preferred_language": "1033",
                "preferred_method": "email",
                "email": "a@example.com",
                "confirm_email": "b@example.com"
            }),
            &ctx(),
        ));
        assert!(errors.contains("confirm_email"));
    }

    #[test]
    fn no_benefits_removes_details() {
        let update = parse_step(
            ApplyStep::ConfirmFederalProvincialTerritorialBenefits,
            json!({ "has_federal_provincial_territorial_benefits": false }),
            &ctx(),
        )
        .unwrap();
        assert_eq!(update.remove, vec![ApplyField::DentalBenefits]);
    }

    #[test]
    fn dental_benefits_requiredness_is_asymmetric() {
        let errors = invalid(parse_step(
            ApplyStep::FederalProvincialTerritorialBenefits,
            json!({ "has_federal_benefits": false, "has_provincial_territorial_benefits": true }),
            &ctx(),
        ));
        assert!(!errors.contains("federal_social_program"));
        assert!(errors.contains("province"));
        assert!(errors.contains("provincial_territorial_social_program"));

        let update = parse_step(
            ApplyStep::FederalProvincialTerritorialBenefits,
            json!({
                "has_federal_benefits": true,
                "federal_social_program": "fed-1",
                "has_provincial_territorial_benefits": false,
                "province": "ON"
            }),
            &ctx(),
        )
        .unwrap();
        let benefits = update.patch.dental_benefits.unwrap();
        assert_eq!(benefits.federal_social_program.as_deref(), Some("fed-1"));
        assert_eq!(benefits.province, None);
    }

    #[test]
    fn child_information_requires_parent_and_sin_when_declared() {
        let result = parse_child_step(
            ApplyStep::ChildInformation,
            json!({
                "first_name": "Kid",
                "last_name": "Doe",
                "date_of_birth": "2016-02-02",
                "is_parent": false,
                "has_social_insurance_number": true
            }),
            &ctx(),
        );
        let errors = match result {
            Err(FormError::Invalid(errors)) => errors,
            other => panic!("expected field errors, got {other:?}"),
        };
        assert!(errors.contains("is_parent"));
        assert!(errors.contains("social_insurance_number"));
    }

    #[test]
    fn child_confirm_benefits_false_clears_details() {
        let patch = parse_child_step(
            ApplyStep::ChildConfirmFederalProvincialTerritorialBenefits,
            json!({ "has_federal_provincial_territorial_benefits": false }),
            &ctx(),
        )
        .unwrap();
        let mut child = ChildState::new(uuid::Uuid::new_v4());
        child.dental_benefits = Some(DentalBenefits {
            has_federal_benefits: true,
            federal_social_program: Some("stale".into()),
            has_provincial_territorial_benefits: false,
            province: None,
            provincial_territorial_social_program: None,
        });
        patch.apply_to(&mut child);
        assert_eq!(child.has_federal_provincial_territorial_benefits, Some(false));
        assert!(child.dental_benefits.is_none());
    }

    #[test]
    fn child_steps_reject_applicant_steps() {
        assert_matches!(
            parse_child_step(ApplyStep::MaritalStatus, json!({}), &ctx()),
            Err(FormError::NoForm(_))
        );
    }
}
