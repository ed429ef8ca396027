//! Apply state lifecycle: start, load, save, clear.
//!
//! All persistence of [`ApplyState`] goes through [`StateLifecycle`]. State is
//! passed by value: `load` and `save` return fresh snapshots and never mutate
//! a shared reference. Two requests that load the same flow and both save
//! race with last-write-wins semantics; there is no locking across the
//! store boundary.

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

use super::forms::ChildStatePatch;
use super::review::{self, ReviewOutcome, ReviewedApplyState};
use super::state::{
    ApplicantInformation, ApplicationType, ApplyState, ChildState, CommunicationPreferences,
    ContactInformation, DentalBenefits, MaritalStatus, PartnerInformation, SubmissionInfo,
    TermsAndConditions,
};
use crate::clock::Clock;
use crate::error::CoreError;
use crate::session_store::SessionStore;
use crate::types::{ChildId, FlowId};

/// Prefix of the session key an apply flow is stored under.
pub const SESSION_KEY_PREFIX: &str = "apply-flow-";

/// Default inactivity window after which a stored flow is discarded.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: i64 = 20;

/// Session key of a flow. Deterministic, one key per flow id.
pub fn session_key(id: FlowId) -> String {
    format!("{SESSION_KEY_PREFIX}{id}")
}

/// Parse a flow id received from a request path.
pub fn parse_flow_id(raw: &str) -> Result<FlowId, CoreError> {
    FlowId::parse_str(raw).map_err(|_| CoreError::InvalidIdentifier(raw.to_string()))
}

// ---------------------------------------------------------------------------
// Patch
// ---------------------------------------------------------------------------

/// Top-level fields that a step writes. `None` leaves the current value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApplyStatePatch {
    pub edit_mode: Option<bool>,
    pub type_of_application: Option<ApplicationType>,
    pub terms_and_conditions: Option<TermsAndConditions>,
    pub tax_filing: Option<bool>,
    pub date_of_birth: Option<NaiveDate>,
    pub living_independently: Option<bool>,
    pub disability_tax_credit: Option<bool>,
    pub applicant_information: Option<ApplicantInformation>,
    pub marital_status: Option<MaritalStatus>,
    pub partner_information: Option<PartnerInformation>,
    pub contact_information: Option<ContactInformation>,
    pub communication_preferences: Option<CommunicationPreferences>,
    pub dental_insurance: Option<bool>,
    pub has_federal_provincial_territorial_benefits: Option<bool>,
    pub dental_benefits: Option<DentalBenefits>,
    pub children: Option<Vec<ChildState>>,
    pub submission_info: Option<SubmissionInfo>,
}

/// Names of the removable top-level fields of [`ApplyState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyField {
    TypeOfApplication,
    TermsAndConditions,
    TaxFiling,
    DateOfBirth,
    LivingIndependently,
    DisabilityTaxCredit,
    ApplicantInformation,
    MaritalStatus,
    PartnerInformation,
    ContactInformation,
    CommunicationPreferences,
    DentalInsurance,
    HasFederalProvincialTerritorialBenefits,
    DentalBenefits,
}

impl ApplyStatePatch {
    /// Overlay every present field onto `state` (last write wins per field).
    pub fn apply_to(self, state: &mut ApplyState) {
        macro_rules! overlay {
            ($($field:ident),* $(,)?) => {
                $(if let Some(value) = self.$field {
                    state.$field = Some(value);
                })*
            };
        }
        overlay!(
            type_of_application,
            terms_and_conditions,
            tax_filing,
            date_of_birth,
            living_independently,
            disability_tax_credit,
            applicant_information,
            marital_status,
            partner_information,
            contact_information,
            communication_preferences,
            dental_insurance,
            has_federal_provincial_territorial_benefits,
            dental_benefits,
            submission_info,
        );
        if let Some(edit_mode) = self.edit_mode {
            state.edit_mode = edit_mode;
        }
        if let Some(children) = self.children {
            state.children = children;
        }
    }
}

impl ApplyField {
    pub fn clear(self, state: &mut ApplyState) {
        match self {
            Self::TypeOfApplication => state.type_of_application = None,
            Self::TermsAndConditions => state.terms_and_conditions = None,
            Self::TaxFiling => state.tax_filing = None,
            Self::DateOfBirth => state.date_of_birth = None,
            Self::LivingIndependently => state.living_independently = None,
            Self::DisabilityTaxCredit => state.disability_tax_credit = None,
            Self::ApplicantInformation => state.applicant_information = None,
            Self::MaritalStatus => state.marital_status = None,
            Self::PartnerInformation => state.partner_information = None,
            Self::ContactInformation => state.contact_information = None,
            Self::CommunicationPreferences => state.communication_preferences = None,
            Self::DentalInsurance => state.dental_insurance = None,
            Self::HasFederalProvincialTerritorialBenefits => {
                state.has_federal_provincial_territorial_benefits = None
            }
            Self::DentalBenefits => state.dental_benefits = None,
        }
    }
}

// ---------------------------------------------------------------------------
// Lifecycle manager
// ---------------------------------------------------------------------------

/// Start/load/save/clear of apply flows against a [`SessionStore`].
#[derive(Clone)]
pub struct StateLifecycle {
    clock: Arc<dyn Clock>,
    timeout: Duration,
}

impl StateLifecycle {
    pub fn new(clock: Arc<dyn Clock>, timeout_minutes: i64) -> Self {
        Self {
            clock,
            timeout: Duration::minutes(timeout_minutes),
        }
    }

    /// Today's date according to the lifecycle clock.
    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Write a fresh state for `flow_id`, seeded with `initial`.
    pub async fn start(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        initial: ApplyStatePatch,
    ) -> Result<ApplyState, CoreError> {
        let id = parse_flow_id(flow_id)?;
        let mut state = ApplyState::new(id, self.clock.now());
        initial.apply_to(&mut state);
        self.persist(store, &state).await?;

        tracing::info!(flow_id = %id, "Apply state started");
        Ok(state)
    }

    /// Load the state of `flow_id`.
    ///
    /// Missing, undecodable and expired entries are deleted and reported as
    /// [`CoreError::SessionMissing`] / [`CoreError::SessionExpired`].
    pub async fn load(&self, store: &dyn SessionStore, flow_id: &str) -> Result<ApplyState, CoreError> {
        let id = parse_flow_id(flow_id)?;
        let key = session_key(id);

        let Some(bytes) = store.get(&key).await? else {
            store.delete(&key).await?;
            tracing::info!(flow_id = %id, "Apply state not found in session");
            return Err(CoreError::SessionMissing { key });
        };

        let state: ApplyState = match serde_json::from_slice(&bytes) {
            Ok(state) => state,
            Err(err) => {
                store.delete(&key).await?;
                tracing::warn!(flow_id = %id, error = %err, "Discarded undecodable apply state");
                return Err(CoreError::SessionMissing { key });
            }
        };

        let idle = self.clock.now() - state.last_updated_on;
        if idle > self.timeout {
            store.delete(&key).await?;
            tracing::info!(
                flow_id = %id,
                idle_secs = idle.num_seconds(),
                "Apply state expired"
            );
            return Err(CoreError::SessionExpired {
                key,
                idle_minutes: idle.num_minutes(),
            });
        }

        Ok(state)
    }

    /// Merge `patch` into the stored state, drop `remove`, refresh
    /// `last_updated_on`, persist and return the new snapshot.
    pub async fn save(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        patch: ApplyStatePatch,
        remove: &[ApplyField],
    ) -> Result<ApplyState, CoreError> {
        let (state, ()) = self
            .update(store, flow_id, |state| {
                patch.apply_to(state);
                for field in remove {
                    field.clear(state);
                }
                Ok(())
            })
            .await?;

        tracing::debug!(
            flow_id = %state.id,
            removed = ?remove,
            edit_mode = state.edit_mode,
            "Apply state saved"
        );
        Ok(state)
    }

    /// Append a fresh child and return its id.
    pub async fn add_child(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
    ) -> Result<(ApplyState, ChildId), CoreError> {
        let (state, child_id) = self
            .update(store, flow_id, |state| {
                let child_id = ChildId::new_v4();
                state.children.push(ChildState::new(child_id));
                Ok(child_id)
            })
            .await?;

        tracing::info!(flow_id = %state.id, child_id = %child_id, "Child added");
        Ok((state, child_id))
    }

    /// Remove a child by id. Removing an unknown child is not an error.
    pub async fn remove_child(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        child_id: ChildId,
    ) -> Result<ApplyState, CoreError> {
        let (state, removed) = self
            .update(store, flow_id, |state| {
                let before = state.children.len();
                state.children.retain(|child| child.id != child_id);
                Ok(before != state.children.len())
            })
            .await?;

        tracing::info!(flow_id = %state.id, child_id = %child_id, removed, "Child removed");
        Ok(state)
    }

    /// Apply a child step's patch to child `child_id`.
    pub async fn save_child(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        child_id: ChildId,
        patch: ChildStatePatch,
    ) -> Result<ApplyState, CoreError> {
        let (state, ()) = self
            .update(store, flow_id, |state| {
                let child = state
                    .children
                    .iter_mut()
                    .find(|child| child.id == child_id)
                    .ok_or(CoreError::NotFound {
                        entity: "Child",
                        id: child_id,
                    })?;
                patch.apply_to(child);
                Ok(())
            })
            .await?;

        tracing::debug!(flow_id = %state.id, child_id = %child_id, "Child state saved");
        Ok(state)
    }

    /// Delete the stored state. Idempotent.
    pub async fn clear(&self, store: &dyn SessionStore, flow_id: &str) -> Result<(), CoreError> {
        let id = parse_flow_id(flow_id)?;
        store.delete(&session_key(id)).await?;
        tracing::info!(flow_id = %id, "Apply state cleared");
        Ok(())
    }

    /// Load and gate the review step.
    ///
    /// A reviewable state enters edit mode. When the state is not reviewable
    /// and was in edit mode, edit mode is switched off before the redirect is
    /// returned so an abandoned correction does not leave the flow stuck.
    pub async fn review(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
    ) -> Result<ReviewOutcome<ReviewedApplyState>, CoreError> {
        let state = self.load(store, flow_id).await?;
        match review::validate_for_review(&state, self.today()) {
            ReviewOutcome::Ok(mut reviewed) => {
                if !state.edit_mode {
                    self.set_edit_mode(store, flow_id, true).await?;
                    reviewed.edit_mode = true;
                }
                Ok(ReviewOutcome::Ok(reviewed))
            }
            ReviewOutcome::Redirect(target) => {
                if state.edit_mode && !state.is_submitted() {
                    self.set_edit_mode(store, flow_id, false).await?;
                }
                Ok(ReviewOutcome::Redirect(target))
            }
        }
    }

    pub async fn set_edit_mode(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        edit_mode: bool,
    ) -> Result<ApplyState, CoreError> {
        let patch = ApplyStatePatch {
            edit_mode: Some(edit_mode),
            ..Default::default()
        };
        self.save(store, flow_id, patch, &[]).await
    }

    /// Load, mutate, refresh `last_updated_on` and persist.
    ///
    /// The id is restored after `mutate` runs so it can never change.
    async fn update<T>(
        &self,
        store: &dyn SessionStore,
        flow_id: &str,
        mutate: impl FnOnce(&mut ApplyState) -> Result<T, CoreError>,
    ) -> Result<(ApplyState, T), CoreError> {
        let mut state = self.load(store, flow_id).await?;
        let id = state.id;
        let output = mutate(&mut state)?;
        state.id = id;
        state.last_updated_on = self.clock.now();
        self.persist(store, &state).await?;
        Ok((state, output))
    }

    async fn persist(&self, store: &dyn SessionStore, state: &ApplyState) -> Result<(), CoreError> {
        let bytes = serde_json::to_vec(state)
            .map_err(|e| CoreError::Internal(format!("Failed to encode apply state: {e}")))?;
        store.set(&session_key(state.id), bytes).await
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
