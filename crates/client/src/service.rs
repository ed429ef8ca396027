use async_trait::async_trait;
use cdcp_core::mapping::entity::{BenefitApplicationEntity, BenefitApplicationResponseEntity};

use crate::api::BenefitApiError;

/// Submission and retrieval of benefit applications.
#[async_trait]
pub trait BenefitApplicationService: Send + Sync {
    /// Submit a new application. Returns the upstream receipt.
    async fn submit_application(
        &self,
        application: &BenefitApplicationEntity,
    ) -> Result<BenefitApplicationResponseEntity, BenefitApiError>;

    /// Fetch the application on file for a SIN, if any.
    async fn find_client_application(
        &self,
        social_insurance_number: &str,
    ) -> Result<Option<BenefitApplicationEntity>, BenefitApiError>;
}
