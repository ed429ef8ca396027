//! Outbound client for the downstream benefits system.
//!
//! [`BenefitApplicationService`] is the seam the API layer depends on;
//! [`api::BenefitApplicationApi`] is its HTTP implementation.

pub mod api;
pub mod service;

pub use api::{BenefitApiError, BenefitApplicationApi};
pub use service::BenefitApplicationService;
