use std::sync::Arc;

use cdcp_client::BenefitApplicationService;
use cdcp_core::apply::lifecycle::StateLifecycle;
use cdcp_core::clock::Clock;
use cdcp_core::mapping::BenefitCodes;

use crate::config::ServerConfig;
use crate::session::SessionRegistry;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Open HTTP sessions and their stored apply flows.
    pub sessions: Arc<SessionRegistry>,
    pub lifecycle: StateLifecycle,
    pub clock: Arc<dyn Clock>,
    pub codes: Arc<BenefitCodes>,
    /// Outbound client of the benefits system.
    pub benefit_api: Arc<dyn BenefitApplicationService>,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        clock: Arc<dyn Clock>,
        benefit_api: Arc<dyn BenefitApplicationService>,
    ) -> Self {
        let lifecycle = StateLifecycle::new(Arc::clone(&clock), config.session_timeout_minutes);
        let codes = Arc::new(config.codes.clone());
        let sessions = Arc::new(SessionRegistry::new(
            Arc::clone(&clock),
            config.http_session_idle_minutes,
        ));
        Self {
            config: Arc::new(config),
            sessions,
            lifecycle,
            clock,
            codes,
            benefit_api,
        }
    }
}
