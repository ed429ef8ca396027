use cdcp_core::apply::lifecycle::DEFAULT_SESSION_TIMEOUT_MINUTES;
use cdcp_core::mapping::BenefitCodes;

use crate::session::DEFAULT_HTTP_SESSION_IDLE_MINUTES;

/// Server configuration loaded from environment variables.
///
/// All fields have defaults suitable for local development. In production,
/// override via environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Bind address (default: `0.0.0.0`).
    pub host: String,
    /// Bind port (default: `3000`).
    pub port: u16,
    /// Allowed CORS origins, parsed from comma-separated `CORS_ORIGINS` env var.
    pub cors_origins: Vec<String>,
    /// HTTP request timeout in seconds (default: `30`).
    pub request_timeout_secs: u64,
    /// Upper bound on draining in-flight requests after a shutdown signal.
    pub shutdown_timeout_secs: u64,
    /// Inactivity window of an apply flow, in minutes (default: `20`).
    pub session_timeout_minutes: i64,
    /// Inactivity window of an HTTP session, in minutes (default: `60`).
    pub http_session_idle_minutes: i64,
    /// Downstream benefits system.
    pub benefit_api: BenefitApiConfig,
    /// Reference data ids sent to and received from the benefits system.
    pub codes: BenefitCodes,
}

/// Connection settings of the benefits system.
#[derive(Debug, Clone)]
pub struct BenefitApiConfig {
    pub base_uri: String,
    pub subscription_key: String,
    /// Outbound request timeout in seconds (default: `30`).
    pub timeout_secs: u64,
}

impl ServerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                       | Default                    |
    /// |-------------------------------|----------------------------|
    /// | `HOST`                        | `0.0.0.0`                  |
    /// | `PORT`                        | `3000`                     |
    /// | `CORS_ORIGINS`                | `http://localhost:5173`    |
    /// | `REQUEST_TIMEOUT_SECS`        | `30`                       |
    /// | `SHUTDOWN_TIMEOUT_SECS`       | `30`                       |
    /// | `SESSION_TIMEOUT_MINUTES`     | `20`                       |
    /// | `HTTP_SESSION_IDLE_MINUTES`   | `60`                       |
    ///
    /// See [`BenefitApiConfig::from_env`] and [`codes_from_env`] for the
    /// benefits system settings.
    pub fn from_env() -> Self {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".into());

        let port: u16 = std::env::var("PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .expect("PORT must be a valid u16");

        let cors_origins: Vec<String> = std::env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".into())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        let request_timeout_secs: u64 = std::env::var("REQUEST_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("REQUEST_TIMEOUT_SECS must be a valid u64");

        let shutdown_timeout_secs: u64 = std::env::var("SHUTDOWN_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("SHUTDOWN_TIMEOUT_SECS must be a valid u64");

        let session_timeout_minutes: i64 = std::env::var("SESSION_TIMEOUT_MINUTES")
            .unwrap_or_else(|_| DEFAULT_SESSION_TIMEOUT_MINUTES.to_string())
            .parse()
            .expect("SESSION_TIMEOUT_MINUTES must be a valid i64");
        assert!(
            session_timeout_minutes > 0,
            "SESSION_TIMEOUT_MINUTES must be positive"
        );

        let http_session_idle_minutes: i64 = std::env::var("HTTP_SESSION_IDLE_MINUTES")
            .unwrap_or_else(|_| DEFAULT_HTTP_SESSION_IDLE_MINUTES.to_string())
            .parse()
            .expect("HTTP_SESSION_IDLE_MINUTES must be a valid i64");
        assert!(
            http_session_idle_minutes > 0,
            "HTTP_SESSION_IDLE_MINUTES must be positive"
        );

        Self {
            host,
            port,
            cors_origins,
            request_timeout_secs,
            shutdown_timeout_secs,
            session_timeout_minutes,
            http_session_idle_minutes,
            benefit_api: BenefitApiConfig::from_env(),
            codes: codes_from_env(),
        }
    }
}

impl BenefitApiConfig {
    /// | Env Var                           | Default                  |
    /// |-----------------------------------|--------------------------|
    /// | `BENEFIT_API_BASE_URI`            | `http://localhost:8080`  |
    /// | `BENEFIT_API_SUBSCRIPTION_KEY`    | (empty)                  |
    /// | `BENEFIT_API_TIMEOUT_SECS`        | `30`                     |
    pub fn from_env() -> Self {
        let base_uri =
            std::env::var("BENEFIT_API_BASE_URI").unwrap_or_else(|_| "http://localhost:8080".into());

        let subscription_key = std::env::var("BENEFIT_API_SUBSCRIPTION_KEY").unwrap_or_default();
        if subscription_key.is_empty() {
            tracing::warn!("BENEFIT_API_SUBSCRIPTION_KEY is not set; benefit API calls will be rejected upstream");
        }

        let timeout_secs: u64 = std::env::var("BENEFIT_API_TIMEOUT_SECS")
            .unwrap_or_else(|_| "30".into())
            .parse()
            .expect("BENEFIT_API_TIMEOUT_SECS must be a valid u64");

        Self {
            base_uri,
            subscription_key,
            timeout_secs,
        }
    }
}

/// Application category ids, overridable per environment.
///
/// | Env Var                                  | Default     |
/// |------------------------------------------|-------------|
/// | `APPLICANT_CATEGORY_CODE_INDIVIDUAL`     | `775170000` |
/// | `APPLICANT_CATEGORY_CODE_FAMILY`         | `775170001` |
/// | `APPLICANT_CATEGORY_CODE_DEPENDENT_ONLY` | `775170002` |
pub fn codes_from_env() -> BenefitCodes {
    let defaults = BenefitCodes::default();
    let var = |name: &str, default: String| std::env::var(name).unwrap_or(default);

    BenefitCodes {
        applicant_category_individual: var(
            "APPLICANT_CATEGORY_CODE_INDIVIDUAL",
            defaults.applicant_category_individual,
        ),
        applicant_category_family: var(
            "APPLICANT_CATEGORY_CODE_FAMILY",
            defaults.applicant_category_family,
        ),
        applicant_category_dependent_only: var(
            "APPLICANT_CATEGORY_CODE_DEPENDENT_ONLY",
            defaults.applicant_category_dependent_only,
        ),
        ..defaults
    }
}
