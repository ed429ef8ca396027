use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: &'static str, id: Uuid },

    #[error("Validation failed: {0}")]
    Validation(String),

    /// The flow id in the request is not a UUID. The caller must restart the flow.
    #[error("Invalid flow identifier: {0}")]
    InvalidIdentifier(String),

    /// No state is stored under the flow's session key.
    #[error("No apply state stored under session key {key}")]
    SessionMissing { key: String },

    /// The stored state has been idle longer than the inactivity window.
    #[error("Apply state under session key {key} expired after {idle_minutes} minutes of inactivity")]
    SessionExpired { key: String, idle_minutes: i64 },

    /// The submitted CSRF token does not match the session token.
    #[error("CSRF token mismatch")]
    CsrfMismatch,

    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Whether the error means the user has to start the flow over.
    pub fn requires_restart(&self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifier(_) | Self::SessionMissing { .. } | Self::SessionExpired { .. }
        )
    }
}
