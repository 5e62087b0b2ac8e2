use thiserror::Error;

pub type Result<T> = std::result::Result<T, InjectError>;

#[derive(Debug, Error)]
pub enum InjectError {
    /// The engine was used before a container was configured.
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// An injectable member could not be satisfied by any resolution path.
    #[error("Could not resolve dependency of type {type_name} for member `{member}` in {owner}")]
    Resolution {
        member: String,
        type_name: String,
        owner: String,
    },

    /// A scoped service was requested from the root provider.
    #[error("Cannot resolve scoped service {type_name} from the root provider")]
    LifetimeMismatch { type_name: String },

    #[error("Dependency not found: {type_name}")]
    DependencyNotFound { type_name: String },

    #[error("Failed to downcast type: {type_name}")]
    DowncastFailed { type_name: String },

    #[error("Ambiguous implementation for {interface}: {}", candidates.join(", "))]
    AmbiguousImplementation {
        interface: String,
        candidates: Vec<String>,
    },

    #[error("Scope {scope} has already been disposed")]
    ScopeDisposed { scope: String },

    #[error("Internal error: {0}")]
    Internal(String),
}

impl InjectError {
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn resolution(
        member: impl Into<String>,
        type_name: impl Into<String>,
        owner: impl Into<String>,
    ) -> Self {
        Self::Resolution {
            member: member.into(),
            type_name: type_name.into(),
            owner: owner.into(),
        }
    }

    pub(crate) fn unconfigured() -> Self {
        Self::configuration("Factory is not configured. Call Factory::configure() first.")
    }

    /// True for the container signal that triggers the request-scope fallback.
    pub fn is_lifetime_mismatch(&self) -> bool {
        matches!(self, Self::LifetimeMismatch { .. })
    }

    pub fn is_configuration(&self) -> bool {
        matches!(self, Self::Configuration { .. })
    }

    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::Resolution { .. })
    }
}

impl axum::response::IntoResponse for InjectError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::INTERNAL_SERVER_ERROR;
        let message = match &self {
            InjectError::Internal(msg) => msg.clone(),
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_message_names_member_type_and_owner() {
        let err = InjectError::resolution("repository", "dyn app::Repository", "app::UserService");
        let message = err.to_string();
        assert!(message.contains("repository"));
        assert!(message.contains("dyn app::Repository"));
        assert!(message.contains("app::UserService"));
        assert!(err.is_resolution());
    }

    #[test]
    fn test_lifetime_mismatch_is_distinguishable() {
        let err = InjectError::LifetimeMismatch {
            type_name: "Session".into(),
        };
        assert!(err.is_lifetime_mismatch());
        assert!(!InjectError::Internal("x".into()).is_lifetime_mismatch());
    }
}
