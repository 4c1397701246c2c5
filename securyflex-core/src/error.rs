use thiserror::Error;

/// Namespace some identity providers put in front of their error codes.
const PROVIDER_CODE_NAMESPACE: &str = "auth/";

/// Strip the provider namespace from an error code, e.g. `auth/wrong-password`.
pub fn normalize_provider_code(code: &str) -> &str {
    code.strip_prefix(PROVIDER_CODE_NAMESPACE).unwrap_or(code)
}

/// Errors reported by an [`IdentityProvider`](crate::providers::IdentityProvider).
///
/// Rejections carry the provider's machine-readable code (for example
/// `wrong-password` or `email-already-in-use`), which the orchestrator
/// translates through [`ErrorCode::from_provider_code`](crate::ErrorCode::from_provider_code).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    #[error("Provider rejected the request ({code}): {message}")]
    Rejected { code: String, message: String },

    #[error("Identity provider is not configured")]
    NotConfigured,

    #[error("Identity provider unavailable: {0}")]
    Unavailable(String),
}

impl ProviderError {
    pub fn rejected(code: impl Into<String>) -> Self {
        let code = code.into();
        Self::Rejected {
            message: code.clone(),
            code,
        }
    }

    /// The provider code without namespace, if the provider answered with one.
    pub fn code(&self) -> Option<&str> {
        match self {
            ProviderError::Rejected { code, .. } => Some(normalize_provider_code(code)),
            _ => None,
        }
    }

    /// Whether this error means the supplied credentials were wrong, as opposed to
    /// the provider being unreachable or throttling us.
    pub fn is_credential_rejection(&self) -> bool {
        self.code()
            .is_some_and(|code| !matches!(code, "network-request-failed" | "too-many-requests"))
    }
}

/// Errors reported by a [`ProfileStore`](crate::providers::ProfileStore).
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Record not found")]
    NotFound,
}

#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Invalid name: {0}")]
    InvalidName(String),

    #[error("Invalid field: {0}")]
    InvalidField(String),
}

#[derive(Debug, Error)]
pub enum EventError {
    #[error("Event bus error: {0}")]
    BusError(String),

    #[error("Event handler error: {0}")]
    HandlerError(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        assert_eq!(StorageError::NotFound.to_string(), "Record not found");
        assert_eq!(
            ValidationError::InvalidField("KvK".to_string()).to_string(),
            "Invalid field: KvK"
        );
        assert_eq!(
            ProviderError::rejected("wrong-password").to_string(),
            "Provider rejected the request (wrong-password): wrong-password"
        );
    }

    #[test]
    fn test_provider_error_codes() {
        let rejected = ProviderError::rejected("wrong-password");
        assert_eq!(rejected.code(), Some("wrong-password"));
        assert!(rejected.is_credential_rejection());

        assert!(!ProviderError::rejected("network-request-failed").is_credential_rejection());
        assert!(!ProviderError::rejected("too-many-requests").is_credential_rejection());
        assert!(!ProviderError::NotConfigured.is_credential_rejection());
        assert_eq!(ProviderError::Unavailable("timeout".into()).code(), None);
    }

    #[test]
    fn test_namespaced_provider_codes() {
        let rejected = ProviderError::rejected("auth/wrong-password");
        assert_eq!(rejected.code(), Some("wrong-password"));
        assert!(rejected.is_credential_rejection());

        assert!(!ProviderError::rejected("auth/network-request-failed").is_credential_rejection());
        assert!(!ProviderError::rejected("auth/too-many-requests").is_credential_rejection());
        assert_eq!(normalize_provider_code("auth/user-not-found"), "user-not-found");
        assert_eq!(normalize_provider_code("user-not-found"), "user-not-found");
    }
}
