//! Boundary result type returned by every auth operation
//!
//! [`AuthResult`] is what the UI layer sees: a success flag, an optional
//! machine-readable [`ErrorCode`], a Dutch message and optional structured data.
//! It serializes to camelCase JSON.
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::normalize_provider_code;

/// Machine-readable error codes. Wire strings are kebab-case.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ErrorCode {
    AccountLocked,
    RateLimited,
    EmailNotVerified,
    AuthFailed,
    /// The identity provider has no configuration. The wire string keeps the
    /// name of the hosted backend the UI layer already matches on.
    #[serde(rename = "firebase-not-configured")]
    ProviderNotConfigured,
    WeakPassword,
    WeakDemoPassword,
    InvalidEmail,
    InvalidInput,
    UserNotFound,
    WrongPassword,
    InvalidCredential,
    UserDisabled,
    EmailAlreadyInUse,
    TooManyRequests,
    NetworkRequestFailed,
    InvalidActionCode,
    ExpiredActionCode,
    OperationInProgress,
    NotAuthenticated,
    SessionExpired,
    Unknown,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::AccountLocked => "account-locked",
            ErrorCode::RateLimited => "rate-limited",
            ErrorCode::EmailNotVerified => "email-not-verified",
            ErrorCode::AuthFailed => "auth-failed",
            ErrorCode::ProviderNotConfigured => "firebase-not-configured",
            ErrorCode::WeakPassword => "weak-password",
            ErrorCode::WeakDemoPassword => "weak-demo-password",
            ErrorCode::InvalidEmail => "invalid-email",
            ErrorCode::InvalidInput => "invalid-input",
            ErrorCode::UserNotFound => "user-not-found",
            ErrorCode::WrongPassword => "wrong-password",
            ErrorCode::InvalidCredential => "invalid-credential",
            ErrorCode::UserDisabled => "user-disabled",
            ErrorCode::EmailAlreadyInUse => "email-already-in-use",
            ErrorCode::TooManyRequests => "too-many-requests",
            ErrorCode::NetworkRequestFailed => "network-request-failed",
            ErrorCode::InvalidActionCode => "invalid-action-code",
            ErrorCode::ExpiredActionCode => "expired-action-code",
            ErrorCode::OperationInProgress => "operation-in-progress",
            ErrorCode::NotAuthenticated => "not-authenticated",
            ErrorCode::SessionExpired => "session-expired",
            ErrorCode::Unknown => "unknown",
        }
    }

    /// Translate a provider error code. Unrecognised codes map to [`ErrorCode::Unknown`].
    pub fn from_provider_code(code: &str) -> Self {
        match normalize_provider_code(code) {
            "user-not-found" => ErrorCode::UserNotFound,
            "wrong-password" => ErrorCode::WrongPassword,
            "invalid-credential" => ErrorCode::InvalidCredential,
            "invalid-email" => ErrorCode::InvalidEmail,
            "user-disabled" => ErrorCode::UserDisabled,
            "email-already-in-use" => ErrorCode::EmailAlreadyInUse,
            "weak-password" => ErrorCode::WeakPassword,
            "too-many-requests" => ErrorCode::TooManyRequests,
            "network-request-failed" => ErrorCode::NetworkRequestFailed,
            "invalid-action-code" => ErrorCode::InvalidActionCode,
            "expired-action-code" => ErrorCode::ExpiredActionCode,
            _ => ErrorCode::Unknown,
        }
    }

    /// The fixed Dutch message shown for this code.
    pub fn message(&self) -> &'static str {
        match self {
            ErrorCode::AccountLocked => {
                "Account tijdelijk geblokkeerd vanwege te veel mislukte inlogpogingen."
            }
            ErrorCode::RateLimited => "Te veel pogingen. Probeer het later opnieuw.",
            ErrorCode::EmailNotVerified => {
                "Je e-mailadres is nog niet geverifieerd. Controleer je inbox."
            }
            ErrorCode::AuthFailed => "Inloggen mislukt. Controleer je e-mailadres en wachtwoord.",
            ErrorCode::ProviderNotConfigured => {
                "Authenticatie is niet geconfigureerd. Neem contact op met de beheerder."
            }
            ErrorCode::WeakPassword => "Wachtwoord voldoet niet aan de beveiligingseisen.",
            ErrorCode::WeakDemoPassword => {
                "Demo-account gebruikt een zwak wachtwoord en is uitgeschakeld."
            }
            ErrorCode::InvalidEmail => "Ongeldig e-mailadres.",
            ErrorCode::InvalidInput => "Ongeldige invoer.",
            ErrorCode::UserNotFound => "Geen account gevonden met dit e-mailadres.",
            ErrorCode::WrongPassword => "Onjuist wachtwoord.",
            ErrorCode::InvalidCredential => "Ongeldige inloggegevens.",
            ErrorCode::UserDisabled => "Dit account is uitgeschakeld.",
            ErrorCode::EmailAlreadyInUse => "Dit e-mailadres is al in gebruik.",
            ErrorCode::TooManyRequests => "Te veel verzoeken. Probeer het later opnieuw.",
            ErrorCode::NetworkRequestFailed => {
                "Netwerkfout. Controleer je internetverbinding."
            }
            ErrorCode::InvalidActionCode => "Deze link is ongeldig of al gebruikt.",
            ErrorCode::ExpiredActionCode => "Deze link is verlopen. Vraag een nieuwe aan.",
            ErrorCode::OperationInProgress => "Er loopt al een aanvraag. Even geduld.",
            ErrorCode::NotAuthenticated => "Je bent niet ingelogd.",
            ErrorCode::SessionExpired => "Je sessie is verlopen. Log opnieuw in.",
            ErrorCode::Unknown => "Er is een onbekende fout opgetreden.",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of an auth operation.
///
/// Exactly one of success or `error_code` holds; the constructors enforce it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResult {
    is_success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_code: Option<ErrorCode>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    data: Option<Map<String, Value>>,
}

impl AuthResult {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            is_success: true,
            error_code: None,
            message: message.into(),
            data: None,
        }
    }

    pub fn success_with_data(message: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            data: Some(data),
            ..Self::success(message)
        }
    }

    /// A failure carrying the code's standard Dutch message.
    pub fn failure(code: ErrorCode) -> Self {
        Self::failure_with_message(code, code.message())
    }

    pub fn failure_with_message(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            is_success: false,
            error_code: Some(code),
            message: message.into(),
            data: None,
        }
    }

    pub fn failure_with_data(
        code: ErrorCode,
        message: impl Into<String>,
        data: Map<String, Value>,
    ) -> Self {
        Self {
            data: Some(data),
            ..Self::failure_with_message(code, message)
        }
    }

    pub fn is_success(&self) -> bool {
        self.is_success
    }

    pub fn error_code(&self) -> Option<ErrorCode> {
        self.error_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> Option<&Map<String, Value>> {
        self.data.as_ref()
    }

    /// Look up one entry of `data`.
    pub fn data_value(&self, key: &str) -> Option<&Value> {
        self.data.as_ref().and_then(|d| d.get(key))
    }
}
