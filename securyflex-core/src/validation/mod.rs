//! Credential and identifier validation
//!
//! Every check in this module is a pure function. Rules are enumerated one by one
//! instead of being delegated to a validation library so that the UI can show
//! every violated rule at once, each with its own Dutch message.
//!
//! - [`password`]: password policy, common-password detection and strength scoring
//! - [`identifiers`]: KvK, postal code, WPBR and beveiligingspas numbers
use regex::Regex;
use std::sync::LazyLock;

use crate::error::ValidationError;

pub mod identifiers;
pub mod password;

pub use identifiers::{
    IdentifierValidation, KvkNumber, PasNumber, PostalCode, WpbrNumber, format_dutch_postal_code,
    format_kvk_number, format_wpbr_number, is_valid_beveiligingspas_number,
    is_valid_dutch_postal_code, is_valid_kvk, is_valid_wpbr_number,
    validate_beveiligingspas_number_detailed, validate_dutch_postal_code_detailed,
    validate_kvk_detailed, validate_wpbr_number_detailed,
};
pub use password::{
    MAX_PASSWORD_LENGTH, MIN_PASSWORD_LENGTH, PasswordValidationResult,
    calculate_password_strength, is_common_password, is_valid_password, strength_label,
    validate_password_detailed,
};

/// Lazy-loaded email validation regex
///
/// Permissive on the local part (`+`, `.`, `%`, `_`, `-`), strict on the domain
/// labels, and requires an alphabetic top-level domain.
static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    )
    .expect("Invalid email regex pattern")
});

const MAX_EMAIL_LENGTH: usize = 254;
const MAX_NAME_LENGTH: usize = 100;

/// Returns `true` if `email` looks like a deliverable address.
///
/// # Examples
///
/// ```rust
/// use securyflex_core::validation::is_valid_email;
///
/// assert!(is_valid_email("jan.de.vries+werk@securyflex.nl"));
/// assert!(!is_valid_email("jan..devries@securyflex.nl"));
/// ```
pub fn is_valid_email(email: &str) -> bool {
    if email.is_empty() || email.len() > MAX_EMAIL_LENGTH {
        return false;
    }

    if email.contains("..") {
        return false;
    }

    let Some((local, _)) = email.split_once('@') else {
        return false;
    };
    if local.starts_with('.') || local.ends_with('.') {
        return false;
    }

    EMAIL_REGEX.is_match(email)
}

/// Validates a display name
///
/// - Cannot be empty or whitespace only
/// - Maximum 100 characters
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::InvalidName(
            "Naam mag niet leeg zijn".to_string(),
        ));
    }

    if name.chars().count() > MAX_NAME_LENGTH {
        return Err(ValidationError::InvalidName(
            "Naam mag maximaal 100 tekens bevatten".to_string(),
        ));
    }

    Ok(())
}

/// Normalize an email address for use as a tracking key.
pub fn normalize_identifier(email: &str) -> String {
    email.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_valid_email_valid() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("test.email+tag@domain.co.uk"));
        assert!(is_valid_email("user123@test-domain.nl"));
        assert!(is_valid_email("a@b.nl"));
    }

    #[test]
    fn test_is_valid_email_invalid() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("invalid-email"));
        assert!(!is_valid_email("@domain.com"));
        assert!(!is_valid_email("user@"));
        assert!(!is_valid_email("user@domain"));
        assert!(!is_valid_email("user..name@domain.com"));
        assert!(!is_valid_email("user@domain..com"));
        assert!(!is_valid_email(".user@domain.com"));
        assert!(!is_valid_email("user.@domain.com"));
        assert!(!is_valid_email("user@-domain.com"));

        let long_email = format!("{}@example.com", "a".repeat(250));
        assert!(!is_valid_email(&long_email));
    }

    #[test]
    fn test_validate_name() {
        assert!(validate_name("Jan de Vries").is_ok());
        assert!(validate_name("José María García-López").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name(&"a".repeat(101)).is_err());
    }

    #[test]
    fn test_normalize_identifier() {
        assert_eq!(normalize_identifier("  Test@Example.NL "), "test@example.nl");
    }
}
