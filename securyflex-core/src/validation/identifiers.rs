//! Dutch business identifiers
//!
//! | Identifier      | Canonical form | Accepted input                                 |
//! | --------------- | -------------- | ---------------------------------------------- |
//! | KvK number      | `12345678`     | 8 digits, all other characters ignored         |
//! | Postal code     | `1234 AB`      | 4 digits (no leading 0) + 2 letters, any case  |
//! | WPBR number     | `WPBR-123456`  | `WPBR-` + 6 digits, any case, spaces ignored   |
//! | Beveiligingspas | `1234567`      | 7 digits, all other characters ignored         |
//!
//! Each identifier has a boolean check (`is_valid_*`), a detailed check returning
//! Dutch error messages plus the canonical form, and a parsed newtype whose
//! `Display` is the canonical form.
use std::{fmt, str::FromStr, sync::LazyLock};

use regex::Regex;
use serde::Serialize;

use crate::error::ValidationError;

static KVK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{8}$").expect("Invalid KvK regex pattern"));
static POSTAL_CODE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[1-9][0-9]{3}[A-Z]{2}$").expect("Invalid postal code regex pattern")
});
static WPBR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^WPBR-[0-9]{6}$").expect("Invalid WPBR regex pattern"));
static PAS_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[0-9]{7}$").expect("Invalid pas regex pattern"));

/// Result of a detailed identifier check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentifierValidation {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub formatted: Option<String>,
}

impl<T: fmt::Display> From<Result<T, Vec<String>>> for IdentifierValidation {
    fn from(result: Result<T, Vec<String>>) -> Self {
        match result {
            Ok(value) => Self {
                is_valid: true,
                errors: Vec::new(),
                formatted: Some(value.to_string()),
            },
            Err(errors) => Self {
                is_valid: false,
                errors,
                formatted: None,
            },
        }
    }
}

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn invalid_field(errors: Vec<String>) -> ValidationError {
    ValidationError::InvalidField(errors.join("; "))
}

/// A Chamber of Commerce (KvK) registration number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct KvkNumber(String);

impl KvkNumber {
    pub fn parse_detailed(input: &str) -> Result<Self, Vec<String>> {
        let digits = digits_only(input);
        if digits.is_empty() {
            return Err(vec!["KvK-nummer is verplicht".to_string()]);
        }

        if !KVK_REGEX.is_match(&digits) {
            return Err(vec!["KvK-nummer moet uit precies 8 cijfers bestaan".to_string()]);
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for KvkNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_detailed(s).map_err(invalid_field)
    }
}

impl fmt::Display for KvkNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A Dutch postal code, displayed as `1234 AB`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PostalCode {
    digits: String,
    letters: String,
}

impl PostalCode {
    pub fn parse_detailed(input: &str) -> Result<Self, Vec<String>> {
        let compact: String = input
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        if compact.is_empty() {
            return Err(vec!["Postcode is verplicht".to_string()]);
        }

        if !POSTAL_CODE_REGEX.is_match(&compact) {
            let mut errors = vec!["Postcode moet het formaat 1234 AB hebben".to_string()];
            if compact.starts_with('0') {
                errors.push("Postcode mag niet met een 0 beginnen".to_string());
            }
            return Err(errors);
        }

        let (digits, letters) = compact.split_at(4);
        Ok(Self {
            digits: digits.to_string(),
            letters: letters.to_string(),
        })
    }
}

impl FromStr for PostalCode {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_detailed(s).map_err(invalid_field)
    }
}

impl fmt::Display for PostalCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.digits, self.letters)
    }
}

/// A WPBR certification number (`WPBR-123456`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WpbrNumber(String);

impl WpbrNumber {
    pub fn parse_detailed(input: &str) -> Result<Self, Vec<String>> {
        let compact: String = input
            .trim()
            .chars()
            .filter(|c| !c.is_whitespace())
            .flat_map(char::to_uppercase)
            .collect();
        if compact.is_empty() {
            return Err(vec!["WPBR-nummer is verplicht".to_string()]);
        }

        if WPBR_REGEX.is_match(&compact) {
            return Ok(Self(compact));
        }

        let mut errors = Vec::new();
        let rest = match compact.strip_prefix("WPBR-") {
            Some(rest) => rest,
            None => {
                errors.push("WPBR-nummer moet beginnen met 'WPBR-'".to_string());
                compact.trim_start_matches("WPBR")
            }
        };
        if rest.len() != 6 || !rest.chars().all(|c| c.is_ascii_digit()) {
            errors.push("WPBR-nummer moet eindigen op precies 6 cijfers".to_string());
        }
        Err(errors)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for WpbrNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_detailed(s).map_err(invalid_field)
    }
}

impl fmt::Display for WpbrNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A beveiligingspas (security guard identity pass) number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PasNumber(String);

impl PasNumber {
    pub fn parse_detailed(input: &str) -> Result<Self, Vec<String>> {
        let digits = digits_only(input);
        if digits.is_empty() {
            return Err(vec!["Passnummer is verplicht".to_string()]);
        }

        if !PAS_REGEX.is_match(&digits) {
            return Err(vec!["Passnummer moet uit precies 7 cijfers bestaan".to_string()]);
        }

        Ok(Self(digits))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for PasNumber {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_detailed(s).map_err(invalid_field)
    }
}

impl fmt::Display for PasNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

pub fn is_valid_kvk(input: &str) -> bool {
    KvkNumber::parse_detailed(input).is_ok()
}

pub fn is_valid_dutch_postal_code(input: &str) -> bool {
    PostalCode::parse_detailed(input).is_ok()
}

pub fn is_valid_wpbr_number(input: &str) -> bool {
    WpbrNumber::parse_detailed(input).is_ok()
}

pub fn is_valid_beveiligingspas_number(input: &str) -> bool {
    PasNumber::parse_detailed(input).is_ok()
}

pub fn validate_kvk_detailed(input: &str) -> IdentifierValidation {
    KvkNumber::parse_detailed(input).into()
}

pub fn validate_dutch_postal_code_detailed(input: &str) -> IdentifierValidation {
    PostalCode::parse_detailed(input).into()
}

pub fn validate_wpbr_number_detailed(input: &str) -> IdentifierValidation {
    WpbrNumber::parse_detailed(input).into()
}

pub fn validate_beveiligingspas_number_detailed(input: &str) -> IdentifierValidation {
    PasNumber::parse_detailed(input).into()
}

/// Canonical KvK number, or `None` if the input is not a valid KvK number.
pub fn format_kvk_number(input: &str) -> Option<String> {
    KvkNumber::parse_detailed(input).ok().map(|k| k.to_string())
}

/// Canonical `1234 AB` postal code, or `None` if the input is not valid.
pub fn format_dutch_postal_code(input: &str) -> Option<String> {
    PostalCode::parse_detailed(input).ok().map(|p| p.to_string())
}

/// Canonical `WPBR-123456` number, or `None` if the input is not valid.
pub fn format_wpbr_number(input: &str) -> Option<String> {
    WpbrNumber::parse_detailed(input).ok().map(|w| w.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kvk() {
        assert!(is_valid_kvk("12345678"));
        assert!(is_valid_kvk("1234 5678"));
        assert!(is_valid_kvk("12.34.56.78"));
        assert!(!is_valid_kvk("1234567"));
        assert!(!is_valid_kvk("123456789"));
        assert!(!is_valid_kvk("1234567a"));
        assert!(!is_valid_kvk(""));
        assert!(!is_valid_kvk("KvK"));
    }

    #[test]
    fn test_kvk_ignores_non_digits() {
        assert!(is_valid_kvk("KvK 12345678"));
        assert!(is_valid_kvk("kvk: 1234-5678"));
        assert_eq!(format_kvk_number("KvK nr. 12345678").as_deref(), Some("12345678"));
    }

    #[test]
    fn test_kvk_detailed() {
        let result = validate_kvk_detailed("1234 5678");
        assert!(result.is_valid);
        assert_eq!(result.formatted.as_deref(), Some("12345678"));

        let result = validate_kvk_detailed("12ab");
        assert!(!result.is_valid);
        assert_eq!(
            result.errors,
            vec!["KvK-nummer moet uit precies 8 cijfers bestaan".to_string()]
        );
        assert!(result.formatted.is_none());

        let result = validate_kvk_detailed("   ");
        assert_eq!(result.errors, vec!["KvK-nummer is verplicht".to_string()]);
    }

    #[test]
    fn test_kvk_round_trip() {
        for formatted in ["12345678", "00000001", "98765432"] {
            let parsed: KvkNumber = formatted.parse().unwrap();
            assert_eq!(format_kvk_number(&parsed.to_string()).as_deref(), Some(formatted));
        }
    }

    #[test]
    fn test_postal_code() {
        assert!(is_valid_dutch_postal_code("1234AB"));
        assert!(is_valid_dutch_postal_code("1234 ab"));
        assert!(is_valid_dutch_postal_code(" 9999 zz "));
        assert!(!is_valid_dutch_postal_code("0123AB"));
        assert!(!is_valid_dutch_postal_code("123AB"));
        assert!(!is_valid_dutch_postal_code("1234A"));
        assert!(!is_valid_dutch_postal_code("1234ABC"));
        assert!(!is_valid_dutch_postal_code(""));
    }

    #[test]
    fn test_postal_code_detailed() {
        let result = validate_dutch_postal_code_detailed("1012ab");
        assert!(result.is_valid);
        assert_eq!(result.formatted.as_deref(), Some("1012 AB"));

        let result = validate_dutch_postal_code_detailed("0123AB");
        assert!(!result.is_valid);
        assert_eq!(result.errors.len(), 2);
    }

    #[test]
    fn test_postal_code_round_trip() {
        for formatted in ["1012 AB", "9999 ZZ", "3011 XK"] {
            let parsed: PostalCode = formatted.parse().unwrap();
            assert_eq!(
                format_dutch_postal_code(&parsed.to_string()).as_deref(),
                Some(formatted)
            );
        }
    }

    #[test]
    fn test_wpbr() {
        assert!(is_valid_wpbr_number("WPBR-123456"));
        assert!(is_valid_wpbr_number("wpbr-123456"));
        assert!(is_valid_wpbr_number(" WPBR- 123456 "));
        assert!(!is_valid_wpbr_number("123456"));
        assert!(!is_valid_wpbr_number("WPBR-12345"));
        assert!(!is_valid_wpbr_number("WPBR123456"));
        assert_eq!(format_wpbr_number("wpbr-000042").as_deref(), Some("WPBR-000042"));
    }

    #[test]
    fn test_wpbr_detailed() {
        let result = validate_wpbr_number_detailed("123456");
        assert!(!result.is_valid);
        assert_eq!(result.errors, vec!["WPBR-nummer moet beginnen met 'WPBR-'".to_string()]);

        let result = validate_wpbr_number_detailed("WPBR-12");
        assert_eq!(
            result.errors,
            vec!["WPBR-nummer moet eindigen op precies 6 cijfers".to_string()]
        );
    }

    #[test]
    fn test_beveiligingspas() {
        assert!(is_valid_beveiligingspas_number("1234567"));
        assert!(is_valid_beveiligingspas_number("123-4567"));
        assert!(!is_valid_beveiligingspas_number("123456"));
        assert!(!is_valid_beveiligingspas_number("12345678"));
        assert!(!is_valid_beveiligingspas_number("12345a7"));
        assert!(is_valid_beveiligingspas_number("pas 1234567"));

        let result = validate_beveiligingspas_number_detailed("12 34 567");
        assert_eq!(result.formatted.as_deref(), Some("1234567"));
    }

    #[test]
    fn test_from_str_error() {
        let err = "abc".parse::<KvkNumber>().unwrap_err();
        assert!(matches!(err, ValidationError::InvalidField(_)));
    }
}
