//! Password policy and strength scoring
//!
//! The policy requires at least 12 characters with an uppercase letter, a
//! lowercase letter, a digit and a special character, and rejects common
//! passwords. [`validate_password_detailed`] reports every violated rule;
//! [`is_valid_password`] only answers yes or no.
use serde::Serialize;

pub const MIN_PASSWORD_LENGTH: usize = 12;
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Compared against the password lowercased with everything but letters and
/// digits removed.
const COMMON_PASSWORDS: &[&str] = &[
    "password",
    "password1",
    "password12",
    "password123",
    "passw0rd",
    "p4ssw0rd",
    "123456",
    "12345678",
    "123456789",
    "1234567890",
    "111111",
    "000000",
    "qwerty",
    "qwerty123",
    "abc123",
    "admin",
    "admin123",
    "letmein",
    "welcome",
    "welcome123",
    "welkom",
    "welkom01",
    "welkom123",
    "wachtwoord",
    "wachtwoord1",
    "wachtwoord123",
    "beveiliging",
    "beveiliging123",
    "securyflex",
    "securyflex123",
    "monkey",
    "dragon",
    "iloveyou",
    "sunshine",
    "football",
    "trustno1",
];

/// Case-sensitive fragments that make any password common.
const COMMON_FRAGMENTS: &[&str] = &["123456", "password", "qwerty"];

const KEYBOARD_RUNS: &[&str] = &[
    "qwe", "wer", "ert", "rty", "tyu", "yui", "uio", "iop", "asd", "sdf", "dfg", "fgh", "ghj",
    "hjk", "jkl", "zxc", "xcv", "cvb", "vbn", "bnm",
];

const SEQUENTIAL_PENALTY: i32 = 15;
const REPEAT_PENALTY: i32 = 10;

/// Outcome of [`validate_password_detailed`].
///
/// `is_valid` is derived from `errors`, so the two can never disagree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordValidationResult {
    is_valid: bool,
    errors: Vec<String>,
    strength: u8,
}

impl PasswordValidationResult {
    fn new(errors: Vec<String>, strength: u8) -> Self {
        Self {
            is_valid: errors.is_empty(),
            errors,
            strength,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn strength(&self) -> u8 {
        self.strength
    }

    pub fn into_errors(self) -> Vec<String> {
        self.errors
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct CharacterClasses {
    upper: bool,
    lower: bool,
    digit: bool,
    special: bool,
}

impl CharacterClasses {
    fn of(password: &str) -> Self {
        password.chars().fold(Self::default(), |mut classes, c| {
            if c.is_uppercase() {
                classes.upper = true;
            } else if c.is_lowercase() {
                classes.lower = true;
            } else if c.is_ascii_digit() {
                classes.digit = true;
            } else if !c.is_alphanumeric() && !c.is_whitespace() {
                classes.special = true;
            }
            classes
        })
    }

    fn count(&self) -> i32 {
        [self.upper, self.lower, self.digit, self.special]
            .iter()
            .filter(|present| **present)
            .count() as i32
    }
}

/// Returns `true` if the password satisfies the full password policy.
///
/// ```rust
/// use securyflex_core::validation::is_valid_password;
///
/// assert!(is_valid_password("Password1234!"));
/// assert!(!is_valid_password("Password123!"));
/// ```
pub fn is_valid_password(password: &str) -> bool {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return false;
    }

    let classes = CharacterClasses::of(password);
    classes.upper
        && classes.lower
        && classes.digit
        && classes.special
        && !is_common_password(password)
}

/// Returns `true` for deny-listed passwords and passwords containing a well known
/// fragment such as `123456`.
pub fn is_common_password(password: &str) -> bool {
    let normalized: String = password
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .collect();

    COMMON_PASSWORDS.contains(&normalized.as_str())
        || COMMON_FRAGMENTS
            .iter()
            .any(|fragment| password.contains(fragment))
}

/// Check every password rule and collect a Dutch message for each violation.
///
/// Rules are reported in a fixed order: minimum length, maximum length,
/// uppercase, lowercase, digit, special character, common password.
pub fn validate_password_detailed(password: &str) -> PasswordValidationResult {
    let length = password.chars().count();
    let classes = CharacterClasses::of(password);
    let mut errors = Vec::new();

    if length < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Wachtwoord moet minimaal {MIN_PASSWORD_LENGTH} tekens bevatten"
        ));
    }
    if length > MAX_PASSWORD_LENGTH {
        errors.push(format!(
            "Wachtwoord mag maximaal {MAX_PASSWORD_LENGTH} tekens bevatten"
        ));
    }
    if !classes.upper {
        errors.push("Wachtwoord moet minimaal één hoofdletter bevatten".to_string());
    }
    if !classes.lower {
        errors.push("Wachtwoord moet minimaal één kleine letter bevatten".to_string());
    }
    if !classes.digit {
        errors.push("Wachtwoord moet minimaal één cijfer bevatten".to_string());
    }
    if !classes.special {
        errors.push(
            "Wachtwoord moet minimaal één speciaal teken bevatten (!@#$%^&* etc.)".to_string(),
        );
    }
    if is_common_password(password) {
        errors.push("Dit wachtwoord is te algemeen, kies een uniek wachtwoord".to_string());
    }

    PasswordValidationResult::new(errors, calculate_password_strength(password))
}

/// Score a password from 0 to 100.
///
/// - +10 for each length milestone reached (8, 12, 16, 20 characters)
/// - +10 for each character class present
/// - +5 per distinct class present
/// - common passwords keep 30% of their score
/// - -15 for a sequential run such as `123`, `abc` or `qwe`
/// - -10 for three or more identical characters in a row
pub fn calculate_password_strength(password: &str) -> u8 {
    if password.is_empty() {
        return 0;
    }

    let length = password.chars().count();
    let classes = CharacterClasses::of(password);

    let mut score: i32 = [8, 12, 16, 20]
        .iter()
        .filter(|milestone| length >= **milestone)
        .count() as i32
        * 10;

    score += classes.count() * 10;
    score += classes.count() * 5;

    if is_common_password(password) {
        score = score * 3 / 10;
    }
    if has_sequential_run(password) {
        score -= SEQUENTIAL_PENALTY;
    }
    if has_repeated_run(password) {
        score -= REPEAT_PENALTY;
    }

    score.clamp(0, 100) as u8
}

/// Dutch label for a strength score, as shown next to the strength meter.
pub fn strength_label(strength: u8) -> &'static str {
    match strength {
        0..=19 => "Zeer zwak",
        20..=39 => "Zwak",
        40..=59 => "Redelijk",
        60..=79 => "Sterk",
        _ => "Zeer sterk",
    }
}

fn has_sequential_run(password: &str) -> bool {
    let lowered: Vec<char> = password.chars().flat_map(char::to_lowercase).collect();

    let ascending = lowered.windows(3).any(|w| {
        let same_kind = w.iter().all(char::is_ascii_digit)
            || w.iter().all(char::is_ascii_lowercase);
        same_kind && w[1] as u32 == w[0] as u32 + 1 && w[2] as u32 == w[1] as u32 + 1
    });
    if ascending {
        return true;
    }

    let lowered: String = lowered.into_iter().collect();
    KEYBOARD_RUNS.iter().any(|run| lowered.contains(run))
}

fn has_repeated_run(password: &str) -> bool {
    let chars: Vec<char> = password.chars().collect();
    chars.windows(3).any(|w| w[0] == w[1] && w[1] == w[2])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_passwords_are_invalid() {
        for password in ["", "Aa1!", "Abcdef1!xyz", "Zz9#Zz9#Zz9"] {
            assert!(password.chars().count() < MIN_PASSWORD_LENGTH);
            assert!(!is_valid_password(password), "{password} should be invalid");
        }
    }

    #[test]
    fn test_spec_examples() {
        assert!(!is_valid_password("Password123!"));

        assert!(is_valid_password("Password1234!"));
        assert!(calculate_password_strength("Password1234!") > 60);
    }

    #[test]
    fn test_valid_password() {
        assert!(is_valid_password("Beveil!ger2024x"));
        assert!(is_valid_password("Tr0mpet&Fiets"));
    }

    #[test]
    fn test_missing_classes_are_invalid() {
        assert!(!is_valid_password("alllowercase1!"));
        assert!(!is_valid_password("ALLUPPERCASE1!"));
        assert!(!is_valid_password("NoDigitsHere!!"));
        assert!(!is_valid_password("NoSpecials1234"));
    }

    #[test]
    fn test_common_passwords() {
        assert!(is_common_password("password"));
        assert!(is_common_password("Welkom123!"));
        assert!(is_common_password("MySecret123456!"));
        assert!(is_common_password("xxqwertyxx"));
        assert!(!is_common_password("Password1234!"));
        assert!(!is_common_password("Tr0mpet&Fiets"));
    }

    #[test]
    fn test_detailed_reports_every_missing_class() {
        let result = validate_password_detailed("            ");
        assert!(!result.is_valid());
        let errors = result.errors();
        assert!(errors.iter().any(|e| e.contains("hoofdletter")));
        assert!(errors.iter().any(|e| e.contains("kleine letter")));
        assert!(errors.iter().any(|e| e.contains("cijfer")));
        assert!(errors.iter().any(|e| e.contains("speciaal teken")));
    }

    #[test]
    fn test_detailed_order_and_length_rules() {
        let result = validate_password_detailed("abc");
        let errors = result.errors();
        assert!(errors[0].contains("minimaal 12"));
        assert!(errors[1].contains("hoofdletter"));

        let long = format!("Aa1!{}", "x".repeat(130));
        let result = validate_password_detailed(&long);
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("maximaal 128"));
    }

    #[test]
    fn test_detailed_valid_password() {
        let result = validate_password_detailed("Password1234!");
        assert!(result.is_valid());
        assert!(result.errors().is_empty());
        assert_eq!(result.strength(), calculate_password_strength("Password1234!"));
    }

    #[test]
    fn test_detailed_flags_common_password() {
        let result = validate_password_detailed("Password123!");
        assert!(!result.is_valid());
        assert_eq!(result.errors().len(), 1);
        assert!(result.errors()[0].contains("te algemeen"));
    }

    #[test]
    fn test_validity_matches_errors() {
        for password in ["", "short", "Password1234!", "Tr0mpet&Fiets", "password"] {
            let result = validate_password_detailed(password);
            assert_eq!(result.is_valid(), result.errors().is_empty());
        }
    }

    #[test]
    fn test_strength_is_clamped() {
        assert_eq!(calculate_password_strength(""), 0);
        assert_eq!(calculate_password_strength("123"), 0);
        assert_eq!(calculate_password_strength("aaa"), 5);
        let strongest = "Xk9#mP2$vL7@nQ4!wR8%";
        assert_eq!(calculate_password_strength(strongest), 100);
    }

    #[test]
    fn test_strength_monotonic_in_length() {
        // Same character classes, no runs or repeats.
        let candidates = ["Xk9#mP2$", "Xk9#mP2$vL7@", "Xk9#mP2$vL7@nQ4!", "Xk9#mP2$vL7@nQ4!wR8%"];
        let scores: Vec<u8> = candidates
            .iter()
            .map(|p| calculate_password_strength(p))
            .collect();
        assert!(scores.windows(2).all(|w| w[0] <= w[1]), "{scores:?}");
    }

    #[test]
    fn test_strength_penalties() {
        let base = calculate_password_strength("Xk9#mP2$vL7@");
        assert_eq!(calculate_password_strength("Xk9#mP2$v123"), base - 15);
        assert_eq!(calculate_password_strength("Xk9#mP2$vLLL"), base - 10);
        assert!(calculate_password_strength("Password123!") < base / 2);
    }

    #[test]
    fn test_sequential_detection() {
        assert!(has_sequential_run("x123x"));
        assert!(has_sequential_run("xABCx"));
        assert!(has_sequential_run("Qwerty"));
        assert!(!has_sequential_run("a1b2c3"));
        assert!(!has_sequential_run("9:;"));
    }

    #[test]
    fn test_strength_label() {
        assert_eq!(strength_label(0), "Zeer zwak");
        assert_eq!(strength_label(45), "Redelijk");
        assert_eq!(strength_label(65), "Sterk");
        assert_eq!(strength_label(100), "Zeer sterk");
    }
}
