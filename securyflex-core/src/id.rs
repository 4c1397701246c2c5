//! Prefixed random identifiers
//!
//! Identifiers generated by the in-memory providers look like `usr_<random>`: a
//! short type prefix followed by at least 96 bits of URL-safe base64 randomness.

use base64::{Engine, prelude::BASE64_URL_SAFE_NO_PAD};
use rand::RngCore;

/// Generate a prefixed ID with 96 bits of entropy
///
/// # Example
/// ```
/// use securyflex_core::id::generate_prefixed_id;
///
/// let user_id = generate_prefixed_id("usr");
/// assert!(user_id.starts_with("usr_"));
/// ```
pub fn generate_prefixed_id(prefix: &str) -> String {
    let mut bytes = [0u8; 12];
    rand::rng().fill_bytes(&mut bytes);

    let encoded = BASE64_URL_SAFE_NO_PAD.encode(bytes);

    format!("{prefix}_{encoded}")
}

/// Generate an opaque one-time code, e.g. for password reset links.
pub fn generate_code(len_bytes: usize) -> String {
    let mut bytes = vec![0u8; len_bytes.max(16)];
    rand::rng().fill_bytes(&mut bytes);
    BASE64_URL_SAFE_NO_PAD.encode(bytes)
}

/// Validate that a prefixed ID has the expected format
pub fn validate_prefixed_id(id: &str, expected_prefix: &str) -> bool {
    let Some(random_part) = id
        .strip_prefix(expected_prefix)
        .and_then(|rest| rest.strip_prefix('_'))
    else {
        return false;
    };

    match BASE64_URL_SAFE_NO_PAD.decode(random_part) {
        Ok(decoded) => decoded.len() >= 12,
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_prefixed_id() {
        let id = generate_prefixed_id("usr");
        assert!(id.starts_with("usr_"));

        let id2 = generate_prefixed_id("usr");
        assert_ne!(id, id2);
    }

    #[test]
    fn test_validate_prefixed_id() {
        let id = generate_prefixed_id("usr");
        assert!(validate_prefixed_id(&id, "usr"));
        assert!(!validate_prefixed_id(&id, "sess"));

        assert!(!validate_prefixed_id("usr", "usr"));
        assert!(!validate_prefixed_id("usr_", "usr"));
        assert!(!validate_prefixed_id("usr_invalid!", "usr"));
    }

    #[test]
    fn test_generate_code_has_minimum_entropy() {
        let code = generate_code(4);
        let decoded = BASE64_URL_SAFE_NO_PAD.decode(&code).unwrap();
        assert_eq!(decoded.len(), 16);
        assert_ne!(code, generate_code(16));
    }
}
