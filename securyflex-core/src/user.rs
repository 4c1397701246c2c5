//! Users and their profile documents
//!
//! The identity provider owns credentials; the profile store owns the profile
//! document. The auth core only touches a handful of profile fields:
//!
//! | Field                  | Type     | Description                                   |
//! | ---------------------- | -------- | --------------------------------------------- |
//! | `userType`             | `String` | `guard`, `company` or `admin`.                |
//! | `name`                 | `String` | Display name.                                 |
//! | `email`                | `String` | Email address at registration time.           |
//! | `createdAt`            | `String` | RFC 3339 timestamp of profile creation.       |
//! | `lastLoginAt`          | `String` | RFC 3339 timestamp of the last login.         |
//! | `termsAcceptedVersion` | `String` | Version of the terms the user accepted.       |
//! | `termsAcceptedAt`      | `String` | RFC 3339 timestamp of terms acceptance.       |
use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{error::ValidationError, id::generate_prefixed_id, id::validate_prefixed_id};

/// A profile document as stored by the profile store.
pub type ProfileFields = Map<String, Value>;

/// Names of the profile fields the auth core reads or writes.
pub mod fields {
    pub const USER_TYPE: &str = "userType";
    pub const NAME: &str = "name";
    pub const EMAIL: &str = "email";
    pub const CREATED_AT: &str = "createdAt";
    pub const LAST_LOGIN_AT: &str = "lastLoginAt";
    pub const TERMS_ACCEPTED_VERSION: &str = "termsAcceptedVersion";
    pub const TERMS_ACCEPTED_AT: &str = "termsAcceptedAt";

    /// Fields that callers may not overwrite through a profile update.
    pub const PROTECTED: &[&str] = &[
        USER_TYPE,
        EMAIL,
        CREATED_AT,
        LAST_LOGIN_AT,
        TERMS_ACCEPTED_VERSION,
        TERMS_ACCEPTED_AT,
    ];
}

/// A unique, stable identifier for a specific user
/// This value should be treated as opaque.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: &str) -> Self {
        UserId(id.to_string())
    }

    pub fn new_random() -> Self {
        UserId(generate_prefixed_id("usr"))
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this ID was generated by [`UserId::new_random`].
    pub fn is_generated(&self) -> bool {
        validate_prefixed_id(&self.0, "usr")
    }
}

impl From<String> for UserId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The role a SecuryFlex account plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    Guard,
    #[default]
    Company,
    Admin,
}

impl UserType {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserType::Guard => "guard",
            UserType::Company => "company",
            UserType::Admin => "admin",
        }
    }

    /// Guess a role from substrings of the email address.
    ///
    /// Only used when a verified user logs in without a profile document.
    /// Falls back to [`UserType::Company`].
    pub fn infer_from_email(email: &str) -> Self {
        let email = email.to_lowercase();
        if email.contains("guard") {
            UserType::Guard
        } else if email.contains("company") {
            UserType::Company
        } else if email.contains("admin") {
            UserType::Admin
        } else {
            UserType::Company
        }
    }

    /// A display name used for profiles created without one.
    pub fn default_display_name(&self) -> &'static str {
        match self {
            UserType::Guard => "Beveiliger",
            UserType::Company => "Beveiligingsbedrijf",
            UserType::Admin => "Beheerder",
        }
    }
}

impl fmt::Display for UserType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UserType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "guard" => Ok(UserType::Guard),
            "company" => Ok(UserType::Company),
            "admin" => Ok(UserType::Admin),
            other => Err(ValidationError::InvalidField(format!(
                "Unknown user type: {other}"
            ))),
        }
    }
}

/// The authenticated user as seen by the UI layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserIdentity {
    pub user_id: UserId,
    pub user_type: UserType,
    pub name: String,
    pub email: String,
    pub profile: ProfileFields,
}

impl UserIdentity {
    /// Build an identity from a profile document, falling back to `email` and the
    /// role's default display name for missing fields.
    pub fn from_profile(user_id: UserId, email: &str, profile: ProfileFields) -> Self {
        let user_type = profile
            .get(fields::USER_TYPE)
            .and_then(Value::as_str)
            .and_then(|s| s.parse().ok())
            .unwrap_or_default();
        let name = profile
            .get(fields::NAME)
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| UserType::default_display_name(&user_type).to_string());

        Self {
            user_id,
            user_type,
            name,
            email: email.to_string(),
            profile,
        }
    }
}
