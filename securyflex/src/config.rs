//! Service configuration
//!
//! [`AuthConfig`] is assembled in three layers, later layers winning:
//!
//! 1. Defaults (the SecuryFlex policy constants)
//! 2. A TOML file ([`AuthConfig::from_file`])
//! 3. `SECURYFLEX_*` environment variables ([`AuthConfig::with_env_overrides`])
//!
//! ```toml
//! provider_configured = true
//! infer_user_type_from_email = false
//!
//! [rate_limit]
//! login_window_minutes = 15
//! max_attempts = 3
//!
//! [lockout]
//! max_failed_logins = 5
//! lockout_duration_minutes = 1440
//!
//! [session]
//! idle_timeout_minutes = 30
//! absolute_timeout_minutes = 480
//! ```
//!
//! Demo mode needs both `demo_mode` and `allow_demo_mode`. The environment can
//! switch `demo_mode` on, but `allow_demo_mode` is only read from the file or set
//! in code, so a stray environment variable cannot enable demo logins on a
//! production deployment.
use std::{collections::HashMap, fs, path::Path};

use chrono::Duration;
use serde::{Deserialize, Serialize};
use securyflex_core::{
    UserType,
    config::{CooldownConfig, LockoutConfig, RateLimitConfig, SessionConfig},
    validation::normalize_identifier,
};

pub const ENV_PROVIDER_CONFIGURED: &str = "SECURYFLEX_PROVIDER_CONFIGURED";
pub const ENV_DEMO_MODE: &str = "SECURYFLEX_DEMO_MODE";
/// JSON object mapping email to `{ "password", "user_type", "name" }`.
pub const ENV_DEMO_CREDENTIALS: &str = "SECURYFLEX_DEMO_CREDENTIALS";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse configuration file: {0}")]
    Toml(#[from] basic_toml::Error),

    #[error("Invalid value for {name}: {message}")]
    Env { name: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A pre-provisioned demo account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DemoCredential {
    pub password: String,
    #[serde(default)]
    pub user_type: UserType,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthConfig {
    /// Whether the identity provider has been set up. When `false`, logins fail
    /// with `firebase-not-configured` without calling the provider.
    pub provider_configured: bool,
    pub demo_mode: bool,
    pub allow_demo_mode: bool,
    /// Demo accounts keyed by normalized email
    pub demo_credentials: HashMap<String, DemoCredential>,
    /// Pick the role of a user without a profile document from their email address.
    pub infer_user_type_from_email: bool,
    pub rate_limit: RateLimitConfig,
    pub lockout: LockoutConfig,
    pub session: SessionConfig,
    pub cooldown: CooldownConfig,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            provider_configured: true,
            demo_mode: false,
            allow_demo_mode: false,
            demo_credentials: HashMap::new(),
            infer_user_type_from_email: true,
            rate_limit: RateLimitConfig::default(),
            lockout: LockoutConfig::default(),
            session: SessionConfig::default(),
            cooldown: CooldownConfig::default(),
        }
    }
}

impl AuthConfig {
    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path.as_ref())?;
        let config = Self::from_toml_str(&content)?;
        tracing::info!(path = %path.as_ref().display(), "Loaded auth configuration");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let file: AuthConfigFile = basic_toml::from_str(content)?;
        file.apply(Self::default())
    }

    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.apply_env(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn apply_env<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_PROVIDER_CONFIGURED) {
            self.provider_configured = parse_bool(ENV_PROVIDER_CONFIGURED, &value)?;
        }
        if let Some(value) = lookup(ENV_DEMO_MODE) {
            self.demo_mode = parse_bool(ENV_DEMO_MODE, &value)?;
        }
        if let Some(value) = lookup(ENV_DEMO_CREDENTIALS) {
            let credentials: HashMap<String, DemoCredential> = serde_json::from_str(&value)
                .map_err(|e| ConfigError::Env {
                    name: ENV_DEMO_CREDENTIALS,
                    message: e.to_string(),
                })?;
            for (email, credential) in credentials {
                self.demo_credentials
                    .insert(normalize_identifier(&email), credential);
            }
        }
        Ok(self)
    }

    /// Register a demo account.
    pub fn with_demo_credential(mut self, email: &str, credential: DemoCredential) -> Self {
        self.demo_credentials
            .insert(normalize_identifier(email), credential);
        self
    }

    /// Whether demo logins are actually served.
    pub fn demo_enabled(&self) -> bool {
        self.demo_mode && self.allow_demo_mode
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.demo_mode && !self.allow_demo_mode {
            return Err(ConfigError::Invalid(
                "demo_mode is set but allow_demo_mode is false".to_string(),
            ));
        }
        if self.rate_limit.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "rate_limit.max_attempts must be at least 1".to_string(),
            ));
        }
        if self.lockout.enabled && self.lockout.max_failed_logins == 0 {
            return Err(ConfigError::Invalid(
                "lockout.max_failed_logins must be at least 1".to_string(),
            ));
        }
        let durations = [
            ("rate_limit.login_window", self.rate_limit.login_window),
            ("rate_limit.registration_window", self.rate_limit.registration_window),
            ("lockout.lockout_duration", self.lockout.lockout_duration),
            ("session.idle_timeout", self.session.idle_timeout),
            ("session.absolute_timeout", self.session.absolute_timeout),
            ("cooldown.email_verification", self.cooldown.email_verification),
            ("cooldown.password_reset", self.cooldown.password_reset),
        ];
        if let Some((name, _)) = durations.iter().find(|(_, d)| *d <= Duration::zero()) {
            return Err(ConfigError::Invalid(format!("{name} must be positive")));
        }
        if self.session.idle_timeout > self.session.absolute_timeout {
            return Err(ConfigError::Invalid(
                "session.idle_timeout exceeds session.absolute_timeout".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Env {
            name,
            message: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct AuthConfigFile {
    provider_configured: Option<bool>,
    demo_mode: Option<bool>,
    allow_demo_mode: Option<bool>,
    infer_user_type_from_email: Option<bool>,
    demo_credentials: HashMap<String, DemoCredential>,
    rate_limit: RateLimitFile,
    lockout: LockoutFile,
    session: SessionFile,
    cooldown: CooldownFile,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct RateLimitFile {
    login_window_minutes: Option<i64>,
    registration_window_minutes: Option<i64>,
    max_attempts: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct LockoutFile {
    enabled: Option<bool>,
    max_failed_logins: Option<u32>,
    lockout_duration_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct SessionFile {
    idle_timeout_minutes: Option<i64>,
    absolute_timeout_minutes: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct CooldownFile {
    email_verification_seconds: Option<i64>,
    password_reset_seconds: Option<i64>,
}

fn set_minutes(
    target: &mut Duration,
    name: &str,
    minutes: Option<i64>,
) -> Result<(), ConfigError> {
    if let Some(minutes) = minutes {
        *target = Duration::try_minutes(minutes)
            .ok_or_else(|| ConfigError::Invalid(format!("{name} is out of range: {minutes}")))?;
    }
    Ok(())
}

fn set_seconds(
    target: &mut Duration,
    name: &str,
    seconds: Option<i64>,
) -> Result<(), ConfigError> {
    if let Some(seconds) = seconds {
        *target = Duration::try_seconds(seconds)
            .ok_or_else(|| ConfigError::Invalid(format!("{name} is out of range: {seconds}")))?;
    }
    Ok(())
}

impl AuthConfigFile {
    fn apply(self, mut config: AuthConfig) -> Result<AuthConfig, ConfigError> {
        if let Some(v) = self.provider_configured {
            config.provider_configured = v;
        }
        if let Some(v) = self.demo_mode {
            config.demo_mode = v;
        }
        if let Some(v) = self.allow_demo_mode {
            config.allow_demo_mode = v;
        }
        if let Some(v) = self.infer_user_type_from_email {
            config.infer_user_type_from_email = v;
        }
        for (email, credential) in self.demo_credentials {
            config
                .demo_credentials
                .insert(normalize_identifier(&email), credential);
        }

        set_minutes(
            &mut config.rate_limit.login_window,
            "rate_limit.login_window_minutes",
            self.rate_limit.login_window_minutes,
        )?;
        set_minutes(
            &mut config.rate_limit.registration_window,
            "rate_limit.registration_window_minutes",
            self.rate_limit.registration_window_minutes,
        )?;
        if let Some(v) = self.rate_limit.max_attempts {
            config.rate_limit.max_attempts = v;
        }

        if let Some(v) = self.lockout.enabled {
            config.lockout.enabled = v;
        }
        if let Some(v) = self.lockout.max_failed_logins {
            config.lockout.max_failed_logins = v;
        }
        set_minutes(
            &mut config.lockout.lockout_duration,
            "lockout.lockout_duration_minutes",
            self.lockout.lockout_duration_minutes,
        )?;

        set_minutes(
            &mut config.session.idle_timeout,
            "session.idle_timeout_minutes",
            self.session.idle_timeout_minutes,
        )?;
        set_minutes(
            &mut config.session.absolute_timeout,
            "session.absolute_timeout_minutes",
            self.session.absolute_timeout_minutes,
        )?;

        set_seconds(
            &mut config.cooldown.email_verification,
            "cooldown.email_verification_seconds",
            self.cooldown.email_verification_seconds,
        )?;
        set_seconds(
            &mut config.cooldown.password_reset,
            "cooldown.password_reset_seconds",
            self.cooldown.password_reset_seconds,
        )?;

        config.validate()?;
        Ok(config)
    }
}
