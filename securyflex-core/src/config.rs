//! Policy configuration for the security components
//!
//! Defaults match the SecuryFlex policy: 3 attempts per 15 minutes for login and
//! per hour for registration, a 24 hour lockout after 5 failed logins, and
//! sessions that expire after 30 idle minutes or 8 hours in total.
use chrono::Duration;

/// Rate limiting for repeated login and registration attempts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Rolling window for login attempts
    pub login_window: Duration,
    /// Rolling window for registration attempts
    pub registration_window: Duration,
    /// Attempts inside the window at which further attempts are refused
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            login_window: Duration::minutes(15),
            registration_window: Duration::hours(1),
            max_attempts: 3,
        }
    }
}

/// Account lockout after sustained login failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutConfig {
    /// Whether lockout is enforced at all
    pub enabled: bool,
    /// Failed logins that lock the account
    pub max_failed_logins: u32,
    /// How long a lockout lasts
    pub lockout_duration: Duration,
}

impl Default for LockoutConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_failed_logins: 5,
            lockout_duration: Duration::hours(24),
        }
    }
}

impl LockoutConfig {
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

/// Session timeouts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub idle_timeout: Duration,
    pub absolute_timeout: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout: Duration::minutes(30),
            absolute_timeout: Duration::hours(8),
        }
    }
}

impl SessionConfig {
    pub fn idle_timeout(mut self, duration: Duration) -> Self {
        self.idle_timeout = duration;
        self
    }

    pub fn absolute_timeout(mut self, duration: Duration) -> Self {
        self.absolute_timeout = duration;
        self
    }
}

/// Cooldowns between repeated email sends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CooldownConfig {
    pub email_verification: Duration,
    pub password_reset: Duration,
}

impl Default for CooldownConfig {
    fn default() -> Self {
        Self {
            email_verification: Duration::minutes(2),
            password_reset: Duration::minutes(5),
        }
    }
}
