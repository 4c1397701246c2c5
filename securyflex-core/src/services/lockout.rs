//! Account lockout after repeated failed logins.
//!
//! The failed-login counter is not windowed: it only resets on a successful
//! login, an explicit unlock (password reset) or when an active lockout expires.
//! Reaching [`LockoutConfig::max_failed_logins`] stamps the lock time once;
//! further failures while locked do not extend it.
//!
//! Expiry is lazy. The state of an identifier whose lockout has run out is
//! cleared the next time it is queried.
//!
//! # Example
//!
//! ```rust
//! use securyflex_core::services::LockoutManager;
//! use securyflex_core::config::LockoutConfig;
//!
//! let lockout = LockoutManager::new(LockoutConfig::default());
//! for _ in 0..5 {
//!     lockout.record_failed_login("user@example.nl");
//! }
//! assert!(lockout.is_locked_out("user@example.nl"));
//!
//! lockout.reset_on_success("user@example.nl");
//! assert!(!lockout.is_locked_out("user@example.nl"));
//! ```

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, system_clock},
    config::LockoutConfig,
    validation::normalize_identifier,
};

/// Stored lockout state for one identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockoutState {
    pub identifier: String,
    pub failed_count: u32,
    pub locked_at: Option<DateTime<Utc>>,
}

impl LockoutState {
    fn new(identifier: String) -> Self {
        Self {
            identifier,
            failed_count: 0,
            locked_at: None,
        }
    }
}

/// Point-in-time view of an identifier's lockout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LockoutStatus {
    pub identifier: String,
    pub failed_attempts: u32,
    pub is_locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

impl LockoutStatus {
    fn unlocked(identifier: String) -> Self {
        Self {
            identifier,
            failed_attempts: 0,
            is_locked: false,
            locked_until: None,
        }
    }

    /// Seconds until the lockout ends at `now`, if locked.
    pub fn retry_after_seconds_at(&self, now: DateTime<Utc>) -> Option<i64> {
        self.locked_until
            .filter(|_| self.is_locked)
            .map(|until| (until - now).num_seconds().max(0))
    }

    /// Whole hours until the lockout ends at `now`, rounded up.
    pub fn remaining_hours_at(&self, now: DateTime<Utc>) -> i64 {
        match self.locked_until {
            Some(until) if self.is_locked => {
                let seconds = (until - now).num_seconds().max(0);
                (seconds + 3599) / 3600
            }
            _ => 0,
        }
    }
}

/// Tracks failed logins per identifier and enforces the lockout.
pub struct LockoutManager {
    config: LockoutConfig,
    clock: Arc<dyn Clock>,
    states: DashMap<String, LockoutState>,
}

impl LockoutManager {
    pub fn new(config: LockoutConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: LockoutConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            states: DashMap::new(),
        }
    }

    pub fn config(&self) -> &LockoutConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    fn status_of(&self, state: &LockoutState) -> LockoutStatus {
        let locked_until = state
            .locked_at
            .map(|at| at + self.config.lockout_duration);
        LockoutStatus {
            identifier: state.identifier.clone(),
            failed_attempts: state.failed_count,
            is_locked: locked_until.is_some(),
            locked_until,
        }
    }

    /// Count a failed login. Returns the status after counting.
    pub fn record_failed_login(&self, identifier: &str) -> LockoutStatus {
        let key = normalize_identifier(identifier);
        if !self.config.enabled {
            return LockoutStatus::unlocked(key);
        }

        // An expired lock must not count towards the next one.
        self.expire_if_due(&key);

        let now = self.clock.now();
        let mut state = self
            .states
            .entry(key.clone())
            .or_insert_with(|| LockoutState::new(key));
        state.failed_count = state.failed_count.saturating_add(1);

        if state.failed_count >= self.config.max_failed_logins && state.locked_at.is_none() {
            state.locked_at = Some(now);
            tracing::info!(
                email = %state.identifier,
                failed_attempts = state.failed_count,
                "Account locked after repeated failed logins"
            );
        }

        self.status_of(&state)
    }

    /// Clear the stored state if its lockout has run out. Returns whether it did.
    fn expire_if_due(&self, key: &str) -> bool {
        let now = self.clock.now();
        let duration = self.config.lockout_duration;
        let removed = self
            .states
            .remove_if(key, |_, state| {
                state.locked_at.is_some_and(|at| now - at >= duration)
            })
            .is_some();
        if removed {
            tracing::debug!(email = %key, "Lockout expired");
        }
        removed
    }

    /// Current status of the identifier, expiring a finished lockout first.
    pub fn lockout_status(&self, identifier: &str) -> LockoutStatus {
        let key = normalize_identifier(identifier);
        if !self.config.enabled {
            return LockoutStatus::unlocked(key);
        }

        self.expire_if_due(&key);
        match self.states.get(&key) {
            Some(state) => self.status_of(&state),
            None => LockoutStatus::unlocked(key),
        }
    }

    pub fn is_locked_out(&self, identifier: &str) -> bool {
        self.lockout_status(identifier).is_locked
    }

    /// Like [`is_locked_out`](Self::is_locked_out), but reports whether the call
    /// itself expired a lockout. Used to emit unlock events.
    pub fn check_expired(&self, identifier: &str) -> bool {
        self.config.enabled && self.expire_if_due(&normalize_identifier(identifier))
    }

    /// Forget the identifier's failures and lock. Idempotent.
    pub fn reset_on_success(&self, identifier: &str) {
        self.states.remove(&normalize_identifier(identifier));
    }

    /// Lift a lock explicitly. Returns `true` if the identifier was locked.
    pub fn unlock(&self, identifier: &str) -> bool {
        let key = normalize_identifier(identifier);
        let was_locked = self.lockout_status(&key).is_locked;
        self.states.remove(&key);
        if was_locked {
            tracing::info!(email = %key, "Account unlocked");
        }
        was_locked
    }

    /// Raw stored state, without expiring it.
    pub fn state(&self, identifier: &str) -> Option<LockoutState> {
        self.states
            .get(&normalize_identifier(identifier))
            .map(|s| s.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn manager() -> (LockoutManager, ManualClock) {
        let clock = ManualClock::default();
        let manager = LockoutManager::with_clock(LockoutConfig::default(), Arc::new(clock.clone()));
        (manager, clock)
    }

    #[test]
    fn test_locks_on_fifth_failure() {
        let (manager, _) = manager();
        for i in 1..=4 {
            let status = manager.record_failed_login("user@example.nl");
            assert_eq!(status.failed_attempts, i);
            assert!(!status.is_locked);
        }
        let status = manager.record_failed_login("user@example.nl");
        assert!(status.is_locked);
        assert_eq!(status.failed_attempts, 5);
        assert!(status.locked_until.is_some());
        assert!(manager.is_locked_out("USER@example.nl"));
    }

    #[test]
    fn test_further_failures_do_not_extend_lock() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        let first = manager.lockout_status("user@example.nl").locked_until;

        clock.advance(Duration::hours(1));
        let status = manager.record_failed_login("user@example.nl");
        assert_eq!(status.failed_attempts, 6);
        assert_eq!(status.locked_until, first);
    }

    #[test]
    fn test_lockout_expires_lazily() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }

        clock.advance(Duration::hours(23) + Duration::minutes(59));
        assert!(manager.is_locked_out("user@example.nl"));
        assert_eq!(
            manager
                .lockout_status("user@example.nl")
                .remaining_hours_at(clock.now()),
            1
        );

        clock.advance(Duration::minutes(1));
        assert!(manager.state("user@example.nl").is_some());
        assert!(!manager.is_locked_out("user@example.nl"));
        assert!(manager.state("user@example.nl").is_none());
    }

    #[test]
    fn test_check_expired_reports_transition() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        assert!(!manager.check_expired("user@example.nl"));
        clock.advance(Duration::hours(24));
        assert!(manager.check_expired("user@example.nl"));
        assert!(!manager.check_expired("user@example.nl"));
    }

    #[test]
    fn test_failure_after_expiry_starts_fresh() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        clock.advance(Duration::hours(25));
        let status = manager.record_failed_login("user@example.nl");
        assert_eq!(status.failed_attempts, 1);
        assert!(!status.is_locked);
    }

    #[test]
    fn test_counter_is_not_windowed() {
        let (manager, clock) = manager();
        for _ in 0..4 {
            manager.record_failed_login("user@example.nl");
            clock.advance(Duration::days(2));
        }
        assert!(manager.record_failed_login("user@example.nl").is_locked);
    }

    #[test]
    fn test_reset_on_success_is_idempotent() {
        let (manager, _) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        manager.reset_on_success("user@example.nl");
        manager.reset_on_success("user@example.nl");
        assert!(!manager.is_locked_out("user@example.nl"));
        assert_eq!(manager.lockout_status("user@example.nl").failed_attempts, 0);
    }

    #[test]
    fn test_unlock() {
        let (manager, _) = manager();
        assert!(!manager.unlock("user@example.nl"));
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        assert!(manager.unlock("user@example.nl"));
        assert!(!manager.is_locked_out("user@example.nl"));
    }

    #[test]
    fn test_disabled() {
        let manager = LockoutManager::new(LockoutConfig::disabled());
        for _ in 0..10 {
            let status = manager.record_failed_login("user@example.nl");
            assert!(!status.is_locked);
        }
        assert!(!manager.is_locked_out("user@example.nl"));
    }

    #[test]
    fn test_retry_after_seconds() {
        let (manager, clock) = manager();
        for _ in 0..5 {
            manager.record_failed_login("user@example.nl");
        }
        clock.advance(Duration::hours(2));
        let status = manager.lockout_status("user@example.nl");
        assert_eq!(status.retry_after_seconds_at(clock.now()), Some(22 * 3600));
        assert_eq!(status.remaining_hours_at(clock.now()), 22);

        clock.advance(Duration::days(2));
        assert_eq!(status.retry_after_seconds_at(clock.now()), Some(0));
        assert!(
            LockoutStatus::unlocked("x".into())
                .retry_after_seconds_at(clock.now())
                .is_none()
        );
    }
}
