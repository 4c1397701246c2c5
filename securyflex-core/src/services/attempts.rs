//! Rolling-window rate limiting for login and registration attempts.
//!
//! Attempts are kept per lowercased identifier for the lifetime of the process
//! only; a restart forgets them. Entries older than the window are pruned when
//! the identifier is read (pull-based TTL), so there is no background sweeper and
//! an idle identifier keeps its stale entries until it is queried again.
//!
//! # Example
//!
//! ```rust
//! use securyflex_core::services::{AttemptKind, AttemptTracker};
//! use securyflex_core::config::RateLimitConfig;
//!
//! let tracker = AttemptTracker::new(RateLimitConfig::default());
//! for _ in 0..3 {
//!     tracker.record_attempt("test@example.nl", AttemptKind::Login);
//! }
//! assert!(tracker.is_rate_limited("test@example.nl", AttemptKind::Login));
//! assert!(tracker.remaining_lock_minutes("test@example.nl", AttemptKind::Login) > 0);
//! ```

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{Clock, system_clock},
    config::RateLimitConfig,
    validation::normalize_identifier,
};

/// The operation being rate limited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttemptKind {
    Login,
    Registration,
}

impl AttemptKind {
    /// Backoff once the identifier has 3 or more attempts in the window.
    fn elevated_backoff(&self) -> Duration {
        match self {
            AttemptKind::Login => Duration::minutes(60),
            AttemptKind::Registration => Duration::minutes(120),
        }
    }

    /// Backoff once the identifier has 5 or more attempts in the window.
    fn severe_backoff(&self) -> Duration {
        match self {
            AttemptKind::Login => Duration::minutes(120),
            AttemptKind::Registration => Duration::minutes(240),
        }
    }
}

/// Tracks attempt timestamps per identifier and answers rate-limit questions.
///
/// The tracker does not serialize concurrent attempts for the same identifier;
/// the orchestrator guards in-flight operations before recording.
pub struct AttemptTracker {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    login: DashMap<String, Vec<DateTime<Utc>>>,
    registration: DashMap<String, Vec<DateTime<Utc>>>,
}

impl AttemptTracker {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            login: DashMap::new(),
            registration: DashMap::new(),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn attempts(&self, kind: AttemptKind) -> &DashMap<String, Vec<DateTime<Utc>>> {
        match kind {
            AttemptKind::Login => &self.login,
            AttemptKind::Registration => &self.registration,
        }
    }

    fn window(&self, kind: AttemptKind) -> Duration {
        match kind {
            AttemptKind::Login => self.config.login_window,
            AttemptKind::Registration => self.config.registration_window,
        }
    }

    /// Record an attempt at the current time. Returns the number of attempts
    /// inside the window, including this one.
    pub fn record_attempt(&self, identifier: &str, kind: AttemptKind) -> usize {
        let now = self.clock.now();
        let key = normalize_identifier(identifier);
        let window = self.window(kind);

        let mut entry = self.attempts(kind).entry(key).or_default();
        entry.retain(|at| now - *at < window);
        entry.push(now);
        entry.len()
    }

    /// Drop attempts older than the window and return what remains, oldest first.
    fn prune(&self, identifier: &str, kind: AttemptKind) -> Vec<DateTime<Utc>> {
        let now = self.clock.now();
        let key = normalize_identifier(identifier);
        let window = self.window(kind);
        let attempts = self.attempts(kind);

        let remaining = match attempts.get_mut(&key) {
            Some(mut entry) => {
                entry.retain(|at| now - *at < window);
                entry.clone()
            }
            None => return Vec::new(),
        };

        if remaining.is_empty() {
            attempts.remove_if(&key, |_, v| v.is_empty());
        }
        remaining
    }

    /// Number of attempts currently inside the window.
    pub fn attempt_count(&self, identifier: &str, kind: AttemptKind) -> usize {
        self.prune(identifier, kind).len()
    }

    /// `true` once the identifier has used up its attempts for the window.
    pub fn is_rate_limited(&self, identifier: &str, kind: AttemptKind) -> bool {
        self.prune(identifier, kind).len() >= self.config.max_attempts as usize
    }

    /// Time left before the identifier may try again, using a backoff that grows
    /// with the number of recent attempts. Zero when there are no recent attempts.
    pub fn remaining_lock_time(&self, identifier: &str, kind: AttemptKind) -> Duration {
        let attempts = self.prune(identifier, kind);
        let Some(oldest) = attempts.first() else {
            return Duration::zero();
        };

        let base = match attempts.len() {
            n if n >= 5 => kind.severe_backoff(),
            n if n >= 3 => kind.elevated_backoff(),
            _ => self.window(kind),
        };

        let remaining = base - (self.clock.now() - *oldest);
        remaining.max(Duration::zero())
    }

    /// [`remaining_lock_time`](Self::remaining_lock_time) rounded up to whole minutes.
    pub fn remaining_lock_minutes(&self, identifier: &str, kind: AttemptKind) -> i64 {
        let seconds = self.remaining_lock_time(identifier, kind).num_seconds();
        (seconds + 59) / 60
    }

    /// Forget every attempt of `kind` for the identifier.
    pub fn clear(&self, identifier: &str, kind: AttemptKind) {
        self.attempts(kind).remove(&normalize_identifier(identifier));
    }

    /// Forget all attempts for the identifier.
    pub fn clear_all(&self, identifier: &str) {
        self.clear(identifier, AttemptKind::Login);
        self.clear(identifier, AttemptKind::Registration);
    }
}
