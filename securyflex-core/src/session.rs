//! Session records
//!
//! A session is created on successful login and tracks two clocks:
//!
//! | Field              | Type       | Description                                    |
//! | ------------------ | ---------- | ---------------------------------------------- |
//! | `user_id`          | `UserId`   | The user the session belongs to.               |
//! | `started_at`       | `DateTime` | When the session was created (absolute clock). |
//! | `last_activity_at` | `DateTime` | Last recorded user activity (idle clock).      |
//!
//! `last_activity_at >= started_at` always holds.
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::user::UserId;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRecord {
    user_id: UserId,
    started_at: DateTime<Utc>,
    last_activity_at: DateTime<Utc>,
}

impl SessionRecord {
    pub fn new(user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            user_id,
            started_at: now,
            last_activity_at: now,
        }
    }

    pub fn user_id(&self) -> &UserId {
        &self.user_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_activity_at(&self) -> DateTime<Utc> {
        self.last_activity_at
    }

    /// Record activity at `now`. Timestamps earlier than the current one are ignored.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if now > self.last_activity_at {
            self.last_activity_at = now;
        }
    }

    /// Evaluate both timeouts at `now`. The absolute timeout wins when both apply.
    pub fn status_at(
        &self,
        now: DateTime<Utc>,
        idle_timeout: Duration,
        absolute_timeout: Duration,
    ) -> SessionStatus {
        if now - self.started_at >= absolute_timeout {
            SessionStatus::AbsoluteTimeout
        } else if now - self.last_activity_at >= idle_timeout {
            SessionStatus::IdleTimeout
        } else {
            SessionStatus::Valid
        }
    }
}

/// Result of checking a user's session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionStatus {
    Valid,
    Missing,
    IdleTimeout,
    AbsoluteTimeout,
}

impl SessionStatus {
    pub fn is_valid(&self) -> bool {
        matches!(self, SessionStatus::Valid)
    }

    pub fn is_expired(&self) -> bool {
        matches!(
            self,
            SessionStatus::IdleTimeout | SessionStatus::AbsoluteTimeout
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_session_starts_with_equal_clocks() {
        let now = Utc::now();
        let session = SessionRecord::new(UserId::new("u1"), now);
        assert_eq!(session.started_at(), session.last_activity_at());
    }

    #[test]
    fn test_touch_never_moves_backwards() {
        let now = Utc::now();
        let mut session = SessionRecord::new(UserId::new("u1"), now);
        session.touch(now - Duration::minutes(5));
        assert_eq!(session.last_activity_at(), now);
        session.touch(now + Duration::minutes(5));
        assert_eq!(session.last_activity_at(), now + Duration::minutes(5));
        assert!(session.last_activity_at() >= session.started_at());
    }

    #[test]
    fn test_status_boundaries() {
        let now = Utc::now();
        let idle = Duration::minutes(30);
        let absolute = Duration::hours(8);
        let session = SessionRecord::new(UserId::new("u1"), now);

        assert_eq!(
            session.status_at(now + Duration::minutes(29), idle, absolute),
            SessionStatus::Valid
        );
        assert_eq!(
            session.status_at(now + Duration::minutes(30), idle, absolute),
            SessionStatus::IdleTimeout
        );
        assert_eq!(
            session.status_at(now + Duration::hours(8), idle, absolute),
            SessionStatus::AbsoluteTimeout
        );
    }
}
