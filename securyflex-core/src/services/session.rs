use std::sync::Arc;

use dashmap::DashMap;

use crate::{
    clock::{Clock, system_clock},
    config::SessionConfig,
    session::{SessionRecord, SessionStatus},
    user::UserId,
};

/// In-memory session tracking with idle and absolute timeouts
///
/// At most one session exists per user. Expired sessions are removed when they
/// are checked.
pub struct SessionManager {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    sessions: DashMap<UserId, SessionRecord>,
}

impl SessionManager {
    pub fn new(config: SessionConfig) -> Self {
        Self::with_clock(config, system_clock())
    }

    pub fn with_clock(config: SessionConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            sessions: DashMap::new(),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start a new session for the user, replacing any existing one
    pub fn initialize_session(&self, user_id: &UserId) -> SessionRecord {
        let record = SessionRecord::new(user_id.clone(), self.clock.now());
        self.sessions.insert(user_id.clone(), record.clone());
        tracing::debug!(user.id = %user_id, "Session initialized");
        record
    }

    /// Record activity on a valid session.
    ///
    /// Returns `false` when the user has no session or it has expired; an
    /// expired session is removed instead of being extended.
    pub fn update_last_activity(&self, user_id: &UserId) -> bool {
        let now = self.clock.now();
        let status = match self.sessions.get_mut(user_id) {
            Some(mut record) => {
                let status = record.status_at(
                    now,
                    self.config.idle_timeout,
                    self.config.absolute_timeout,
                );
                if status.is_valid() {
                    record.touch(now);
                    return true;
                }
                status
            }
            None => return false,
        };

        self.sessions.remove(user_id);
        tracing::info!(user.id = %user_id, status = ?status, "Session expired");
        false
    }

    /// Evaluate the user's session without removing it when expired
    pub fn session_status(&self, user_id: &UserId) -> SessionStatus {
        match self.sessions.get(user_id) {
            Some(record) => record.status_at(
                self.clock.now(),
                self.config.idle_timeout,
                self.config.absolute_timeout,
            ),
            None => SessionStatus::Missing,
        }
    }

    /// Evaluate the user's session, removing it if it has expired
    pub fn check_session(&self, user_id: &UserId) -> SessionStatus {
        let now = self.clock.now();
        let status = match self.sessions.get(user_id) {
            Some(record) => record.status_at(
                now,
                self.config.idle_timeout,
                self.config.absolute_timeout,
            ),
            None => return SessionStatus::Missing,
        };

        if status.is_expired() {
            self.sessions.remove(user_id);
            tracing::info!(user.id = %user_id, status = ?status, "Session expired");
        }
        status
    }

    pub fn is_session_valid(&self, user_id: &UserId) -> bool {
        self.check_session(user_id).is_valid()
    }

    /// Remove the user's session. Returns whether one existed.
    pub fn invalidate_session(&self, user_id: &UserId) -> bool {
        self.sessions.remove(user_id).is_some()
    }

    /// The stored session, without evaluating timeouts
    pub fn session(&self, user_id: &UserId) -> Option<SessionRecord> {
        self.sessions.get(user_id).map(|r| r.clone())
    }

    /// Number of stored sessions, including ones that expired but were not checked yet
    pub fn active_sessions(&self) -> usize {
        self.sessions.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use chrono::Duration;

    fn manager() -> (SessionManager, ManualClock) {
        let clock = ManualClock::default();
        let manager = SessionManager::with_clock(SessionConfig::default(), Arc::new(clock.clone()));
        (manager, clock)
    }

    #[test]
    fn test_missing_session() {
        let (manager, _) = manager();
        let user = UserId::new("u1");
        assert_eq!(manager.check_session(&user), SessionStatus::Missing);
        assert!(!manager.update_last_activity(&user));
        assert!(!manager.is_session_valid(&user));
    }

    #[test]
    fn test_idle_timeout() {
        let (manager, clock) = manager();
        let user = UserId::new("u1");
        manager.initialize_session(&user);

        clock.advance(Duration::minutes(29));
        assert!(manager.is_session_valid(&user));

        clock.advance(Duration::minutes(1));
        assert_eq!(manager.check_session(&user), SessionStatus::IdleTimeout);
        assert_eq!(manager.check_session(&user), SessionStatus::Missing);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[test]
    fn test_activity_extends_idle_but_not_absolute() {
        let (manager, clock) = manager();
        let user = UserId::new("u1");
        manager.initialize_session(&user);

        for _ in 0..16 {
            clock.advance(Duration::minutes(29));
            assert!(manager.update_last_activity(&user));
            assert!(manager.is_session_valid(&user));
        }

        // 16 * 29 minutes = 7h44m; the next step crosses 8 hours.
        clock.advance(Duration::minutes(16));
        assert_eq!(manager.check_session(&user), SessionStatus::AbsoluteTimeout);
    }

    #[test]
    fn test_activity_does_not_revive_expired_session() {
        let (manager, clock) = manager();
        let user = UserId::new("u1");
        manager.initialize_session(&user);

        clock.advance(Duration::minutes(31));
        assert_eq!(manager.session_status(&user), SessionStatus::IdleTimeout);
        assert!(!manager.update_last_activity(&user));
        assert!(manager.session(&user).is_none());
        assert!(!manager.is_session_valid(&user));
    }

    #[test]
    fn test_session_status_does_not_remove() {
        let (manager, clock) = manager();
        let user = UserId::new("u1");
        manager.initialize_session(&user);

        clock.advance(Duration::hours(9));
        assert_eq!(manager.session_status(&user), SessionStatus::AbsoluteTimeout);
        assert_eq!(manager.active_sessions(), 1);
        assert_eq!(manager.check_session(&user), SessionStatus::AbsoluteTimeout);
        assert_eq!(manager.active_sessions(), 0);
    }

    #[test]
    fn test_initialize_replaces_existing() {
        let (manager, clock) = manager();
        let user = UserId::new("u1");
        let first = manager.initialize_session(&user);
        clock.advance(Duration::minutes(10));
        let second = manager.initialize_session(&user);

        assert!(second.started_at() > first.started_at());
        assert_eq!(manager.active_sessions(), 1);
        assert_eq!(
            manager.session(&user).map(|s| s.started_at()),
            Some(second.started_at())
        );
    }

    #[test]
    fn test_invalidate() {
        let (manager, _) = manager();
        let user = UserId::new("u1");
        manager.initialize_session(&user);
        assert!(manager.invalidate_session(&user));
        assert!(!manager.invalidate_session(&user));
        assert_eq!(manager.check_session(&user), SessionStatus::Missing);
    }

    #[test]
    fn test_custom_timeouts() {
        let clock = ManualClock::default();
        let config = SessionConfig::default().idle_timeout(Duration::minutes(5));
        let manager = SessionManager::with_clock(config, Arc::new(clock.clone()));
        let user = UserId::new("u1");
        manager.initialize_session(&user);
        clock.advance(Duration::minutes(5));
        assert_eq!(manager.check_session(&user), SessionStatus::IdleTimeout);
    }
}
