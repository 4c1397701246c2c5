use dashmap::DashSet;
use serde::{Deserialize, Serialize};
use securyflex_core::{UserId, UserType};

/// Authentication state broadcast to subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum AuthState {
    /// Nothing has been checked yet
    Initial,
    Authenticated {
        user_id: UserId,
        user_type: UserType,
    },
    Unauthenticated,
    /// Registered or signed in, but the email address is not verified yet
    AwaitingEmailVerification { email: String },
}

impl AuthState {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, AuthState::Authenticated { .. })
    }
}

/// Marks an operation as running for a key until dropped.
pub(crate) struct InFlightGuard<'a> {
    set: &'a DashSet<String>,
    key: String,
}

impl<'a> InFlightGuard<'a> {
    /// Returns `None` if an operation for `key` is already running.
    pub(crate) fn acquire(set: &'a DashSet<String>, key: String) -> Option<Self> {
        if set.insert(key.clone()) {
            Some(Self { set, key })
        } else {
            None
        }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.set.remove(&self.key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guard_excludes_second_holder() {
        let set = DashSet::new();
        let guard = InFlightGuard::acquire(&set, "login:a@b.nl".to_string());
        assert!(guard.is_some());
        assert!(InFlightGuard::acquire(&set, "login:a@b.nl".to_string()).is_none());
        assert!(InFlightGuard::acquire(&set, "login:c@d.nl".to_string()).is_some());

        drop(guard);
        assert!(InFlightGuard::acquire(&set, "login:a@b.nl".to_string()).is_some());
    }

    #[test]
    fn test_state_serialization() {
        let state = AuthState::AwaitingEmailVerification {
            email: "a@b.nl".to_string(),
        };
        let json = serde_json::to_value(&state).unwrap();
        assert_eq!(json["state"], "awaitingEmailVerification");
        assert_eq!(json["email"], "a@b.nl");
        assert!(!state.is_authenticated());
    }
}
