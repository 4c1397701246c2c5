use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::{
    error::EventError,
    user::{UserId, UserType},
};

/// Reason why an account was unlocked.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum UnlockReason {
    /// Account was unlocked via password reset
    PasswordReset,
    /// Lockout period expired naturally
    LockoutExpired,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionEndReason {
    Logout,
    IdleTimeout,
    AbsoluteTimeout,
}

/// Represents events that can be emitted by the event bus
///
/// Events notify interested parties (audit logging, security monitoring) about
/// registrations, logins and lockouts. Email addresses are the normalized
/// identifier; credentials are never part of an event.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    UserRegistered {
        user_id: UserId,
        email: String,
        user_type: UserType,
        timestamp: DateTime<Utc>,
    },

    LoginSucceeded {
        user_id: UserId,
        email: String,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when a login attempt is rejected by the identity provider.
    LoginFailed {
        /// The email address that was attempted
        email: String,
        /// Failed logins counted towards the lockout so far
        failed_attempts: u32,
        /// When the attempt occurred
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an account becomes locked due to too many failed attempts.
    ///
    /// This is a security-critical event that should trigger alerts.
    AccountLocked {
        email: String,
        failed_attempts: u32,
        /// When the lockout will expire
        locked_until: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },

    /// Emitted when an account is unlocked.
    AccountUnlocked {
        email: String,
        reason: UnlockReason,
        timestamp: DateTime<Utc>,
    },

    SessionEnded {
        user_id: UserId,
        reason: SessionEndReason,
        timestamp: DateTime<Utc>,
    },
}

/// A trait for handling events emitted by the event bus
///
/// Implementors of this trait can be registered with the [`EventBus`] to receive and process events.
/// The handler is called asynchronously for each event emitted.
///
/// # Examples
///
/// ```
/// # use securyflex_core::events::{Event, EventHandler};
/// # use securyflex_core::error::EventError;
/// # use async_trait::async_trait;
/// struct AuditLog;
///
/// #[async_trait]
/// impl EventHandler for AuditLog {
///     async fn handle_event(&self, event: &Event) -> Result<(), EventError> {
///         println!("{event:?}");
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait EventHandler: Send + Sync + 'static {
    async fn handle_event(&self, event: &Event) -> Result<(), EventError>;
}

/// Event bus that can emit events and register event handlers
///
/// Handlers run in registration order. The first failing handler stops the
/// emission and its error is returned.
#[derive(Clone)]
pub struct EventBus {
    handlers: Arc<RwLock<Vec<Arc<dyn EventHandler>>>>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register an event handler with the event bus
    pub async fn register(&self, handler: Arc<dyn EventHandler>) {
        self.handlers.write().await.push(handler);
    }

    pub async fn handler_count(&self) -> usize {
        self.handlers.read().await.len()
    }

    /// Emit an event to all registered handlers
    pub async fn emit(&self, event: &Event) -> Result<(), EventError> {
        for handler in self.handlers.read().await.iter() {
            handler.handle_event(event).await?;
        }

        Ok(())
    }
}
