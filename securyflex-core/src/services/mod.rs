//! Stateful security services
//!
//! Each service owns its state in concurrent maps and reads time from an
//! injected [`Clock`](crate::clock::Clock). None of them talk to the identity
//! provider; the orchestrator composes them.

pub mod attempts;
pub mod lockout;
pub mod session;

pub use attempts::{AttemptKind, AttemptTracker};
pub use lockout::{LockoutManager, LockoutState, LockoutStatus};
pub use session::SessionManager;
