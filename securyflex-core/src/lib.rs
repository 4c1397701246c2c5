//! Core functionality for the SecuryFlex authentication subsystem
//!
//! This crate contains the pieces of the auth core that do not talk to the
//! identity provider themselves:
//!
//! - [`validation`]: password policy and Dutch business identifiers (KvK, WPBR,
//!   postal code, beveiligingspas)
//! - [`services`]: the attempt tracker, lockout manager and session manager
//! - [`providers`]: the [`IdentityProvider`] and [`ProfileStore`] traits and
//!   in-memory implementations
//! - [`AuthResult`] and [`ErrorCode`], the values returned at the boundary
//! - the [`events`] bus and the injectable [`clock`]
//!
//! The orchestrator that composes these lives in the `securyflex` crate.
pub mod clock;
pub mod config;
pub mod error;
pub mod events;
pub mod id;
pub mod providers;
pub mod result;
pub mod services;
pub mod session;
pub mod user;
pub mod validation;

pub use clock::{Clock, ManualClock, SystemClock};
pub use providers::{IdentityProvider, ProfileStore, ProviderUser};
pub use result::{AuthResult, ErrorCode};
pub use session::{SessionRecord, SessionStatus};
pub use user::{ProfileFields, UserId, UserIdentity, UserType};
