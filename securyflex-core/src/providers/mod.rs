//! External collaborators of the auth core
//!
//! The identity provider owns credentials and email flows; the profile store
//! owns the per-user profile document. Both are traits so the orchestrator can be
//! run against a hosted backend in production and the in-memory implementations
//! in tests and local development.

pub mod identity;
pub mod memory;
pub mod profile;

pub use identity::{IdentityProvider, ProviderUser};
pub use memory::{InMemoryIdentityProvider, InMemoryProfileStore};
pub use profile::ProfileStore;
