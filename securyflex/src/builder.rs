//! Builder for constructing [`AuthService`] instances
//!
//! The builder uses a type-state to make sure the identity provider and profile
//! store are supplied before building.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use chrono::Duration;
//! use securyflex::{AuthServiceBuilder, InMemoryIdentityProvider, InMemoryProfileStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let auth = AuthServiceBuilder::new()
//!         .with_config_file("securyflex.toml")?
//!         .with_env_overrides()?
//!         .with_session_timeouts(Duration::minutes(15), Duration::hours(4))
//!         .with_providers(
//!             Arc::new(InMemoryIdentityProvider::new()),
//!             Arc::new(InMemoryProfileStore::new()),
//!         )
//!         .build()
//!         .await?;
//!
//!     let _ = auth.check_auth_state().await;
//!     Ok(())
//! }
//! ```

use std::{path::Path, sync::Arc};

use chrono::Duration;
use securyflex_core::{
    Clock, IdentityProvider, ProfileStore, SystemClock,
    config::{CooldownConfig, LockoutConfig, RateLimitConfig},
    events::{EventBus, EventHandler},
    providers::{InMemoryIdentityProvider, InMemoryProfileStore},
};

use crate::{AuthService, config::{AuthConfig, ConfigError, DemoCredential}};

/// Errors that can occur when building an [`AuthService`].
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceBuilderError {
    /// Failed to load configuration
    #[error("Configuration could not be loaded: {0}")]
    Config(#[from] ConfigError),

    /// Invalid configuration provided
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Marker type indicating no providers have been configured yet.
pub struct NoProviders;

/// Marker type holding the configured identity provider and profile store.
pub struct WithProviders<I: IdentityProvider, P: ProfileStore> {
    identity: Arc<I>,
    profiles: Arc<P>,
}

pub struct AuthServiceBuilder<Providers> {
    providers: Providers,
    config: AuthConfig,
    clock: Arc<dyn Clock>,
    handlers: Vec<Arc<dyn EventHandler>>,
}

impl Default for AuthServiceBuilder<NoProviders> {
    fn default() -> Self {
        Self::new()
    }
}

impl AuthServiceBuilder<NoProviders> {
    /// Create a builder with the default policy, the system clock and no event
    /// handlers.
    pub fn new() -> Self {
        Self {
            providers: NoProviders,
            config: AuthConfig::default(),
            clock: Arc::new(SystemClock),
            handlers: Vec::new(),
        }
    }

    pub fn with_providers<I: IdentityProvider, P: ProfileStore>(
        self,
        identity: Arc<I>,
        profiles: Arc<P>,
    ) -> AuthServiceBuilder<WithProviders<I, P>> {
        AuthServiceBuilder {
            providers: WithProviders { identity, profiles },
            config: self.config,
            clock: self.clock,
            handlers: self.handlers,
        }
    }

    /// Use fresh in-memory providers, for local development and tests.
    pub fn with_in_memory_providers(
        self,
    ) -> AuthServiceBuilder<WithProviders<InMemoryIdentityProvider, InMemoryProfileStore>> {
        self.with_providers(
            Arc::new(InMemoryIdentityProvider::new()),
            Arc::new(InMemoryProfileStore::new()),
        )
    }
}

impl<Providers> AuthServiceBuilder<Providers> {
    /// Replace the whole configuration.
    pub fn with_config(mut self, config: AuthConfig) -> Self {
        self.config = config;
        self
    }

    /// Replace the configuration with one loaded from a TOML file.
    pub fn with_config_file(mut self, path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        self.config = AuthConfig::from_file(path)?;
        Ok(self)
    }

    /// Apply `SECURYFLEX_*` environment overrides to the current configuration.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        self.config = self.config.with_env_overrides()?;
        Ok(self)
    }

    pub fn with_rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = config;
        self
    }

    pub fn with_lockout(mut self, config: LockoutConfig) -> Self {
        self.config.lockout = config;
        self
    }

    pub fn with_session_timeouts(mut self, idle: Duration, absolute: Duration) -> Self {
        self.config.session = self
            .config
            .session
            .idle_timeout(idle)
            .absolute_timeout(absolute);
        self
    }

    pub fn with_cooldowns(mut self, config: CooldownConfig) -> Self {
        self.config.cooldown = config;
        self
    }

    /// Enable demo mode with the given accounts. Never use this in production.
    pub fn with_demo_mode<'a>(
        mut self,
        credentials: impl IntoIterator<Item = (&'a str, DemoCredential)>,
    ) -> Self {
        self.config.demo_mode = true;
        self.config.allow_demo_mode = true;
        for (email, credential) in credentials {
            self.config = self.config.with_demo_credential(email, credential);
        }
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_event_handler(mut self, handler: Arc<dyn EventHandler>) -> Self {
        self.handlers.push(handler);
        self
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}

impl<I: IdentityProvider, P: ProfileStore> AuthServiceBuilder<WithProviders<I, P>> {
    /// Build the service.
    ///
    /// Fails if the configuration is inconsistent, e.g. demo mode requested
    /// without `allow_demo_mode`.
    pub async fn build(self) -> Result<AuthService<I, P>, AuthServiceBuilderError> {
        self.config
            .validate()
            .map_err(|e| AuthServiceBuilderError::InvalidConfiguration(e.to_string()))?;

        let events = EventBus::new();
        for handler in self.handlers {
            events.register(handler).await;
        }

        let service = AuthService::from_parts(
            self.providers.identity,
            self.providers.profiles,
            self.config,
            self.clock,
            events,
        );
        tracing::debug!(strategy = service.strategy_name(), "Auth service built");
        Ok(service)
    }
}
