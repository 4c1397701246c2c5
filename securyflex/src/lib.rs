//! # SecuryFlex authentication
//!
//! This crate provides [`AuthService`], the orchestrator of the SecuryFlex
//! authentication subsystem. It composes the components of `securyflex-core`
//! (credential validation, attempt tracking, account lockout and session
//! management) and is the only place that talks to the identity provider and the
//! profile store.
//!
//! Every operation returns an [`AuthResult`]: a success flag, a machine-readable
//! [`ErrorCode`] and a Dutch message for the UI layer. Operations never panic and
//! never return `Err`; unexpected provider or store faults are logged and
//! reported as [`ErrorCode::Unknown`].
//!
//! ## Policy
//!
//! - Login: 3 attempts per 15 minutes per email, progressively longer waits
//! - Lockout: 24 hours after 5 failed logins, lifted by a successful login or a
//!   password reset
//! - Sessions: 30 minutes idle, 8 hours absolute
//! - Registration: 3 attempts per hour per email
//!
//! All of this state lives in memory inside one [`AuthService`] instance.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use securyflex::{AuthServiceBuilder, InMemoryIdentityProvider, InMemoryProfileStore};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let identity = Arc::new(InMemoryIdentityProvider::new());
//! identity.add_user("jan@beveiliging.nl", "Veilig-Wachtwoord-42", true);
//!
//! let auth = AuthServiceBuilder::new()
//!     .with_providers(identity, Arc::new(InMemoryProfileStore::new()))
//!     .build()
//!     .await?;
//!
//! let result = auth.login("jan@beveiliging.nl", "Veilig-Wachtwoord-42").await;
//! assert!(result.is_success());
//! assert!(auth.is_authenticated());
//! # Ok(())
//! # }
//! ```
use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use dashmap::{DashMap, DashSet};
use serde_json::{Map, Value, json};
use tokio::sync::watch;

use securyflex_core::{
    events::{Event, SessionEndReason, UnlockReason},
    services::{AttemptKind, AttemptTracker, LockoutManager, LockoutStatus, SessionManager},
    user::fields,
    validation::normalize_identifier,
};

pub mod builder;
pub mod config;
pub mod state;
pub mod strategy;

mod account;

pub use builder::{AuthServiceBuilder, AuthServiceBuilderError, NoProviders, WithProviders};
pub use config::{AuthConfig, ConfigError, DemoCredential};
pub use state::AuthState;
pub use strategy::{
    AuthStrategy, DemoAuthStrategy, ProductionAuthStrategy, SignIn, StrategyError,
};

pub use securyflex_core::{
    AuthResult, Clock, ErrorCode, IdentityProvider, ManualClock, ProfileFields, ProfileStore,
    ProviderUser, SessionStatus, SystemClock, UserId, UserIdentity, UserType,
    error::ProviderError,
    events::{EventBus, EventHandler},
    providers::{InMemoryIdentityProvider, InMemoryProfileStore},
    validation::{
        PasswordValidationResult, calculate_password_strength, is_common_password,
        is_valid_beveiligingspas_number, is_valid_dutch_postal_code, is_valid_email,
        is_valid_kvk, is_valid_password, is_valid_wpbr_number, validate_password_detailed,
    },
};

/// Version of the terms of service users currently have to accept.
pub const CURRENT_TERMS_VERSION: &str = "2024-1";

#[derive(Debug, Clone)]
struct CurrentUser {
    identity: UserIdentity,
    /// Signed in through the demo strategy, unknown to the identity provider
    synthetic: bool,
}

/// The authentication orchestrator.
///
/// `AuthService` owns all rate-limit, lockout and session state, so one instance
/// should be shared (for example behind an [`Arc`]) for the lifetime of the
/// process. It is `Send + Sync`; no lock is held across a provider call.
///
/// Build one with [`AuthServiceBuilder`], or with [`AuthService::new`] for the
/// default policy.
pub struct AuthService<I: IdentityProvider, P: ProfileStore> {
    identity: Arc<I>,
    profiles: Arc<P>,
    strategy: Arc<dyn AuthStrategy>,
    attempts: AttemptTracker,
    lockout: LockoutManager,
    sessions: SessionManager,
    events: EventBus,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    current: RwLock<Option<CurrentUser>>,
    state: watch::Sender<AuthState>,
    in_flight: DashSet<String>,
    verification_sent: DashMap<String, DateTime<Utc>>,
    reset_sent: DashMap<String, DateTime<Utc>>,
}

impl<I: IdentityProvider, P: ProfileStore> AuthService<I, P> {
    /// Create a service with the default configuration and the system clock.
    pub fn new(identity: Arc<I>, profiles: Arc<P>) -> Self {
        Self::from_parts(
            identity,
            profiles,
            AuthConfig::default(),
            Arc::new(SystemClock),
            EventBus::default(),
        )
    }

    pub(crate) fn from_parts(
        identity: Arc<I>,
        profiles: Arc<P>,
        config: AuthConfig,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Self {
        let production = ProductionAuthStrategy::new(identity.clone(), config.provider_configured);
        let strategy: Arc<dyn AuthStrategy> = if config.demo_enabled() {
            tracing::warn!(
                accounts = config.demo_credentials.len(),
                "Demo mode enabled, demo accounts bypass the identity provider"
            );
            Arc::new(DemoAuthStrategy::new(
                production,
                config.demo_credentials.clone(),
            ))
        } else {
            Arc::new(production)
        };

        let (state, _) = watch::channel(AuthState::Initial);

        Self {
            attempts: AttemptTracker::with_clock(config.rate_limit.clone(), clock.clone()),
            lockout: LockoutManager::with_clock(config.lockout.clone(), clock.clone()),
            sessions: SessionManager::with_clock(config.session.clone(), clock.clone()),
            identity,
            profiles,
            strategy,
            events,
            clock,
            config,
            current: RwLock::new(None),
            state,
            in_flight: DashSet::new(),
            verification_sent: DashMap::new(),
            reset_sent: DashMap::new(),
        }
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn attempts(&self) -> &AttemptTracker {
        &self.attempts
    }

    pub fn lockout(&self) -> &LockoutManager {
        &self.lockout
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Name of the sign-in strategy selected at construction.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }

    /// Receive every [`AuthState`] change.
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    pub fn auth_state(&self) -> AuthState {
        self.state.borrow().clone()
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    fn set_state(&self, state: AuthState) {
        self.state.send_replace(state);
    }

    fn current(&self) -> Option<CurrentUser> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_current(&self, user: Option<CurrentUser>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = user;
    }

    /// Make `user` the current user. A different previous user loses their session.
    fn install_current(&self, user: CurrentUser) {
        let user_id = user.identity.user_id.clone();
        let previous = self
            .current
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(user);
        if let Some(previous) = previous.filter(|p| p.identity.user_id != user_id) {
            self.sessions.invalidate_session(&previous.identity.user_id);
            tracing::debug!(user.id = %previous.identity.user_id, "Replaced by another user, session ended");
        }
    }

    fn is_current(&self, user_id: &UserId) -> bool {
        self.current()
            .is_some_and(|c| &c.identity.user_id == user_id)
    }

    async fn emit(&self, event: Event) {
        if let Err(e) = self.events.emit(&event).await {
            tracing::warn!(error = %e, "Event handler failed");
        }
    }

    /// Provider sign-out whose failure is only logged.
    async fn sign_out_quietly(&self) {
        if let Err(e) = self.identity.sign_out().await {
            tracing::warn!(error = %e, "Provider sign-out failed");
        }
    }

    /// Sign in with email and password.
    ///
    /// The email is trimmed for the provider call and additionally lowercased for
    /// rate limiting and lockout. Lockout is checked before the rate limit, and
    /// neither rejection reaches the provider.
    pub async fn login(&self, email: &str, password: &str) -> AuthResult {
        let email = email.trim();
        let identifier = normalize_identifier(email);

        let Some(_guard) =
            state::InFlightGuard::acquire(&self.in_flight, format!("login:{identifier}"))
        else {
            tracing::debug!(email = %identifier, "Login already in progress");
            return AuthResult::failure(ErrorCode::OperationInProgress);
        };

        if self.lockout.check_expired(&identifier) {
            self.emit(Event::AccountUnlocked {
                email: identifier.clone(),
                reason: UnlockReason::LockoutExpired,
                timestamp: self.now(),
            })
            .await;
        }

        let lockout = self.lockout.lockout_status(&identifier);
        if lockout.is_locked {
            tracing::debug!(email = %identifier, "Login refused, account locked");
            return self.account_locked(&lockout);
        }

        if self.attempts.is_rate_limited(&identifier, AttemptKind::Login) {
            let minutes = self
                .attempts
                .remaining_lock_minutes(&identifier, AttemptKind::Login);
            tracing::debug!(email = %identifier, minutes, "Login refused, rate limited");
            return rate_limited_minutes(
                format!("Te veel inlogpogingen. Probeer het over {minutes} minuten opnieuw."),
                minutes,
            );
        }

        match self.strategy.sign_in(email, password).await {
            Ok(signed_in) => self.complete_login(&identifier, signed_in).await,
            Err(StrategyError::WeakDemoPassword) => {
                self.record_failed_login(&identifier).await;
                AuthResult::failure(ErrorCode::WeakDemoPassword)
            }
            Err(StrategyError::Provider(error)) if error.is_credential_rejection() => {
                tracing::debug!(email = %identifier, error = %error, "Credentials rejected");
                self.record_failed_login(&identifier).await;
                AuthResult::failure(ErrorCode::AuthFailed)
            }
            Err(StrategyError::Provider(error)) => {
                tracing::warn!(email = %identifier, error = %error, "Login failed at the provider");
                provider_failure(&error)
            }
        }
    }

    fn account_locked(&self, status: &LockoutStatus) -> AuthResult {
        let now = self.now();
        let hours = status.remaining_hours_at(now);
        let mut data = Map::new();
        data.insert("remainingHours".into(), json!(hours));
        if let Some(until) = status.locked_until {
            data.insert("lockedUntil".into(), json!(until.to_rfc3339()));
        }
        if let Some(seconds) = status.retry_after_seconds_at(now) {
            data.insert("retryAfterSeconds".into(), json!(seconds));
        }
        AuthResult::failure_with_data(
            ErrorCode::AccountLocked,
            format!(
                "Account tijdelijk geblokkeerd vanwege te veel mislukte inlogpogingen. Probeer het over {hours} uur opnieuw."
            ),
            data,
        )
    }

    async fn record_failed_login(&self, identifier: &str) {
        self.attempts.record_attempt(identifier, AttemptKind::Login);
        let status = self.lockout.record_failed_login(identifier);
        let now = self.now();

        self.emit(Event::LoginFailed {
            email: identifier.to_string(),
            failed_attempts: status.failed_attempts,
            timestamp: now,
        })
        .await;

        let just_locked = status.is_locked
            && status.failed_attempts == self.lockout.config().max_failed_logins;
        if let (true, Some(locked_until)) = (just_locked, status.locked_until) {
            tracing::info!(
                email = %identifier,
                failed_attempts = status.failed_attempts,
                "Account locked"
            );
            self.emit(Event::AccountLocked {
                email: identifier.to_string(),
                failed_attempts: status.failed_attempts,
                locked_until,
                timestamp: now,
            })
            .await;
        }
    }

    async fn complete_login(&self, identifier: &str, signed_in: SignIn) -> AuthResult {
        let synthetic = signed_in.is_synthetic();
        let SignIn { user, profile } = signed_in;

        if !user.email_verified {
            self.sign_out_quietly().await;
            tracing::info!(user.id = %user.user_id, "Login refused, email not verified");
            self.set_state(AuthState::AwaitingEmailVerification { email: user.email });
            return AuthResult::failure(ErrorCode::EmailNotVerified);
        }

        let mut profile = match profile {
            Some(profile) => profile,
            None => match self.load_or_create_profile(&user).await {
                Ok(profile) => profile,
                Err(result) => {
                    self.sign_out_quietly().await;
                    return result;
                }
            },
        };

        self.sessions.initialize_session(&user.user_id);
        self.attempts.clear(identifier, AttemptKind::Login);
        self.lockout.reset_on_success(identifier);

        let now = self.now();
        let last_login = json!(now.to_rfc3339());
        profile.insert(fields::LAST_LOGIN_AT.into(), last_login.clone());
        if !synthetic {
            let mut update = ProfileFields::new();
            update.insert(fields::LAST_LOGIN_AT.into(), last_login);
            if let Err(e) = self.profiles.update_document(&user.user_id, update).await {
                tracing::warn!(user.id = %user.user_id, error = %e, "Failed to update last login time");
            }
        }

        let identity = UserIdentity::from_profile(user.user_id.clone(), &user.email, profile);
        let result = AuthResult::success_with_data("Succesvol ingelogd.", user_data(&identity));

        self.set_state(AuthState::Authenticated {
            user_id: identity.user_id.clone(),
            user_type: identity.user_type,
        });
        self.install_current(CurrentUser {
            identity,
            synthetic,
        });

        self.emit(Event::LoginSucceeded {
            user_id: user.user_id.clone(),
            email: identifier.to_string(),
            timestamp: now,
        })
        .await;
        tracing::info!(
            user.id = %user.user_id,
            strategy = self.strategy.name(),
            "User logged in"
        );
        result
    }

    /// Load the user's profile document, creating a default one if it is missing.
    ///
    /// Store failures are logged and returned as a ready `unknown` result.
    async fn load_or_create_profile(&self, user: &ProviderUser) -> Result<ProfileFields, AuthResult> {
        let existing = self
            .profiles
            .get_document(&user.user_id)
            .await
            .map_err(|e| {
                tracing::error!(user.id = %user.user_id, error = %e, "Failed to load profile");
                AuthResult::failure(ErrorCode::Unknown)
            })?;
        if let Some(profile) = existing {
            return Ok(profile);
        }

        let user_type = if self.config.infer_user_type_from_email {
            UserType::infer_from_email(&user.email)
        } else {
            UserType::default()
        };
        let profile = base_profile(
            &user.email,
            user_type,
            user_type.default_display_name(),
            self.now(),
        );
        self.profiles
            .set_document(&user.user_id, profile.clone())
            .await
            .map_err(|e| {
                tracing::error!(user.id = %user.user_id, error = %e, "Failed to create profile");
                AuthResult::failure(ErrorCode::Unknown)
            })?;

        tracing::info!(user.id = %user.user_id, user_type = %user_type, "Created default profile");
        Ok(profile)
    }

    /// Sign out. Provider errors are logged and otherwise ignored; local state is
    /// always cleared.
    pub async fn logout(&self) -> AuthResult {
        let current = self.current();
        self.sign_out_quietly().await;
        self.set_current(None);

        if let Some(current) = current {
            let user_id = current.identity.user_id;
            self.sessions.invalidate_session(&user_id);
            tracing::info!(user.id = %user_id, "User logged out");
            self.emit(Event::SessionEnded {
                user_id,
                reason: SessionEndReason::Logout,
                timestamp: self.now(),
            })
            .await;
        }

        self.set_state(AuthState::Unauthenticated);
        AuthResult::success("Succesvol uitgelogd.")
    }

    /// Tear down an expired session. A `Missing` status counts as an idle
    /// timeout: the session was already removed after expiring.
    async fn end_expired_session(&self, user_id: &UserId, status: SessionStatus) {
        let reason = match status {
            SessionStatus::AbsoluteTimeout => SessionEndReason::AbsoluteTimeout,
            _ => SessionEndReason::IdleTimeout,
        };
        self.sessions.invalidate_session(user_id);
        self.sign_out_quietly().await;
        self.set_current(None);
        self.set_state(AuthState::Unauthenticated);
        self.emit(Event::SessionEnded {
            user_id: user_id.clone(),
            reason,
            timestamp: self.now(),
        })
        .await;
    }

    /// The current user, provided their session is still valid.
    async fn require_session(&self) -> Result<CurrentUser, AuthResult> {
        let Some(current) = self.current() else {
            return Err(AuthResult::failure(ErrorCode::NotAuthenticated));
        };
        match self.sessions.check_session(&current.identity.user_id) {
            SessionStatus::Valid => Ok(current),
            // Missing too: the current user's session only disappears once it expired
            status => {
                self.end_expired_session(&current.identity.user_id, status)
                    .await;
                Err(AuthResult::failure(ErrorCode::SessionExpired))
            }
        }
    }

    /// Reconcile the provider's signed-in user with the local session.
    ///
    /// Used at startup and when the app returns to the foreground. A provider
    /// user this instance has not seen yet (after a restart) gets a fresh
    /// session; a missing session of the current user means it expired.
    pub async fn check_auth_state(&self) -> AuthResult {
        if let Some(current) = self.current().filter(|c| c.synthetic) {
            return match self.require_session().await {
                Ok(_) => AuthResult::success_with_data("Ingelogd.", user_data(&current.identity)),
                Err(result) => {
                    self.set_state(AuthState::Unauthenticated);
                    result
                }
            };
        }

        let user = match self.identity.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => {
                if let Some(current) = self.current() {
                    self.sessions.invalidate_session(&current.identity.user_id);
                }
                self.set_current(None);
                self.set_state(AuthState::Unauthenticated);
                return AuthResult::failure(ErrorCode::NotAuthenticated);
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to read the provider's current user");
                return provider_failure(&e);
            }
        };

        if !user.email_verified {
            self.sessions.invalidate_session(&user.user_id);
            self.sign_out_quietly().await;
            self.set_current(None);
            self.set_state(AuthState::AwaitingEmailVerification { email: user.email });
            return AuthResult::failure(ErrorCode::EmailNotVerified);
        }

        match self.sessions.check_session(&user.user_id) {
            SessionStatus::Valid => {}
            SessionStatus::Missing if !self.is_current(&user.user_id) => {
                self.sessions.initialize_session(&user.user_id);
                tracing::debug!(user.id = %user.user_id, "Session restored from provider state");
            }
            status => {
                tracing::info!(user.id = %user.user_id, status = ?status, "Session expired");
                self.end_expired_session(&user.user_id, status).await;
                return AuthResult::failure(ErrorCode::SessionExpired);
            }
        }

        let identity = match self.current() {
            Some(current) if current.identity.user_id == user.user_id => current.identity,
            _ => match self.load_or_create_profile(&user).await {
                Ok(profile) => UserIdentity::from_profile(user.user_id.clone(), &user.email, profile),
                Err(result) => return result,
            },
        };

        self.set_state(AuthState::Authenticated {
            user_id: identity.user_id.clone(),
            user_type: identity.user_type,
        });
        let result = AuthResult::success_with_data("Ingelogd.", user_data(&identity));
        self.install_current(CurrentUser {
            identity,
            synthetic: false,
        });
        result
    }

    /// Record user activity, resetting the idle timeout. Returns `false` when
    /// there is no valid session; an expired session is left for
    /// [`check_auth_state`](Self::check_auth_state) to end.
    pub fn record_activity(&self) -> bool {
        let Some(current) = self.current() else {
            return false;
        };
        let user_id = &current.identity.user_id;
        self.sessions.session_status(user_id).is_valid()
            && self.sessions.update_last_activity(user_id)
    }

    pub fn current_user_id(&self) -> Option<UserId> {
        self.current().map(|c| c.identity.user_id)
    }

    pub fn current_user_type(&self) -> Option<UserType> {
        self.current().map(|c| c.identity.user_type)
    }

    pub fn current_user_name(&self) -> Option<String> {
        self.current().map(|c| c.identity.name)
    }

    pub fn current_user_data(&self) -> Option<UserIdentity> {
        self.current().map(|c| c.identity)
    }

    /// `true` when a user is signed in and their session has not expired.
    ///
    /// Does not end an expired session; [`check_auth_state`](Self::check_auth_state) does.
    pub fn is_authenticated(&self) -> bool {
        self.current()
            .is_some_and(|c| self.sessions.session_status(&c.identity.user_id).is_valid())
    }
}

/// Profile fields every document written by the auth core starts with.
fn base_profile(email: &str, user_type: UserType, name: &str, now: DateTime<Utc>) -> ProfileFields {
    let mut profile = ProfileFields::new();
    profile.insert(fields::USER_TYPE.into(), json!(user_type.as_str()));
    profile.insert(fields::NAME.into(), json!(name));
    profile.insert(fields::EMAIL.into(), json!(email));
    profile.insert(fields::CREATED_AT.into(), json!(now.to_rfc3339()));
    profile
}

fn user_data(identity: &UserIdentity) -> Map<String, Value> {
    let mut data = Map::new();
    data.insert("userId".into(), json!(identity.user_id.as_str()));
    data.insert("userType".into(), json!(identity.user_type.as_str()));
    data.insert("name".into(), json!(identity.name));
    data.insert("email".into(), json!(identity.email));
    data
}

fn rate_limited_minutes(message: String, minutes: i64) -> AuthResult {
    let mut data = Map::new();
    data.insert("remainingMinutes".into(), json!(minutes));
    AuthResult::failure_with_data(ErrorCode::RateLimited, message, data)
}

/// Translate a provider error into a boundary result.
fn provider_failure(error: &ProviderError) -> AuthResult {
    match error {
        ProviderError::NotConfigured => AuthResult::failure(ErrorCode::ProviderNotConfigured),
        ProviderError::Unavailable(reason) => {
            tracing::error!(error = %reason, "Identity provider unavailable");
            AuthResult::failure(ErrorCode::NetworkRequestFailed)
        }
        ProviderError::Rejected { code, .. } => {
            AuthResult::failure(ErrorCode::from_provider_code(code))
        }
    }
}
