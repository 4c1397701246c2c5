//! Account lifecycle operations: registration, email verification, password
//! reset, profile updates and terms acceptance.
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde_json::{Map, json};

use securyflex_core::{
    error::ValidationError,
    events::{Event, UnlockReason},
    services::AttemptKind,
    user::fields,
    validation::{normalize_identifier, validate_name},
};

use crate::{
    AuthResult, AuthService, AuthState, CURRENT_TERMS_VERSION, ErrorCode, IdentityProvider,
    PasswordValidationResult, ProfileFields, ProfileStore, UserIdentity, UserType, base_profile,
    is_valid_email, provider_failure, rate_limited_minutes, state::InFlightGuard,
    validate_password_detailed,
};

/// Fields a registration may not set through `additional_data`.
const REGISTRATION_RESERVED: &[&str] = &[fields::NAME];

fn weak_password(check: PasswordValidationResult) -> AuthResult {
    let strength = check.strength();
    let errors = check.into_errors();
    let mut data = Map::new();
    data.insert("strength".into(), json!(strength));
    data.insert("errors".into(), json!(errors));
    AuthResult::failure_with_data(ErrorCode::WeakPassword, ErrorCode::WeakPassword.message(), data)
}

fn invalid_name(error: ValidationError) -> AuthResult {
    let message = match error {
        ValidationError::InvalidName(message) => message,
        other => other.to_string(),
    };
    let mut data = Map::new();
    data.insert("field".into(), json!(fields::NAME));
    AuthResult::failure_with_data(ErrorCode::InvalidInput, message, data)
}

fn cooldown_active(seconds: i64, message: String) -> AuthResult {
    let mut data = Map::new();
    data.insert("remainingSeconds".into(), json!(seconds));
    AuthResult::failure_with_data(ErrorCode::RateLimited, message, data)
}

impl<I: IdentityProvider, P: ProfileStore> AuthService<I, P> {
    /// Seconds left on a cooldown started at the time stored for `key`.
    /// Finished cooldowns are removed.
    fn cooldown_remaining(
        &self,
        sent: &DashMap<String, DateTime<Utc>>,
        key: &str,
        cooldown: Duration,
    ) -> Option<i64> {
        let started = sent.get(key).map(|at| *at)?;
        let remaining = cooldown - (self.now() - started);
        if remaining > Duration::zero() {
            Some((remaining.num_milliseconds() + 999) / 1000)
        } else {
            sent.remove(key);
            None
        }
    }

    /// Create an account.
    ///
    /// Input is validated before any provider call: the email format, every
    /// password rule (reported together in `data.errors`) and the display name.
    /// The account is left signed in at the provider, unverified and without a
    /// local session, so a verification email can be resent.
    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: &str,
        user_type: UserType,
        additional_data: Option<ProfileFields>,
    ) -> AuthResult {
        let email = email.trim();
        let identifier = normalize_identifier(email);

        if !is_valid_email(email) {
            return AuthResult::failure(ErrorCode::InvalidEmail);
        }
        let check = validate_password_detailed(password);
        if !check.is_valid() {
            return weak_password(check);
        }
        if let Err(e) = validate_name(name) {
            return invalid_name(e);
        }
        if !self.config.provider_configured || !self.identity.is_configured() {
            return AuthResult::failure(ErrorCode::ProviderNotConfigured);
        }

        let Some(_guard) =
            InFlightGuard::acquire(&self.in_flight, format!("register:{identifier}"))
        else {
            return AuthResult::failure(ErrorCode::OperationInProgress);
        };

        if self
            .attempts
            .is_rate_limited(&identifier, AttemptKind::Registration)
        {
            let minutes = self
                .attempts
                .remaining_lock_minutes(&identifier, AttemptKind::Registration);
            tracing::debug!(email = %identifier, minutes, "Registration refused, rate limited");
            return rate_limited_minutes(
                format!("Te veel registratiepogingen. Probeer het over {minutes} minuten opnieuw."),
                minutes,
            );
        }
        self.attempts
            .record_attempt(&identifier, AttemptKind::Registration);

        let user = match self.identity.sign_up(email, password).await {
            Ok(user) => user,
            Err(e) => {
                tracing::info!(email = %identifier, error = %e, "Registration rejected by provider");
                return provider_failure(&e);
            }
        };

        if let Err(e) = self.identity.send_email_verification().await {
            tracing::warn!(user.id = %user.user_id, error = %e, "Failed to send verification email");
        } else {
            self.verification_sent.insert(identifier.clone(), self.now());
        }

        let mut profile: ProfileFields = additional_data
            .unwrap_or_default()
            .into_iter()
            .filter(|(key, _)| {
                !fields::PROTECTED.contains(&key.as_str())
                    && !REGISTRATION_RESERVED.contains(&key.as_str())
            })
            .collect();
        profile.extend(base_profile(email, user_type, name.trim(), self.now()));

        if let Err(e) = self
            .profiles
            .set_document(&user.user_id, profile)
            .await
        {
            tracing::error!(user.id = %user.user_id, error = %e, "Failed to write profile");
            return AuthResult::failure(ErrorCode::Unknown);
        }

        self.set_state(AuthState::AwaitingEmailVerification {
            email: email.to_string(),
        });
        self.emit(Event::UserRegistered {
            user_id: user.user_id.clone(),
            email: identifier,
            user_type,
            timestamp: self.now(),
        })
        .await;
        tracing::info!(user.id = %user.user_id, user_type = %user_type, "User registered");

        let mut data = Map::new();
        data.insert("userId".into(), json!(user.user_id.as_str()));
        data.insert("requiresEmailVerification".into(), json!(true));
        AuthResult::success_with_data(
            "Account aangemaakt. Controleer je e-mail om je account te verifiëren.",
            data,
        )
    }

    /// Send the verification email again to the provider's signed-in user.
    pub async fn resend_email_verification(&self) -> AuthResult {
        let user = match self.identity.current_user().await {
            Ok(Some(user)) => user,
            Ok(None) => return AuthResult::failure(ErrorCode::NotAuthenticated),
            Err(e) => return provider_failure(&e),
        };
        if user.email_verified {
            return AuthResult::success("Je e-mailadres is al geverifieerd.");
        }

        let key = normalize_identifier(&user.email);
        if let Some(seconds) = self.cooldown_remaining(
            &self.verification_sent,
            &key,
            self.config.cooldown.email_verification,
        ) {
            return cooldown_active(
                seconds,
                format!("Wacht nog {seconds} seconden voordat je een nieuwe verificatie-e-mail aanvraagt."),
            );
        }

        if let Err(e) = self.identity.send_email_verification().await {
            tracing::warn!(user.id = %user.user_id, error = %e, "Failed to resend verification email");
            return provider_failure(&e);
        }
        self.verification_sent.insert(key, self.now());
        AuthResult::success("Verificatie-e-mail verzonden.")
    }

    /// Request a password reset email.
    ///
    /// Unknown addresses are reported as success so the response does not reveal
    /// which emails have an account.
    pub async fn send_password_reset_email(&self, email: &str) -> AuthResult {
        let email = email.trim();
        if !is_valid_email(email) {
            return AuthResult::failure(ErrorCode::InvalidEmail);
        }

        let key = normalize_identifier(email);
        if let Some(seconds) =
            self.cooldown_remaining(&self.reset_sent, &key, self.config.cooldown.password_reset)
        {
            return cooldown_active(
                seconds,
                format!("Wacht nog {seconds} seconden voordat je opnieuw een reset-e-mail aanvraagt."),
            );
        }

        match self.identity.send_password_reset_email(email).await {
            Ok(()) => {}
            Err(e) if e.code() == Some("user-not-found") => {
                tracing::debug!(email = %key, "Password reset requested for unknown email");
            }
            Err(e) => {
                tracing::warn!(email = %key, error = %e, "Failed to send password reset email");
                return provider_failure(&e);
            }
        }

        self.reset_sent.insert(key, self.now());
        AuthResult::success(
            "Als er een account bestaat voor dit e-mailadres, is er een e-mail verzonden om je wachtwoord te herstellen.",
        )
    }

    /// Check a password reset code. `data.email` holds the account's email.
    pub async fn verify_password_reset_code(&self, code: &str) -> AuthResult {
        match self.identity.verify_password_reset_code(code.trim()).await {
            Ok(email) => {
                let mut data = Map::new();
                data.insert("email".into(), json!(email));
                AuthResult::success_with_data("Code is geldig.", data)
            }
            Err(e) => provider_failure(&e),
        }
    }

    /// Set a new password with a reset code.
    ///
    /// The new password must satisfy the password policy. A successful reset
    /// lifts any lockout and clears login attempts for the account.
    pub async fn confirm_password_reset(&self, code: &str, new_password: &str) -> AuthResult {
        let check = validate_password_detailed(new_password);
        if !check.is_valid() {
            return weak_password(check);
        }

        let code = code.trim();
        let email = match self.identity.verify_password_reset_code(code).await {
            Ok(email) => email,
            Err(e) => return provider_failure(&e),
        };
        if let Err(e) = self.identity.confirm_password_reset(code, new_password).await {
            tracing::warn!(error = %e, "Password reset confirmation failed");
            return provider_failure(&e);
        }

        let key = normalize_identifier(&email);
        let was_locked = self.lockout.unlock(&key);
        self.attempts.clear(&key, AttemptKind::Login);
        self.reset_sent.remove(&key);

        if was_locked {
            self.emit(Event::AccountUnlocked {
                email: key.clone(),
                reason: UnlockReason::PasswordReset,
                timestamp: self.now(),
            })
            .await;
        }
        tracing::info!(email = %key, "Password reset completed");

        AuthResult::success("Je wachtwoord is gewijzigd. Je kunt nu inloggen.")
    }

    /// Merge `fields` into the current user's profile.
    ///
    /// Requires a valid session. Fields owned by the auth core (`userType`,
    /// `email`, timestamps, terms) are rejected.
    pub async fn update_profile(&self, update: ProfileFields) -> AuthResult {
        let current = match self.require_session().await {
            Ok(current) => current,
            Err(result) => return result,
        };

        let protected: Vec<&str> = update
            .keys()
            .map(String::as_str)
            .filter(|key| fields::PROTECTED.contains(key))
            .collect();
        if !protected.is_empty() {
            let mut data = Map::new();
            data.insert("fields".into(), json!(protected));
            return AuthResult::failure_with_data(
                ErrorCode::InvalidInput,
                format!("Deze velden kunnen niet worden gewijzigd: {}.", protected.join(", ")),
                data,
            );
        }
        if let Some(name) = update.get(fields::NAME) {
            let name = name.as_str().unwrap_or_default();
            if let Err(e) = validate_name(name) {
                return invalid_name(e);
            }
        }

        if let Err(result) = self
            .apply_profile_update(current.identity, current.synthetic, update)
            .await
        {
            return result;
        }
        AuthResult::success("Profiel bijgewerkt.")
    }

    /// Write `update` to the store (unless synthetic) and to the local identity.
    async fn apply_profile_update(
        &self,
        identity: UserIdentity,
        synthetic: bool,
        update: ProfileFields,
    ) -> Result<(), AuthResult> {
        if !synthetic {
            self.profiles
                .update_document(&identity.user_id, update.clone())
                .await
                .map_err(|e| {
                    tracing::error!(user.id = %identity.user_id, error = %e, "Failed to update profile");
                    AuthResult::failure(ErrorCode::Unknown)
                })?;
        }

        let mut profile = identity.profile;
        profile.extend(update);
        let updated = UserIdentity::from_profile(identity.user_id, &identity.email, profile);
        self.sessions.update_last_activity(&updated.user_id);
        self.set_current(Some(crate::CurrentUser {
            identity: updated,
            synthetic,
        }));
        Ok(())
    }

    /// Whether the current user accepted [`CURRENT_TERMS_VERSION`].
    pub fn has_accepted_current_terms(&self) -> bool {
        self.current().is_some_and(|c| {
            c.identity
                .profile
                .get(fields::TERMS_ACCEPTED_VERSION)
                .and_then(|v| v.as_str())
                == Some(CURRENT_TERMS_VERSION)
        })
    }

    /// Record that the current user accepted [`CURRENT_TERMS_VERSION`].
    pub async fn accept_current_terms(&self) -> AuthResult {
        let current = match self.require_session().await {
            Ok(current) => current,
            Err(result) => return result,
        };

        let mut update = ProfileFields::new();
        update.insert(
            fields::TERMS_ACCEPTED_VERSION.into(),
            json!(CURRENT_TERMS_VERSION),
        );
        update.insert(
            fields::TERMS_ACCEPTED_AT.into(),
            json!(self.now().to_rfc3339()),
        );

        if let Err(result) = self
            .apply_profile_update(current.identity, current.synthetic, update)
            .await
        {
            return result;
        }
        tracing::info!(version = CURRENT_TERMS_VERSION, "Terms accepted");
        AuthResult::success("Voorwaarden geaccepteerd.")
    }
}
