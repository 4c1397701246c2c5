//! Sign-in strategies
//!
//! The strategy is chosen once when the service is built. Production deployments
//! always get [`ProductionAuthStrategy`]; [`DemoAuthStrategy`] is only selected
//! when the configuration allows demo mode, and it wraps the production strategy
//! so that non-demo accounts keep working.
use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use securyflex_core::{
    IdentityProvider, ProfileFields, ProviderUser, UserId,
    error::ProviderError,
    user::fields,
    validation::{normalize_identifier, validate_password_detailed},
};

use crate::config::DemoCredential;

/// A successful sign-in.
#[derive(Debug, Clone)]
pub struct SignIn {
    pub user: ProviderUser,
    /// Profile supplied by the strategy itself. `None` means it has to be loaded
    /// from the profile store.
    pub profile: Option<ProfileFields>,
}

impl SignIn {
    /// Demo sign-ins never touch the provider or the profile store.
    pub fn is_synthetic(&self) -> bool {
        self.profile.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("Demo account password does not meet the password policy")]
    WeakDemoPassword,
}

#[async_trait]
pub trait AuthStrategy: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Authenticate `email` (trimmed, original case) with `password`.
    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, StrategyError>;
}

/// Signs in against the identity provider.
pub struct ProductionAuthStrategy<I: IdentityProvider> {
    identity: Arc<I>,
    provider_configured: bool,
}

impl<I: IdentityProvider> ProductionAuthStrategy<I> {
    pub fn new(identity: Arc<I>, provider_configured: bool) -> Self {
        Self {
            identity,
            provider_configured,
        }
    }
}

#[async_trait]
impl<I: IdentityProvider> AuthStrategy for ProductionAuthStrategy<I> {
    fn name(&self) -> &'static str {
        "production"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, StrategyError> {
        if !self.provider_configured || !self.identity.is_configured() {
            return Err(ProviderError::NotConfigured.into());
        }

        let user = self.identity.sign_in(email, password).await?;
        Ok(SignIn {
            user,
            profile: None,
        })
    }
}

/// Serves pre-provisioned demo accounts and delegates everything else.
pub struct DemoAuthStrategy<I: IdentityProvider> {
    inner: ProductionAuthStrategy<I>,
    credentials: HashMap<String, DemoCredential>,
}

impl<I: IdentityProvider> DemoAuthStrategy<I> {
    /// `credentials` must be keyed by normalized email.
    pub fn new(inner: ProductionAuthStrategy<I>, credentials: HashMap<String, DemoCredential>) -> Self {
        Self { inner, credentials }
    }

    fn synthetic_sign_in(email: &str, key: &str, credential: &DemoCredential) -> SignIn {
        let user_id = UserId::new(&format!("demo_{}", key.replace(['@', '.'], "_")));
        let name = credential
            .name
            .clone()
            .unwrap_or_else(|| credential.user_type.default_display_name().to_string());

        let mut profile = ProfileFields::new();
        profile.insert(fields::USER_TYPE.into(), json!(credential.user_type.as_str()));
        profile.insert(fields::NAME.into(), json!(name));
        profile.insert(fields::EMAIL.into(), json!(email));
        profile.insert(fields::CREATED_AT.into(), json!(Utc::now().to_rfc3339()));
        profile.insert("demo".into(), json!(true));

        SignIn {
            user: ProviderUser {
                user_id,
                email: email.to_string(),
                email_verified: true,
            },
            profile: Some(profile),
        }
    }
}

#[async_trait]
impl<I: IdentityProvider> AuthStrategy for DemoAuthStrategy<I> {
    fn name(&self) -> &'static str {
        "demo"
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignIn, StrategyError> {
        let key = normalize_identifier(email);
        if let Some(credential) = self.credentials.get(&key) {
            if !validate_password_detailed(&credential.password).is_valid() {
                tracing::warn!(email = %key, "Demo account has a weak password, refusing demo login");
                return Err(StrategyError::WeakDemoPassword);
            }
            if credential.password == password {
                tracing::info!(email = %key, "Demo login");
                return Ok(Self::synthetic_sign_in(email, &key, credential));
            }
        }

        self.inner.sign_in(email, password).await
    }
}
