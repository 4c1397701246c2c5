use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::{error::ProviderError, user::UserId};

/// A user as reported by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderUser {
    pub user_id: UserId,
    pub email: String,
    pub email_verified: bool,
}

/// Credential and email-flow operations of a hosted identity provider.
///
/// The provider keeps its own notion of a signed-in user, which
/// [`current_user`](IdentityProvider::current_user) exposes. Rejections are
/// reported as [`ProviderError::Rejected`] with the provider's code
/// (`wrong-password`, `email-already-in-use`, `invalid-action-code`, ...).
#[async_trait]
pub trait IdentityProvider: Send + Sync + 'static {
    /// Whether the provider has the configuration it needs to serve requests.
    fn is_configured(&self) -> bool {
        true
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    /// Create an account. The new account is signed in afterwards.
    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError>;

    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Send a verification email to the signed-in user.
    async fn send_email_verification(&self) -> Result<(), ProviderError>;

    async fn send_password_reset_email(&self, email: &str) -> Result<(), ProviderError>;

    async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &str,
    ) -> Result<(), ProviderError>;

    /// Check a password reset code and return the email it belongs to.
    async fn verify_password_reset_code(&self, code: &str) -> Result<String, ProviderError>;

    /// The signed-in user with freshly loaded verification state, if any.
    async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError>;
}
