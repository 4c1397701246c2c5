//! In-memory identity provider and profile store
//!
//! Used by the test suites, the CLI and local development. The identity
//! provider mimics the behaviour of a hosted backend closely enough for the
//! orchestrator: per-account verification state, a signed-in user slot, password
//! reset codes and provider error codes.
use std::sync::{
    Mutex, PoisonError, RwLock,
    atomic::{AtomicBool, AtomicUsize, Ordering},
};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::{
    error::{ProviderError, StorageError},
    id::generate_code,
    user::{ProfileFields, UserId},
    validation::normalize_identifier,
};

use super::{IdentityProvider, ProfileStore, ProviderUser};

/// Shortest password the in-memory provider accepts on sign-up, like hosted
/// providers that enforce their own minimum.
const PROVIDER_MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone)]
struct Account {
    user_id: UserId,
    email: String,
    password: String,
    email_verified: bool,
    disabled: bool,
}

impl Account {
    fn provider_user(&self) -> ProviderUser {
        ProviderUser {
            user_id: self.user_id.clone(),
            email: self.email.clone(),
            email_verified: self.email_verified,
        }
    }
}

pub struct InMemoryIdentityProvider {
    configured: AtomicBool,
    accounts: DashMap<String, Account>,
    current: RwLock<Option<String>>,
    reset_codes: DashMap<String, String>,
    verification_emails: DashMap<String, usize>,
    reset_emails: DashMap<String, usize>,
    forced_failure: Mutex<Option<ProviderError>>,
    sign_in_calls: AtomicUsize,
}

impl Default for InMemoryIdentityProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryIdentityProvider {
    pub fn new() -> Self {
        Self {
            configured: AtomicBool::new(true),
            accounts: DashMap::new(),
            current: RwLock::new(None),
            reset_codes: DashMap::new(),
            verification_emails: DashMap::new(),
            reset_emails: DashMap::new(),
            forced_failure: Mutex::new(None),
            sign_in_calls: AtomicUsize::new(0),
        }
    }

    /// A provider that reports itself as unconfigured and refuses every call.
    pub fn unconfigured() -> Self {
        let provider = Self::new();
        provider.configured.store(false, Ordering::SeqCst);
        provider
    }

    /// Seed an account. Returns its user id.
    pub fn add_user(&self, email: &str, password: &str, email_verified: bool) -> UserId {
        let user_id = UserId::new_random();
        self.accounts.insert(
            normalize_identifier(email),
            Account {
                user_id: user_id.clone(),
                email: email.trim().to_string(),
                password: password.to_string(),
                email_verified,
                disabled: false,
            },
        );
        user_id
    }

    /// Mark the account's email address as verified.
    pub fn verify_email(&self, email: &str) -> bool {
        match self.accounts.get_mut(&normalize_identifier(email)) {
            Some(mut account) => {
                account.email_verified = true;
                true
            }
            None => false,
        }
    }

    pub fn disable_user(&self, email: &str) -> bool {
        match self.accounts.get_mut(&normalize_identifier(email)) {
            Some(mut account) => {
                account.disabled = true;
                true
            }
            None => false,
        }
    }

    /// Make every call fail with `error` until [`clear_failure`](Self::clear_failure).
    pub fn fail_with(&self, error: ProviderError) {
        *self
            .forced_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(error);
    }

    pub fn clear_failure(&self) {
        *self
            .forced_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// Number of `sign_in` calls that reached the provider.
    pub fn sign_in_calls(&self) -> usize {
        self.sign_in_calls.load(Ordering::SeqCst)
    }

    pub fn verification_emails_sent(&self, email: &str) -> usize {
        self.verification_emails
            .get(&normalize_identifier(email))
            .map(|n| *n)
            .unwrap_or(0)
    }

    pub fn reset_emails_sent(&self, email: &str) -> usize {
        self.reset_emails
            .get(&normalize_identifier(email))
            .map(|n| *n)
            .unwrap_or(0)
    }

    /// The most recent outstanding reset code issued for `email`.
    pub fn reset_code_for(&self, email: &str) -> Option<String> {
        let key = normalize_identifier(email);
        self.reset_codes
            .iter()
            .find(|entry| *entry.value() == key)
            .map(|entry| entry.key().clone())
    }

    pub fn has_account(&self, email: &str) -> bool {
        self.accounts.contains_key(&normalize_identifier(email))
    }

    fn check_available(&self) -> Result<(), ProviderError> {
        if !self.configured.load(Ordering::SeqCst) {
            return Err(ProviderError::NotConfigured);
        }
        match self
            .forced_failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }

    fn set_current(&self, key: Option<String>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = key;
    }

    fn current_key(&self) -> Option<String> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl IdentityProvider for InMemoryIdentityProvider {
    fn is_configured(&self) -> bool {
        self.configured.load(Ordering::SeqCst)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let key = normalize_identifier(email);
        let user = {
            let account = self
                .accounts
                .get(&key)
                .ok_or_else(|| ProviderError::rejected("user-not-found"))?;
            if account.disabled {
                return Err(ProviderError::rejected("user-disabled"));
            }
            if account.password != password {
                return Err(ProviderError::rejected("wrong-password"));
            }
            account.provider_user()
        };

        self.set_current(Some(key));
        Ok(user)
    }

    async fn sign_up(&self, email: &str, password: &str) -> Result<ProviderUser, ProviderError> {
        self.check_available()?;

        if !crate::validation::is_valid_email(email.trim()) {
            return Err(ProviderError::rejected("invalid-email"));
        }
        if password.chars().count() < PROVIDER_MIN_PASSWORD_LENGTH {
            return Err(ProviderError::rejected("weak-password"));
        }
        if self.has_account(email) {
            return Err(ProviderError::rejected("email-already-in-use"));
        }

        self.add_user(email, password, false);
        let key = normalize_identifier(email);
        let user = self
            .accounts
            .get(&key)
            .map(|account| account.provider_user())
            .ok_or_else(|| ProviderError::Unavailable("account vanished".to_string()))?;
        self.set_current(Some(key));
        Ok(user)
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.set_current(None);
        Ok(())
    }

    async fn send_email_verification(&self) -> Result<(), ProviderError> {
        self.check_available()?;
        let key = self
            .current_key()
            .ok_or_else(|| ProviderError::rejected("user-not-found"))?;
        *self.verification_emails.entry(key).or_default() += 1;
        Ok(())
    }

    async fn send_password_reset_email(&self, email: &str) -> Result<(), ProviderError> {
        self.check_available()?;
        let key = normalize_identifier(email);
        if !self.accounts.contains_key(&key) {
            return Err(ProviderError::rejected("user-not-found"));
        }
        self.reset_codes.retain(|_, owner| *owner != key);
        self.reset_codes.insert(generate_code(16), key.clone());
        *self.reset_emails.entry(key).or_default() += 1;
        Ok(())
    }

    async fn confirm_password_reset(
        &self,
        code: &str,
        new_password: &str,
    ) -> Result<(), ProviderError> {
        self.check_available()?;
        if new_password.chars().count() < PROVIDER_MIN_PASSWORD_LENGTH {
            return Err(ProviderError::rejected("weak-password"));
        }
        let (_, key) = self
            .reset_codes
            .remove(code)
            .ok_or_else(|| ProviderError::rejected("invalid-action-code"))?;
        let mut account = self
            .accounts
            .get_mut(&key)
            .ok_or_else(|| ProviderError::rejected("user-not-found"))?;
        account.password = new_password.to_string();
        Ok(())
    }

    async fn verify_password_reset_code(&self, code: &str) -> Result<String, ProviderError> {
        self.check_available()?;
        let key = self
            .reset_codes
            .get(code)
            .map(|owner| owner.clone())
            .ok_or_else(|| ProviderError::rejected("invalid-action-code"))?;
        self.accounts
            .get(&key)
            .map(|account| account.email.clone())
            .ok_or_else(|| ProviderError::rejected("user-not-found"))
    }

    async fn current_user(&self) -> Result<Option<ProviderUser>, ProviderError> {
        Ok(self
            .current_key()
            .and_then(|key| self.accounts.get(&key).map(|a| a.provider_user())))
    }
}

/// Profile documents kept in a concurrent map.
#[derive(Default)]
pub struct InMemoryProfileStore {
    documents: DashMap<UserId, ProfileFields>,
    offline: AtomicBool,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// While offline every call fails with [`StorageError::Connection`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> Result<(), StorageError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StorageError::Connection("profile store offline".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn get_document(&self, user_id: &UserId) -> Result<Option<ProfileFields>, StorageError> {
        self.check_online()?;
        Ok(self.documents.get(user_id).map(|d| d.clone()))
    }

    async fn set_document(
        &self,
        user_id: &UserId,
        document: ProfileFields,
    ) -> Result<(), StorageError> {
        self.check_online()?;
        self.documents.insert(user_id.clone(), document);
        Ok(())
    }

    async fn update_document(
        &self,
        user_id: &UserId,
        fields: ProfileFields,
    ) -> Result<(), StorageError> {
        self.check_online()?;
        let mut document = self
            .documents
            .get_mut(user_id)
            .ok_or(StorageError::NotFound)?;
        document.extend(fields);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sign_in_codes() {
        let provider = InMemoryIdentityProvider::new();
        provider.add_user("guard@example.nl", "Secret-Pass-123", true);

        let user = provider
            .sign_in("Guard@Example.nl", "Secret-Pass-123")
            .await
            .unwrap();
        assert!(user.email_verified);
        assert_eq!(provider.current_user().await.unwrap(), Some(user));

        let err = provider
            .sign_in("guard@example.nl", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("wrong-password"));

        let err = provider
            .sign_in("nobody@example.nl", "wrong")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("user-not-found"));
        assert_eq!(provider.sign_in_calls(), 3);
    }

    #[tokio::test]
    async fn test_sign_up_and_sign_out() {
        let provider = InMemoryIdentityProvider::new();
        let user = provider
            .sign_up("new@example.nl", "Secret-Pass-123")
            .await
            .unwrap();
        assert!(!user.email_verified);

        let err = provider
            .sign_up("NEW@example.nl", "Secret-Pass-123")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("email-already-in-use"));

        provider.sign_out().await.unwrap();
        assert_eq!(provider.current_user().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_password_reset_flow() {
        let provider = InMemoryIdentityProvider::new();
        provider.add_user("user@example.nl", "Old-Password-1", true);
        provider
            .send_password_reset_email("user@example.nl")
            .await
            .unwrap();

        let code = provider.reset_code_for("user@example.nl").unwrap();
        assert_eq!(
            provider.verify_password_reset_code(&code).await.unwrap(),
            "user@example.nl"
        );
        provider
            .confirm_password_reset(&code, "New-Password-12")
            .await
            .unwrap();
        assert!(provider.reset_code_for("user@example.nl").is_none());
        provider
            .sign_in("user@example.nl", "New-Password-12")
            .await
            .unwrap();

        let err = provider
            .confirm_password_reset(&code, "Another-Pass-12")
            .await
            .unwrap_err();
        assert_eq!(err.code(), Some("invalid-action-code"));
    }

    #[tokio::test]
    async fn test_unconfigured_and_forced_failures() {
        let provider = InMemoryIdentityProvider::unconfigured();
        assert!(!provider.is_configured());
        assert_eq!(
            provider.sign_in("a@b.nl", "x").await.unwrap_err(),
            ProviderError::NotConfigured
        );

        let provider = InMemoryIdentityProvider::new();
        provider.fail_with(ProviderError::rejected("network-request-failed"));
        let err = provider.sign_in("a@b.nl", "x").await.unwrap_err();
        assert_eq!(err.code(), Some("network-request-failed"));
        provider.clear_failure();
        let err = provider.sign_in("a@b.nl", "x").await.unwrap_err();
        assert_eq!(err.code(), Some("user-not-found"));
    }

    #[tokio::test]
    async fn test_profile_store() {
        let store = InMemoryProfileStore::new();
        let user_id = UserId::new("u1");

        assert!(store.get_document(&user_id).await.unwrap().is_none());
        assert!(matches!(
            store.update_document(&user_id, ProfileFields::new()).await,
            Err(StorageError::NotFound)
        ));

        let mut doc = ProfileFields::new();
        doc.insert("name".into(), json!("Jan"));
        store.set_document(&user_id, doc).await.unwrap();

        let mut update = ProfileFields::new();
        update.insert("phone".into(), json!("0612345678"));
        store.update_document(&user_id, update).await.unwrap();

        let doc = store.get_document(&user_id).await.unwrap().unwrap();
        assert_eq!(doc.get("name"), Some(&json!("Jan")));
        assert_eq!(doc.get("phone"), Some(&json!("0612345678")));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_profile_store_offline() {
        let store = InMemoryProfileStore::new();
        let user_id = UserId::new("u1");
        store.set_offline(true);
        assert!(matches!(
            store.get_document(&user_id).await,
            Err(StorageError::Connection(_))
        ));
        assert!(matches!(
            store.set_document(&user_id, ProfileFields::new()).await,
            Err(StorageError::Connection(_))
        ));

        store.set_offline(false);
        assert!(store.get_document(&user_id).await.unwrap().is_none());
    }
}
