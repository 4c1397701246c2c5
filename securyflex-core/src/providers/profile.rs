use async_trait::async_trait;

use crate::{
    error::StorageError,
    user::{ProfileFields, UserId},
};

/// Document store holding one profile document per user.
#[async_trait]
pub trait ProfileStore: Send + Sync + 'static {
    async fn get_document(&self, user_id: &UserId) -> Result<Option<ProfileFields>, StorageError>;

    /// Create or replace the user's document.
    async fn set_document(&self, user_id: &UserId, document: ProfileFields)
    -> Result<(), StorageError>;

    /// Merge `fields` into an existing document.
    ///
    /// Fails with [`StorageError::NotFound`] when the user has no document.
    async fn update_document(
        &self,
        user_id: &UserId,
        fields: ProfileFields,
    ) -> Result<(), StorageError>;
}
