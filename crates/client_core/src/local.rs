//! Record and blob store backed by the local SQLite document store.

use async_trait::async_trait;
use shared::domain::{ResourceKind, UserId, UserProfile};
use storage::Storage;

use crate::{
    collaborators::{BlobStore, RecordStore},
    error::ServiceError,
};

#[async_trait]
impl RecordStore for Storage {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ServiceError> {
        self.load_user_profile(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(ResourceKind::User, id.as_str()))
    }

    async fn put_user(&self, profile: &UserProfile) -> Result<(), ServiceError> {
        self.save_user_profile(profile).await?;
        Ok(())
    }
}

#[async_trait]
impl BlobStore for Storage {
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.load_blob(path).await?)
    }
}
