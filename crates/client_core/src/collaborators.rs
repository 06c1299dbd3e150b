//! Narrow capability traits the controllers are built from.
//!
//! Each trait covers one external service: the REST catalog, the user record
//! store, the blob store and the identity provider. `Missing*` types stand in
//! for a service that was not configured and fail every call.

use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{
    Company, CompanyId, Event, EventId, JobOffer, JobOfferId, Listing, ResourceKind, UserId,
    UserProfile,
};
use tokio::sync::RwLock;

use crate::error::ServiceError;

/// Remote listing/detail fetches for the public catalog.
#[async_trait]
pub trait RemoteCatalog: Send + Sync {
    async fn companies(&self) -> Result<Listing<Company>, ServiceError>;
    async fn company(&self, id: &CompanyId) -> Result<Company, ServiceError>;
    async fn jobs(&self) -> Result<Listing<JobOffer>, ServiceError>;
    async fn job(&self, id: &JobOfferId) -> Result<JobOffer, ServiceError>;
    async fn events(&self) -> Result<Listing<Event>, ServiceError>;
    async fn event(&self, id: &EventId) -> Result<Event, ServiceError>;
}

/// User documents with full-overwrite semantics.
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ServiceError>;
    async fn put_user(&self, profile: &UserProfile) -> Result<(), ServiceError>;
}

/// Binary objects such as profile images.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// `Ok(None)` when nothing is stored at `path`.
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError>;
}

#[async_trait]
pub trait Identity: Send + Sync {
    async fn current_user_id(&self) -> Option<UserId>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, ServiceError>;
    async fn register(&self, registration: &Registration) -> Result<UserId, ServiceError>;
    async fn sign_out(&self);
}

/// Identity fixed at construction time, or swapped explicitly.
#[derive(Default)]
pub struct StaticIdentity {
    user_id: RwLock<Option<UserId>>,
}

impl StaticIdentity {
    pub fn signed_in(user_id: UserId) -> Self {
        Self {
            user_id: RwLock::new(Some(user_id)),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub async fn set(&self, user_id: Option<UserId>) {
        *self.user_id.write().await = user_id;
    }
}

#[async_trait]
impl Identity for StaticIdentity {
    async fn current_user_id(&self) -> Option<UserId> {
        self.user_id.read().await.clone()
    }
}

pub struct MissingCatalog;

#[async_trait]
impl RemoteCatalog for MissingCatalog {
    async fn companies(&self) -> Result<Listing<Company>, ServiceError> {
        Err(unavailable("catalog"))
    }

    async fn company(&self, _id: &CompanyId) -> Result<Company, ServiceError> {
        Err(unavailable("catalog"))
    }

    async fn jobs(&self) -> Result<Listing<JobOffer>, ServiceError> {
        Err(unavailable("catalog"))
    }

    async fn job(&self, _id: &JobOfferId) -> Result<JobOffer, ServiceError> {
        Err(unavailable("catalog"))
    }

    async fn events(&self) -> Result<Listing<Event>, ServiceError> {
        Err(unavailable("catalog"))
    }

    async fn event(&self, _id: &EventId) -> Result<Event, ServiceError> {
        Err(unavailable("catalog"))
    }
}

pub struct MissingRecordStore;

#[async_trait]
impl RecordStore for MissingRecordStore {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ServiceError> {
        Err(ServiceError::not_found(ResourceKind::User, id.as_str()))
    }

    async fn put_user(&self, _profile: &UserProfile) -> Result<(), ServiceError> {
        Err(ServiceError::Store("record store is unavailable".into()))
    }
}

pub struct MissingBlobStore;

#[async_trait]
impl BlobStore for MissingBlobStore {
    async fn fetch_bytes(&self, _path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(None)
    }
}

pub struct MissingAuthProvider;

#[async_trait]
impl AuthProvider for MissingAuthProvider {
    async fn sign_in(&self, _credentials: &Credentials) -> Result<UserId, ServiceError> {
        Err(unavailable("authentication provider"))
    }

    async fn register(&self, _registration: &Registration) -> Result<UserId, ServiceError> {
        Err(unavailable("authentication provider"))
    }

    async fn sign_out(&self) {}
}

fn unavailable(service: &str) -> ServiceError {
    ServiceError::Transport(format!("{service} is unavailable"))
}

/// The full set of services a screen controller may be built from.
#[derive(Clone)]
pub struct Collaborators {
    pub catalog: Arc<dyn RemoteCatalog>,
    pub records: Arc<dyn RecordStore>,
    pub blobs: Arc<dyn BlobStore>,
    pub identity: Arc<dyn Identity>,
    pub auth: Arc<dyn AuthProvider>,
}

impl Default for Collaborators {
    fn default() -> Self {
        Self {
            catalog: Arc::new(MissingCatalog),
            records: Arc::new(MissingRecordStore),
            blobs: Arc::new(MissingBlobStore),
            identity: Arc::new(StaticIdentity::anonymous()),
            auth: Arc::new(MissingAuthProvider),
        }
    }
}

impl Collaborators {
    pub fn with_catalog(mut self, catalog: Arc<dyn RemoteCatalog>) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_records(mut self, records: Arc<dyn RecordStore>) -> Self {
        self.records = records;
        self
    }

    pub fn with_blobs(mut self, blobs: Arc<dyn BlobStore>) -> Self {
        self.blobs = blobs;
        self
    }

    pub fn with_identity(mut self, identity: Arc<dyn Identity>) -> Self {
        self.identity = identity;
        self
    }

    pub fn with_auth(mut self, auth: Arc<dyn AuthProvider>) -> Self {
        self.auth = auth;
        self
    }
}
