//! In-memory collaborators shared by the controller tests.

use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    },
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use shared::domain::{
    listing_from, Company, CompanyId, ContractType, Event, EventId, JobOffer, JobOfferId, Listing,
    ResourceKind, UserId, UserProfile,
};
use tokio::sync::{Mutex, Notify};

use crate::{
    collaborators::{
        AuthProvider, BlobStore, Collaborators, Credentials, RecordStore, Registration,
        RemoteCatalog, StaticIdentity,
    },
    error::ServiceError,
};

pub fn company(id: &str, name: &str, sector: &str) -> Company {
    Company {
        id: CompanyId::new(id),
        name: name.into(),
        sector: sector.into(),
        description: format!("{name} description"),
        location: "Paris".into(),
        logo_path: None,
        website: None,
    }
}

pub fn job(id: &str, company_id: &str, profession: &str) -> JobOffer {
    JobOffer {
        id: JobOfferId::new(id),
        company_id: CompanyId::new(company_id),
        profession: profession.into(),
        description: format!("{profession} wanted"),
        contract_type: ContractType::FullTime,
        location: "Paris".into(),
        salary: Some("45k".into()),
    }
}

pub fn event(id: &str, title: &str, day: u32) -> Event {
    Event {
        id: EventId::new(id),
        title: title.into(),
        description: String::new(),
        location: "Lyon".into(),
        starts_at: Utc
            .with_ymd_and_hms(2026, 11, day, 18, 0, 0)
            .single()
            .expect("valid date"),
        company_id: None,
    }
}

pub fn profile(id: &str) -> UserProfile {
    let mut profile = UserProfile::new(UserId::new(id), format!("{id}@example.com"));
    profile.first_name = "Grace".into();
    profile.last_name = "Hopper".into();
    profile
}

#[derive(Default)]
pub struct FakeCatalog {
    pub companies: Listing<Company>,
    pub jobs: Listing<JobOffer>,
    pub events: Listing<Event>,
    pub fail_with: Option<ServiceError>,
    pub fail_companies: bool,
    /// When set, every call parks until `release` is notified.
    pub gated: bool,
    pub release: Notify,
    pub job_calls: AtomicUsize,
    pub company_calls: AtomicUsize,
}

impl FakeCatalog {
    pub fn seeded() -> Self {
        Self {
            companies: listing_from([
                company("acme", "Acme", "Logistics"),
                company("globex", "Globex", "Energy"),
            ]),
            jobs: listing_from([
                job("j1", "acme", "Backend Engineer"),
                job("j2", "acme", "Product Designer"),
                job("j3", "globex", "Data Analyst"),
            ]),
            events: listing_from([
                event("e1", "Rust Meetup", 20),
                event("e2", "Career Fair", 5),
                event("e3", "Hiring Night", 12),
            ]),
            ..Self::default()
        }
    }

    pub fn failing(err: ServiceError) -> Self {
        Self {
            fail_with: Some(err),
            ..Self::seeded()
        }
    }

    pub fn gated() -> Self {
        Self {
            gated: true,
            ..Self::seeded()
        }
    }

    async fn enter(&self) -> Result<(), ServiceError> {
        if self.gated {
            self.release.notified().await;
        }
        match &self.fail_with {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl RemoteCatalog for FakeCatalog {
    async fn companies(&self) -> Result<Listing<Company>, ServiceError> {
        self.enter().await?;
        Ok(self.companies.clone())
    }

    async fn company(&self, id: &CompanyId) -> Result<Company, ServiceError> {
        self.company_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        if self.fail_companies {
            return Err(ServiceError::Transport("companies endpoint down".into()));
        }
        self.companies
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Company, id.as_str()))
    }

    async fn jobs(&self) -> Result<Listing<JobOffer>, ServiceError> {
        self.enter().await?;
        Ok(self.jobs.clone())
    }

    async fn job(&self, id: &JobOfferId) -> Result<JobOffer, ServiceError> {
        self.job_calls.fetch_add(1, Ordering::SeqCst);
        self.enter().await?;
        self.jobs
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ResourceKind::JobOffer, id.as_str()))
    }

    async fn events(&self) -> Result<Listing<Event>, ServiceError> {
        self.enter().await?;
        Ok(self.events.clone())
    }

    async fn event(&self, id: &EventId) -> Result<Event, ServiceError> {
        self.enter().await?;
        self.events
            .get(id.as_str())
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ResourceKind::Event, id.as_str()))
    }
}

#[derive(Default)]
pub struct MemoryRecordStore {
    pub users: Mutex<HashMap<UserId, UserProfile>>,
    pub puts: AtomicUsize,
    pub fail_puts: bool,
}

impl MemoryRecordStore {
    pub fn with_users(users: impl IntoIterator<Item = UserProfile>) -> Self {
        Self {
            users: Mutex::new(
                users
                    .into_iter()
                    .map(|profile| (profile.id.clone(), profile))
                    .collect(),
            ),
            ..Self::default()
        }
    }

    pub async fn stored(&self, id: &str) -> Option<UserProfile> {
        self.users.lock().await.get(&UserId::new(id)).cloned()
    }
}

#[async_trait]
impl RecordStore for MemoryRecordStore {
    async fn get_user(&self, id: &UserId) -> Result<UserProfile, ServiceError> {
        self.users
            .lock()
            .await
            .get(id)
            .cloned()
            .ok_or_else(|| ServiceError::not_found(ResourceKind::User, id.as_str()))
    }

    async fn put_user(&self, profile: &UserProfile) -> Result<(), ServiceError> {
        if self.fail_puts {
            return Err(ServiceError::Store("permission denied".into()));
        }
        self.puts.fetch_add(1, Ordering::SeqCst);
        self.users
            .lock()
            .await
            .insert(profile.id.clone(), profile.clone());
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryBlobStore {
    pub blobs: HashMap<String, Vec<u8>>,
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn fetch_bytes(&self, path: &str) -> Result<Option<Vec<u8>>, ServiceError> {
        Ok(self.blobs.get(path).cloned())
    }
}

#[derive(Default)]
pub struct FakeAuth {
    pub accounts: Mutex<HashMap<String, (String, UserId)>>,
    pub sign_outs: AtomicUsize,
}

impl FakeAuth {
    pub fn with_account(email: &str, password: &str, user_id: &str) -> Self {
        let auth = Self::default();
        auth.accounts.try_lock().expect("fresh mutex").insert(
            email.to_string(),
            (password.to_string(), UserId::new(user_id)),
        );
        auth
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, ServiceError> {
        match self.accounts.lock().await.get(&credentials.email) {
            Some((password, user_id)) if *password == credentials.password => {
                Ok(user_id.clone())
            }
            _ => Err(ServiceError::Validation("invalid email or password".into())),
        }
    }

    async fn register(&self, registration: &Registration) -> Result<UserId, ServiceError> {
        let mut accounts = self.accounts.lock().await;
        if accounts.contains_key(&registration.email) {
            return Err(ServiceError::Validation("email already registered".into()));
        }
        let user_id = UserId::new(format!("user-{}", accounts.len() + 1));
        accounts.insert(
            registration.email.clone(),
            (registration.password.clone(), user_id.clone()),
        );
        Ok(user_id)
    }

    async fn sign_out(&self) {
        self.sign_outs.fetch_add(1, Ordering::SeqCst);
    }
}

pub struct Harness {
    pub catalog: Arc<FakeCatalog>,
    pub records: Arc<MemoryRecordStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub identity: Arc<StaticIdentity>,
}

impl Harness {
    pub fn new(catalog: FakeCatalog, records: MemoryRecordStore) -> Self {
        Self {
            catalog: Arc::new(catalog),
            records: Arc::new(records),
            blobs: Arc::new(MemoryBlobStore::default()),
            identity: Arc::new(StaticIdentity::signed_in(UserId::new("u1"))),
        }
    }

    pub fn with_blobs(mut self, blobs: MemoryBlobStore) -> Self {
        self.blobs = Arc::new(blobs);
        self
    }

    pub fn anonymous(mut self) -> Self {
        self.identity = Arc::new(StaticIdentity::anonymous());
        self
    }

    pub fn collaborators(&self) -> Collaborators {
        Collaborators::default()
            .with_catalog(self.catalog.clone())
            .with_records(self.records.clone())
            .with_blobs(self.blobs.clone())
            .with_identity(self.identity.clone())
    }
}
