use std::sync::Arc;

use shared::domain::{Company, JobOffer, JobOfferId, UserProfile};
use tokio::task::JoinHandle;
use tracing::info;

use super::{fetch_profile, rewrite_profile, ProfileCache};
use crate::{
    collaborators::{Identity, RecordStore, RemoteCatalog},
    error::ServiceError,
    state::{Operation, OperationState},
};

/// Job offer screen: the offer, its company, and the apply/withdraw actions.
pub struct JobDetailController {
    catalog: Arc<dyn RemoteCatalog>,
    records: Arc<dyn RecordStore>,
    identity: Arc<dyn Identity>,
    job: Operation<JobOffer>,
    company: Operation<Company>,
    applicant: Operation<UserProfile>,
    application: Operation<UserProfile>,
    cache: ProfileCache,
}

impl JobDetailController {
    pub fn new(
        catalog: Arc<dyn RemoteCatalog>,
        records: Arc<dyn RecordStore>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self {
            catalog,
            records,
            identity,
            job: Operation::new("job"),
            company: Operation::new("job_company"),
            applicant: Operation::new("applicant"),
            application: Operation::new("application"),
            cache: ProfileCache::new(),
        }
    }

    pub fn job(&self) -> &Operation<JobOffer> {
        &self.job
    }

    pub fn company(&self) -> &Operation<Company> {
        &self.company
    }

    pub fn applicant(&self) -> &Operation<UserProfile> {
        &self.applicant
    }

    /// Outcome of the last apply/withdraw: the rewritten user document.
    pub fn application(&self) -> &Operation<UserProfile> {
        &self.application
    }

    /// Fetches the offer, then its owning company. The company fetch is only
    /// issued once the offer has loaded; until then the company operation is
    /// back to `NotStarted`.
    pub fn load(&self, job_id: JobOfferId) -> JoinHandle<()> {
        self.company.reset();
        let job = self.job.start();
        let company = self.company.clone();
        let catalog = Arc::clone(&self.catalog);
        tokio::spawn(async move {
            let loaded = job.complete(catalog.job(&job_id).await);
            if let OperationState::Completed(offer) = loaded {
                company
                    .run(async { catalog.company(&offer.company_id).await })
                    .await;
            }
        })
    }

    /// Loads the signed-in user's document so the screen can tell whether the
    /// offer was already applied to.
    pub fn load_applicant(&self) -> JoinHandle<OperationState<UserProfile>> {
        let records = Arc::clone(&self.records);
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        self.applicant.launch(async move {
            fetch_profile(identity.as_ref(), records.as_ref(), &cache).await
        })
    }

    /// Whether the most recently known user document lists the loaded offer.
    pub fn has_applied(&self) -> bool {
        match (self.job.value(), self.cache.get()) {
            (Some(job), Some(profile)) => profile.has_applied(&job.id),
            _ => false,
        }
    }

    pub fn apply(&self) -> JoinHandle<OperationState<UserProfile>> {
        let Some(job) = self.job.value() else {
            let state = self
                .application
                .reject(ServiceError::Validation("job offer is not loaded".to_string()));
            return tokio::spawn(async move { state });
        };

        let records = Arc::clone(&self.records);
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        self.application.launch(async move {
            let job_id = job.id.clone();
            let profile = rewrite_profile(identity.as_ref(), records.as_ref(), &cache, |current| {
                Ok(current.with_application(job))
            })
            .await?;
            info!(user_id = %profile.id, job_id = %job_id, "applied to job offer");
            Ok(profile)
        })
    }

    pub fn withdraw(&self) -> JoinHandle<OperationState<UserProfile>> {
        let Some(job) = self.job.value() else {
            let state = self
                .application
                .reject(ServiceError::Validation("job offer is not loaded".to_string()));
            return tokio::spawn(async move { state });
        };

        let records = Arc::clone(&self.records);
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        self.application.launch(async move {
            let profile = rewrite_profile(identity.as_ref(), records.as_ref(), &cache, |current| {
                Ok(current.without_application(&job.id))
            })
            .await?;
            info!(user_id = %profile.id, job_id = %job.id, "withdrew job application");
            Ok(profile)
        })
    }
}
