//! Per-screen controllers. Each one owns a handful of [`Operation`]s and is
//! built from explicitly injected collaborators.
//!
//! [`Operation`]: crate::state::Operation

mod auth;
mod catalog;
mod job_detail;
mod profile;

pub use auth::AuthController;
pub use catalog::{CompaniesController, CompanyDetailController, EventsController, JobsController};
pub use job_detail::JobDetailController;
pub use profile::{
    NewCertification, NewExperience, NewProject, ProfileController, ProfileEdit, ProfileImage,
};

use std::sync::Arc;

use shared::domain::{UserId, UserProfile};
use tokio::sync::watch;

use crate::{
    collaborators::{Collaborators, Identity, RecordStore},
    error::ServiceError,
};

async fn signed_in_user(identity: &dyn Identity) -> Result<UserId, ServiceError> {
    identity
        .current_user_id()
        .await
        .ok_or(ServiceError::Unauthenticated)
}

/// Last user document known to match the store: refreshed by every
/// successful read or write, untouched by failed ones.
#[derive(Clone)]
struct ProfileCache {
    latest: Arc<watch::Sender<Option<UserProfile>>>,
}

impl ProfileCache {
    fn new() -> Self {
        let (latest, _) = watch::channel(None);
        Self {
            latest: Arc::new(latest),
        }
    }

    fn get(&self) -> Option<UserProfile> {
        self.latest.borrow().clone()
    }

    fn remember(&self, profile: &UserProfile) {
        self.latest.send_replace(Some(profile.clone()));
    }
}

/// Reads the signed-in user's document from the store and caches it.
async fn fetch_profile(
    identity: &dyn Identity,
    records: &dyn RecordStore,
    cache: &ProfileCache,
) -> Result<UserProfile, ServiceError> {
    let user_id = signed_in_user(identity).await?;
    let profile = records.get_user(&user_id).await?;
    cache.remember(&profile);
    Ok(profile)
}

/// Read-modify-write of the signed-in user's document.
///
/// The cached document is used when it belongs to the signed-in user,
/// otherwise the document is read from the store. The derived document
/// overwrites the stored one; there is no version check.
async fn rewrite_profile<F>(
    identity: &dyn Identity,
    records: &dyn RecordStore,
    cache: &ProfileCache,
    change: F,
) -> Result<UserProfile, ServiceError>
where
    F: FnOnce(&UserProfile) -> Result<UserProfile, ServiceError>,
{
    let user_id = signed_in_user(identity).await?;
    let current = match cache.get() {
        Some(profile) if profile.id == user_id => profile,
        _ => records.get_user(&user_id).await?,
    };
    let next = change(&current)?;
    records.put_user(&next).await?;
    cache.remember(&next);
    Ok(next)
}

impl Collaborators {
    pub fn auth_controller(&self) -> AuthController {
        AuthController::new(Arc::clone(&self.auth), Arc::clone(&self.records))
    }

    pub fn companies_controller(&self) -> CompaniesController {
        CompaniesController::new(Arc::clone(&self.catalog))
    }

    pub fn company_detail_controller(&self) -> CompanyDetailController {
        CompanyDetailController::new(Arc::clone(&self.catalog))
    }

    pub fn jobs_controller(&self) -> JobsController {
        JobsController::new(Arc::clone(&self.catalog))
    }

    pub fn events_controller(&self) -> EventsController {
        EventsController::new(Arc::clone(&self.catalog))
    }

    pub fn job_detail_controller(&self) -> JobDetailController {
        JobDetailController::new(
            Arc::clone(&self.catalog),
            Arc::clone(&self.records),
            Arc::clone(&self.identity),
        )
    }

    pub fn profile_controller(&self) -> ProfileController {
        ProfileController::new(
            Arc::clone(&self.records),
            Arc::clone(&self.blobs),
            Arc::clone(&self.identity),
        )
    }
}
