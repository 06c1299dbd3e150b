use std::sync::Arc;

use chrono::NaiveDate;
use shared::domain::{
    new_entry_id, Certification, Experience, JobOffer, JobOfferId, Project, UserProfile,
};
use tokio::task::JoinHandle;
use tracing::info;

use super::{fetch_profile, rewrite_profile, signed_in_user, ProfileCache};
use crate::{
    collaborators::{BlobStore, Identity, RecordStore},
    error::ServiceError,
    state::{Operation, OperationState},
};

/// Profile picture bytes, or the placeholder when none is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProfileImage {
    Stored(Vec<u8>),
    Placeholder,
}

/// Editable identity fields of a profile. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileEdit {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub headline: Option<String>,
    pub bio: Option<String>,
    pub image_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCertification {
    pub name: String,
    pub issuer: String,
    pub issued_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewExperience {
    pub role: String,
    pub company: String,
    pub description: String,
    pub started_on: Option<NaiveDate>,
    pub ended_on: Option<NaiveDate>,
}

/// The signed-in user's own profile screen.
pub struct ProfileController {
    records: Arc<dyn RecordStore>,
    blobs: Arc<dyn BlobStore>,
    identity: Arc<dyn Identity>,
    profile: Operation<UserProfile>,
    image: Operation<ProfileImage>,
    update: Operation<UserProfile>,
    cache: ProfileCache,
}

impl ProfileController {
    pub fn new(
        records: Arc<dyn RecordStore>,
        blobs: Arc<dyn BlobStore>,
        identity: Arc<dyn Identity>,
    ) -> Self {
        Self {
            records,
            blobs,
            identity,
            profile: Operation::new("profile"),
            image: Operation::new("profile_image"),
            update: Operation::new("profile_update"),
            cache: ProfileCache::new(),
        }
    }

    pub fn profile(&self) -> &Operation<UserProfile> {
        &self.profile
    }

    pub fn image(&self) -> &Operation<ProfileImage> {
        &self.image
    }

    /// Outcome of the last edit: the rewritten user document.
    pub fn update(&self) -> &Operation<UserProfile> {
        &self.update
    }

    /// Most recent document that was successfully loaded or written. A failed
    /// edit leaves it unchanged.
    pub fn current(&self) -> Option<UserProfile> {
        self.cache.get()
    }

    pub fn pending_applications(&self) -> Vec<JobOffer> {
        self.current()
            .map(|profile| profile.pending_applications.into_values().collect())
            .unwrap_or_default()
    }

    pub fn load_profile(&self) -> JoinHandle<OperationState<UserProfile>> {
        let records = Arc::clone(&self.records);
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        self.profile.launch(async move {
            fetch_profile(identity.as_ref(), records.as_ref(), &cache).await
        })
    }

    /// Falls back to [`ProfileImage::Placeholder`] when the profile has no
    /// image path or nothing is stored at it.
    pub fn load_image(&self) -> JoinHandle<OperationState<ProfileImage>> {
        let records = Arc::clone(&self.records);
        let blobs = Arc::clone(&self.blobs);
        let identity = Arc::clone(&self.identity);
        let cached = self.current();
        self.image.launch(async move {
            let user_id = signed_in_user(identity.as_ref()).await?;
            let profile = match cached {
                Some(profile) if profile.id == user_id => profile,
                _ => records.get_user(&user_id).await?,
            };
            let Some(path) = profile.image_path.filter(|path| !path.trim().is_empty()) else {
                return Ok(ProfileImage::Placeholder);
            };
            Ok(match blobs.fetch_bytes(&path).await? {
                Some(bytes) if !bytes.is_empty() => ProfileImage::Stored(bytes),
                _ => ProfileImage::Placeholder,
            })
        })
    }

    pub fn update_profile(&self, edit: ProfileEdit) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("updated profile", move |current| {
            let mut next = current.clone();
            if let Some(first_name) = edit.first_name {
                next.first_name = first_name.trim().to_string();
            }
            if let Some(last_name) = edit.last_name {
                next.last_name = last_name.trim().to_string();
            }
            if let Some(headline) = edit.headline {
                next.headline = headline.trim().to_string();
            }
            if let Some(bio) = edit.bio {
                next.bio = bio;
            }
            if let Some(image_path) = edit.image_path {
                let image_path = image_path.trim().to_string();
                next.image_path = (!image_path.is_empty()).then_some(image_path);
            }
            Ok(next)
        })
    }

    pub fn add_project(&self, project: NewProject) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("added project", move |current| {
            let title = required("project title", &project.title)?;
            let mut next = current.clone();
            next.projects.push(Project {
                id: new_entry_id(),
                title,
                description: project.description,
                link: project.link.filter(|link| !link.trim().is_empty()),
            });
            Ok(next)
        })
    }

    pub fn remove_project(&self, project_id: String) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("removed project", move |current| {
            let mut next = current.clone();
            next.projects.retain(|project| project.id != project_id);
            Ok(next)
        })
    }

    pub fn add_certification(
        &self,
        certification: NewCertification,
    ) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("added certification", move |current| {
            let name = required("certification name", &certification.name)?;
            let mut next = current.clone();
            next.certifications.push(Certification {
                id: new_entry_id(),
                name,
                issuer: certification.issuer.trim().to_string(),
                issued_on: certification.issued_on,
            });
            Ok(next)
        })
    }

    pub fn remove_certification(
        &self,
        certification_id: String,
    ) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("removed certification", move |current| {
            let mut next = current.clone();
            next.certifications
                .retain(|certification| certification.id != certification_id);
            Ok(next)
        })
    }

    pub fn add_experience(
        &self,
        experience: NewExperience,
    ) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("added experience", move |current| {
            let role = required("experience role", &experience.role)?;
            let company = required("experience company", &experience.company)?;
            if let (Some(started), Some(ended)) = (experience.started_on, experience.ended_on) {
                if ended < started {
                    return Err(ServiceError::Validation(
                        "experience cannot end before it starts".to_string(),
                    ));
                }
            }
            let mut next = current.clone();
            next.experiences.push(Experience {
                id: new_entry_id(),
                role,
                company,
                description: experience.description,
                started_on: experience.started_on,
                ended_on: experience.ended_on,
            });
            Ok(next)
        })
    }

    pub fn remove_experience(
        &self,
        experience_id: String,
    ) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("removed experience", move |current| {
            let mut next = current.clone();
            next.experiences
                .retain(|experience| experience.id != experience_id);
            Ok(next)
        })
    }

    pub fn withdraw_application(
        &self,
        job_id: JobOfferId,
    ) -> JoinHandle<OperationState<UserProfile>> {
        self.rewrite("withdrew job application", move |current| {
            Ok(current.without_application(&job_id))
        })
    }

    fn rewrite<F>(&self, action: &'static str, change: F) -> JoinHandle<OperationState<UserProfile>>
    where
        F: FnOnce(&UserProfile) -> Result<UserProfile, ServiceError> + Send + 'static,
    {
        let records = Arc::clone(&self.records);
        let identity = Arc::clone(&self.identity);
        let cache = self.cache.clone();
        self.update.launch(async move {
            let profile =
                rewrite_profile(identity.as_ref(), records.as_ref(), &cache, change).await?;
            info!(user_id = %profile.id, action, "profile rewritten");
            Ok(profile)
        })
    }
}

fn required(field: &str, value: &str) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::Validation(format!("{field} is required")));
    }
    Ok(value.to_string())
}
