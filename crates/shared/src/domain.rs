use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self(value.to_string())
            }
        }
    };
}

id_newtype!(UserId);
id_newtype!(CompanyId);
id_newtype!(JobOfferId);
id_newtype!(EventId);

/// Key -> record mapping returned by "fetch all" endpoints.
pub type Listing<T> = BTreeMap<String, T>;

/// Anything addressable by a string key inside a [`Listing`].
pub trait Keyed {
    fn key(&self) -> &str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Company,
    JobOffer,
    Event,
    User,
}

impl ResourceKind {
    /// Collection segment used by the REST backend.
    pub fn collection(self) -> &'static str {
        match self {
            ResourceKind::Company => "companies",
            ResourceKind::JobOffer => "jobs",
            ResourceKind::Event => "events",
            ResourceKind::User => "users",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ResourceKind::Company => "company",
            ResourceKind::JobOffer => "job offer",
            ResourceKind::Event => "event",
            ResourceKind::User => "user",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractType {
    #[default]
    FullTime,
    PartTime,
    Internship,
    Freelance,
    Apprenticeship,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Company {
    pub id: CompanyId,
    pub name: String,
    #[serde(default)]
    pub sector: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobOffer {
    pub id: JobOfferId,
    pub company_id: CompanyId,
    pub profession: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub contract_type: ContractType,
    #[serde(default)]
    pub location: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salary: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: EventId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub location: String,
    pub starts_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub company_id: Option<CompanyId>,
}

/// Fresh identifier for a profile entry (project, certification, experience).
pub fn new_entry_id() -> String {
    Uuid::new_v4().to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certification {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issued_on: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    pub id: String,
    pub role: String,
    pub company: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_on: Option<NaiveDate>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_on: Option<NaiveDate>,
}

/// User document as persisted in the record store.
///
/// `pending_applications` is the set of job offers the user applied to, keyed
/// by job offer id. The whole document is overwritten on every change.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: UserId,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    pub email: String,
    #[serde(default)]
    pub headline: String,
    #[serde(default)]
    pub bio: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub certifications: Vec<Certification>,
    #[serde(default)]
    pub experiences: Vec<Experience>,
    #[serde(default)]
    pub pending_applications: BTreeMap<String, JobOffer>,
}

impl UserProfile {
    pub fn new(id: UserId, email: impl Into<String>) -> Self {
        Self {
            id,
            first_name: String::new(),
            last_name: String::new(),
            email: email.into(),
            headline: String::new(),
            bio: String::new(),
            image_path: None,
            projects: Vec::new(),
            certifications: Vec::new(),
            experiences: Vec::new(),
            pending_applications: BTreeMap::new(),
        }
    }

    pub fn has_applied(&self, job_id: &JobOfferId) -> bool {
        self.pending_applications.contains_key(job_id.as_str())
    }

    /// Copy of this profile with `job` added to the pending applications.
    pub fn with_application(&self, job: JobOffer) -> Self {
        let mut next = self.clone();
        next.pending_applications.insert(job.id.0.clone(), job);
        next
    }

    /// Copy of this profile without `job_id` in the pending applications.
    pub fn without_application(&self, job_id: &JobOfferId) -> Self {
        let mut next = self.clone();
        next.pending_applications.remove(job_id.as_str());
        next
    }
}

impl Keyed for Company {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for JobOffer {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for Event {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

impl Keyed for UserProfile {
    fn key(&self) -> &str {
        self.id.as_str()
    }
}

/// Builds a listing from records, keyed by each record's own id.
pub fn listing_from<T: Keyed>(records: impl IntoIterator<Item = T>) -> Listing<T> {
    records
        .into_iter()
        .map(|record| (record.key().to_string(), record))
        .collect()
}
