//! Client core for the SleeveUp job-and-events platform.
//!
//! Screen controllers wrap calls to external services (REST catalog, user
//! record store, blob store, identity) in [`Operation`]s whose
//! [`OperationState`] a presentation layer observes.

pub mod collaborators;
pub mod controllers;
pub mod error;
mod local;
pub mod rest;
pub mod search;
pub mod state;

pub use collaborators::{
    AuthProvider, BlobStore, Collaborators, Credentials, Identity, MissingAuthProvider,
    MissingBlobStore, MissingCatalog, MissingRecordStore, RecordStore, Registration,
    RemoteCatalog, StaticIdentity,
};
pub use controllers::{
    AuthController, CompaniesController, CompanyDetailController, EventsController,
    JobDetailController, JobsController, NewCertification, NewExperience, NewProject,
    ProfileController, ProfileEdit, ProfileImage,
};
pub use error::ServiceError;
pub use rest::{RestAuth, RestCatalog, DEFAULT_REQUEST_TIMEOUT};
pub use state::{InFlight, Operation, OperationState};

#[cfg(test)]
#[path = "tests/support.rs"]
mod support;

#[cfg(test)]
#[path = "tests/controllers_tests.rs"]
mod controllers_tests;
