//! Read-only catalog screens: companies, jobs and events.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use shared::domain::{Company, CompanyId, Event, EventId, JobOffer, Listing};
use tokio::task::JoinHandle;

use crate::{
    collaborators::RemoteCatalog,
    search::filter_listing,
    state::{Operation, OperationState},
};

pub struct CompaniesController {
    catalog: Arc<dyn RemoteCatalog>,
    companies: Operation<Listing<Company>>,
}

impl CompaniesController {
    pub fn new(catalog: Arc<dyn RemoteCatalog>) -> Self {
        Self {
            catalog,
            companies: Operation::new("companies"),
        }
    }

    pub fn companies(&self) -> &Operation<Listing<Company>> {
        &self.companies
    }

    pub fn load_companies(&self) -> JoinHandle<OperationState<Listing<Company>>> {
        let catalog = Arc::clone(&self.catalog);
        self.companies
            .launch(async move { catalog.companies().await })
    }

    /// Filters the loaded listing by name or sector; empty until loaded.
    pub fn search(&self, query: &str) -> Listing<Company> {
        self.companies
            .value()
            .map(|listing| filter_listing(&listing, query))
            .unwrap_or_default()
    }
}

pub struct CompanyDetailController {
    catalog: Arc<dyn RemoteCatalog>,
    company: Operation<Company>,
    jobs: Operation<Listing<JobOffer>>,
}

impl CompanyDetailController {
    pub fn new(catalog: Arc<dyn RemoteCatalog>) -> Self {
        Self {
            catalog,
            company: Operation::new("company"),
            jobs: Operation::new("company_jobs"),
        }
    }

    pub fn company(&self) -> &Operation<Company> {
        &self.company
    }

    pub fn jobs(&self) -> &Operation<Listing<JobOffer>> {
        &self.jobs
    }

    pub fn load_company(&self, id: CompanyId) -> JoinHandle<OperationState<Company>> {
        let catalog = Arc::clone(&self.catalog);
        self.company.launch(async move { catalog.company(&id).await })
    }

    /// Job offers published by the company.
    pub fn load_company_jobs(
        &self,
        id: CompanyId,
    ) -> JoinHandle<OperationState<Listing<JobOffer>>> {
        let catalog = Arc::clone(&self.catalog);
        self.jobs.launch(async move {
            let jobs = catalog.jobs().await?;
            Ok(jobs
                .into_iter()
                .filter(|(_, job)| job.company_id == id)
                .collect())
        })
    }
}

pub struct JobsController {
    catalog: Arc<dyn RemoteCatalog>,
    jobs: Operation<Listing<JobOffer>>,
}

impl JobsController {
    pub fn new(catalog: Arc<dyn RemoteCatalog>) -> Self {
        Self {
            catalog,
            jobs: Operation::new("jobs"),
        }
    }

    pub fn jobs(&self) -> &Operation<Listing<JobOffer>> {
        &self.jobs
    }

    pub fn load_jobs(&self) -> JoinHandle<OperationState<Listing<JobOffer>>> {
        let catalog = Arc::clone(&self.catalog);
        self.jobs.launch(async move { catalog.jobs().await })
    }

    /// Filters the loaded listing by profession; empty until loaded.
    pub fn search(&self, query: &str) -> Listing<JobOffer> {
        self.jobs
            .value()
            .map(|listing| filter_listing(&listing, query))
            .unwrap_or_default()
    }
}

pub struct EventsController {
    catalog: Arc<dyn RemoteCatalog>,
    events: Operation<Listing<Event>>,
    event: Operation<Event>,
}

impl EventsController {
    pub fn new(catalog: Arc<dyn RemoteCatalog>) -> Self {
        Self {
            catalog,
            events: Operation::new("events"),
            event: Operation::new("event"),
        }
    }

    pub fn events(&self) -> &Operation<Listing<Event>> {
        &self.events
    }

    pub fn event(&self) -> &Operation<Event> {
        &self.event
    }

    pub fn load_events(&self) -> JoinHandle<OperationState<Listing<Event>>> {
        let catalog = Arc::clone(&self.catalog);
        self.events.launch(async move { catalog.events().await })
    }

    pub fn load_event(&self, id: EventId) -> JoinHandle<OperationState<Event>> {
        let catalog = Arc::clone(&self.catalog);
        self.event.launch(async move { catalog.event(&id).await })
    }

    /// Filters the loaded listing by title; empty until loaded.
    pub fn search(&self, query: &str) -> Listing<Event> {
        self.events
            .value()
            .map(|listing| filter_listing(&listing, query))
            .unwrap_or_default()
    }

    /// Loaded events starting at or after `now`, soonest first.
    pub fn upcoming(&self, now: DateTime<Utc>) -> Vec<Event> {
        let mut upcoming: Vec<Event> = self
            .events
            .value()
            .map(|listing| {
                listing
                    .into_values()
                    .filter(|event| event.starts_at >= now)
                    .collect()
            })
            .unwrap_or_default();
        upcoming.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then_with(|| a.id.cmp(&b.id)));
        upcoming
    }
}
