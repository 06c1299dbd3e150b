//! HTTP adapters for the catalog and authentication endpoints.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use shared::{
    domain::{
        Company, CompanyId, Event, EventId, JobOffer, JobOfferId, Listing, ResourceKind, UserId,
    },
    error::ApiError,
    protocol::{LoginRequest, RegisterRequest, SessionResponse},
};
use tokio::sync::RwLock;
use tracing::{debug, info};
use url::Url;

use crate::{
    collaborators::{AuthProvider, Credentials, Identity, RemoteCatalog, Registration},
    error::ServiceError,
};

pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(15);

fn build_http_client(timeout: Duration) -> Result<Client, ServiceError> {
    Ok(Client::builder().timeout(timeout).build()?)
}

fn endpoint(base_url: &Url, segments: &[&str]) -> Result<Url, ServiceError> {
    let mut url = base_url.clone();
    url.path_segments_mut()
        .map_err(|_| ServiceError::Transport(format!("backend url '{base_url}' cannot be a base")))?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

/// Maps non-success statuses onto the service error taxonomy.
async fn check_status(
    response: Response,
    kind: ResourceKind,
    id: Option<&str>,
) -> Result<Response, ServiceError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    match status {
        StatusCode::NOT_FOUND => Err(ServiceError::not_found(kind, id.unwrap_or("*"))),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(ServiceError::Unauthenticated),
        _ => match response.json::<ApiError>().await {
            Ok(body) if body.code.is_client_fault() => Err(ServiceError::Validation(body.message)),
            Ok(body) => Err(ServiceError::Transport(format!(
                "backend returned {}: {}",
                status.as_u16(),
                body.message
            ))),
            Err(_) => Err(ServiceError::Transport(format!(
                "backend returned {}: {}",
                status.as_u16(),
                status.canonical_reason().unwrap_or("unexpected status")
            ))),
        },
    }
}

/// Catalog served by the platform's REST backend.
///
/// `GET {base}/{collection}` answers a JSON object keyed by record id (or
/// `null` when the collection is empty); `GET {base}/{collection}/{id}`
/// answers the record or `null`.
#[derive(Clone)]
pub struct RestCatalog {
    http: Client,
    base_url: Url,
}

impl RestCatalog {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self::with_client(
            build_http_client(timeout)?,
            Url::parse(base_url)?,
        ))
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    async fn fetch_all<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
    ) -> Result<Listing<T>, ServiceError> {
        let url = endpoint(&self.base_url, &[kind.collection()])?;
        debug!(%url, %kind, "fetching listing");
        let response = self.http.get(url).send().await?;
        let listing: Option<Listing<T>> = check_status(response, kind, None).await?.json().await?;
        Ok(listing.unwrap_or_default())
    }

    async fn fetch_by_id<T: DeserializeOwned>(
        &self,
        kind: ResourceKind,
        id: &str,
    ) -> Result<T, ServiceError> {
        let url = endpoint(&self.base_url, &[kind.collection(), id])?;
        debug!(%url, %kind, id, "fetching record");
        let response = self.http.get(url).send().await?;
        let record: Option<T> = check_status(response, kind, Some(id)).await?.json().await?;
        record.ok_or_else(|| ServiceError::not_found(kind, id))
    }
}

#[async_trait]
impl RemoteCatalog for RestCatalog {
    async fn companies(&self) -> Result<Listing<Company>, ServiceError> {
        self.fetch_all(ResourceKind::Company).await
    }

    async fn company(&self, id: &CompanyId) -> Result<Company, ServiceError> {
        self.fetch_by_id(ResourceKind::Company, id.as_str()).await
    }

    async fn jobs(&self) -> Result<Listing<JobOffer>, ServiceError> {
        self.fetch_all(ResourceKind::JobOffer).await
    }

    async fn job(&self, id: &JobOfferId) -> Result<JobOffer, ServiceError> {
        self.fetch_by_id(ResourceKind::JobOffer, id.as_str()).await
    }

    async fn events(&self) -> Result<Listing<Event>, ServiceError> {
        self.fetch_all(ResourceKind::Event).await
    }

    async fn event(&self, id: &EventId) -> Result<Event, ServiceError> {
        self.fetch_by_id(ResourceKind::Event, id.as_str()).await
    }
}

#[derive(Debug, Clone)]
struct Session {
    user_id: UserId,
    token: Option<String>,
}

/// Email/password authentication against `{base}/auth/*`. The session lives
/// in memory only.
pub struct RestAuth {
    http: Client,
    base_url: Url,
    session: RwLock<Option<Session>>,
}

impl RestAuth {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, ServiceError> {
        Ok(Self::with_client(
            build_http_client(timeout)?,
            Url::parse(base_url)?,
        ))
    }

    pub fn with_client(http: Client, base_url: Url) -> Self {
        Self {
            http,
            base_url,
            session: RwLock::new(None),
        }
    }

    /// Bearer token handed out by the backend for the current session.
    pub async fn token(&self) -> Option<String> {
        self.session
            .read()
            .await
            .as_ref()
            .and_then(|session| session.token.clone())
    }

    async fn open_session<B: serde::Serialize + ?Sized>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<UserId, ServiceError> {
        let url = endpoint(&self.base_url, &["auth", route])?;
        let response = self.http.post(url).json(body).send().await?;
        let response = match check_status(response, ResourceKind::User, None).await {
            Ok(response) => response,
            Err(ServiceError::Unauthenticated) => {
                return Err(ServiceError::Validation(
                    "invalid email or password".to_string(),
                ))
            }
            Err(err) => return Err(err),
        };
        let body: SessionResponse = response.json().await?;

        info!(user_id = %body.user_id, route, "session opened");
        let user_id = body.user_id.clone();
        *self.session.write().await = Some(Session {
            user_id: body.user_id,
            token: body.token,
        });
        Ok(user_id)
    }
}

#[async_trait]
impl AuthProvider for RestAuth {
    async fn sign_in(&self, credentials: &Credentials) -> Result<UserId, ServiceError> {
        self.open_session(
            "login",
            &LoginRequest {
                email: credentials.email.clone(),
                password: credentials.password.clone(),
            },
        )
        .await
    }

    async fn register(&self, registration: &Registration) -> Result<UserId, ServiceError> {
        self.open_session(
            "register",
            &RegisterRequest {
                email: registration.email.clone(),
                password: registration.password.clone(),
                first_name: registration.first_name.clone(),
                last_name: registration.last_name.clone(),
            },
        )
        .await
    }

    async fn sign_out(&self) {
        if let Some(session) = self.session.write().await.take() {
            info!(user_id = %session.user_id, "session closed");
        }
    }
}

#[async_trait]
impl Identity for RestAuth {
    async fn current_user_id(&self) -> Option<UserId> {
        self.session
            .read()
            .await
            .as_ref()
            .map(|session| session.user_id.clone())
    }
}

#[cfg(test)]
#[path = "tests/rest_tests.rs"]
mod tests;
