use shared::domain::ResourceKind;
use thiserror::Error;

/// Failure raised by a collaborator call.
///
/// Controllers never propagate this type to observers; it is rendered into the
/// reason string of [`crate::OperationState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("{kind} '{id}' not found")]
    NotFound { kind: ResourceKind, id: String },
    #[error("user is not signed in")]
    Unauthenticated,
    #[error("{0}")]
    Validation(String),
    #[error("transport failure: {0}")]
    Transport(String),
    #[error("store failure: {0}")]
    Store(String),
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl ServiceError {
    pub fn not_found(kind: ResourceKind, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }
}

impl From<reqwest::Error> for ServiceError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            Self::Malformed(value.to_string())
        } else if value.is_timeout() {
            Self::Transport(format!("request timed out: {value}"))
        } else {
            Self::Transport(value.to_string())
        }
    }
}

impl From<anyhow::Error> for ServiceError {
    fn from(value: anyhow::Error) -> Self {
        Self::Store(format!("{value:#}"))
    }
}

impl From<url::ParseError> for ServiceError {
    fn from(value: url::ParseError) -> Self {
        Self::Transport(format!("invalid backend url: {value}"))
    }
}
