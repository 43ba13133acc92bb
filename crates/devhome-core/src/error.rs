use thiserror::Error;
use uuid::Uuid;

use crate::status::ConnectionStatus;

/// Failures surfaced by a [`ConnectionRepository`](crate::repository::ConnectionRepository)
/// or [`UserDirectory`](crate::repository::UserDirectory).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("cannot create a connection to self")]
    SelfRelationship,

    /// The storage uniqueness constraint on the unordered pair rejected an insert.
    #[error("a connection already exists for this pair")]
    DuplicateRelationship { existing: Option<ConnectionStatus> },

    #[error("connection not found: {0}")]
    NotFound(Uuid),

    #[error("connection status changed concurrently (now {current})")]
    StatusConflict { current: ConnectionStatus },

    #[error("storage failure: {0}")]
    Storage(String),
}

/// Caller-facing failures of the request operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ServiceError {
    #[error("invalid status: {sent}")]
    InvalidStatus {
        sent: String,
        allowed: &'static [ConnectionStatus],
    },

    #[error("cannot send request to self")]
    SelfRelationship,

    #[error("target user not found: {0}")]
    TargetNotFound(Uuid),

    /// A connection for the pair already exists, in either direction.
    #[error("request already exists")]
    RequestAlreadyExists { status: Option<ConnectionStatus> },

    #[error("no pending request found for this user")]
    NoPendingRequest,

    #[error("storage failure: {0}")]
    Storage(String),
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::SelfRelationship => Self::SelfRelationship,
            RepositoryError::DuplicateRelationship { existing } => {
                Self::RequestAlreadyExists { status: existing }
            }
            RepositoryError::NotFound(_) | RepositoryError::StatusConflict { .. } => {
                Self::NoPendingRequest
            }
            RepositoryError::Storage(msg) => Self::Storage(msg),
        }
    }
}
