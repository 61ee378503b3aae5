//! Domain operations. Each service is generic over a [`Store`](crate::db::Store) and is
//! exposed to the HTTP layer through the object-safe trait next to it.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use thiserror::Error;

use crate::db::RepositoryError;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    Unauthorized(String),

    /// The request is well-formed but the current state does not allow it.
    #[error("{0}")]
    InvalidState(String),

    #[error("{0}")]
    Validation(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

/// Errors diesel raises around a transaction itself, such as a failed commit or a
/// serialization failure.
impl From<diesel::result::Error> for ServiceError {
    fn from(err: diesel::result::Error) -> Self {
        ServiceError::Internal(anyhow::Error::new(err).context("Transaction failed"))
    }
}

impl From<RepositoryError> for ServiceError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::Conflict(message) => ServiceError::Conflict(message),
            RepositoryError::Other(err) => ServiceError::Internal(err),
        }
    }
}
