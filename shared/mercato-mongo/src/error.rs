//! Repository error types

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A mutation was handed an entity that cannot be stored (nil identifier).
    #[error("Invalid entity: {0}")]
    InvalidArgument(&'static str),

    /// An entity with the same identifier already exists in the collection.
    #[error("An entity with id {id} already exists")]
    Conflict { id: Uuid },

    /// An update targeted an identifier with no stored entity.
    #[error("No entity with id {id} exists")]
    NotFound { id: Uuid },

    /// The store cannot be reached. Fatal at startup.
    #[error("Document store unavailable: {0}")]
    Unavailable(String),

    /// Any other driver-level failure.
    #[error("Document store error: {0}")]
    Store(#[from] mongodb::error::Error),
}
