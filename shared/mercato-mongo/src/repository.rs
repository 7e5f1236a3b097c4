//! Generic CRUD contract over one entity collection.

use async_trait::async_trait;
use mercato_core::Entity;
use mongodb::bson::Document;
use uuid::Uuid;

use crate::error::RepositoryError;

/// Identity-keyed CRUD plus predicate-based reads over one collection.
///
/// Every call round-trips to the store; there is no caching layer and no
/// in-process locking. Concurrent writes to the same entity resolve through
/// the store's native concurrency control (last write wins on replace).
/// Callers needing a bounded wait wrap individual calls in their own
/// timeout.
#[async_trait]
pub trait Repository<E: Entity>: Send + Sync {
    /// All entities in the collection. No ordering guarantee.
    async fn get_all(&self) -> Result<Vec<E>, RepositoryError>;

    /// All entities matching `filter`. The filter is evaluated by the store,
    /// never by loading the collection into memory.
    async fn get_all_matching(&self, filter: Document) -> Result<Vec<E>, RepositoryError>;

    /// Exact-identity lookup. Absence is an empty result, not an error.
    async fn get(&self, id: Uuid) -> Result<Option<E>, RepositoryError>;

    /// First entity matching `filter`. Deterministic only if the filter
    /// encodes an order; the store's iteration order is unspecified.
    async fn get_matching(&self, filter: Document) -> Result<Option<E>, RepositoryError>;

    /// Insert a new entity. Fails with [`RepositoryError::Conflict`] when the
    /// identifier is already present.
    async fn create(&self, entity: &E) -> Result<(), RepositoryError>;

    /// Replace the stored entity whose identifier matches wholesale; fields
    /// absent from `entity` do not survive. Fails with
    /// [`RepositoryError::NotFound`] when no entity matches.
    async fn update(&self, entity: &E) -> Result<(), RepositoryError>;

    /// Delete by identifier. Deleting an absent identifier is a success.
    async fn remove(&self, id: Uuid) -> Result<(), RepositoryError>;
}
