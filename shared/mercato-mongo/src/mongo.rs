//! MongoDB-backed implementation of the generic repository.

use async_trait::async_trait;
use futures_util::TryStreamExt;
use mercato_core::Entity;
use mongodb::bson::{doc, Document};
use mongodb::error::{ErrorKind, WriteFailure};
use mongodb::Collection;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::repository::Repository;

const DUPLICATE_KEY_CODE: i32 = 11000;

/// Generic repository over one MongoDB collection.
///
/// Entities serialize their identifier under `_id` (see
/// [`mercato_core::Entity`]), so identity uniqueness is delegated to the
/// store's primary-key index.
#[derive(Debug, Clone)]
pub struct MongoRepository<E: Entity> {
    collection: Collection<E>,
}

impl<E: Entity> MongoRepository<E> {
    pub(crate) fn new(collection: Collection<E>) -> Self {
        Self { collection }
    }
}

fn id_filter(id: Uuid) -> Document {
    doc! { "_id": id.to_string() }
}

fn is_duplicate_key(error: &mongodb::error::Error) -> bool {
    matches!(
        *error.kind,
        ErrorKind::Write(WriteFailure::WriteError(ref write_error))
            if write_error.code == DUPLICATE_KEY_CODE
    )
}

#[async_trait]
impl<E: Entity> Repository<E> for MongoRepository<E> {
    async fn get_all(&self) -> Result<Vec<E>, RepositoryError> {
        let cursor = self.collection.find(Document::new()).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_all_matching(&self, filter: Document) -> Result<Vec<E>, RepositoryError> {
        let cursor = self.collection.find(filter).await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        Ok(self.collection.find_one(id_filter(id)).await?)
    }

    async fn get_matching(&self, filter: Document) -> Result<Option<E>, RepositoryError> {
        Ok(self.collection.find_one(filter).await?)
    }

    async fn create(&self, entity: &E) -> Result<(), RepositoryError> {
        if entity.id().is_nil() {
            return Err(RepositoryError::InvalidArgument("entity identifier is nil"));
        }

        self.collection.insert_one(entity).await.map_err(|e| {
            if is_duplicate_key(&e) {
                RepositoryError::Conflict { id: entity.id() }
            } else {
                RepositoryError::Store(e)
            }
        })?;

        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<(), RepositoryError> {
        if entity.id().is_nil() {
            return Err(RepositoryError::InvalidArgument("entity identifier is nil"));
        }

        let result = self
            .collection
            .replace_one(id_filter(entity.id()), entity)
            .await?;

        if result.matched_count == 0 {
            return Err(RepositoryError::NotFound { id: entity.id() });
        }

        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.collection.delete_one(id_filter(id)).await?;
        Ok(())
    }
}
