//! In-process repository with the same contract as the Mongo one.
//!
//! Used by service tests that need repository semantics without a running
//! store. Filters are evaluated as top-level field equality against the
//! entity's BSON document, which covers the equality predicates services
//! build with `doc!`.

use async_trait::async_trait;
use mercato_core::Entity;
use mongodb::bson::{to_document, Document};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::RepositoryError;
use crate::repository::Repository;

#[derive(Clone)]
pub struct InMemoryRepository<E> {
    entities: Arc<RwLock<HashMap<Uuid, E>>>,
}

impl<E> InMemoryRepository<E> {
    pub fn new() -> Self {
        Self { entities: Arc::new(RwLock::new(HashMap::new())) }
    }
}

impl<E> Default for InMemoryRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

fn matches_filter<E: Entity>(entity: &E, filter: &Document) -> bool {
    let document = match to_document(entity) {
        Ok(document) => document,
        Err(_) => return false,
    };
    filter.iter().all(|(key, value)| document.get(key) == Some(value))
}

#[async_trait]
impl<E: Entity + Clone> Repository<E> for InMemoryRepository<E> {
    async fn get_all(&self) -> Result<Vec<E>, RepositoryError> {
        Ok(self.entities.read().await.values().cloned().collect())
    }

    async fn get_all_matching(&self, filter: Document) -> Result<Vec<E>, RepositoryError> {
        Ok(self
            .entities
            .read()
            .await
            .values()
            .filter(|entity| matches_filter(*entity, &filter))
            .cloned()
            .collect())
    }

    async fn get(&self, id: Uuid) -> Result<Option<E>, RepositoryError> {
        Ok(self.entities.read().await.get(&id).cloned())
    }

    async fn get_matching(&self, filter: Document) -> Result<Option<E>, RepositoryError> {
        Ok(self
            .entities
            .read()
            .await
            .values()
            .find(|entity| matches_filter(*entity, &filter))
            .cloned())
    }

    async fn create(&self, entity: &E) -> Result<(), RepositoryError> {
        if entity.id().is_nil() {
            return Err(RepositoryError::InvalidArgument("entity identifier is nil"));
        }

        let mut entities = self.entities.write().await;
        if entities.contains_key(&entity.id()) {
            return Err(RepositoryError::Conflict { id: entity.id() });
        }
        entities.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn update(&self, entity: &E) -> Result<(), RepositoryError> {
        if entity.id().is_nil() {
            return Err(RepositoryError::InvalidArgument("entity identifier is nil"));
        }

        let mut entities = self.entities.write().await;
        if !entities.contains_key(&entity.id()) {
            return Err(RepositoryError::NotFound { id: entity.id() });
        }
        entities.insert(entity.id(), entity.clone());
        Ok(())
    }

    async fn remove(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.entities.write().await.remove(&id);
        Ok(())
    }
}
