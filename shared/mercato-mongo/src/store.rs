//! MongoDB connection bootstrap.

use mercato_core::{Entity, MongoSettings, ServiceSettings};
use mongodb::bson::doc;
use mongodb::{Client, Database};
use tracing::{debug, info};

use crate::error::RepositoryError;
use crate::mongo::MongoRepository;

/// Long-lived handle to the service's database.
///
/// Connected once at startup and shared by every repository the service
/// constructs; the driver's client is safe for concurrent use. The database
/// is named after the service.
#[derive(Debug, Clone)]
pub struct MongoStore {
    #[allow(dead_code)]
    client: Client,
    database: Database,
}

impl MongoStore {
    /// Connect and verify the store is reachable. An unreachable store is a
    /// startup failure; the caller should refuse to become ready.
    pub async fn connect(
        service_settings: &ServiceSettings,
        mongo_settings: &MongoSettings,
    ) -> Result<Self, RepositoryError> {
        let connection_string = mongo_settings.connection_string();
        debug!(database = %service_settings.service_name, "Connecting to document store");

        let client = Client::with_uri_str(&connection_string)
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;
        let database = client.database(&service_settings.service_name);

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| RepositoryError::Unavailable(e.to_string()))?;

        info!(database = %service_settings.service_name, "Document store connected");

        Ok(Self { client, database })
    }

    /// Repository factory: one repository per entity type, bound to its
    /// collection for the process lifetime.
    pub fn repository<E: Entity>(&self, collection_name: &str) -> MongoRepository<E> {
        MongoRepository::new(self.database.collection(collection_name))
    }

    /// Check if the connection is healthy
    pub async fn is_healthy(&self) -> bool {
        self.database.run_command(doc! { "ping": 1 }).await.is_ok()
    }
}
