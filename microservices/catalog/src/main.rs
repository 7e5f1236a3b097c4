//! Catalog Service
//!
//! Item catalog over the shared infrastructure stack: items stored through
//! the generic Mongo repository, contract events published on the message
//! bus, and price adjustments consumed from it.

use anyhow::Context;
use mercato_bus::{provision_bus, BusSettings, ConsumerRegistry};
use mercato_core::{
    CoreError, DependencyStatus, HealthStatus, MercatoService, MongoSettings, ReadinessStatus,
    Result, ServiceRuntime, ServiceSettings,
};
use mercato_mongo::{MongoStore, Repository};
use std::sync::Arc;
use tracing::info;

mod contracts;
mod handlers;
mod items;
mod routes;

use contracts::PriceAdjustedConsumer;
use handlers::AppState;
use items::Item;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _telemetry = mercato_telemetry::init("catalog")?;

    info!("Starting Catalog Service");

    let service = Arc::new(CatalogService::new().await?);
    ServiceRuntime::run(service).await?;
    Ok(())
}

pub struct CatalogService {
    state: AppState,
    http_port: u16,
    start_time: std::time::Instant,
}

impl CatalogService {
    pub async fn new() -> anyhow::Result<Self> {
        let service_settings = ServiceSettings::from_env()?;
        let mongo_settings = MongoSettings::from_env()?;

        let store = MongoStore::connect(&service_settings, &mongo_settings).await?;
        let items: Arc<dyn Repository<Item>> = Arc::new(store.repository::<Item>("items"));

        let consumers =
            ConsumerRegistry::new().register(PriceAdjustedConsumer::new(items.clone()));
        let bus_settings = BusSettings::from_env()?;
        let bus = Arc::new(provision_bus(&bus_settings, consumers, None).await?);

        let http_port = std::env::var("HTTP_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse()
            .context("Invalid HTTP_PORT")?;

        Ok(Self {
            state: AppState { store, items, bus },
            http_port,
            start_time: std::time::Instant::now(),
        })
    }
}

#[async_trait::async_trait]
impl MercatoService for CatalogService {
    fn service_id(&self) -> &'static str {
        "catalog"
    }

    async fn health(&self) -> HealthStatus {
        HealthStatus {
            healthy: self.state.store.is_healthy().await,
            service_id: self.service_id().to_string(),
            version: self.version().to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    async fn ready(&self) -> ReadinessStatus {
        let store_ok = self.state.store.is_healthy().await;
        let bus_ok = self.state.bus.is_running();
        ReadinessStatus {
            ready: store_ok && bus_ok,
            dependencies: vec![
                DependencyStatus { name: "mongodb".to_string(), available: store_ok },
                DependencyStatus { name: "message-bus".to_string(), available: bus_ok },
            ],
        }
    }

    async fn start(&self) -> Result<()> {
        let app = routes::create_router(self.state.clone());
        let addr = format!("0.0.0.0:{}", self.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        info!(%addr, "Catalog API listening");
        axum::serve(listener, app).await?;
        Ok(())
    }

    async fn shutdown(&self) -> Result<()> {
        info!("Shutting down Catalog Service");
        self.state
            .bus
            .shutdown()
            .await
            .map_err(|e| CoreError::Unavailable(e.to_string()))
    }
}
