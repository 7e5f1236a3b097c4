//! HTTP handlers for the catalog REST surface.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use mercato_bus::{BusError, MessageBus};
use mercato_mongo::{MongoStore, Repository, RepositoryError};
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::contracts::{ItemCreated, ItemDeleted, ItemUpdated};
use crate::items::{CreateItemDto, Item, ItemDto, UpdateItemDto};

#[derive(Clone)]
pub struct AppState {
    pub store: MongoStore,
    pub items: Arc<dyn Repository<Item>>,
    pub bus: Arc<MessageBus>,
}

/// Handler-level failure, mapped onto HTTP status codes.
pub enum ApiError {
    Repository(RepositoryError),
    Bus(BusError),
}

impl From<RepositoryError> for ApiError {
    fn from(e: RepositoryError) -> Self {
        Self::Repository(e)
    }
}

impl From<BusError> for ApiError {
    fn from(e: BusError) -> Self {
        Self::Bus(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Repository(e) => {
                let status = match &e {
                    RepositoryError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
                    RepositoryError::Conflict { .. } => StatusCode::CONFLICT,
                    RepositoryError::NotFound { .. } => StatusCode::NOT_FOUND,
                    RepositoryError::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
                    RepositoryError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, e.to_string())
            }
            ApiError::Bus(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let healthy = state.store.is_healthy().await;
    let status = if healthy { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status, Json(json!({ "healthy": healthy })))
}

pub async fn ready(State(state): State<AppState>) -> impl IntoResponse {
    let store_ok = state.store.is_healthy().await;
    let bus_ok = state.bus.is_running();
    let status = if store_ok && bus_ok { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (
        status,
        Json(json!({
            "ready": store_ok && bus_ok,
            "dependencies": [
                { "name": "mongodb", "available": store_ok },
                { "name": "message-bus", "available": bus_ok },
            ],
        })),
    )
}

pub async fn list_items(State(state): State<AppState>) -> Result<Json<Vec<ItemDto>>, ApiError> {
    let items = state.items.get_all().await?;
    Ok(Json(items.into_iter().map(ItemDto::from).collect()))
}

pub async fn get_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<ItemDto>, ApiError> {
    let item = state.items.get(id).await?.ok_or(RepositoryError::NotFound { id })?;
    Ok(Json(item.into()))
}

pub async fn create_item(
    State(state): State<AppState>,
    Json(dto): Json<CreateItemDto>,
) -> Result<(StatusCode, Json<ItemDto>), ApiError> {
    let item = Item {
        id: Uuid::new_v4(),
        name: dto.name,
        description: dto.description,
        price: dto.price,
        created_at: Utc::now(),
    };

    state.items.create(&item).await?;
    state
        .bus
        .publish(&ItemCreated {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
        })
        .await?;

    info!(item_id = %item.id, "Item created");
    Ok((StatusCode::CREATED, Json(item.into())))
}

pub async fn update_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(dto): Json<UpdateItemDto>,
) -> Result<StatusCode, ApiError> {
    let existing = state.items.get(id).await?.ok_or(RepositoryError::NotFound { id })?;

    let item = Item {
        id,
        name: dto.name,
        description: dto.description,
        price: dto.price,
        created_at: existing.created_at,
    };

    state.items.update(&item).await?;
    state
        .bus
        .publish(&ItemUpdated {
            id: item.id,
            name: item.name.clone(),
            description: item.description.clone(),
            price: item.price,
        })
        .await?;

    info!(item_id = %id, "Item updated");
    Ok(StatusCode::NO_CONTENT)
}

pub async fn delete_item(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.items.remove(id).await?;
    state.bus.publish(&ItemDeleted { id }).await?;

    info!(item_id = %id, "Item deleted");
    Ok(StatusCode::NO_CONTENT)
}
