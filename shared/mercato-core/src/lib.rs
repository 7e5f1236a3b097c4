//! Mercato Core - Shared service infrastructure
//!
//! This crate provides:
//! - Typed settings for the collaborators every service wires up
//! - The `Entity` identity contract used by the generic repository
//! - Error handling utilities
//! - Standard service trait and runtime all microservices run under

pub mod entity;
pub mod error;
pub mod service;
pub mod settings;

pub use entity::Entity;
pub use error::{CoreError, Result};
pub use service::{DependencyStatus, HealthStatus, MercatoService, ReadinessStatus, ServiceRuntime};
pub use settings::{MongoSettings, RabbitMqSettings, ServiceBusSettings, ServiceSettings};
