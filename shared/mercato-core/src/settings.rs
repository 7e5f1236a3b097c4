//! Typed settings for the external collaborators every service wires up.
//!
//! The deployment environment is responsible for supplying validated values;
//! these constructors only bind and parse.

use crate::error::{CoreError, Result};
use serde::Deserialize;
use std::env;

/// Process-wide service identity and collaborator selection.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceSettings {
    /// Name of the microservice; also names its database and endpoint prefix.
    pub service_name: String,
    /// Token authority the service trusts. Consumed by the identity layer,
    /// carried here so all services bind the same section.
    pub authority: Option<String>,
    /// Broker discriminator ("RABBITMQ" or "SERVICEBUS"). Unset or
    /// unrecognized values fall back to RabbitMQ at provisioning time.
    pub message_broker: Option<String>,
    /// Secret-vault name, consumed by the deployment environment.
    pub key_vault_name: Option<String>,
}

impl ServiceSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            service_name: env::var("SERVICE_NAME")
                .map_err(|_| CoreError::Config("SERVICE_NAME is not set".to_string()))?,
            authority: env::var("AUTHORITY").ok(),
            message_broker: env::var("MESSAGE_BROKER").ok(),
            key_vault_name: env::var("KEY_VAULT_NAME").ok(),
        })
    }
}

/// Document store connection parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct MongoSettings {
    pub host: String,
    pub port: u16,
    /// Full connection string; when unset it is derived from host and port.
    pub connection_string: Option<String>,
}

impl MongoSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("MONGODB_HOST").unwrap_or_else(|_| "localhost".to_string()),
            port: env::var("MONGODB_PORT")
                .unwrap_or_else(|_| "27017".to_string())
                .parse()
                .map_err(|e| CoreError::Config(format!("Invalid MONGODB_PORT: {}", e)))?,
            connection_string: env::var("MONGODB_CONNECTION_STRING").ok(),
        })
    }

    /// Effective connection string: the configured one, or `mongodb://{host}:{port}`.
    pub fn connection_string(&self) -> String {
        match &self.connection_string {
            Some(s) if !s.trim().is_empty() => s.clone(),
            _ => format!("mongodb://{}:{}", self.host, self.port),
        }
    }
}

/// RabbitMQ broker parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct RabbitMqSettings {
    pub host: String,
}

impl RabbitMqSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("RABBITMQ_HOST").unwrap_or_else(|_| "localhost".to_string()),
        })
    }

    /// AMQP address for the broker host.
    pub fn address(&self) -> String {
        format!("amqp://{}:5672", self.host)
    }
}

/// Cloud service-bus broker parameters.
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceBusSettings {
    pub connection_string: String,
}

impl ServiceBusSettings {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            connection_string: env::var("SERVICEBUS_CONNECTION_STRING").map_err(|_| {
                CoreError::Config("SERVICEBUS_CONNECTION_STRING is not set".to_string())
            })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_string_derived_from_host_and_port() {
        let settings = MongoSettings {
            host: "mongo.internal".to_string(),
            port: 27017,
            connection_string: None,
        };
        assert_eq!(settings.connection_string(), "mongodb://mongo.internal:27017");
    }

    #[test]
    fn explicit_connection_string_wins() {
        let settings = MongoSettings {
            host: "ignored".to_string(),
            port: 1,
            connection_string: Some("mongodb+srv://cluster.example.net".to_string()),
        };
        assert_eq!(settings.connection_string(), "mongodb+srv://cluster.example.net");
    }

    #[test]
    fn blank_connection_string_falls_back() {
        let settings = MongoSettings {
            host: "localhost".to_string(),
            port: 27018,
            connection_string: Some("   ".to_string()),
        };
        assert_eq!(settings.connection_string(), "mongodb://localhost:27018");
    }

    #[test]
    fn rabbitmq_address_is_amqp_uri() {
        let settings = RabbitMqSettings { host: "rabbit.internal".to_string() };
        assert_eq!(settings.address(), "amqp://rabbit.internal:5672");
    }
}
