//! Bus error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BusError {
    /// The broker cannot be reached. Fatal at startup: a service with no
    /// usable bus must not serve requests.
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    /// Any other broker-level failure on an established connection.
    #[error("Transport error: {0}")]
    Transport(#[from] lapin::Error),

    #[error("Message serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Bus configuration error: {0}")]
    Config(String),
}
