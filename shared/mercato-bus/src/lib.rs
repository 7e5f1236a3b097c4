//! Mercato Bus
//!
//! Message-bus provisioning shared by all services: broker selection from
//! configuration, explicit consumer registration, deterministic endpoint
//! naming, a redelivery policy, and trace-span fault observation. The
//! transport is chosen once at startup and held for the process lifetime.

mod bus;
mod consumer;
mod dispatch;
pub mod endpoint;
mod error;
mod message;
mod observer;
mod provision;
mod retry;
pub mod transport;

pub use bus::MessageBus;
pub use consumer::{Consumer, ConsumerBinding, ConsumerRegistry};
pub use endpoint::endpoint_name;
pub use error::BusError;
pub use message::Message;
pub use observer::{ConsumeContext, ConsumeObserver, SpanFaultObserver};
pub use provision::{provision_bus, start_bus, BrokerKind, BusSettings};
pub use retry::RetryPolicy;
