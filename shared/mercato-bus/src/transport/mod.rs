//! Transport abstraction and the concrete broker implementations.
//!
//! All transports expose the same narrow surface: bind an endpoint, publish
//! to a message-type topic, close. The broker is selected once at startup
//! from configuration and never switched at runtime.

mod memory;
mod rabbitmq;
mod servicebus;

pub use memory::InMemoryTransport;
pub use rabbitmq::RabbitMqTransport;
pub use servicebus::ServiceBusTransport;

use async_trait::async_trait;

use crate::error::BusError;

/// A named queue/subscription one consumer listens on, fed by one
/// message-type topic. Both names are already in kebab case.
#[derive(Debug, Clone)]
pub struct Endpoint {
    pub name: String,
    pub topic: String,
}

/// A connected broker. The handle is long-lived and shared by concurrent
/// publishes and dispatch loops; concurrency safety is the underlying
/// client's responsibility, this layer adds no locking.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Declare the endpoint on the broker and open its delivery stream.
    async fn bind_endpoint(&self, endpoint: &Endpoint) -> Result<Box<dyn EndpointSource>, BusError>;

    /// Publish a payload to the topic for a message type.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Release the broker connection.
    async fn close(&self) -> Result<(), BusError>;
}

/// Delivery stream of one bound endpoint.
#[async_trait]
pub trait EndpointSource: Send {
    /// Next delivery, or `None` once the stream has ended.
    async fn recv(&mut self) -> Option<Result<TransportDelivery, BusError>>;
}

/// One received message plus its settlement handle.
pub struct TransportDelivery {
    pub payload: Vec<u8>,
    pub acker: Box<dyn DeliveryAck>,
}

/// Settlement for a single delivery: consumed exactly once, either by
/// acknowledging it or by moving it to the endpoint's dead-letter path.
#[async_trait]
pub trait DeliveryAck: Send {
    async fn ack(self: Box<Self>) -> Result<(), BusError>;

    async fn dead_letter(self: Box<Self>) -> Result<(), BusError>;
}
