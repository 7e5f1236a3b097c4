//! Cloud service-bus-style transport.
//!
//! Addressed by a full opaque connection-string URI instead of a host, with
//! topic/subscription topology: a durable topic exchange per message type
//! and a subscription queue per endpoint. Managed AMQP brokers (CloudAMQP,
//! Amazon MQ and kin) are consumed this way; the abstract surface is
//! identical to the RabbitMQ transport and selection happens once at
//! startup.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use mercato_core::ServiceBusSettings;
use tracing::info;

use crate::error::BusError;
use crate::transport::{DeliveryAck, Endpoint, EndpointSource, Transport, TransportDelivery};

pub struct ServiceBusTransport {
    connection: Connection,
    channel: Channel,
}

impl ServiceBusTransport {
    /// Connect using the full connection string. Failure here is fatal at
    /// startup.
    pub async fn connect(settings: &ServiceBusSettings) -> Result<Self, BusError> {
        let connection =
            Connection::connect(&settings.connection_string, ConnectionProperties::default())
                .await
                .map_err(|e| BusError::TransportUnavailable(e.to_string()))?;
        let channel = connection.create_channel().await?;

        info!("Service bus transport connected");

        Ok(Self { connection, channel })
    }

    async fn declare_topic(&self, topic: &str) -> Result<(), BusError> {
        self.channel
            .exchange_declare(
                topic,
                ExchangeKind::Topic,
                ExchangeDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }

    async fn declare_queue(&self, name: &str) -> Result<(), BusError> {
        self.channel
            .queue_declare(
                name,
                QueueDeclareOptions { durable: true, ..Default::default() },
                FieldTable::default(),
            )
            .await?;
        Ok(())
    }
}

fn error_queue_name(endpoint: &str) -> String {
    format!("{endpoint}_error")
}

#[async_trait]
impl Transport for ServiceBusTransport {
    async fn bind_endpoint(&self, endpoint: &Endpoint) -> Result<Box<dyn EndpointSource>, BusError> {
        let error_queue = error_queue_name(&endpoint.name);

        self.declare_topic(&endpoint.topic).await?;
        self.declare_queue(&endpoint.name).await?;
        self.declare_queue(&error_queue).await?;
        // Subscription: the endpoint queue receives everything published to
        // the message-type topic.
        self.channel
            .queue_bind(
                &endpoint.name,
                &endpoint.topic,
                "#",
                QueueBindOptions::default(),
                FieldTable::default(),
            )
            .await?;

        let consumer = self
            .channel
            .basic_consume(
                &endpoint.name,
                &format!("{}-consumer", endpoint.name),
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await?;

        Ok(Box::new(ServiceBusSource {
            consumer,
            channel: self.channel.clone(),
            error_queue,
        }))
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        self.declare_topic(topic).await?;
        self.channel
            .basic_publish(
                topic,
                topic,
                BasicPublishOptions::default(),
                payload,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        self.connection.close(200, "bus shutdown").await?;
        Ok(())
    }
}

struct ServiceBusSource {
    consumer: lapin::Consumer,
    channel: Channel,
    error_queue: String,
}

#[async_trait]
impl EndpointSource for ServiceBusSource {
    async fn recv(&mut self) -> Option<Result<TransportDelivery, BusError>> {
        match self.consumer.next().await? {
            Ok(delivery) => Some(Ok(TransportDelivery {
                payload: delivery.data.clone(),
                acker: Box::new(ServiceBusAck {
                    delivery,
                    channel: self.channel.clone(),
                    error_queue: self.error_queue.clone(),
                }),
            })),
            Err(e) => Some(Err(BusError::Transport(e))),
        }
    }
}

struct ServiceBusAck {
    delivery: Delivery,
    channel: Channel,
    error_queue: String,
}

#[async_trait]
impl DeliveryAck for ServiceBusAck {
    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        self.delivery.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn dead_letter(self: Box<Self>) -> Result<(), BusError> {
        self.channel
            .basic_publish(
                "",
                &self.error_queue,
                BasicPublishOptions::default(),
                &self.delivery.data,
                BasicProperties::default().with_content_type("application/json".into()),
            )
            .await?
            .await?;
        self.delivery.ack(BasicAckOptions::default()).await?;
        Ok(())
    }
}
