//! RabbitMQ transport.
//!
//! Topology: one durable fanout exchange per message type, one durable queue
//! per endpoint bound to it, plus an `{endpoint}_error` queue that receives
//! messages whose redelivery schedule is exhausted.

use async_trait::async_trait;
use futures_util::StreamExt;
use lapin::message::Delivery;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicPublishOptions, ExchangeDeclareOptions,
    QueueBindOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{BasicProperties, Channel, Connection, ConnectionProperties, ExchangeKind};
use mercato_core::RabbitMqSettings;
use tracing::info;

use crate::error::BusError;
use crate::transport::{DeliveryAck, Endpoint, EndpointSource, Transport, TransportDelivery};

pub struct RabbitMqTransport {
    connection: Connection,
    channel: Channel,
}

impl RabbitMqTransport {
    /// Connect to the broker host. Failure here is fatal at startup.
    pub async fn connect(settings: &RabbitMqSettings) -> Result<Self, BusError> {
        let connection = Connection::connect(&settings.address(), ConnectionProperties::default())
            .await
            .map_err(|e| BusError::TransportUnavailable(e.to_string()))?;
        let channel = connection.create_channel().await?;

        info!(host = %settings.host, "RabbitMQ transport connected");

        Ok(Self { connection, channel })
    }

    // Declares are idempotent; publishers and binders both issue them.
    async fn declare_topic(&self, topic: &str) -> Result<(), BusError> {
        self.channel
            .exchange_declare(
                topic,
                ExchangeKind::Fanout,
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
impl Transport for RabbitMqTransport {
    async fn bind_endpoint(&self, endpoint: &Endpoint) -> Result<Box<dyn EndpointSource>, BusError> {
        let error_queue = error_queue_name(&endpoint.name);

        self.declare_topic(&endpoint.topic).await?;
        self.declare_queue(&endpoint.name).await?;
        self.declare_queue(&error_queue).await?;
        self.channel
            .queue_bind(
                &endpoint.name,
                &endpoint.topic,
                "",
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

        Ok(Box::new(RabbitMqSource {
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
                "",
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

struct RabbitMqSource {
    consumer: lapin::Consumer,
    channel: Channel,
    error_queue: String,
}

#[async_trait]
impl EndpointSource for RabbitMqSource {
    async fn recv(&mut self) -> Option<Result<TransportDelivery, BusError>> {
        match self.consumer.next().await? {
            Ok(delivery) => Some(Ok(TransportDelivery {
                payload: delivery.data.clone(),
                acker: Box::new(RabbitMqAck {
                    delivery,
                    channel: self.channel.clone(),
                    error_queue: self.error_queue.clone(),
                }),
            })),
            Err(e) => Some(Err(BusError::Transport(e))),
        }
    }
}

struct RabbitMqAck {
    delivery: Delivery,
    channel: Channel,
    error_queue: String,
}

#[async_trait]
impl DeliveryAck for RabbitMqAck {
    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        self.delivery.ack(BasicAckOptions::default()).await?;
        Ok(())
    }

    async fn dead_letter(self: Box<Self>) -> Result<(), BusError> {
        // Store-and-forward: park the payload on the error queue, then settle
        // the original so it is not redelivered again.
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
