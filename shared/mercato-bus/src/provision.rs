//! Bus provisioning: broker selection, endpoint binding, retry and
//! observer installation.

use mercato_core::{RabbitMqSettings, ServiceBusSettings, ServiceSettings};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::bus::MessageBus;
use crate::consumer::ConsumerRegistry;
use crate::dispatch::EndpointDispatcher;
use crate::endpoint::{endpoint_name, kebab_case};
use crate::error::BusError;
use crate::observer::{ConsumeObserver, SpanFaultObserver};
use crate::retry::RetryPolicy;
use crate::transport::{Endpoint, RabbitMqTransport, ServiceBusTransport, Transport};

/// Everything provisioning needs from configuration. The sections for
/// transports other than the selected one may be absent.
#[derive(Debug, Clone)]
pub struct BusSettings {
    pub service: ServiceSettings,
    pub rabbitmq: Option<RabbitMqSettings>,
    pub servicebus: Option<ServiceBusSettings>,
}

impl BusSettings {
    pub fn from_env() -> mercato_core::Result<Self> {
        Ok(Self {
            service: ServiceSettings::from_env()?,
            rabbitmq: Some(RabbitMqSettings::from_env()?),
            servicebus: ServiceBusSettings::from_env().ok(),
        })
    }
}

/// The broker implementation behind the bus. Exactly one is active per
/// process; switching requires reconfiguration and a restart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BrokerKind {
    RabbitMq,
    ServiceBus,
}

impl BrokerKind {
    const RABBITMQ: &'static str = "RABBITMQ";
    const SERVICEBUS: &'static str = "SERVICEBUS";

    /// Select a broker from the settings discriminator. Unset selects
    /// RabbitMQ; unrecognized values also fall back to RabbitMQ but are
    /// logged so the misconfiguration stays visible.
    pub fn from_discriminator(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => BrokerKind::RabbitMq,
            Some(value) if value.eq_ignore_ascii_case(Self::SERVICEBUS) => BrokerKind::ServiceBus,
            Some(value) if value.eq_ignore_ascii_case(Self::RABBITMQ) => BrokerKind::RabbitMq,
            Some(other) => {
                warn!(broker = %other, "Unrecognized message broker; falling back to RabbitMQ");
                BrokerKind::RabbitMq
            }
        }
    }
}

/// Produce a fully configured bus: broker selected from settings, transport
/// connected, consumers registered under their computed endpoint names, the
/// redelivery policy installed (the default unless `retry_override` is
/// given), and the span fault observer attached.
///
/// Connection failure is fatal and surfaces to the caller; the hosting
/// process should refuse to become ready without a bus.
pub async fn provision_bus(
    settings: &BusSettings,
    consumers: ConsumerRegistry,
    retry_override: Option<RetryPolicy>,
) -> Result<MessageBus, BusError> {
    let broker = BrokerKind::from_discriminator(settings.service.message_broker.as_deref());
    info!(?broker, service = %settings.service.service_name, "Provisioning message bus");

    let transport: Arc<dyn Transport> = match broker {
        BrokerKind::RabbitMq => {
            let rabbitmq = settings
                .rabbitmq
                .as_ref()
                .ok_or_else(|| BusError::Config("RabbitMQ settings are missing".to_string()))?;
            Arc::new(RabbitMqTransport::connect(rabbitmq).await?)
        }
        BrokerKind::ServiceBus => {
            let servicebus = settings
                .servicebus
                .as_ref()
                .ok_or_else(|| BusError::Config("Service bus settings are missing".to_string()))?;
            Arc::new(ServiceBusTransport::connect(servicebus).await?)
        }
    };

    start_bus(transport, &settings.service.service_name, consumers, retry_override, Vec::new())
        .await
}

/// Wire consumers, the retry policy, and observers onto an already connected
/// transport. The span fault observer is always attached first;
/// `extra_observers` come after it. Used by [`provision_bus`] and by tests
/// running on an in-memory transport.
pub async fn start_bus(
    transport: Arc<dyn Transport>,
    service_name: &str,
    consumers: ConsumerRegistry,
    retry_override: Option<RetryPolicy>,
    extra_observers: Vec<Arc<dyn ConsumeObserver>>,
) -> Result<MessageBus, BusError> {
    let retry = retry_override.unwrap_or_default();

    let mut observers: Vec<Arc<dyn ConsumeObserver>> = vec![Arc::new(SpanFaultObserver)];
    observers.extend(extra_observers);
    let observers = Arc::new(observers);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let mut workers = Vec::new();

    for binding in consumers.into_bindings() {
        let endpoint = Endpoint {
            name: endpoint_name(service_name, binding.message_type()),
            topic: kebab_case(binding.message_type()),
        };
        let source = transport.bind_endpoint(&endpoint).await?;

        info!(
            endpoint = %endpoint.name,
            message_type = binding.message_type(),
            "Consumer registered"
        );

        let dispatcher = EndpointDispatcher {
            endpoint: endpoint.name,
            binding,
            retry: retry.clone(),
            observers: observers.clone(),
        };
        workers.push(tokio::spawn(dispatcher.run(source, shutdown_rx.clone())));
    }

    Ok(MessageBus::new(transport, shutdown_tx, workers))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_discriminator_selects_rabbitmq() {
        assert_eq!(BrokerKind::from_discriminator(None), BrokerKind::RabbitMq);
        assert_eq!(BrokerKind::from_discriminator(Some("")), BrokerKind::RabbitMq);
    }

    #[test]
    fn discriminator_is_case_insensitive() {
        assert_eq!(BrokerKind::from_discriminator(Some("rabbitmq")), BrokerKind::RabbitMq);
        assert_eq!(BrokerKind::from_discriminator(Some("RABBITMQ")), BrokerKind::RabbitMq);
        assert_eq!(BrokerKind::from_discriminator(Some("ServiceBus")), BrokerKind::ServiceBus);
        assert_eq!(BrokerKind::from_discriminator(Some("SERVICEBUS")), BrokerKind::ServiceBus);
    }

    #[test]
    fn unrecognized_discriminator_falls_back_to_rabbitmq() {
        assert_eq!(BrokerKind::from_discriminator(Some("kafka")), BrokerKind::RabbitMq);
    }
}
