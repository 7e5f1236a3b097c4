//! Explicit consumer registration.
//!
//! Each service hands the provisioner the complete list of message-type →
//! handler bindings at startup; the set is frozen once provisioning runs.

use anyhow::Context;
use async_trait::async_trait;
use std::marker::PhantomData;
use std::sync::Arc;

use crate::message::Message;

/// Handler for one message type. Errors are non-fatal: they drive the
/// redelivery policy and, once it is exhausted, the dead-letter path.
#[async_trait]
pub trait Consumer<M: Message>: Send + Sync + 'static {
    async fn consume(&self, message: M) -> anyhow::Result<()>;
}

/// Type-erased consumer invoked by the dispatch loop with the raw payload.
#[async_trait]
pub(crate) trait ErasedConsumer: Send + Sync {
    async fn consume(&self, payload: &[u8]) -> anyhow::Result<()>;
}

struct TypedConsumer<M, C> {
    consumer: C,
    _message: PhantomData<fn(M)>,
}

#[async_trait]
impl<M: Message, C: Consumer<M>> ErasedConsumer for TypedConsumer<M, C> {
    async fn consume(&self, payload: &[u8]) -> anyhow::Result<()> {
        let message: M = serde_json::from_slice(payload)
            .with_context(|| format!("malformed {} payload", M::message_type()))?;
        self.consumer.consume(message).await
    }
}

/// One message-type → handler binding.
#[derive(Clone)]
pub struct ConsumerBinding {
    message_type: &'static str,
    handler: Arc<dyn ErasedConsumer>,
}

impl ConsumerBinding {
    pub fn message_type(&self) -> &'static str {
        self.message_type
    }

    pub(crate) fn handler(&self) -> Arc<dyn ErasedConsumer> {
        self.handler.clone()
    }
}

/// The complete consumer set of one service.
#[derive(Default)]
pub struct ConsumerRegistry {
    bindings: Vec<ConsumerBinding>,
}

impl ConsumerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `consumer` to its message type.
    pub fn register<M: Message, C: Consumer<M>>(mut self, consumer: C) -> Self {
        self.bindings.push(ConsumerBinding {
            message_type: M::message_type(),
            handler: Arc::new(TypedConsumer { consumer, _message: PhantomData }),
        });
        self
    }

    pub fn bindings(&self) -> &[ConsumerBinding] {
        &self.bindings
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    pub(crate) fn into_bindings(self) -> Vec<ConsumerBinding> {
        self.bindings
    }
}
