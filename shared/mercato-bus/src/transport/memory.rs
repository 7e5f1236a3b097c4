//! In-process transport for tests and local wiring.
//!
//! Implements the same surface as the broker transports over tokio channels
//! and records settlements so tests can assert on acks and dead-letters.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};

use crate::error::BusError;
use crate::transport::{DeliveryAck, Endpoint, EndpointSource, Transport, TransportDelivery};

#[derive(Default)]
struct MemoryState {
    /// topic -> senders of every endpoint queue bound to it
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Vec<u8>>>>,
    /// endpoint -> settled deliveries
    acked: HashMap<String, u64>,
    /// endpoint -> dead-lettered payloads
    dead_letters: HashMap<String, Vec<Vec<u8>>>,
}

#[derive(Clone, Default)]
pub struct InMemoryTransport {
    state: Arc<Mutex<MemoryState>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Settled delivery count for an endpoint.
    pub async fn acked(&self, endpoint: &str) -> u64 {
        self.state.lock().await.acked.get(endpoint).copied().unwrap_or(0)
    }

    /// Payloads dead-lettered from an endpoint.
    pub async fn dead_letters(&self, endpoint: &str) -> Vec<Vec<u8>> {
        self.state.lock().await.dead_letters.get(endpoint).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn bind_endpoint(&self, endpoint: &Endpoint) -> Result<Box<dyn EndpointSource>, BusError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let mut state = self.state.lock().await;
        state.subscribers.entry(endpoint.topic.clone()).or_default().push(sender);
        Ok(Box::new(InMemorySource {
            endpoint: endpoint.name.clone(),
            receiver,
            state: self.state.clone(),
        }))
    }

    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), BusError> {
        let state = self.state.lock().await;
        if let Some(senders) = state.subscribers.get(topic) {
            for sender in senders {
                // A dropped receiver is an unbound endpoint; skip it, like a
                // broker with no queue bound to the topic.
                let _ = sender.send(payload.to_vec());
            }
        }
        Ok(())
    }

    async fn close(&self) -> Result<(), BusError> {
        self.state.lock().await.subscribers.clear();
        Ok(())
    }
}

struct InMemorySource {
    endpoint: String,
    receiver: mpsc::UnboundedReceiver<Vec<u8>>,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl EndpointSource for InMemorySource {
    async fn recv(&mut self) -> Option<Result<TransportDelivery, BusError>> {
        let payload = self.receiver.recv().await?;
        Some(Ok(TransportDelivery {
            payload: payload.clone(),
            acker: Box::new(InMemoryAck {
                endpoint: self.endpoint.clone(),
                payload,
                state: self.state.clone(),
            }),
        }))
    }
}

struct InMemoryAck {
    endpoint: String,
    payload: Vec<u8>,
    state: Arc<Mutex<MemoryState>>,
}

#[async_trait]
impl DeliveryAck for InMemoryAck {
    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        let InMemoryAck { endpoint, state, .. } = *self;
        *state.lock().await.acked.entry(endpoint).or_insert(0) += 1;
        Ok(())
    }

    async fn dead_letter(self: Box<Self>) -> Result<(), BusError> {
        let InMemoryAck { endpoint, payload, state } = *self;
        state.lock().await.dead_letters.entry(endpoint).or_default().push(payload);
        Ok(())
    }
}
