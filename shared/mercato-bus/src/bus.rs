//! The provisioned bus handle.

use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::endpoint::kebab_case;
use crate::error::BusError;
use crate::message::Message;
use crate::transport::Transport;

/// A fully provisioned bus: transport connected, consumers dispatching,
/// redelivery policy installed, fault observer attached.
///
/// Obtained once at startup from [`crate::provision_bus`] and held for the
/// process lifetime. Safe to share across tasks.
pub struct MessageBus {
    transport: Arc<dyn Transport>,
    shutdown: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

impl MessageBus {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        shutdown: watch::Sender<bool>,
        workers: Vec<JoinHandle<()>>,
    ) -> Self {
        Self { transport, shutdown, workers: Mutex::new(workers) }
    }

    /// Publish a contract message to its message-type topic.
    pub async fn publish<M: Message>(&self, message: &M) -> Result<(), BusError> {
        let payload = serde_json::to_vec(message)?;
        self.transport.publish(&kebab_case(M::message_type()), &payload).await
    }

    /// False once shutdown has begun.
    pub fn is_running(&self) -> bool {
        !*self.shutdown.borrow()
    }

    /// Graceful stop: stop taking new deliveries, let in-flight consumption
    /// finish, then release the transport connection.
    pub async fn shutdown(&self) -> Result<(), BusError> {
        if *self.shutdown.borrow() {
            return Ok(());
        }
        info!("Bus shutting down; draining in-flight consumption");

        let _ = self.shutdown.send(true);
        let workers: Vec<JoinHandle<()>> = self.workers.lock().await.drain(..).collect();
        for worker in workers {
            let _ = worker.await;
        }

        self.transport.close().await
    }
}
