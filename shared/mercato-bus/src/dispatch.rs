//! Per-endpoint dispatch loop: consume, observe, redeliver, dead-letter.

use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn, Instrument};

use crate::consumer::ConsumerBinding;
use crate::observer::{ConsumeContext, ConsumeObserver};
use crate::retry::RetryPolicy;
use crate::transport::{EndpointSource, TransportDelivery};

pub(crate) struct EndpointDispatcher {
    pub(crate) endpoint: String,
    pub(crate) binding: ConsumerBinding,
    pub(crate) retry: RetryPolicy,
    pub(crate) observers: Arc<Vec<Arc<dyn ConsumeObserver>>>,
}

impl EndpointDispatcher {
    /// Runs until shutdown is signalled or the delivery stream ends. A
    /// delivery picked up before the signal is consumed to completion; the
    /// signal only stops the loop from taking the next one.
    pub(crate) async fn run(
        self,
        mut source: Box<dyn EndpointSource>,
        mut shutdown: watch::Receiver<bool>,
    ) {
        info!(
            endpoint = %self.endpoint,
            message_type = self.binding.message_type(),
            "Endpoint consuming"
        );

        loop {
            tokio::select! {
                _ = shutdown.changed() => break,
                delivery = source.recv() => match delivery {
                    None => break,
                    Some(Err(error)) => {
                        warn!(endpoint = %self.endpoint, error = %error, "Delivery stream error");
                    }
                    Some(Ok(delivery)) => self.consume_with_retry(delivery).await,
                },
            }
        }

        info!(endpoint = %self.endpoint, "Endpoint stopped");
    }

    async fn consume_with_retry(&self, delivery: TransportDelivery) {
        let TransportDelivery { payload, acker } = delivery;
        let handler = self.binding.handler();
        let mut attempt: u32 = 1;

        loop {
            let ctx = ConsumeContext {
                endpoint: self.endpoint.clone(),
                message_type: self.binding.message_type().to_string(),
                attempt,
            };

            for observer in self.observers.iter() {
                observer.pre_consume(&ctx).await;
            }

            let span = tracing::info_span!(
                "consume",
                endpoint = %ctx.endpoint,
                message_type = %ctx.message_type,
                attempt = ctx.attempt,
            );
            let result = async {
                let result = handler.consume(&payload).await;
                match &result {
                    Ok(()) => {
                        for observer in self.observers.iter() {
                            observer.post_consume(&ctx).await;
                        }
                    }
                    Err(error) => {
                        for observer in self.observers.iter() {
                            observer.consume_fault(&ctx, error).await;
                        }
                    }
                }
                result
            }
            .instrument(span)
            .await;

            match result {
                Ok(()) => {
                    if let Err(error) = acker.ack().await {
                        warn!(endpoint = %self.endpoint, error = %error, "Failed to settle delivery");
                    }
                    return;
                }
                Err(_) => {
                    let redeliveries_used = attempt - 1;
                    if redeliveries_used >= self.retry.attempts {
                        warn!(
                            endpoint = %self.endpoint,
                            attempts = attempt,
                            "Redelivery schedule exhausted; moving message to the dead-letter queue"
                        );
                        if let Err(error) = acker.dead_letter().await {
                            warn!(endpoint = %self.endpoint, error = %error, "Failed to dead-letter delivery");
                        }
                        return;
                    }
                    tokio::time::sleep(self.retry.delay_for(attempt)).await;
                    attempt += 1;
                }
            }
        }
    }
}
