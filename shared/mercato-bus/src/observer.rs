//! Consume pipeline observation.

use async_trait::async_trait;
use opentelemetry::trace::{get_active_span, Status};

/// What the pipeline knows about the delivery under consumption.
#[derive(Debug, Clone)]
pub struct ConsumeContext {
    pub endpoint: String,
    pub message_type: String,
    /// 1-based; 1 is the initial delivery, higher values are redeliveries.
    pub attempt: u32,
}

/// Hooks around message consumption. All hooks default to no-ops; none of
/// them may swallow or rewrite the handler's error, so redelivery proceeds
/// unmodified regardless of what an observer does.
#[async_trait]
pub trait ConsumeObserver: Send + Sync + 'static {
    async fn pre_consume(&self, _ctx: &ConsumeContext) {}

    async fn post_consume(&self, _ctx: &ConsumeContext) {}

    async fn consume_fault(&self, _ctx: &ConsumeContext, _error: &anyhow::Error) {}
}

/// Marks the active trace span as failed when a consumer raises an error.
///
/// Attached to every provisioned bus. Its only side effect is observability
/// annotation: the error keeps flowing into the redelivery policy.
pub struct SpanFaultObserver;

#[async_trait]
impl ConsumeObserver for SpanFaultObserver {
    async fn consume_fault(&self, ctx: &ConsumeContext, error: &anyhow::Error) {
        get_active_span(|span| {
            span.set_status(Status::error(error.to_string()));
        });
        tracing::error!(
            endpoint = %ctx.endpoint,
            message_type = %ctx.message_type,
            attempt = ctx.attempt,
            error = %error,
            "Consumer fault"
        );
    }
}
