//! Dispatch pipeline behavior on the in-memory transport: settlement,
//! redelivery, fault observation, dead-lettering, and graceful shutdown.

use async_trait::async_trait;
use mercato_bus::transport::{InMemoryTransport, Transport};
use mercato_bus::{
    start_bus, ConsumeContext, ConsumeObserver, Consumer, ConsumerRegistry, Message, MessageBus,
    RetryPolicy,
};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::{sleep, timeout};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderPlaced {
    order: String,
}

impl Message for OrderPlaced {}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct OrderCancelled {
    order: String,
}

impl Message for OrderCancelled {}

#[derive(Default)]
struct RecordingConsumer {
    received: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Consumer<OrderPlaced> for RecordingConsumer {
    async fn consume(&self, message: OrderPlaced) -> anyhow::Result<()> {
        self.received.lock().await.push(message.order);
        Ok(())
    }
}

struct FailingConsumer {
    calls: Arc<AtomicU32>,
}

#[async_trait]
impl Consumer<OrderPlaced> for FailingConsumer {
    async fn consume(&self, _message: OrderPlaced) -> anyhow::Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        anyhow::bail!("inventory lookup failed")
    }
}

struct SlowConsumer {
    started: Arc<AtomicU32>,
    completed: Arc<AtomicU32>,
}

#[async_trait]
impl Consumer<OrderPlaced> for SlowConsumer {
    async fn consume(&self, _message: OrderPlaced) -> anyhow::Result<()> {
        self.started.fetch_add(1, Ordering::SeqCst);
        sleep(Duration::from_millis(100)).await;
        self.completed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
struct RecordingObserver {
    pre: AtomicU32,
    post: AtomicU32,
    faults: Mutex<Vec<(u32, String)>>,
}

#[async_trait]
impl ConsumeObserver for RecordingObserver {
    async fn pre_consume(&self, _ctx: &ConsumeContext) {
        self.pre.fetch_add(1, Ordering::SeqCst);
    }

    async fn post_consume(&self, _ctx: &ConsumeContext) {
        self.post.fetch_add(1, Ordering::SeqCst);
    }

    async fn consume_fault(&self, ctx: &ConsumeContext, error: &anyhow::Error) {
        self.faults.lock().await.push((ctx.attempt, error.to_string()));
    }
}

async fn start_test_bus(
    transport: &InMemoryTransport,
    consumers: ConsumerRegistry,
    retry: Option<RetryPolicy>,
    observers: Vec<Arc<dyn ConsumeObserver>>,
) -> MessageBus {
    start_bus(Arc::new(transport.clone()), "fulfillment", consumers, retry, observers)
        .await
        .expect("bus should start")
}

/// Polls until `count` deliveries are settled, failing after five seconds.
async fn wait_for_acks(transport: &InMemoryTransport, endpoint: &str, count: u64) {
    timeout(Duration::from_secs(5), async {
        while transport.acked(endpoint).await < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("deliveries not settled in time");
}

/// Polls until the endpoint has a dead-lettered payload.
async fn wait_for_dead_letter(transport: &InMemoryTransport, endpoint: &str) {
    timeout(Duration::from_secs(5), async {
        while transport.dead_letters(endpoint).await.is_empty() {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("no dead letter in time");
}

/// Polls until the counter reaches `count`.
async fn wait_for_count(counter: &AtomicU32, count: u32) {
    timeout(Duration::from_secs(5), async {
        while counter.load(Ordering::SeqCst) < count {
            sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("count not reached in time");
}

#[tokio::test]
async fn consumed_message_is_dispatched_and_settled() {
    let transport = InMemoryTransport::new();
    let received = Arc::new(Mutex::new(Vec::new()));
    let consumers =
        ConsumerRegistry::new().register(RecordingConsumer { received: received.clone() });

    let bus = start_test_bus(&transport, consumers, None, Vec::new()).await;
    bus.publish(&OrderPlaced { order: "ord-7".to_string() }).await.unwrap();

    // Settled under the computed endpoint name.
    wait_for_acks(&transport, "fulfillment-order-placed", 1).await;
    assert_eq!(*received.lock().await, vec!["ord-7".to_string()]);
    assert!(transport.dead_letters("fulfillment-order-placed").await.is_empty());

    bus.shutdown().await.unwrap();
    assert!(!bus.is_running());
}

#[tokio::test]
async fn endpoints_dispatch_independently() {
    let transport = InMemoryTransport::new();
    let placed = Arc::new(Mutex::new(Vec::new()));

    struct CancelledConsumer {
        cancelled: Arc<AtomicU32>,
    }

    #[async_trait]
    impl Consumer<OrderCancelled> for CancelledConsumer {
        async fn consume(&self, _message: OrderCancelled) -> anyhow::Result<()> {
            self.cancelled.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    let cancelled = Arc::new(AtomicU32::new(0));
    let consumers = ConsumerRegistry::new()
        .register(RecordingConsumer { received: placed.clone() })
        .register(CancelledConsumer { cancelled: cancelled.clone() });
    let bus = start_test_bus(&transport, consumers, None, Vec::new()).await;

    bus.publish(&OrderPlaced { order: "a".to_string() }).await.unwrap();
    bus.publish(&OrderCancelled { order: "b".to_string() }).await.unwrap();

    wait_for_acks(&transport, "fulfillment-order-placed", 1).await;
    wait_for_acks(&transport, "fulfillment-order-cancelled", 1).await;
    assert_eq!(cancelled.load(Ordering::SeqCst), 1);

    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn failing_consumer_is_redelivered_then_dead_lettered() {
    let transport = InMemoryTransport::new();
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(RecordingObserver::default());
    let consumers = ConsumerRegistry::new().register(FailingConsumer { calls: calls.clone() });

    // Two redeliveries with a tiny interval: three attempts in total.
    let bus = start_test_bus(
        &transport,
        consumers,
        Some(RetryPolicy::interval(2, Duration::from_millis(1))),
        vec![observer.clone()],
    )
    .await;
    bus.publish(&OrderPlaced { order: "ord-9".to_string() }).await.unwrap();

    wait_for_dead_letter(&transport, "fulfillment-order-placed").await;

    assert_eq!(calls.load(Ordering::SeqCst), 3);
    assert_eq!(transport.acked("fulfillment-order-placed").await, 0);
    assert_eq!(observer.pre.load(Ordering::SeqCst), 3);
    assert_eq!(observer.post.load(Ordering::SeqCst), 0);

    // Fault observation fires on every attempt with the error's description,
    // and never blocks redelivery.
    let faults = observer.faults.lock().await;
    assert_eq!(
        faults.iter().map(|(attempt, _)| *attempt).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(faults.iter().all(|(_, error)| error.contains("inventory lookup failed")));
    drop(faults);

    // Handler errors never tear the bus down.
    assert!(bus.is_running());
    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn malformed_payload_faults_without_invoking_the_consumer() {
    let transport = InMemoryTransport::new();
    let calls = Arc::new(AtomicU32::new(0));
    let observer = Arc::new(RecordingObserver::default());
    let consumers = ConsumerRegistry::new().register(FailingConsumer { calls: calls.clone() });

    let bus = start_test_bus(
        &transport,
        consumers,
        Some(RetryPolicy::none()),
        vec![observer.clone()],
    )
    .await;
    transport.publish("order-placed", b"not json").await.unwrap();

    wait_for_dead_letter(&transport, "fulfillment-order-placed").await;

    assert_eq!(calls.load(Ordering::SeqCst), 0);
    let faults = observer.faults.lock().await;
    assert_eq!(faults.len(), 1);
    assert!(faults[0].1.contains("malformed OrderPlaced payload"));
    drop(faults);

    bus.shutdown().await.unwrap();
}

#[tokio::test]
async fn shutdown_drains_in_flight_consumption() {
    let transport = InMemoryTransport::new();
    let started = Arc::new(AtomicU32::new(0));
    let completed = Arc::new(AtomicU32::new(0));
    let consumers = ConsumerRegistry::new()
        .register(SlowConsumer { started: started.clone(), completed: completed.clone() });

    let bus = start_test_bus(&transport, consumers, None, Vec::new()).await;
    bus.publish(&OrderPlaced { order: "ord-1".to_string() }).await.unwrap();

    wait_for_count(&started, 1).await;

    bus.shutdown().await.unwrap();

    // The in-flight delivery finished and was settled before the transport
    // was released.
    assert_eq!(completed.load(Ordering::SeqCst), 1);
    assert_eq!(transport.acked("fulfillment-order-placed").await, 1);
}
