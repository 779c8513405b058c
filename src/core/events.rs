//! In-process publish/subscribe dispatcher.
//!
//! One handler per topic, a bounded FIFO queue, and a single dispatcher task
//! that fans each event out to its handler on a fresh task. Handler failures
//! stay inside the bus; publishers only see an error once the bus is closed.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, warn};

/// Default number of events the queue holds before publishers block
pub const DEFAULT_CAPACITY: usize = 10;

/// An event in flight on the bus
#[derive(Debug, Clone)]
pub struct Event {
    pub topic: String,
    pub payload: serde_json::Value,
}

/// Handler invoked for every event published on a subscribed topic
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, event: Event) -> anyhow::Result<()>;
}

#[derive(Debug, Error)]
pub enum BusError {
    #[error("duplicate subscription for topic: {0}")]
    DuplicateSubscription(String),

    #[error("event bus is closed")]
    Closed,
}

/// Publish/subscribe bus under construction.
///
/// Subscriptions are registered up front, before traffic begins; the
/// subscriber map is frozen once `start` hands it to the dispatcher.
pub struct EventBus {
    capacity: usize,
    subscribers: HashMap<String, Arc<dyn EventHandler>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            subscribers: HashMap::new(),
        }
    }

    /// Register the handler for a topic. Topics map one-to-one to handlers;
    /// a second registration fails and leaves the first in place.
    pub fn subscribe(
        &mut self,
        topic: impl Into<String>,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), BusError> {
        let topic = topic.into();
        if self.subscribers.contains_key(&topic) {
            return Err(BusError::DuplicateSubscription(topic));
        }
        self.subscribers.insert(topic, handler);
        Ok(())
    }

    /// Start the dispatcher loop and hand back the running bus.
    pub fn start(self) -> RunningBus {
        let (tx, rx) = mpsc::channel(self.capacity);
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let dispatcher = tokio::spawn(dispatch_loop(rx, shutdown_rx, self.subscribers));

        RunningBus {
            publisher: Publisher { tx },
            shutdown_tx,
            dispatcher,
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Cloneable handle for publishing events onto the bus
#[derive(Clone)]
pub struct Publisher {
    tx: mpsc::Sender<Event>,
}

impl Publisher {
    /// Enqueue an event. Blocks while the queue is full (backpressure by
    /// design; the bus applies no timeout of its own).
    pub async fn publish(
        &self,
        topic: impl Into<String>,
        payload: serde_json::Value,
    ) -> Result<(), BusError> {
        let event = Event {
            topic: topic.into(),
            payload,
        };
        self.tx.send(event).await.map_err(|_| BusError::Closed)
    }
}

/// A started bus: publisher handles plus the dispatcher lifecycle
pub struct RunningBus {
    publisher: Publisher,
    shutdown_tx: oneshot::Sender<()>,
    dispatcher: JoinHandle<()>,
}

impl RunningBus {
    pub fn publisher(&self) -> Publisher {
        self.publisher.clone()
    }

    /// Stop accepting publishes, drain the queue, then stop the dispatcher.
    pub async fn shutdown(self) {
        drop(self.publisher);
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.dispatcher.await {
            error!("event dispatcher task failed during shutdown: {}", e);
        }
    }
}

async fn dispatch_loop(
    mut rx: mpsc::Receiver<Event>,
    mut shutdown_rx: oneshot::Receiver<()>,
    subscribers: HashMap<String, Arc<dyn EventHandler>>,
) {
    loop {
        tokio::select! {
            received = rx.recv() => match received {
                Some(event) => dispatch(event, &subscribers),
                None => break,
            },
            _ = &mut shutdown_rx => {
                // Refuse new publishes, then drain whatever is queued.
                rx.close();
                while let Some(event) = rx.recv().await {
                    dispatch(event, &subscribers);
                }
                break;
            }
        }
    }
}

/// Route one event to its topic handler on a fresh task. Events are
/// dispatched in queue order; handler completions are unordered.
fn dispatch(event: Event, subscribers: &HashMap<String, Arc<dyn EventHandler>>) {
    let Some(handler) = subscribers.get(&event.topic) else {
        warn!("no registered subscriber for {} topic", event.topic);
        return;
    };

    let handler = Arc::clone(handler);
    tokio::spawn(async move {
        let topic = event.topic.clone();
        if let Err(e) = handler.handle(event).await {
            error!("handler for {} topic returned an error: {:#}", topic, e);
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    struct CountingHandler {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl EventHandler for CountingHandler {
        async fn handle(&self, _event: Event) -> anyhow::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct RecordingHandler {
        seen: Arc<Mutex<Vec<serde_json::Value>>>,
    }

    #[async_trait]
    impl EventHandler for RecordingHandler {
        async fn handle(&self, event: Event) -> anyhow::Result<()> {
            self.seen.lock().unwrap().push(event.payload);
            Ok(())
        }
    }

    struct FailingHandler;

    #[async_trait]
    impl EventHandler for FailingHandler {
        async fn handle(&self, _event: Event) -> anyhow::Result<()> {
            anyhow::bail!("boom")
        }
    }

    #[tokio::test]
    async fn test_duplicate_subscription_rejected() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        bus.subscribe(
            "match-created",
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
            }),
        )
        .unwrap();

        let second = bus.subscribe("match-created", Arc::new(FailingHandler));
        assert!(matches!(second, Err(BusError::DuplicateSubscription(_))));

        // First handler is still the registered one
        let running = bus.start();
        running
            .publisher()
            .publish("match-created", serde_json::json!({}))
            .await
            .unwrap();
        running.shutdown().await;

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_publish_without_subscriber_is_dropped_not_an_error() {
        let bus = EventBus::new();
        let running = bus.start();

        let publisher = running.publisher();
        let publish = publisher.publish("nobody-home", serde_json::json!({"n": 1}));
        tokio::time::timeout(Duration::from_secs(1), publish)
            .await
            .expect("publish must not block indefinitely")
            .unwrap();

        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_events_dispatched_in_publish_order() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut bus = EventBus::with_capacity(4);
        bus.subscribe(
            "ordered",
            Arc::new(RecordingHandler {
                seen: Arc::clone(&seen),
            }),
        )
        .unwrap();

        let running = bus.start();
        let publisher = running.publisher();
        for n in 0..4 {
            publisher
                .publish("ordered", serde_json::json!(n))
                .await
                .unwrap();
        }
        running.shutdown().await;
        tokio::time::sleep(Duration::from_millis(50)).await;

        // Handler completions are unordered by contract, so only membership
        // is asserted; dispatch order is what the bus guarantees.
        let mut values = seen.lock().unwrap().clone();
        values.sort_by_key(|v| v.as_i64().unwrap());
        assert_eq!(values.len(), 4);
    }

    #[tokio::test]
    async fn test_handler_failure_is_contained() {
        let mut bus = EventBus::new();
        bus.subscribe("volatile", Arc::new(FailingHandler)).unwrap();

        let running = bus.start();
        let result = running
            .publisher()
            .publish("volatile", serde_json::json!({}))
            .await;
        assert!(result.is_ok());
        running.shutdown().await;
    }

    #[tokio::test]
    async fn test_publish_after_shutdown_fails() {
        let bus = EventBus::new();
        let running = bus.start();
        let publisher = running.publisher();
        running.shutdown().await;

        let result = publisher.publish("late", serde_json::json!({})).await;
        assert!(matches!(result, Err(BusError::Closed)));
    }

    #[tokio::test]
    async fn test_shutdown_drains_queued_events() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::with_capacity(8);
        bus.subscribe(
            "drain",
            Arc::new(CountingHandler {
                calls: Arc::clone(&calls),
            }),
        )
        .unwrap();

        let running = bus.start();
        let publisher = running.publisher();
        for _ in 0..5 {
            publisher
                .publish("drain", serde_json::json!({}))
                .await
                .unwrap();
        }
        running.shutdown().await;

        // Handlers are fire-and-forget; give spawned tasks a beat to finish.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }
}
