use crate::messages::SensorMessage;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::BroadcastStream;
use tokio_stream::{Stream, StreamExt};
use tracing::{debug, trace};

/// Buffer per topic; at 1 kHz this is one second of backlog for a slow subscriber
const TOPIC_CAPACITY: usize = 1000;

/// Publish/subscribe bus for sensor reports.
///
/// Delivery is fire-and-forget: publishing with no subscribers succeeds, and
/// a subscriber that falls behind loses the oldest messages.
#[derive(Clone, Default)]
pub struct TopicBus {
    topics: Arc<RwLock<HashMap<String, TopicHandle>>>,
}

/// Publication handle returned by [`TopicBus::advertise`]
#[derive(Clone, Debug)]
pub struct TopicHandle {
    name: Arc<str>,
    tx: broadcast::Sender<SensorMessage>,
    published: Arc<AtomicU64>,
}

impl TopicHandle {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Snapshot of one topic's counters
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TopicStatus {
    pub name: String,
    pub messages_published: u64,
    pub subscribers: usize,
}

impl TopicBus {
    pub fn new() -> Self {
        Self::default()
    }

    async fn get_or_create(&self, name: &str) -> TopicHandle {
        if let Some(handle) = self.topics.read().await.get(name) {
            return handle.clone();
        }

        let mut topics = self.topics.write().await;
        topics
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!("[topics] creating topic '{}'", name);
                let (tx, _) = broadcast::channel(TOPIC_CAPACITY);
                TopicHandle {
                    name: Arc::from(name),
                    tx,
                    published: Arc::new(AtomicU64::new(0)),
                }
            })
            .clone()
    }

    /// Advertise a topic for publication; advertising an existing topic returns its handle
    pub async fn advertise(&self, name: &str) -> TopicHandle {
        self.get_or_create(name).await
    }

    /// Publish a message under the handle's topic
    pub fn publish(&self, handle: &TopicHandle, message: SensorMessage) {
        handle.published.fetch_add(1, Ordering::Relaxed);
        if handle.tx.send(message).is_err() {
            // No active subscribers - this is fine
            trace!("[topics] '{}' has no subscribers", handle.name);
        }
    }

    /// Subscribe to a topic, creating it if nobody has advertised it yet
    pub async fn subscribe(&self, name: &str) -> broadcast::Receiver<SensorMessage> {
        self.get_or_create(name).await.tx.subscribe()
    }

    /// Subscribe as a stream, skipping over messages lost to lag
    pub async fn stream(&self, name: &str) -> impl Stream<Item = SensorMessage> {
        let rx = self.subscribe(name).await;
        BroadcastStream::new(rx).filter_map(|item| item.ok())
    }

    pub async fn stats(&self) -> Vec<TopicStatus> {
        let topics = self.topics.read().await;
        let mut stats: Vec<TopicStatus> = topics
            .values()
            .map(|h| TopicStatus {
                name: h.name.to_string(),
                messages_published: h.published.load(Ordering::Relaxed),
                subscribers: h.tx.receiver_count(),
            })
            .collect();
        stats.sort_by(|a, b| a.name.cmp(&b.name));
        stats
    }
}
