//! In-process event fan-out with bounded per-subscriber queues

use crate::events::{CrawlEvent, EventSink};
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::mpsc;
use tracing::debug;

/// Number of events kept for `recent`
pub const DEFAULT_HISTORY: usize = 500;

/// Queue depth of each subscriber
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Fire-and-forget event publisher
///
/// `publish` never waits. A subscriber whose queue is full or whose receiver
/// was dropped is evicted on the next publish.
#[derive(Debug)]
pub struct EventBus {
    subscribers: Mutex<Vec<mpsc::Sender<CrawlEvent>>>,
    history: Mutex<VecDeque<CrawlEvent>>,
    history_limit: usize,
    queue_capacity: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_HISTORY, DEFAULT_QUEUE_CAPACITY)
    }

    /// Creates a bus with the given history size and subscriber queue depth
    pub fn with_limits(history_limit: usize, queue_capacity: usize) -> Self {
        Self {
            subscribers: Mutex::new(Vec::new()),
            history: Mutex::new(VecDeque::with_capacity(history_limit)),
            history_limit,
            queue_capacity: queue_capacity.max(1),
        }
    }

    /// Registers a new subscriber
    ///
    /// The receiver only sees events published after this call; use
    /// [`EventBus::recent`] for earlier ones.
    pub fn subscribe(&self) -> mpsc::Receiver<CrawlEvent> {
        let (tx, rx) = mpsc::channel(self.queue_capacity);
        lock(&self.subscribers).push(tx);
        rx
    }

    /// Publishes an event to history and every live subscriber
    pub fn publish(&self, event: CrawlEvent) {
        debug!(target: "knowledge_crawler::events", "{}", event.to_json());

        {
            let mut history = lock(&self.history);
            if self.history_limit > 0 {
                if history.len() == self.history_limit {
                    history.pop_front();
                }
                history.push_back(event.clone());
            }
        }

        let mut subscribers = lock(&self.subscribers);
        subscribers.retain(|tx| tx.try_send(event.clone()).is_ok());
    }

    /// The last `n` events, oldest first
    pub fn recent(&self, n: usize) -> Vec<CrawlEvent> {
        let history = lock(&self.history);
        let skip = history.len().saturating_sub(n);
        history.iter().skip(skip).cloned().collect()
    }

    /// Number of subscribers still attached
    pub fn subscriber_count(&self) -> usize {
        lock(&self.subscribers).len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for EventBus {
    fn publish(&self, event: CrawlEvent) {
        EventBus::publish(self, event);
    }
}

// Events are diagnostics; a poisoned lock still holds usable data
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
