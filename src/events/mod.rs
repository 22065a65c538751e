//! Crawl event stream
//!
//! Skips, failures, backoffs, and progress are all reported as events.
//! The crawler publishes through [`EventSink`]; [`EventBus`] is the
//! in-process implementation with live subscribers and recent history.

mod bus;
mod event;

pub use bus::{EventBus, DEFAULT_HISTORY, DEFAULT_QUEUE_CAPACITY};
pub use event::{CrawlEvent, EventKind};

/// Destination for crawl events
///
/// `publish` must not block the caller.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: CrawlEvent);
}

use std::sync::Arc;

/// Publishes events stamped with one task id
#[derive(Clone)]
pub struct EventReporter {
    sink: Arc<dyn EventSink>,
    task_id: Option<String>,
}

impl EventReporter {
    pub fn new(sink: Arc<dyn EventSink>, task_id: Option<&str>) -> Self {
        Self {
            sink,
            task_id: task_id.map(str::to_string),
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        self.task_id.as_deref()
    }

    /// Starts an event of `kind` for this reporter's task
    pub fn event(&self, kind: EventKind) -> CrawlEvent {
        CrawlEvent::new(kind, self.task_id.as_deref())
    }

    pub fn publish(&self, event: CrawlEvent) {
        self.sink.publish(event);
    }
}
