//! In-memory [`EventBus`] reference implementation: records every event
//! into a shared `Vec` for test assertions, the same way the teacher's
//! test harness records RPC calls instead of sending them anywhere.

use std::sync::Mutex;

use async_trait::async_trait;

use crate::collab::events::{Event, EventBus, EventKind};

#[derive(Debug, Clone)]
pub struct RecordedEvent {
    pub kind: EventKind,
    pub path: String,
    pub new_path: Option<String>,
}

#[derive(Default)]
pub struct InMemoryEventBus {
    recorded: Mutex<Vec<RecordedEvent>>,
}

impl InMemoryEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn recorded(&self) -> Vec<RecordedEvent> {
        self.recorded.lock().unwrap().clone()
    }
}

#[async_trait]
impl EventBus for InMemoryEventBus {
    fn is_recordable(&self, _kind: EventKind) -> bool {
        true
    }

    async fn record(&self, event: Event) {
        self.recorded.lock().unwrap().push(RecordedEvent {
            kind: event.kind,
            path: event.path,
            new_path: event.new_path,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn records_events_in_order() {
        let bus = InMemoryEventBus::new();
        bus.record(Event::new(EventKind::FileCreated, "/a")).await;
        bus.record(Event::new(EventKind::FileDeleted, "/a")).await;
        let recorded = bus.recorded();
        assert_eq!(recorded.len(), 2);
        assert_eq!(recorded[0].kind, EventKind::FileCreated);
        assert_eq!(recorded[1].kind, EventKind::FileDeleted);
    }
}
