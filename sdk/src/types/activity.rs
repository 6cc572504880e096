//! Activity event types for the Buzzword Bingo SDK.
//!
//! Provides activity events (words marked, BINGO calls, players joining)
//! and the bounded newest-first feed that keeps the most recent ones.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Default number of events kept by an [`ActivityFeed`].
pub const DEFAULT_FEED_CAPACITY: usize = 50;

/// A single activity event envelope.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityEvent {
    /// Event identifier.
    pub id: String,

    /// Event type label (e.g. `word_marked`, `bingo_called`).
    #[serde(rename = "type")]
    pub event_type: String,

    /// Arbitrary event payload.
    #[serde(default)]
    pub payload: serde_json::Value,

    /// Server timestamp of the event.
    pub timestamp: String,
}

impl ActivityEvent {
    /// Creates a new event with an empty payload.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        event_type: impl Into<String>,
        timestamp: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            event_type: event_type.into(),
            payload: serde_json::Value::Null,
            timestamp: timestamp.into(),
        }
    }

    /// Sets the payload.
    #[must_use]
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

/// Bounded ring buffer of activity events, newest first.
#[derive(Debug, Clone, PartialEq)]
pub struct ActivityFeed {
    capacity: usize,
    events: VecDeque<ActivityEvent>,
}

impl Default for ActivityFeed {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_FEED_CAPACITY)
    }
}

impl ActivityFeed {
    /// Creates an empty feed holding at most `capacity` events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    /// Prepends an event, dropping the oldest ones past capacity.
    pub fn push(&mut self, event: ActivityEvent) {
        self.events.push_front(event);
        self.events.truncate(self.capacity);
    }

    /// Returns the newest event.
    #[must_use]
    pub fn latest(&self) -> Option<&ActivityEvent> {
        self.events.front()
    }

    /// Iterates events newest first.
    pub fn iter(&self) -> impl Iterator<Item = &ActivityEvent> {
        self.events.iter()
    }

    /// Returns the number of buffered events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Returns true if no events are buffered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Returns the maximum number of buffered events.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(n: usize) -> ActivityEvent {
        ActivityEvent::new(format!("e{}", n), "word_marked", format!("T{}", n))
    }

    #[test]
    fn test_feed_newest_first() {
        let mut feed = ActivityFeed::default();
        feed.push(event(1));
        feed.push(event(2));

        let ids: Vec<&str> = feed.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["e2", "e1"]);
        assert_eq!(feed.latest().map(|e| e.id.as_str()), Some("e2"));
    }

    #[test]
    fn test_feed_bounded_at_capacity() {
        let mut feed = ActivityFeed::default();
        for n in 0..120 {
            feed.push(event(n));
            assert!(feed.len() <= DEFAULT_FEED_CAPACITY);
        }

        assert_eq!(feed.len(), DEFAULT_FEED_CAPACITY);
        assert_eq!(feed.latest().map(|e| e.id.as_str()), Some("e119"));
        assert_eq!(feed.iter().last().map(|e| e.id.as_str()), Some("e70"));
    }

    #[test]
    fn test_feed_custom_capacity() {
        let mut feed = ActivityFeed::with_capacity(2);
        feed.push(event(1));
        feed.push(event(2));
        feed.push(event(3));
        assert_eq!(feed.len(), 2);
        assert_eq!(feed.capacity(), 2);
    }

    #[test]
    fn test_event_deserialize_type_field() {
        let json = r#"{"id":"e1","type":"bingo_called","payload":{"nickname":"Alice"},"timestamp":"T1"}"#;
        let event: ActivityEvent = serde_json::from_str(json).expect("deserialize");
        assert_eq!(event.event_type, "bingo_called");
        assert_eq!(event.payload["nickname"], "Alice");
    }

    #[test]
    fn test_event_deserialize_without_payload() {
        let json = r#"{"id":"e1","type":"player_joined","timestamp":"T1"}"#;
        let event: ActivityEvent = serde_json::from_str(json).expect("deserialize");
        assert!(event.payload.is_null());
    }
}
