//! Post-commit domain events for external notifiers.
//!
//! The ledger publishes at most one event per successful operation, after
//! the transaction commits. Sink failures are logged and ignored: a
//! notification problem never rolls back a structural change.

use serde::Serialize;
use tracing::warn;

/// A personnel change that external collaborators may react to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DomainEvent {
    Assigned {
        assignment_id: i64,
        position_id: i64,
        user_id: i64,
    },
    Ended {
        assignment_id: i64,
        position_id: i64,
        user_id: i64,
        reason: String,
    },
    Transferred {
        user_id: i64,
        old_assignment_id: i64,
        new_assignment_id: i64,
        old_position_id: i64,
        new_position_id: i64,
    },
}

/// Receives domain events after commit. Implementations must not assume
/// delivery: the core ignores the result.
pub trait EventSink {
    /// Handle one event. Errors are the sink's to report; the core only
    /// logs them.
    fn publish(&self, event: &DomainEvent) -> anyhow::Result<()>;
}

/// Discards all events. The default for callers without a notifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn publish(&self, _event: &DomainEvent) -> anyhow::Result<()> {
        Ok(())
    }
}

/// Publish `event` to `sink`, swallowing (but logging) any failure.
pub(crate) fn publish_best_effort(sink: &dyn EventSink, event: &DomainEvent) {
    if let Err(error) = sink.publish(event) {
        warn!(?event, %error, "event sink failed; change is already committed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Sink that records everything it sees.
    #[derive(Debug, Default)]
    struct RecordingSink {
        events: Mutex<Vec<DomainEvent>>,
    }

    impl EventSink for RecordingSink {
        fn publish(&self, event: &DomainEvent) -> anyhow::Result<()> {
            self.events
                .lock()
                .map_err(|_| anyhow::anyhow!("poisoned"))?
                .push(event.clone());
            Ok(())
        }
    }

    struct FailingSink;

    impl EventSink for FailingSink {
        fn publish(&self, _event: &DomainEvent) -> anyhow::Result<()> {
            anyhow::bail!("downstream notifier unavailable")
        }
    }

    #[test]
    fn sink_failure_is_swallowed() {
        let event = DomainEvent::Assigned {
            assignment_id: 1,
            position_id: 2,
            user_id: 3,
        };
        // Must not panic or propagate.
        publish_best_effort(&FailingSink, &event);
    }

    #[test]
    fn recording_sink_sees_events() {
        let sink = RecordingSink::default();
        let event = DomainEvent::Ended {
            assignment_id: 1,
            position_id: 2,
            user_id: 3,
            reason: "resigned".to_string(),
        };
        publish_best_effort(&sink, &event);
        assert_eq!(sink.events.lock().expect("lock").len(), 1);
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = DomainEvent::Assigned {
            assignment_id: 1,
            position_id: 2,
            user_id: 3,
        };
        let json = serde_json::to_string(&event).expect("serialize");
        assert!(json.contains("\"kind\":\"assigned\""), "json: {json}");
    }
}
