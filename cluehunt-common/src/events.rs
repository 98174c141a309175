//! Event types for the clue hunt event system
//!
//! Every event is addressed to one team. The server publishes [`HuntEvent`]s
//! on the [`EventBus`]; each team's SSE stream filters the bus down to its own
//! [`TeamEvent`]s.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Who wrote a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Bot,
}

/// One entry of a team's chat log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    /// Unix milliseconds
    pub ts: i64,
}

impl ChatMessage {
    /// Message written by the hunt itself, stamped now
    pub fn bot(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Bot,
            text: text.into(),
            ts: crate::time::now_millis(),
        }
    }

    /// Message written by a team member, stamped now
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            text: text.into(),
            ts: crate::time::now_millis(),
        }
    }
}

/// Events pushed to a team's connected clients
///
/// Serialized with a `type` tag so SSE payloads are self-describing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TeamEvent {
    /// Sent on join: where the team currently stands
    #[serde(rename_all = "camelCase")]
    State {
        current_clue_id: String,
        hint: String,
    },

    /// Team advanced past a clue
    ///
    /// `next_clue_id` is `None` and `done` is true when the clue was terminal.
    #[serde(rename_all = "camelCase")]
    Progress {
        next_clue_id: Option<String>,
        done: bool,
    },

    /// A chat line was appended to the team's log
    ChatMessage(ChatMessage),
}

impl TeamEvent {
    /// SSE `event:` field for this event
    pub fn event_type(&self) -> &'static str {
        match self {
            TeamEvent::State { .. } => "state",
            TeamEvent::Progress { .. } => "progress",
            TeamEvent::ChatMessage(_) => "chatMessage",
        }
    }
}

/// A [`TeamEvent`] addressed to one team channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntEvent {
    pub team_id: String,
    pub event: TeamEvent,
}

/// Central event distribution bus
///
/// Uses `tokio::broadcast` internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Automatic cleanup when subscribers drop
/// - Lagged subscribers lose the oldest events rather than stalling the engine
///
/// Delivery is fire-and-forget: nothing tracks acknowledgment.
///
/// # Examples
///
/// ```
/// use cluehunt_common::events::{EventBus, HuntEvent, TeamEvent};
///
/// let event_bus = EventBus::new(100);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(HuntEvent {
///     team_id: "red".to_string(),
///     event: TeamEvent::Progress { next_clue_id: None, done: true },
/// });
///
/// assert_eq!(rx.try_recv().unwrap().team_id, "red");
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<HuntEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<HuntEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Ok(subscriber_count)` if at least one subscriber exists.
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(&self, event: HuntEvent) -> Result<usize, broadcast::error::SendError<HuntEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// A team with no open stream simply misses the push; its chat log still
    /// records the message.
    pub fn emit_lossy(&self, event: HuntEvent) {
        let _ = self.tx.send(event);
    }

    /// Get the current number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// Get the configured channel capacity
    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn progress(team: &str) -> HuntEvent {
        HuntEvent {
            team_id: team.to_string(),
            event: TeamEvent::Progress {
                next_clue_id: Some("c2".to_string()),
                done: false,
            },
        }
    }

    #[test]
    fn test_eventbus_new() {
        let bus = EventBus::new(100);
        assert_eq!(bus.capacity(), 100);
        assert_eq!(bus.subscriber_count(), 0);
    }

    #[test]
    fn test_eventbus_emit_without_subscribers_errors() {
        let bus = EventBus::new(10);
        assert!(bus.emit(progress("red")).is_err());
        // Lossy variant must not panic
        bus.emit_lossy(progress("red"));
    }

    #[test]
    fn test_eventbus_multiple_subscribers() {
        let bus = EventBus::new(10);
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 2);

        bus.emit(progress("blue")).expect("emit should succeed");

        assert_eq!(rx1.try_recv().expect("rx1 should receive").team_id, "blue");
        assert_eq!(rx2.try_recv().expect("rx2 should receive").team_id, "blue");
    }

    #[test]
    fn test_progress_serializes_camel_case() {
        let json = serde_json::to_value(TeamEvent::Progress {
            next_clue_id: None,
            done: true,
        })
        .unwrap();
        assert_eq!(json["type"], "progress");
        assert!(json["nextClueId"].is_null());
        assert_eq!(json["done"], true);
    }

    #[test]
    fn test_chat_message_event_is_flat() {
        let event = TeamEvent::ChatMessage(ChatMessage {
            role: ChatRole::Bot,
            text: "Hint: look up".to_string(),
            ts: 42,
        });
        assert_eq!(event.event_type(), "chatMessage");

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "chatMessage");
        assert_eq!(json["role"], "bot");
        assert_eq!(json["text"], "Hint: look up");
        assert_eq!(json["ts"], 42);
    }

    #[test]
    fn test_state_event_type() {
        let event = TeamEvent::State {
            current_clue_id: "c1".to_string(),
            hint: "Start at: Fountain".to_string(),
        };
        assert_eq!(event.event_type(), "state");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["currentClueId"], "c1");
    }
}
