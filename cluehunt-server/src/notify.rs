//! Outbound notification boundary
//!
//! The engine pushes [`TeamEvent`]s through a [`NotificationChannel`] and never
//! waits for delivery. The server wires in the shared [`EventBus`]; tests can
//! substitute a recording channel.

use cluehunt_common::{EventBus, HuntEvent, TeamEvent};

/// Fire-and-forget sink for team events
pub trait NotificationChannel: Send + Sync {
    fn publish(&self, team_id: &str, event: TeamEvent);
}

impl NotificationChannel for EventBus {
    fn publish(&self, team_id: &str, event: TeamEvent) {
        self.emit_lossy(HuntEvent {
            team_id: team_id.to_string(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_bus_addresses_team() {
        let bus = EventBus::new(8);
        let mut rx = bus.subscribe();

        bus.publish(
            "red",
            TeamEvent::Progress {
                next_clue_id: Some("b".to_string()),
                done: false,
            },
        );

        let received = rx.try_recv().unwrap();
        assert_eq!(received.team_id, "red");
        assert_eq!(received.event.event_type(), "progress");
    }

    #[test]
    fn test_publish_without_subscribers_is_silent() {
        let bus = EventBus::new(8);
        bus.publish(
            "red",
            TeamEvent::Progress {
                next_clue_id: None,
                done: true,
            },
        );
        assert_eq!(bus.subscriber_count(), 0);
    }
}
