//! Unit tests for the connection event bus.

use super::*;

fn state_change(id: ConnectionId) -> ConnectionEvent {
    ConnectionEvent::StateChanged {
        connection_id: id,
        previous_status: ConnectionStatus::NotConnected,
        new_status: ConnectionStatus::Connecting,
    }
}

/// Tests for event accessors and serialization.
mod events {
    use super::*;

    #[test]
    fn every_variant_exposes_its_connection_id() {
        let id = ConnectionId::new();

        let events = [
            state_change(id),
            ConnectionEvent::Refreshed {
                connection_id: id,
                queue_count: 4,
            },
            ConnectionEvent::Failed {
                connection_id: id,
                error_message: "no route to host".to_string(),
                will_retry: true,
                retry_attempt: 1,
            },
        ];

        for event in events {
            assert_eq!(event.connection_id(), id);
        }
    }

    #[test]
    fn events_round_trip_through_json() {
        let event = state_change(ConnectionId::new());

        let json = serde_json::to_string(&event).expect("event should serialize");
        let decoded: ConnectionEvent = serde_json::from_str(&json).expect("event should parse");

        assert_eq!(decoded, event, "Decoded event should match the original");
    }
}

/// Tests for broadcast delivery semantics.
mod delivery {
    use super::*;

    #[tokio::test]
    async fn publish_without_subscribers_reaches_nobody() {
        let bus = ConnectionEventBus::new(16);

        let reached = bus.publish(state_change(ConnectionId::new()));

        assert_eq!(reached, 0, "No subscribers means nobody is reached");
    }

    #[tokio::test]
    async fn subscriber_receives_published_event() {
        let bus = ConnectionEventBus::new(16);
        let mut receiver = bus.subscribe();
        let event = state_change(ConnectionId::new());

        let reached = bus.publish(event.clone());

        assert_eq!(reached, 1);
        let received = receiver.recv().await.expect("event should arrive");
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn every_subscriber_sees_every_event() {
        let bus = ConnectionEventBus::new(16);
        let mut first = bus.subscribe();
        let mut second = bus.subscribe();
        let event = state_change(ConnectionId::new());

        let reached = bus.publish(event.clone());

        assert_eq!(reached, 2);
        assert_eq!(first.recv().await.expect("first copy"), event);
        assert_eq!(second.recv().await.expect("second copy"), event);
    }

    #[tokio::test]
    async fn late_subscriber_misses_earlier_events() {
        let bus = ConnectionEventBus::new(16);
        bus.publish(state_change(ConnectionId::new()));

        let mut late = bus.subscribe();
        let event = ConnectionEvent::Refreshed {
            connection_id: ConnectionId::new(),
            queue_count: 2,
        };
        bus.publish(event.clone());

        let received = late.recv().await.expect("only the later event arrives");
        assert_eq!(received, event);
    }

    #[tokio::test]
    async fn subscriber_count_tracks_live_receivers() {
        let bus = ConnectionEventBus::default();
        assert_eq!(bus.subscriber_count(), 0);

        let receiver = bus.subscribe();
        assert_eq!(bus.subscriber_count(), 1);

        drop(receiver);
        assert_eq!(bus.subscriber_count(), 0);
    }
}
