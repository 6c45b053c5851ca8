use dashmap::DashMap;
use tokio::sync::broadcast;

use crate::dto::sse::ServerEvent;

/// Simple broadcast hub wrapper used by the SSE services.
pub struct SseHub {
    sender: broadcast::Sender<ServerEvent>,
}

impl SseHub {
    /// Construct a new hub backed by a Tokio broadcast channel with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let (sender, _receiver) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Register a new subscriber that will receive subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerEvent> {
        self.sender.subscribe()
    }

    /// Send an event to all current subscribers, ignoring delivery errors.
    pub fn broadcast(&self, event: ServerEvent) {
        let _ = self.sender.send(event);
    }

    /// Number of live subscribers.
    pub fn receiver_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// One SSE hub per room, created lazily on first subscription.
pub struct RoomHubs {
    hubs: DashMap<String, SseHub>,
    capacity: usize,
}

impl RoomHubs {
    /// Empty registry; every hub gets a channel of `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            hubs: DashMap::new(),
            capacity,
        }
    }

    /// Subscribe to a room, creating its hub on first use.
    pub fn subscribe(&self, room_id: &str) -> broadcast::Receiver<ServerEvent> {
        self.hubs
            .entry(room_id.to_string())
            .or_insert_with(|| SseHub::new(self.capacity))
            .subscribe()
    }

    /// Fan an event out to the room's subscribers. Hubs left without subscribers are dropped.
    pub fn broadcast(&self, room_id: &str, event: ServerEvent) {
        let listening = match self.hubs.get(room_id) {
            Some(hub) if hub.receiver_count() > 0 => {
                hub.broadcast(event);
                true
            }
            Some(_) => false,
            None => return,
        };

        if !listening {
            self.release(room_id);
        }
    }

    /// Drop the room's hub if nobody listens to it anymore.
    pub fn release(&self, room_id: &str) -> bool {
        self.hubs
            .remove_if(room_id, |_, hub| hub.receiver_count() == 0)
            .is_some()
    }

    /// Drop the room's hub, ending every subscriber stream once drained.
    pub fn close(&self, room_id: &str) -> bool {
        self.hubs.remove(room_id).is_some()
    }

    /// Whether a hub exists for the room.
    pub fn contains(&self, room_id: &str) -> bool {
        self.hubs.contains_key(room_id)
    }

    /// Number of rooms with a hub.
    pub fn len(&self) -> usize {
        self.hubs.len()
    }

    /// Whether no room has a hub.
    pub fn is_empty(&self) -> bool {
        self.hubs.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::broadcast::error::RecvError;

    use super::*;

    #[tokio::test]
    async fn events_reach_only_the_matching_room() {
        let hubs = RoomHubs::new(8);
        let mut abc = hubs.subscribe("ABC123");
        let mut xyz = hubs.subscribe("XYZ789");

        hubs.broadcast("ABC123", ServerEvent::new(Some("room.update".into()), "{}".into()));

        let event = abc.recv().await.unwrap();
        assert_eq!(event.event.as_deref(), Some("room.update"));
        assert!(xyz.try_recv().is_err());
    }

    #[tokio::test]
    async fn close_ends_subscriber_streams() {
        let hubs = RoomHubs::new(8);
        let mut rx = hubs.subscribe("ABC123");

        hubs.broadcast("ABC123", ServerEvent::new(Some("room.deleted".into()), "{}".into()));
        assert!(hubs.close("ABC123"));

        assert!(rx.recv().await.is_ok());
        assert!(matches!(rx.recv().await, Err(RecvError::Closed)));
    }

    #[test]
    fn abandoned_hubs_are_pruned_on_broadcast() {
        let hubs = RoomHubs::new(8);
        drop(hubs.subscribe("ABC123"));
        assert!(hubs.contains("ABC123"));

        hubs.broadcast("ABC123", ServerEvent::new(None, "{}".into()));
        assert!(!hubs.contains("ABC123"));
    }

    #[test]
    fn release_keeps_hubs_with_listeners() {
        let hubs = RoomHubs::new(8);
        let rx = hubs.subscribe("ABC123");
        assert!(!hubs.release("ABC123"));

        drop(rx);
        assert!(hubs.release("ABC123"));
        assert!(hubs.is_empty());
    }
}
