use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{broadcast, RwLock};
use uuid::Uuid;

use crate::models::chatmodel::ChatMessage;

/// Buffered per room; a receiver that falls further behind than this sees
/// `RecvError::Lagged` and must replay from the ledger.
const ROOM_CHANNEL_CAPACITY: usize = 256;

/// Push-side fan-out. One broadcast channel per room, created lazily on the
/// first subscribe or publish. The ledger stays authoritative: subscribers
/// that miss a push catch up through `history`, this hub never buffers for
/// offline parties.
#[derive(Debug, Clone, Default)]
pub struct RealtimeHub {
    rooms: Arc<RwLock<HashMap<Uuid, broadcast::Sender<ChatMessage>>>>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        RealtimeHub::default()
    }

    pub async fn subscribe(&self, room_id: Uuid) -> broadcast::Receiver<ChatMessage> {
        {
            let rooms = self.rooms.read().await;
            if let Some(sender) = rooms.get(&room_id) {
                return sender.subscribe();
            }
        }

        let mut rooms = self.rooms.write().await;
        rooms
            .entry(room_id)
            .or_insert_with(|| broadcast::channel(ROOM_CHANNEL_CAPACITY).0)
            .subscribe()
    }

    /// Pushes an appended message to every live subscriber of the room, in
    /// append order. Dropped silently when nobody is subscribed.
    pub async fn publish(&self, room_id: Uuid, message: ChatMessage) {
        let rooms = self.rooms.read().await;
        if let Some(sender) = rooms.get(&room_id) {
            let delivered = sender.send(message).unwrap_or(0);
            tracing::debug!(room_id = %room_id, subscribers = delivered, "message fanned out");
        }
    }

    /// Drops the channel once the last receiver for a room is gone.
    pub async fn prune(&self, room_id: Uuid) {
        let mut rooms = self.rooms.write().await;
        if let Some(sender) = rooms.get(&room_id) {
            if sender.receiver_count() == 0 {
                rooms.remove(&room_id);
            }
        }
    }
}
