use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};
use tracing::debug;

use super::events::LobbyEvent;
use crate::coordinator::ChannelName;

/// Fans lobby events out to per-channel subscribers
#[derive(Debug, Clone)]
pub struct EventBus {
    channels: Arc<RwLock<HashMap<ChannelName, broadcast::Sender<LobbyEvent>>>>,
    capacity: usize,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: Arc::new(RwLock::new(HashMap::new())),
            capacity,
        }
    }

    async fn sender(&self, channel: &ChannelName) -> broadcast::Sender<LobbyEvent> {
        if let Some(sender) = self.channels.read().await.get(channel) {
            return sender.clone();
        }

        debug!(channel = %channel, "Creating event channel");
        let mut channels = self.channels.write().await;
        channels
            .entry(channel.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Emits an event to every subscriber of the event's channel
    pub async fn emit(&self, event: LobbyEvent) {
        let channel = event.channel().clone();
        let event_type = event.event_type();
        let sender = self.sender(&channel).await;

        match sender.send(event) {
            Ok(receivers) => {
                debug!(channel = %channel, event_type, receivers, "Lobby event emitted");
            }
            Err(_) => {
                debug!(channel = %channel, event_type, "Lobby event emitted with no receivers");
            }
        }
    }

    pub async fn subscribe(&self, channel: &ChannelName) -> broadcast::Receiver<LobbyEvent> {
        self.sender(channel).await.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(100)
    }
}
