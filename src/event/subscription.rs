use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::{bus::EventBus, handler::LobbyEventHandler};
use crate::coordinator::ChannelName;

/// Routes one channel's events to a handler on a background task
pub struct LobbySubscription {
    channel: ChannelName,
    handler: Arc<dyn LobbyEventHandler>,
    event_bus: EventBus,
}

impl LobbySubscription {
    pub fn new(channel: ChannelName, handler: Arc<dyn LobbyEventHandler>, event_bus: EventBus) -> Self {
        Self {
            channel,
            handler,
            event_bus,
        }
    }

    /// Subscribes before spawning, so no event emitted after `start`
    /// returns is missed
    pub async fn start(self) -> JoinHandle<()> {
        let channel = self.channel.clone();
        let handler_name = self.handler.handler_name();

        info!(channel = %channel, handler = handler_name, "Starting lobby subscription");

        let mut receiver = self.event_bus.subscribe(&channel).await;

        tokio::spawn(async move {
            loop {
                let event = match receiver.recv().await {
                    Ok(event) => event,
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(channel = %channel, handler = handler_name, skipped, "Lobby subscription lagged");
                        continue;
                    }
                    Err(RecvError::Closed) => break,
                };

                debug!(channel = %channel, handler = handler_name, event_type = event.event_type(), "Received lobby event");

                if let Err(e) = self.handler.handle_lobby_event(&channel, event).await {
                    warn!(channel = %channel, handler = handler_name, error = %e, "Lobby event handler failed");
                }
            }

            warn!(channel = %channel, handler = handler_name, "Lobby subscription ended - no more events");
        })
    }
}
