use async_trait::async_trait;
use thiserror::Error;

use super::events::LobbyEvent;
use crate::coordinator::ChannelName;

#[derive(Debug, Error)]
pub enum LobbyEventError {
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Reacts to events of one channel
#[async_trait]
pub trait LobbyEventHandler: Send + Sync {
    async fn handle_lobby_event(
        &self,
        channel: &ChannelName,
        event: LobbyEvent,
    ) -> Result<(), LobbyEventError>;

    /// Name used in logs
    fn handler_name(&self) -> &'static str;
}
