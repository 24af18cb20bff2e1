use serde::{Deserialize, Serialize};

use crate::coordinator::{AccountName, ChannelName, CompletedGame, Phase};

/// Facts about lobbies that have already happened
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum LobbyEvent {
    /// The channel's visible status changed
    StatusChanged {
        channel: ChannelName,
        phase: Phase,
        status: String,
    },

    /// A lobby was handed a server
    GameCompleted { record: CompletedGame },

    /// A player lost their seat without asking for it
    PlayerEvicted {
        channel: ChannelName,
        player: AccountName,
        reason: String,
    },
}

impl LobbyEvent {
    pub fn channel(&self) -> &ChannelName {
        match self {
            LobbyEvent::StatusChanged { channel, .. } => channel,
            LobbyEvent::GameCompleted { record } => &record.channel,
            LobbyEvent::PlayerEvicted { channel, .. } => channel,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            LobbyEvent::StatusChanged { .. } => "status_changed",
            LobbyEvent::GameCompleted { .. } => "game_completed",
            LobbyEvent::PlayerEvicted { .. } => "player_evicted",
        }
    }
}
