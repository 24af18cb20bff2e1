use chrono::{DateTime, Utc};
use thiserror::Error;

use super::models::{ChannelName, Role};

/// Failures returned by lobby operations. None of them leave a session
/// in a changed state.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CoordinatorError {
    #[error("You are not authenticated")]
    NotAuthenticated,

    #[error("You are banned until {until}")]
    PlayerBanned {
        until: DateTime<Utc>,
        reason: Option<String>,
    },

    #[error("You are already registered in {channel}")]
    AlreadyRegisteredElsewhere { channel: ChannelName },

    #[error("No free {0} slot")]
    RoleOccupied(Role),

    #[error("You are already registered as {0}")]
    AlreadySeated(Role),

    #[error("Unknown class: {0}")]
    UnknownRole(Role),

    #[error("You are not registered in this pickup")]
    NotSeated,

    #[error("Registration is closed")]
    NotInRegistrationPhase,

    #[error("Not waiting for ready players")]
    NotInReadyCheckPhase,

    #[error("Map vote is not open")]
    NotInVotePhase,

    #[error("Unknown map: {0}")]
    UnknownMap(String),

    #[error("No server available")]
    NoServerAvailable,

    #[error("Channel {0} already has a pickup")]
    DuplicateChannel(ChannelName),

    #[error("Unknown channel: {0}")]
    UnknownChannel(ChannelName),

    #[error("Unknown server: {0}")]
    UnknownServer(u32),

    #[error("Ban duration must be at least one day and end within the calendar")]
    InvalidBanDuration,

    #[error("Only admins can use that command")]
    PermissionDenied,
}

impl CoordinatorError {
    /// Only server exhaustion clears up without a corrected action
    pub fn is_retryable(&self) -> bool {
        matches!(self, CoordinatorError::NoServerAvailable)
    }
}
