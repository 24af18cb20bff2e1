// Lobby coordination core: per-channel state machine, seats, votes and
// the directory that enforces one lobby per player.
//
// Nothing in here logs or touches storage; callers turn results into
// messages and records.

// Public API - what other modules can use
pub use directory::{SessionDirectory, SessionUpdate, VoteOutcome};
pub use errors::CoordinatorError;
pub use models::{
    AccountName, ChannelName, CompletedGame, GameVariant, Phase, Role, RoleSlot, RoleSpec, Server,
    SessionSnapshot,
};
pub use roster::RoleRoster;
pub use session::GameSession;
pub use vote::MapVoteTally;

// Internal modules
mod directory;
mod errors;
pub mod models;
mod roster;
mod session;
mod vote;
