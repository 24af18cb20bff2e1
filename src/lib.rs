// Library crate for the pickup game coordinator
// This file exposes the public API for integration tests

pub mod bans;
pub mod config;
pub mod coordinator;
pub mod dispatch;
pub mod event;
pub mod identity;
pub mod records;
pub mod servers;
pub mod shared;
pub mod sweep;

// Re-export commonly used types for easier access in tests
pub use bans::{Ban, BanRegistry};
pub use config::{AppConfig, CoordinatorConfig};
pub use coordinator::{CoordinatorError, SessionDirectory};
pub use dispatch::{ChannelEvent, DispatchOutcome, Dispatcher};
pub use event::{EventBus, LobbyEvent, LobbySubscription};
pub use shared::{AppError, AppState};
