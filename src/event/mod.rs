// Event-driven plumbing between the dispatch layer and side-effect
// subscribers (persistence, topic relays).

// Public API - what other modules can use
pub use bus::EventBus;
pub use events::LobbyEvent;
pub use handler::{LobbyEventError, LobbyEventHandler};
pub use subscription::LobbySubscription;

// Internal modules
mod bus;
mod events;
mod handler;
mod subscription;
