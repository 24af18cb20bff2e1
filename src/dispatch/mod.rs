// Public API - what other modules can use
pub use dispatcher::{Announcement, DispatchOutcome, DispatchSettings, Dispatcher, TopicUpdate};
pub use events::ChannelEvent;
pub use handlers::{channel_status, health, post_event, relay_socket, router};
pub use relay::{forward_to_socket, OutcomeRelay};

// Internal modules
mod dispatcher;
mod events;
mod handlers;
mod relay;
