// Identity collaborator: turns credentials from the chat bridge into
// verified account names and keeps the lazily created player records.

// Public API - what other modules can use
pub use middleware::{resolve_actor, Actor};
pub use players::{Player, PlayerRegistry};
pub use token::{IdentityClaims, IdentityError, IdentityProvider, JwtIdentityProvider, TokenConfig};

// Internal modules
mod middleware;
mod players;
mod token;
