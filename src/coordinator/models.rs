use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumIter};
use uuid::Uuid;

/// Authenticated account name issued by the identity service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountName(String);

impl AccountName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AccountName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Chat channel name, the key a lobby is bound to
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelName(String);

impl ChannelName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChannelName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ChannelName {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// Class role name as declared by a game variant ("medic", "soldier", ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

/// One seat of a role. Roles with several slots have seats 0..slots.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleSlot {
    pub role: Role,
    pub seat: usize,
}

impl RoleSlot {
    pub fn new(role: Role, seat: usize) -> Self {
        Self { role, seat }
    }
}

/// A role and how many players the variant needs in it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleSpec {
    pub name: Role,
    #[serde(default = "default_slots")]
    pub slots: usize,
}

fn default_slots() -> usize {
    1
}

/// A game server that lobbies can be sent to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Server {
    /// Short numeric id used by admins to address the server
    pub id: u32,
    /// Network address, `host:port`
    pub address: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Defines which roles a lobby needs, which maps can be voted and which
/// servers the lobby may be sent to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameVariant {
    pub name: String,
    pub roles: Vec<RoleSpec>,
    pub maps: Vec<String>,
    /// Addresses of eligible servers, in preference order
    pub servers: Vec<String>,
}

impl GameVariant {
    pub fn total_slots(&self) -> usize {
        self.roles.iter().map(|r| r.slots).sum()
    }

    pub fn has_role(&self, role: &Role) -> bool {
        self.roles.iter().any(|r| &r.name == role)
    }
}

/// Lifecycle phase of a lobby
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumIter)]
pub enum Phase {
    Registration,
    ReadyCheck,
    MapVote,
    ServerAssignment,
    Completed,
}

/// Summary of a finished lobby handed to the persistence collaborator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletedGame {
    pub id: Uuid,
    pub channel: ChannelName,
    pub variant: String,
    pub map: String,
    pub server: Server,
    /// (role, player) pairs in variant order
    pub roster: Vec<(Role, AccountName)>,
    pub completed_at: DateTime<Utc>,
}

/// Read-only projection of a lobby for status surfaces
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub channel: ChannelName,
    pub phase: Phase,
    pub slots: Vec<(RoleSlot, Option<AccountName>)>,
    pub ready: Vec<AccountName>,
    pub votes: Vec<(String, usize)>,
    pub map: Option<String>,
    pub server: Option<String>,
}
