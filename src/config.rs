use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

use crate::coordinator::{AccountName, ChannelName, GameVariant, Role, RoleSpec, Server};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {message}")]
    Io { path: String, message: String },

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Invalid coordinator config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelConfig {
    pub name: ChannelName,
    pub variant: String,
}

/// Channels, variants, servers and admins, loaded from the JSON file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoordinatorConfig {
    pub variants: Vec<GameVariant>,
    pub channels: Vec<ChannelConfig>,
    pub servers: Vec<Server>,
    #[serde(default)]
    pub admins: Vec<AccountName>,
}

impl CoordinatorConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let declared: HashSet<&str> = self.servers.iter().map(|s| s.address.as_str()).collect();

        let mut server_ids = HashSet::new();
        for server in &self.servers {
            if !server_ids.insert(server.id) {
                return Err(ConfigError::Invalid(format!("duplicate server id {}", server.id)));
            }
        }

        for variant in &self.variants {
            if variant.roles.is_empty() || variant.roles.iter().any(|r| r.slots == 0) {
                return Err(ConfigError::Invalid(format!(
                    "variant {} needs at least one role with at least one slot",
                    variant.name
                )));
            }
            if variant.maps.is_empty() {
                return Err(ConfigError::Invalid(format!("variant {} has no maps", variant.name)));
            }
            if let Some(missing) = variant.servers.iter().find(|s| !declared.contains(s.as_str())) {
                return Err(ConfigError::Invalid(format!(
                    "variant {} uses undeclared server {}",
                    variant.name, missing
                )));
            }
        }

        let mut seen = HashSet::new();
        for channel in &self.channels {
            if !seen.insert(&channel.name) {
                return Err(ConfigError::Invalid(format!("duplicate channel {}", channel.name)));
            }
            if self.variant(&channel.variant).is_none() {
                return Err(ConfigError::Invalid(format!(
                    "channel {} uses unknown variant {}",
                    channel.name, channel.variant
                )));
            }
        }

        Ok(())
    }

    pub fn variant(&self, name: &str) -> Option<&GameVariant> {
        self.variants.iter().find(|v| v.name == name)
    }

    pub fn variant_for(&self, channel: &ChannelName) -> Option<&GameVariant> {
        self.channels
            .iter()
            .find(|c| &c.name == channel)
            .and_then(|c| self.variant(&c.variant))
    }
}

impl Default for CoordinatorConfig {
    /// One highlander channel, one class each, one local server
    fn default() -> Self {
        let classes = [
            "scout", "soldier", "pyro", "demoman", "heavy", "engineer", "medic", "sniper", "spy",
        ];
        let server = Server {
            id: 1,
            address: "127.0.0.1:27015".to_string(),
            active: true,
        };

        Self {
            variants: vec![GameVariant {
                name: "highlander".to_string(),
                roles: classes
                    .iter()
                    .map(|c| RoleSpec {
                        name: Role::from(*c),
                        slots: 1,
                    })
                    .collect(),
                maps: ["cp_badlands", "cp_granary", "cp_gravelpit", "koth_viaduct", "pl_upward"]
                    .iter()
                    .map(|m| m.to_string())
                    .collect(),
                servers: vec![server.address.clone()],
            }],
            channels: vec![ChannelConfig {
                name: ChannelName::from("#pickup"),
                variant: "highlander".to_string(),
            }],
            servers: vec![server],
            admins: Vec::new(),
        }
    }
}

/// Process configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub bind_addr: String,
    pub jwt_secret: String,
    pub token_expiration_hours: i64,
    /// Selects the PostgreSQL record store when set
    pub database_url: Option<String>,
    pub sweep_interval: Duration,
    pub vote_window: Duration,
    pub topic_prefix: String,
    /// Open a fresh lobby as soon as one is sent to a server
    pub auto_rotate: bool,
    pub coordinator: CoordinatorConfig,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let coordinator = match lookup("PICKUP_CONFIG") {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| ConfigError::Io {
                    path: path.clone(),
                    message: e.to_string(),
                })?;
                CoordinatorConfig::from_json(&json)?
            }
            None => CoordinatorConfig::default(),
        };

        Ok(Self {
            bind_addr: lookup("BIND_ADDR").unwrap_or_else(|| "0.0.0.0:3000".to_string()),
            jwt_secret: lookup("JWT_SECRET")
                .unwrap_or_else(|| "your-secret-key-change-in-production".to_string()),
            token_expiration_hours: parse_or(&lookup, "TOKEN_EXPIRATION_HOURS", 24)?,
            database_url: lookup("DATABASE_URL").filter(|url| !url.is_empty()),
            sweep_interval: Duration::from_secs(parse_or(&lookup, "SWEEP_INTERVAL_SECS", 15)?),
            vote_window: Duration::from_secs(parse_or(&lookup, "VOTE_WINDOW_SECS", 60)?),
            topic_prefix: lookup("TOPIC_PREFIX").unwrap_or_else(|| "Pickup | ".to_string()),
            auto_rotate: parse_or(&lookup, "AUTO_ROTATE", true)?,
            coordinator,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value,
        }),
        None => Ok(default),
    }
}
