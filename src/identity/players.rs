use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;
use tracing::info;

use crate::coordinator::AccountName;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Player {
    pub account: AccountName,
    pub admin: bool,
    pub first_seen: DateTime<Utc>,
}

/// Players known to the process, created on first authenticated contact
pub struct PlayerRegistry {
    players: RwLock<HashMap<AccountName, Player>>,
    admins: HashSet<AccountName>,
}

impl PlayerRegistry {
    pub fn new(admins: impl IntoIterator<Item = AccountName>) -> Self {
        Self {
            players: RwLock::new(HashMap::new()),
            admins: admins.into_iter().collect(),
        }
    }

    /// Idempotent: returns the existing player or creates one
    pub async fn get_or_create_player(&self, account: &AccountName) -> Player {
        if let Some(player) = self.players.read().await.get(account) {
            return player.clone();
        }

        let mut players = self.players.write().await;
        players
            .entry(account.clone())
            .or_insert_with(|| {
                info!(account = %account, "Registered new player");
                Player {
                    account: account.clone(),
                    admin: self.admins.contains(account),
                    first_seen: Utc::now(),
                }
            })
            .clone()
    }
}

impl Default for PlayerRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
