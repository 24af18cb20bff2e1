use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::coordinator::{AccountName, CoordinatorError};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ban {
    pub until: DateTime<Utc>,
    pub reason: Option<String>,
}

impl Ban {
    /// A ban whose end has passed no longer applies
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.until > now
    }
}

/// Players currently suspended from registering
#[derive(Debug, Default)]
pub struct BanRegistry {
    bans: RwLock<HashMap<AccountName, Ban>>,
}

impl BanRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn ban(
        &self,
        player: &AccountName,
        days: u32,
        reason: Option<String>,
    ) -> Result<Ban, CoordinatorError> {
        if days == 0 {
            return Err(CoordinatorError::InvalidBanDuration);
        }

        let until = Duration::try_days(i64::from(days))
            .and_then(|length| Utc::now().checked_add_signed(length))
            .ok_or(CoordinatorError::InvalidBanDuration)?;
        Ok(self.ban_until(player, until, reason).await)
    }

    /// Replaces any existing ban for the player
    pub async fn ban_until(
        &self,
        player: &AccountName,
        until: DateTime<Utc>,
        reason: Option<String>,
    ) -> Ban {
        let reason = reason
            .map(|r| r.trim().to_string())
            .filter(|r| !r.is_empty());
        let ban = Ban { until, reason };

        self.bans.write().await.insert(player.clone(), ban.clone());
        ban
    }

    /// Returns whether a ban was lifted
    pub async fn unban(&self, player: &AccountName) -> bool {
        self.bans.write().await.remove(player).is_some()
    }

    pub async fn active_ban(&self, player: &AccountName) -> Option<Ban> {
        let now = Utc::now();
        self.bans
            .read()
            .await
            .get(player)
            .filter(|ban| ban.is_active_at(now))
            .cloned()
    }

    pub async fn is_banned(&self, player: &AccountName) -> bool {
        self.active_ban(player).await.is_some()
    }

    /// Fails with `PlayerBanned` while a ban is active
    pub async fn check(&self, player: &AccountName) -> Result<(), CoordinatorError> {
        match self.active_ban(player).await {
            Some(ban) => Err(CoordinatorError::PlayerBanned {
                until: ban.until,
                reason: ban.reason,
            }),
            None => Ok(()),
        }
    }
}
