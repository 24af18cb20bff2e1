//! Test assertion helpers for lobby state
#![allow(dead_code)] // Test utilities may not all be used in every test

use pickup::coordinator::{AccountName, ChannelName, Phase, Role};

use super::setup::TestSetup;

// ============================================================================
// Assertion Helpers
// ============================================================================

impl TestSetup {
    pub async fn assert_phase(&self, channel: &str, expected: Phase) {
        let status = self
            .dispatcher
            .directory()
            .status(&channel.into())
            .await
            .unwrap();
        assert_eq!(
            status.phase, expected,
            "{} should be in {} but is in {} ({})",
            channel, expected, status.phase, status.status
        );
    }

    pub async fn occupant_of(&self, channel: &str, role: &str) -> Option<AccountName> {
        let snapshot = self
            .dispatcher
            .directory()
            .snapshot(&channel.into())
            .await
            .unwrap();
        snapshot
            .slots
            .into_iter()
            .find(|(slot, _)| slot.role == Role::from(role))
            .and_then(|(_, occupant)| occupant)
    }

    pub async fn assert_seated_in(&self, player: &str, channel: Option<&str>) {
        let seat = self.dispatcher.directory().seat_of(&player.into()).await;
        assert_eq!(seat, channel.map(ChannelName::from), "unexpected seat for {}", player);
    }

    pub async fn assert_server_locked(&self, address: &str, locked: bool) {
        assert_eq!(
            self.dispatcher.directory().pool().is_locked(address).await,
            locked,
            "unexpected lock state for {}",
            address
        );
    }
}
