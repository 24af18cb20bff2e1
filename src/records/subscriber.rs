use async_trait::async_trait;
use std::sync::Arc;
use tracing::{error, info};

use super::repository::GameRecordRepository;
use crate::coordinator::ChannelName;
use crate::event::{LobbyEvent, LobbyEventError, LobbyEventHandler};

/// Persists every completed game published on the event bus
pub struct RecordSubscriber {
    repository: Arc<dyn GameRecordRepository>,
}

impl RecordSubscriber {
    pub fn new(repository: Arc<dyn GameRecordRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl LobbyEventHandler for RecordSubscriber {
    async fn handle_lobby_event(
        &self,
        channel: &ChannelName,
        event: LobbyEvent,
    ) -> Result<(), LobbyEventError> {
        if let LobbyEvent::GameCompleted { record } = event {
            if let Err(err) = self.repository.record_game(&record).await {
                error!(?err, channel = %channel, game_id = %record.id, "Failed to record completed game");
                return Err(LobbyEventError::Storage(err.to_string()));
            }
            info!(channel = %channel, game_id = %record.id, map = %record.map, "Recorded completed game");
        }

        Ok(())
    }

    fn handler_name(&self) -> &'static str {
        "RecordSubscriber"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coordinator::{AccountName, CompletedGame, Phase, Role, Server};
    use crate::event::{EventBus, LobbySubscription};
    use crate::records::InMemoryGameRecordRepository;
    use chrono::Utc;
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_completed_games_reach_the_repository() {
        let repo = Arc::new(InMemoryGameRecordRepository::new());
        let bus = EventBus::new(16);
        let channel = ChannelName::from("#a");

        let _handle = LobbySubscription::new(
            channel.clone(),
            Arc::new(RecordSubscriber::new(repo.clone())),
            bus.clone(),
        )
        .start()
        .await;

        bus.emit(LobbyEvent::StatusChanged {
            channel: channel.clone(),
            phase: Phase::Completed,
            status: "Game started".to_string(),
        })
        .await;
        bus.emit(LobbyEvent::GameCompleted {
            record: CompletedGame {
                id: Uuid::new_v4(),
                channel: channel.clone(),
                variant: "6v6".to_string(),
                map: "cp_granary".to_string(),
                server: Server {
                    id: 1,
                    address: "10.0.0.1:27015".to_string(),
                    active: true,
                },
                roster: vec![(Role::from("medic"), AccountName::from("alice"))],
                completed_at: Utc::now(),
            },
        })
        .await;

        for _ in 0..50 {
            if !repo.records().await.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let records = repo.records_for(&channel).await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].map, "cp_granary");
    }
}
