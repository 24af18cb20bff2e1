use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::events::ChannelEvent;
use super::relay::OutcomeRelay;
use crate::config::CoordinatorConfig;
use crate::coordinator::{
    AccountName, ChannelName, CompletedGame, CoordinatorError, Phase, SessionDirectory,
    SessionUpdate,
};
use crate::event::{EventBus, LobbyEvent};
use crate::identity::PlayerRegistry;

/// New topic for a channel, `prefix + status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicUpdate {
    pub channel: ChannelName,
    pub topic: String,
}

/// Message to post in a channel other than a direct reply
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Announcement {
    pub channel: ChannelName,
    pub message: String,
}

/// Everything the chat bridge should do in response to one event
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DispatchOutcome {
    /// Reply to the actor in the originating channel
    pub reply: Option<String>,
    pub announcements: Vec<Announcement>,
    pub topics: Vec<TopicUpdate>,
}

impl DispatchOutcome {
    pub fn topic_for(&self, channel: &ChannelName) -> Option<&str> {
        self.topics
            .iter()
            .find(|t| &t.channel == channel)
            .map(|t| t.topic.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.reply.is_none() && self.announcements.is_empty() && self.topics.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub topic_prefix: String,
    pub auto_rotate: bool,
    pub vote_window: chrono::Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self {
            topic_prefix: "Pickup | ".to_string(),
            auto_rotate: true,
            vote_window: chrono::Duration::seconds(60),
        }
    }
}

/// Routes parsed chat events to the coordinator and turns results into
/// replies, announcements and topic refreshes
pub struct Dispatcher {
    directory: Arc<SessionDirectory>,
    players: Arc<PlayerRegistry>,
    config: Arc<CoordinatorConfig>,
    event_bus: EventBus,
    relay: OutcomeRelay,
    settings: DispatchSettings,
}

impl Dispatcher {
    pub fn new(
        directory: Arc<SessionDirectory>,
        players: Arc<PlayerRegistry>,
        config: Arc<CoordinatorConfig>,
        event_bus: EventBus,
        settings: DispatchSettings,
    ) -> Self {
        Self {
            directory,
            players,
            config,
            event_bus,
            relay: OutcomeRelay::default(),
            settings,
        }
    }

    pub fn directory(&self) -> &Arc<SessionDirectory> {
        &self.directory
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    pub fn relay(&self) -> &OutcomeRelay {
        &self.relay
    }

    /// Startup contract: clear stale server locks and open a lobby in every
    /// configured channel
    #[instrument(skip(self))]
    pub async fn bootstrap(&self) -> Result<DispatchOutcome, CoordinatorError> {
        let released = self.directory.pool().release_all().await;
        info!(released, "Released stale server locks");

        let mut outcome = DispatchOutcome::default();
        for channel in &self.config.channels {
            let variant = self
                .config
                .variant(&channel.variant)
                .ok_or_else(|| CoordinatorError::UnknownChannel(channel.name.clone()))?;
            let update = self
                .directory
                .register_channel(channel.name.clone(), variant.clone())
                .await?;
            info!(channel = %channel.name, variant = %variant.name, "Registered channel");
            self.set_topic(&mut outcome, &update);
        }

        Ok(outcome)
    }

    #[instrument(skip(self, event), fields(event = event.name()))]
    pub async fn dispatch(
        &self,
        channel: &ChannelName,
        actor: Option<AccountName>,
        event: ChannelEvent,
    ) -> Result<DispatchOutcome, CoordinatorError> {
        let result = self.route(channel, actor.as_ref(), event).await;

        match &result {
            Ok(_) => debug!(channel = %channel, actor = ?actor, "Event handled"),
            Err(e) => info!(channel = %channel, actor = ?actor, error = %e, "Event rejected"),
        }

        result
    }

    async fn route(
        &self,
        channel: &ChannelName,
        actor: Option<&AccountName>,
        event: ChannelEvent,
    ) -> Result<DispatchOutcome, CoordinatorError> {
        let account = match actor {
            Some(account) => {
                let player = self.players.get_or_create_player(account).await;
                if event.is_admin() && !player.admin {
                    warn!(channel = %channel, player = %account, event = event.name(), "Non-admin attempted admin command");
                    return Err(CoordinatorError::PermissionDenied);
                }
                Some(account)
            }
            None if event.is_public() => None,
            None => return Err(CoordinatorError::NotAuthenticated),
        };

        let mut outcome = DispatchOutcome::default();

        match (event, account) {
            (ChannelEvent::Status, _) => {
                let update = self.directory.status(channel).await?;
                outcome.reply = Some(update.status);
            }
            (ChannelEvent::Maps, _) => {
                let session = self
                    .directory
                    .lookup(channel)
                    .await
                    .ok_or_else(|| CoordinatorError::UnknownChannel(channel.clone()))?;
                outcome.reply = Some(session.lock().await.map_list());
            }
            (_, None) => return Err(CoordinatorError::NotAuthenticated),
            (ChannelEvent::Join { role }, Some(account)) => {
                let (slot, update) = self
                    .directory
                    .register_player(channel, account, &role)
                    .await?;
                info!(channel = %channel, player = %account, role = %slot.role, seat = slot.seat, "Player registered");
                if update.phase == Phase::ReadyCheck {
                    outcome.announcements.push(Announcement {
                        channel: channel.clone(),
                        message: "All slots are filled, type !ready to confirm".to_string(),
                    });
                }
                self.publish(&mut outcome, update).await;
            }
            (ChannelEvent::Leave, Some(account)) => {
                if self.directory.unregister_player(channel, account).await? {
                    info!(channel = %channel, player = %account, "Player left lobby");
                    let update = self.directory.status(channel).await?;
                    self.publish(&mut outcome, update).await;
                }
            }
            (ChannelEvent::Quit, Some(account)) => {
                for affected in self.directory.unregister_player_everywhere(account).await {
                    info!(channel = %affected, player = %account, "Player removed on quit");
                    let update = self.directory.status(&affected).await?;
                    self.publish(&mut outcome, update).await;
                }
            }
            (ChannelEvent::Ready, Some(account)) => {
                let update = self.directory.set_ready(channel, account).await?;
                if update.phase == Phase::MapVote {
                    let session = self.directory.lookup(channel).await;
                    let maps = match session {
                        Some(session) => session.lock().await.map_list(),
                        None => String::new(),
                    };
                    outcome.announcements.push(Announcement {
                        channel: channel.clone(),
                        message: format!("Everyone is ready, vote with !map <name>. {}", maps),
                    });
                }
                self.publish(&mut outcome, update).await;
            }
            (ChannelEvent::Vote { map }, Some(account)) => {
                let vote = self.directory.cast_vote(channel, account, &map).await?;
                outcome.reply = Some(format!("Voted for ({})", vote.map));
                self.publish(&mut outcome, vote.update).await;
            }
            (ChannelEvent::Servers, Some(_)) => {
                outcome.reply = Some(self.server_listing(channel).await?);
            }
            (ChannelEvent::CloseVote, Some(_)) => {
                let update = self.directory.close_vote(channel).await?;
                self.publish(&mut outcome, update).await;
            }
            (ChannelEvent::Ban { account: target, days, reason }, Some(admin)) => {
                let (ban, affected) = self.directory.ban_player(&target, days, reason).await?;
                info!(player = %target, admin = %admin, until = %ban.until, "Player banned");

                for evicted_from in affected {
                    self.event_bus
                        .emit(LobbyEvent::PlayerEvicted {
                            channel: evicted_from.clone(),
                            player: target.clone(),
                            reason: "banned".to_string(),
                        })
                        .await;
                    let update = self.directory.status(&evicted_from).await?;
                    self.publish(&mut outcome, update).await;
                }

                outcome.reply = Some(match &ban.reason {
                    Some(reason) => format!("{} is banned until {} ({})", target, ban.until, reason),
                    None => format!("{} is banned until {}", target, ban.until),
                });
            }
            (ChannelEvent::Unban { account: target }, Some(admin)) => {
                let lifted = self.directory.unban_player(&target).await;
                info!(player = %target, admin = %admin, lifted, "Unban requested");
                outcome.reply = Some(if lifted {
                    format!("{} is no longer banned", target)
                } else {
                    format!("{} was not banned", target)
                });
            }
            (ChannelEvent::Unlock { server_id }, Some(admin)) => {
                let pool = self.directory.pool();
                let server = pool
                    .find_by_id(server_id)
                    .await
                    .ok_or(CoordinatorError::UnknownServer(server_id))?;
                let was_locked = pool.release(&server.address).await;
                info!(server = %server.address, admin = %admin, was_locked, "Server unlocked");

                for update in self.directory.retry_assignments().await {
                    self.publish(&mut outcome, update).await;
                }
                outcome.reply = Some(format!("Server {} ({}) unlocked", server.id, server.address));
            }
            (ChannelEvent::Reset, Some(admin)) => {
                let variant = self
                    .config
                    .variant_for(channel)
                    .ok_or_else(|| CoordinatorError::UnknownChannel(channel.clone()))?;
                let update = self.directory.reset_channel(channel.clone(), variant.clone()).await;
                info!(channel = %channel, admin = %admin, "Channel reset");
                self.publish(&mut outcome, update).await;
            }
        }

        Ok(outcome)
    }

    /// Periodic trigger: closes expired votes and retries server assignment
    #[instrument(skip(self))]
    pub async fn sweep(&self) -> DispatchOutcome {
        let mut outcome = DispatchOutcome::default();
        for update in self.directory.advance_all(self.settings.vote_window).await {
            debug!(channel = %update.channel, phase = %update.phase, "Sweep advanced lobby");
            self.publish(&mut outcome, update).await;
        }
        outcome
    }

    async fn server_listing(&self, channel: &ChannelName) -> Result<String, CoordinatorError> {
        let eligible = match self.directory.lookup(channel).await {
            Some(session) => session.lock().await.variant().servers.clone(),
            None => return Err(CoordinatorError::UnknownChannel(channel.clone())),
        };

        let lines: Vec<String> = self
            .directory
            .pool()
            .status(&eligible)
            .await
            .into_iter()
            .map(|status| {
                let state = match (status.report.reachable, status.report.player_count) {
                    (false, _) => "unavailable".to_string(),
                    (true, Some(count)) => format!("{} players at the moment", count),
                    (true, None) => "available".to_string(),
                };
                let lock = if status.locked { ", in use" } else { "" };
                format!("#{} {} ({}{})", status.server.id, status.server.address, state, lock)
            })
            .collect();

        if lines.is_empty() {
            return Ok("No servers configured".to_string());
        }
        Ok(lines.join("\n"))
    }

    /// Emits the update on the bus and folds it into the outcome. A
    /// completion is announced, recorded and, with auto-rotate, followed
    /// by a fresh lobby.
    async fn publish(&self, outcome: &mut DispatchOutcome, update: SessionUpdate) {
        self.event_bus
            .emit(LobbyEvent::StatusChanged {
                channel: update.channel.clone(),
                phase: update.phase,
                status: update.status.clone(),
            })
            .await;
        self.set_topic(outcome, &update);

        let Some(record) = update.completed.clone() else {
            return;
        };

        info!(
            channel = %record.channel,
            game_id = %record.id,
            map = %record.map,
            server = %record.server.address,
            "Pickup sent to server"
        );
        outcome.announcements.push(Announcement {
            channel: record.channel.clone(),
            message: completion_message(&record),
        });
        self.event_bus
            .emit(LobbyEvent::GameCompleted {
                record: record.clone(),
            })
            .await;

        if self.settings.auto_rotate {
            match self.directory.open_next_lobby(&record.channel).await {
                Ok(next) => {
                    self.event_bus
                        .emit(LobbyEvent::StatusChanged {
                            channel: next.channel.clone(),
                            phase: next.phase,
                            status: next.status.clone(),
                        })
                        .await;
                    self.set_topic(outcome, &next);
                }
                Err(e) => warn!(channel = %record.channel, error = %e, "Failed to open next lobby"),
            }
        }
    }

    fn set_topic(&self, outcome: &mut DispatchOutcome, update: &SessionUpdate) {
        let topic = format!("{}{}", self.settings.topic_prefix, update.status);
        match outcome.topics.iter_mut().find(|t| t.channel == update.channel) {
            Some(existing) => existing.topic = topic,
            None => outcome.topics.push(TopicUpdate {
                channel: update.channel.clone(),
                topic,
            }),
        }
    }
}

fn completion_message(record: &CompletedGame) -> String {
    let players: Vec<String> = record
        .roster
        .iter()
        .map(|(role, player)| format!("{} ({})", player, role))
        .collect();
    format!(
        "Pickup ready on {}: connect {} | {}",
        record.map,
        record.server.address,
        players.join(", ")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bans::BanRegistry;
    use crate::config::ChannelConfig;
    use crate::coordinator::{GameVariant, Role, RoleSpec, Server};
    use crate::servers::{ServerPool, StaticServerProbe};

    fn config() -> CoordinatorConfig {
        let server = Server {
            id: 7,
            address: "10.0.0.7:27015".to_string(),
            active: true,
        };
        CoordinatorConfig {
            variants: vec![GameVariant {
                name: "duel".to_string(),
                roles: vec![
                    RoleSpec { name: Role::from("red"), slots: 1 },
                    RoleSpec { name: Role::from("blu"), slots: 1 },
                ],
                maps: vec!["cp_badlands".to_string(), "koth_product".to_string()],
                servers: vec![server.address.clone()],
            }],
            channels: vec![
                ChannelConfig { name: "#one".into(), variant: "duel".to_string() },
                ChannelConfig { name: "#two".into(), variant: "duel".to_string() },
            ],
            servers: vec![server],
            admins: vec!["boss".into()],
        }
    }

    async fn dispatcher(auto_rotate: bool) -> Dispatcher {
        let config = Arc::new(config());
        let pool = Arc::new(ServerPool::new(
            config.servers.clone(),
            Arc::new(StaticServerProbe::new()),
        ));
        let directory = Arc::new(SessionDirectory::new(pool, Arc::new(BanRegistry::new())));
        let players = Arc::new(PlayerRegistry::new(config.admins.clone()));
        let settings = DispatchSettings {
            auto_rotate,
            ..DispatchSettings::default()
        };

        let dispatcher = Dispatcher::new(directory, players, config, EventBus::default(), settings);
        dispatcher.bootstrap().await.unwrap();
        dispatcher
    }

    fn join(role: &str) -> ChannelEvent {
        ChannelEvent::Join { role: Role::from(role) }
    }

    async fn play_to_vote(dispatcher: &Dispatcher, channel: &ChannelName) {
        dispatcher.dispatch(channel, Some("alice".into()), join("red")).await.unwrap();
        dispatcher.dispatch(channel, Some("bob".into()), join("blu")).await.unwrap();
        dispatcher.dispatch(channel, Some("alice".into()), ChannelEvent::Ready).await.unwrap();
        dispatcher.dispatch(channel, Some("bob".into()), ChannelEvent::Ready).await.unwrap();
    }

    #[tokio::test]
    async fn test_second_bootstrap_rejects_existing_channels() {
        let dispatcher = dispatcher(true).await;
        let outcome = dispatcher.bootstrap().await;

        assert!(matches!(outcome, Err(CoordinatorError::DuplicateChannel(_))));
        assert_eq!(
            dispatcher.directory().channels().await,
            vec![ChannelName::from("#one"), ChannelName::from("#two")]
        );
    }

    #[tokio::test]
    async fn test_unauthenticated_actor_only_reads() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");

        let status = dispatcher.dispatch(&channel, None, ChannelEvent::Status).await.unwrap();
        assert!(status.reply.unwrap().starts_with("Registration (0/2)"));

        let maps = dispatcher.dispatch(&channel, None, ChannelEvent::Maps).await.unwrap();
        assert_eq!(maps.reply.as_deref(), Some("Maps: cp_badlands, koth_product"));

        let result = dispatcher.dispatch(&channel, None, join("red")).await;
        assert_eq!(result, Err(CoordinatorError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_admin_commands_require_admin() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");

        let result = dispatcher
            .dispatch(&channel, Some("alice".into()), ChannelEvent::Reset)
            .await;
        assert_eq!(result, Err(CoordinatorError::PermissionDenied));

        assert!(dispatcher
            .dispatch(&channel, Some("boss".into()), ChannelEvent::Reset)
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_join_refreshes_topic() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");

        let outcome = dispatcher
            .dispatch(&channel, Some("alice".into()), join("red"))
            .await
            .unwrap();

        let topic = outcome.topic_for(&channel).unwrap();
        assert!(topic.starts_with("Pickup | Registration (1/2)"));
        assert!(topic.contains("red: alice"));
    }

    #[tokio::test]
    async fn test_completion_announces_and_rotates() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");
        let mut completed = dispatcher.event_bus().subscribe(&channel).await;
        play_to_vote(&dispatcher, &channel).await;

        dispatcher
            .dispatch(&channel, Some("alice".into()), ChannelEvent::Vote { map: "product".to_string() })
            .await
            .unwrap();
        let outcome = dispatcher
            .dispatch(&channel, Some("bob".into()), ChannelEvent::Vote { map: "koth".to_string() })
            .await
            .unwrap();

        assert_eq!(outcome.reply.as_deref(), Some("Voted for (koth_product)"));
        assert_eq!(outcome.announcements.len(), 1);
        assert!(outcome.announcements[0].message.contains("connect 10.0.0.7:27015"));
        assert!(outcome.topic_for(&channel).unwrap().starts_with("Pickup | Registration (0/2)"));

        let mut saw_record = false;
        while let Ok(event) = completed.try_recv() {
            if let LobbyEvent::GameCompleted { record } = event {
                assert_eq!(record.map, "koth_product");
                saw_record = true;
            }
        }
        assert!(saw_record);
        assert!(dispatcher.directory().pool().is_locked("10.0.0.7:27015").await);
    }

    #[tokio::test]
    async fn test_completion_without_rotation_stays_completed() {
        let dispatcher = dispatcher(false).await;
        let channel = ChannelName::from("#one");
        play_to_vote(&dispatcher, &channel).await;

        dispatcher
            .dispatch(&channel, Some("boss".into()), ChannelEvent::CloseVote)
            .await
            .unwrap();

        let status = dispatcher.directory().status(&channel).await.unwrap();
        assert_eq!(status.phase, Phase::Completed);
        assert_eq!(status.status, "Game started on cp_badlands at 10.0.0.7:27015");
    }

    #[tokio::test]
    async fn test_unlock_hands_server_to_waiting_lobby() {
        let dispatcher = dispatcher(true).await;
        let one = ChannelName::from("#one");
        let two = ChannelName::from("#two");
        play_to_vote(&dispatcher, &one).await;
        dispatcher.dispatch(&one, Some("boss".into()), ChannelEvent::CloseVote).await.unwrap();

        dispatcher.dispatch(&two, Some("carol".into()), join("red")).await.unwrap();
        dispatcher.dispatch(&two, Some("dave".into()), join("blu")).await.unwrap();
        dispatcher.dispatch(&two, Some("carol".into()), ChannelEvent::Ready).await.unwrap();
        dispatcher.dispatch(&two, Some("dave".into()), ChannelEvent::Ready).await.unwrap();
        let waiting = dispatcher
            .dispatch(&two, Some("boss".into()), ChannelEvent::CloseVote)
            .await
            .unwrap();
        assert!(waiting.topic_for(&two).unwrap().contains("Waiting for a server"));

        let outcome = dispatcher
            .dispatch(&two, Some("boss".into()), ChannelEvent::Unlock { server_id: 7 })
            .await
            .unwrap();

        assert_eq!(outcome.reply.as_deref(), Some("Server 7 (10.0.0.7:27015) unlocked"));
        assert_eq!(outcome.announcements.len(), 1);
        assert_eq!(outcome.announcements[0].channel, two);
    }

    #[tokio::test]
    async fn test_unlock_unknown_server() {
        let dispatcher = dispatcher(true).await;
        let result = dispatcher
            .dispatch(&"#one".into(), Some("boss".into()), ChannelEvent::Unlock { server_id: 99 })
            .await;
        assert_eq!(result, Err(CoordinatorError::UnknownServer(99)));
    }

    #[tokio::test]
    async fn test_ban_evicts_from_lobby() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");
        dispatcher.dispatch(&channel, Some("alice".into()), join("red")).await.unwrap();

        let outcome = dispatcher
            .dispatch(
                &"#two".into(),
                Some("boss".into()),
                ChannelEvent::Ban {
                    account: "alice".into(),
                    days: 2,
                    reason: Some("no show".to_string()),
                },
            )
            .await
            .unwrap();

        assert!(outcome.reply.as_deref().unwrap().ends_with("(no show)"));
        assert!(outcome.topic_for(&channel).unwrap().starts_with("Pickup | Registration (0/2)"));

        let result = dispatcher.dispatch(&channel, Some("alice".into()), join("red")).await;
        assert!(matches!(result, Err(CoordinatorError::PlayerBanned { .. })));
    }

    #[tokio::test]
    async fn test_quit_leaves_every_lobby() {
        let dispatcher = dispatcher(true).await;
        let channel = ChannelName::from("#one");
        dispatcher.dispatch(&channel, Some("alice".into()), join("red")).await.unwrap();

        let outcome = dispatcher
            .dispatch(&"#two".into(), Some("alice".into()), ChannelEvent::Quit)
            .await
            .unwrap();

        assert_eq!(outcome.topics.len(), 1);
        assert_eq!(dispatcher.directory().seat_of(&"alice".into()).await, None);
    }

    #[tokio::test]
    async fn test_servers_listing() {
        let dispatcher = dispatcher(true).await;
        let outcome = dispatcher
            .dispatch(&"#one".into(), Some("alice".into()), ChannelEvent::Servers)
            .await
            .unwrap();

        assert_eq!(
            outcome.reply.as_deref(),
            Some("#7 10.0.0.7:27015 (0 players at the moment)")
        );
    }

    #[tokio::test]
    async fn test_unknown_channel() {
        let dispatcher = dispatcher(true).await;
        let result = dispatcher
            .dispatch(&"#nowhere".into(), Some("alice".into()), ChannelEvent::Ready)
            .await;
        assert_eq!(
            result,
            Err(CoordinatorError::UnknownChannel(ChannelName::from("#nowhere")))
        );
    }
}
