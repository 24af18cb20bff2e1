use axum::Router;
use std::sync::Arc;
use tokio::task::JoinHandle;

use pickup::{
    config::{ChannelConfig, CoordinatorConfig},
    coordinator::{ChannelName, GameVariant, Role, RoleSpec, Server, SessionDirectory},
    dispatch::{self, DispatchSettings, Dispatcher},
    event::{EventBus, LobbySubscription},
    identity::{JwtIdentityProvider, PlayerRegistry, TokenConfig},
    records::{InMemoryGameRecordRepository, RecordSubscriber},
    servers::{ServerPool, StaticServerProbe},
    shared::AppState,
    BanRegistry,
};

pub const ADMIN: &str = "admin";
const SECRET: &str = "integration-secret";

// ============================================================================
// Test Setup Infrastructure
// ============================================================================

pub struct TestSetup {
    pub dispatcher: Arc<Dispatcher>,
    pub records: Arc<InMemoryGameRecordRepository>,
    pub probe: Arc<StaticServerProbe>,
    pub app: Router,
    pub tokens: TokenConfig,
    pub _subscription_handles: Vec<JoinHandle<()>>,
}

pub struct TestSetupBuilder {
    channels: Vec<String>,
    servers: Vec<String>,
    auto_rotate: bool,
    vote_window: chrono::Duration,
}

impl TestSetupBuilder {
    pub fn new() -> Self {
        Self {
            channels: vec!["#pickup".to_string()],
            servers: vec!["10.0.0.1:27015".to_string()],
            auto_rotate: true,
            vote_window: chrono::Duration::seconds(60),
        }
    }

    pub fn with_channels(mut self, channels: Vec<&str>) -> Self {
        self.channels = channels.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn with_servers(mut self, servers: Vec<&str>) -> Self {
        self.servers = servers.into_iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn without_rotation(mut self) -> Self {
        self.auto_rotate = false;
        self
    }

    pub fn with_expired_votes(mut self) -> Self {
        self.vote_window = chrono::Duration::zero();
        self
    }

    /// Three one-seat roles: heal, assault1, assault2
    fn config(&self) -> CoordinatorConfig {
        let servers: Vec<Server> = self
            .servers
            .iter()
            .enumerate()
            .map(|(i, address)| Server {
                id: i as u32 + 1,
                address: address.clone(),
                active: true,
            })
            .collect();

        CoordinatorConfig {
            variants: vec![GameVariant {
                name: "trio".to_string(),
                roles: ["heal", "assault1", "assault2"]
                    .iter()
                    .map(|r| RoleSpec {
                        name: Role::from(*r),
                        slots: 1,
                    })
                    .collect(),
                maps: vec![
                    "cp_badlands".to_string(),
                    "cp_granary".to_string(),
                    "koth_viaduct".to_string(),
                ],
                servers: self.servers.clone(),
            }],
            channels: self
                .channels
                .iter()
                .map(|name| ChannelConfig {
                    name: ChannelName::from(name.as_str()),
                    variant: "trio".to_string(),
                })
                .collect(),
            servers,
            admins: vec![ADMIN.into()],
        }
    }

    pub async fn build(self) -> TestSetup {
        let config = Arc::new(self.config());
        config.validate().unwrap();

        let probe = Arc::new(StaticServerProbe::new());
        let pool = Arc::new(ServerPool::new(config.servers.clone(), probe.clone()));
        let directory = Arc::new(SessionDirectory::new(pool, Arc::new(BanRegistry::new())));
        let players = Arc::new(PlayerRegistry::new(config.admins.clone()));
        let event_bus = EventBus::new(1000);

        // Persist completions the same way the binary does
        let records = Arc::new(InMemoryGameRecordRepository::new());
        let record_subscriber = Arc::new(RecordSubscriber::new(records.clone()));
        let mut handles = Vec::new();
        for channel in &config.channels {
            let subscription = LobbySubscription::new(
                channel.name.clone(),
                record_subscriber.clone(),
                event_bus.clone(),
            );
            handles.push(subscription.start().await);
        }

        let settings = DispatchSettings {
            topic_prefix: "Pickup | ".to_string(),
            auto_rotate: self.auto_rotate,
            vote_window: self.vote_window,
        };
        let dispatcher = Arc::new(Dispatcher::new(
            directory,
            players,
            config,
            event_bus,
            settings,
        ));
        dispatcher.bootstrap().await.unwrap();

        let tokens = TokenConfig::new(SECRET, 1);
        let identity = Arc::new(JwtIdentityProvider::new(tokens.clone()));
        let app = dispatch::router(AppState::new(dispatcher.clone(), identity));

        TestSetup {
            dispatcher,
            records,
            probe,
            app,
            tokens,
            _subscription_handles: handles,
        }
    }
}
