use pickup::{
    config::AppConfig,
    coordinator::SessionDirectory,
    dispatch::{self, DispatchSettings, Dispatcher},
    event::{EventBus, LobbySubscription},
    identity::{JwtIdentityProvider, PlayerRegistry, TokenConfig},
    records::{
        GameRecordRepository, InMemoryGameRecordRepository, PostgresGameRecordRepository,
        RecordSubscriber,
    },
    servers::{ServerPool, TcpServerProbe},
    shared::AppState,
    sweep::{start_sweep_task, SweepConfig},
    BanRegistry,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pickup=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting pickup coordinator");

    let config = AppConfig::from_env()?;
    let coordinator = Arc::new(config.coordinator.clone());

    let records: Arc<dyn GameRecordRepository> = match &config.database_url {
        Some(database_url) => {
            let pool = sqlx::PgPool::connect(database_url).await?;
            let repository = PostgresGameRecordRepository::new(pool);
            repository.ensure_schema().await?;
            info!("Recording completed games in PostgreSQL");
            Arc::new(repository)
        }
        None => {
            info!("DATABASE_URL not set, keeping completed games in memory");
            Arc::new(InMemoryGameRecordRepository::new())
        }
    };

    let pool = Arc::new(ServerPool::new(
        coordinator.servers.clone(),
        Arc::new(TcpServerProbe::new(Duration::from_secs(2))),
    ));
    let directory = Arc::new(SessionDirectory::new(pool, Arc::new(BanRegistry::new())));
    let players = Arc::new(PlayerRegistry::new(coordinator.admins.clone()));
    let event_bus = EventBus::new(1000);

    let record_subscriber = Arc::new(RecordSubscriber::new(records));
    for channel in &coordinator.channels {
        LobbySubscription::new(channel.name.clone(), record_subscriber.clone(), event_bus.clone())
            .start()
            .await;
    }

    let settings = DispatchSettings {
        topic_prefix: config.topic_prefix.clone(),
        auto_rotate: config.auto_rotate,
        vote_window: chrono::Duration::from_std(config.vote_window)?,
    };
    let dispatcher = Arc::new(Dispatcher::new(
        directory,
        players,
        coordinator.clone(),
        event_bus,
        settings,
    ));

    let outcome = dispatcher.bootstrap().await?;
    for topic in &outcome.topics {
        info!(channel = %topic.channel, topic = %topic.topic, "Initial topic");
    }

    tokio::spawn(start_sweep_task(
        dispatcher.clone(),
        SweepConfig {
            interval: config.sweep_interval,
        },
    ));

    let identity = Arc::new(JwtIdentityProvider::new(TokenConfig::new(
        config.jwt_secret.clone(),
        config.token_expiration_hours,
    )));
    let app = dispatch::router(AppState::new(dispatcher, identity));

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server running");
    axum::serve(listener, app).await?;

    Ok(())
}
