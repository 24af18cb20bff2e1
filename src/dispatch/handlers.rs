use axum::{
    extract::{Path, State, WebSocketUpgrade},
    middleware,
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use serde_json::{json, Map, Value};
use strum::IntoEnumIterator;
use tower_http::trace::TraceLayer;
use tracing::{info, instrument};

use super::{dispatcher::DispatchOutcome, events::ChannelEvent, relay::forward_to_socket};
use crate::coordinator::{ChannelName, Phase, SessionSnapshot};
use crate::identity::{resolve_actor, Actor};
use crate::shared::{AppError, AppState};

/// Event intake for the chat bridge plus read-only status
pub fn router(state: AppState) -> Router {
    let events = Router::new()
        .route("/channels/:channel/events", post(post_event))
        .route_layer(middleware::from_fn_with_state(state.clone(), resolve_actor));

    Router::new()
        .route("/health", get(health))
        .route("/channels/:channel/status", get(channel_status))
        .route("/relay", get(relay_socket))
        .merge(events)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// POST /channels/:channel/events
#[instrument(name = "post_event", skip(state, event))]
pub async fn post_event(
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Extension(actor): Extension<Actor>,
    Json(event): Json<ChannelEvent>,
) -> Result<Json<DispatchOutcome>, AppError> {
    let channel = ChannelName::new(channel);
    info!(channel = %channel, event = event.name(), "Channel event received");

    let outcome = state.dispatcher.dispatch(&channel, actor.0, event).await?;
    Ok(Json(outcome))
}

/// GET /channels/:channel/status
#[instrument(name = "channel_status", skip(state))]
pub async fn channel_status(
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> Result<Json<SessionSnapshot>, AppError> {
    let snapshot = state
        .dispatcher
        .directory()
        .snapshot(&ChannelName::new(channel))
        .await?;
    Ok(Json(snapshot))
}

/// GET /relay, upgraded to a WebSocket that streams outcomes the chat
/// bridge did not request itself
pub async fn relay_socket(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    let outcomes = state.dispatcher.relay().subscribe();
    ws.on_upgrade(move |socket| forward_to_socket(socket, outcomes))
}

/// GET /health, with the number of lobbies in each phase
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let directory = state.dispatcher.directory();
    let mut current = Vec::new();
    for channel in directory.channels().await {
        if let Ok(update) = directory.status(&channel).await {
            current.push(update.phase);
        }
    }

    let mut phases = Map::new();
    for phase in Phase::iter() {
        let count = current.iter().filter(|p| **p == phase).count();
        phases.insert(phase.to_string(), json!(count));
    }

    Json(json!({ "status": "ok", "channels": current.len(), "phases": phases }))
}
