#![allow(dead_code)] // Test utilities may not all be used in every test

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::Value;
use tokio::time::{sleep, Duration};
use tower::ServiceExt;

use pickup::{
    coordinator::{CompletedGame, CoordinatorError, Role},
    dispatch::{ChannelEvent, DispatchOutcome},
};

use super::setup::{TestSetup, ADMIN};

// ============================================================================
// Action Helpers
// ============================================================================

impl TestSetup {
    /// Dispatch an event as an authenticated player
    pub async fn send(
        &self,
        channel: &str,
        player: &str,
        event: ChannelEvent,
    ) -> Result<DispatchOutcome, CoordinatorError> {
        self.dispatcher
            .dispatch(&channel.into(), Some(player.into()), event)
            .await
    }

    pub async fn send_as_admin(
        &self,
        channel: &str,
        event: ChannelEvent,
    ) -> Result<DispatchOutcome, CoordinatorError> {
        self.send(channel, ADMIN, event).await
    }

    // ============================================================================
    // Convenience Action Methods
    // ============================================================================

    pub async fn join(&self, channel: &str, player: &str, role: &str) -> DispatchOutcome {
        self.send(channel, player, ChannelEvent::Join { role: Role::from(role) })
            .await
            .unwrap()
    }

    pub async fn ready(&self, channel: &str, player: &str) -> DispatchOutcome {
        self.send(channel, player, ChannelEvent::Ready).await.unwrap()
    }

    pub async fn vote(&self, channel: &str, player: &str, map: &str) -> DispatchOutcome {
        self.send(channel, player, ChannelEvent::Vote { map: map.to_string() })
            .await
            .unwrap()
    }

    /// Seats players in heal, assault1, assault2 order
    pub async fn fill_lobby(&self, channel: &str, players: [&str; 3]) {
        for (player, role) in players.iter().zip(["heal", "assault1", "assault2"]) {
            self.join(channel, player, role).await;
        }
    }

    /// Fills the lobby and readies everyone so the map vote is open
    pub async fn open_vote(&self, channel: &str, players: [&str; 3]) {
        self.fill_lobby(channel, players).await;
        for player in players {
            self.ready(channel, player).await;
        }
    }

    /// Waits for the record subscriber to persist `count` games
    pub async fn wait_for_records(&self, count: usize) -> Vec<CompletedGame> {
        for _ in 0..50 {
            let records = self.records.records().await;
            if records.len() >= count {
                return records;
            }
            sleep(Duration::from_millis(10)).await;
        }
        self.records.records().await
    }

    // ============================================================================
    // HTTP Helpers
    // ============================================================================

    pub fn token_for(&self, account: &str) -> String {
        self.tokens.issue_token(&account.into()).unwrap()
    }

    /// POST a JSON event to the router, optionally with a bearer token
    pub async fn post_event(&self, channel: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method("POST")
            .uri(format!("/channels/{}/events", encode(channel)))
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        let request = builder.body(Body::from(body.to_string())).unwrap();

        self.call(request).await
    }

    pub async fn get_status(&self, channel: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .uri(format!("/channels/{}/status", encode(channel)))
            .body(Body::empty())
            .unwrap();

        self.call(request).await
    }

    async fn call(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, value)
    }
}

fn encode(channel: &str) -> String {
    channel.replace('#', "%23")
}
