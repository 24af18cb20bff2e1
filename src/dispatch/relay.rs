use axum::extract::ws::{Message, WebSocket};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use super::dispatcher::DispatchOutcome;

/// Fan-out of outcomes produced off the request path, such as a vote
/// closed by the sweep, to every attached chat bridge
#[derive(Clone)]
pub struct OutcomeRelay {
    sender: broadcast::Sender<DispatchOutcome>,
}

impl OutcomeRelay {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Returns how many bridges received the outcome. Empty outcomes are
    /// not relayed.
    pub fn push(&self, outcome: DispatchOutcome) -> usize {
        if outcome.is_empty() {
            return 0;
        }
        self.sender.send(outcome).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DispatchOutcome> {
        self.sender.subscribe()
    }

    pub fn bridge_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl Default for OutcomeRelay {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Writes each relayed outcome to the socket as JSON until either side
/// hangs up
pub async fn forward_to_socket(
    mut socket: WebSocket,
    mut outcomes: broadcast::Receiver<DispatchOutcome>,
) {
    info!("Chat bridge attached to relay");

    loop {
        tokio::select! {
            received = outcomes.recv() => match received {
                Ok(outcome) => {
                    let text = match serde_json::to_string(&outcome) {
                        Ok(text) => text,
                        Err(e) => {
                            warn!(error = %e, "Failed to serialize relayed outcome");
                            continue;
                        }
                    };
                    if socket.send(Message::Text(text)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Chat bridge fell behind the relay");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },

            inbound = socket.recv() => match inbound {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                // The relay is one-way
                Some(Ok(_)) => {}
            },
        }
    }

    let _ = socket.send(Message::Close(None)).await;
    debug!("Chat bridge detached from relay");
}
