use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::coordinator::Server;

/// Liveness and occupancy of a game server at the time of the probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeReport {
    pub reachable: bool,
    /// None when the probe cannot see occupancy
    pub player_count: Option<u32>,
}

impl ProbeReport {
    pub fn up(player_count: Option<u32>) -> Self {
        Self {
            reachable: true,
            player_count,
        }
    }

    pub fn down() -> Self {
        Self {
            reachable: false,
            player_count: None,
        }
    }
}

/// Answers "is this server reachable and how many players are on it"
#[async_trait]
pub trait ServerProbe: Send + Sync {
    async fn probe(&self, server: &Server) -> ProbeReport;
}

/// Treats a server as live if its address accepts a TCP connection
pub struct TcpServerProbe {
    timeout: Duration,
}

impl TcpServerProbe {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpServerProbe {
    fn default() -> Self {
        Self::new(Duration::from_secs(2))
    }
}

#[async_trait]
impl ServerProbe for TcpServerProbe {
    #[instrument(skip(self, server), fields(address = %server.address))]
    async fn probe(&self, server: &Server) -> ProbeReport {
        match tokio::time::timeout(self.timeout, TcpStream::connect(&server.address)).await {
            Ok(Ok(_)) => {
                debug!("Server accepted connection");
                ProbeReport::up(None)
            }
            Ok(Err(e)) => {
                debug!(error = %e, "Server refused connection");
                ProbeReport::down()
            }
            Err(_) => {
                debug!(timeout_ms = self.timeout.as_millis() as u64, "Server probe timed out");
                ProbeReport::down()
            }
        }
    }
}

/// In-memory probe with settable answers. Unknown servers report up and empty.
#[derive(Default)]
pub struct StaticServerProbe {
    reports: RwLock<HashMap<String, ProbeReport>>,
}

impl StaticServerProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_report(&self, address: &str, report: ProbeReport) {
        self.reports
            .write()
            .await
            .insert(address.to_string(), report);
    }
}

#[async_trait]
impl ServerProbe for StaticServerProbe {
    async fn probe(&self, server: &Server) -> ProbeReport {
        self.reports
            .read()
            .await
            .get(&server.address)
            .copied()
            .unwrap_or(ProbeReport::up(Some(0)))
    }
}
