use std::sync::Arc;
use tokio::sync::Mutex;

use super::probe::{ProbeReport, ServerProbe};
use crate::coordinator::Server;

#[derive(Debug, Clone)]
struct PoolEntry {
    server: Server,
    locked: bool,
}

/// Live view of one server for status listings
#[derive(Debug, Clone, PartialEq)]
pub struct ServerStatus {
    pub server: Server,
    pub locked: bool,
    pub report: ProbeReport,
}

/// Shared pool of game servers. Lock flags only change under one global
/// lock so two lobbies never win the same server.
pub struct ServerPool {
    entries: Mutex<Vec<PoolEntry>>,
    probe: Arc<dyn ServerProbe>,
}

impl ServerPool {
    pub fn new(servers: Vec<Server>, probe: Arc<dyn ServerProbe>) -> Self {
        let entries = servers
            .into_iter()
            .map(|server| PoolEntry {
                server,
                locked: false,
            })
            .collect();

        Self {
            entries: Mutex::new(entries),
            probe,
        }
    }

    /// Locks and returns the first eligible server that is active, unlocked
    /// and answers the liveness probe. Probes run outside the pool lock; a
    /// candidate taken by someone else meanwhile is skipped.
    pub async fn acquire(&self, eligible: &[String]) -> Option<Server> {
        let candidates: Vec<Server> = {
            let entries = self.entries.lock().await;
            eligible
                .iter()
                .filter_map(|address| entries.iter().find(|e| &e.server.address == address))
                .filter(|e| !e.locked && e.server.active)
                .map(|e| e.server.clone())
                .collect()
        };

        for server in candidates {
            if !self.probe.probe(&server).await.reachable {
                continue;
            }

            let mut entries = self.entries.lock().await;
            let Some(entry) = entries.iter_mut().find(|e| e.server.address == server.address) else {
                continue;
            };
            if entry.locked {
                continue;
            }
            entry.locked = true;
            return Some(entry.server.clone());
        }

        None
    }

    /// Clears the lock flag unconditionally. Returns whether it was set.
    pub async fn release(&self, address: &str) -> bool {
        let mut entries = self.entries.lock().await;
        match entries.iter_mut().find(|e| e.server.address == address) {
            Some(entry) => std::mem::replace(&mut entry.locked, false),
            None => false,
        }
    }

    /// Startup sweep for locks left behind by an unclean shutdown
    pub async fn release_all(&self) -> usize {
        let mut entries = self.entries.lock().await;
        entries
            .iter_mut()
            .map(|e| std::mem::replace(&mut e.locked, false))
            .filter(|was_locked| *was_locked)
            .count()
    }

    pub async fn is_locked(&self, address: &str) -> bool {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .any(|e| e.server.address == address && e.locked)
    }

    pub async fn find_by_id(&self, id: u32) -> Option<Server> {
        let entries = self.entries.lock().await;
        entries
            .iter()
            .find(|e| e.server.id == id)
            .map(|e| e.server.clone())
    }

    /// Probes the active servers among `addresses`, outside the pool lock
    pub async fn status(&self, addresses: &[String]) -> Vec<ServerStatus> {
        let candidates: Vec<(Server, bool)> = {
            let entries = self.entries.lock().await;
            addresses
                .iter()
                .filter_map(|address| entries.iter().find(|e| &e.server.address == address))
                .filter(|e| e.server.active)
                .map(|e| (e.server.clone(), e.locked))
                .collect()
        };

        let reports = futures::future::join_all(
            candidates.iter().map(|(server, _)| self.probe.probe(server)),
        )
        .await;

        candidates
            .into_iter()
            .zip(reports)
            .map(|((server, locked), report)| ServerStatus {
                server,
                locked,
                report,
            })
            .collect()
    }
}
