use chrono::{Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};

use super::errors::CoordinatorError;
use super::models::{
    AccountName, ChannelName, CompletedGame, GameVariant, Phase, Role, RoleSlot, SessionSnapshot,
};
use super::session::GameSession;
use crate::bans::{Ban, BanRegistry};
use crate::servers::ServerPool;

/// What a channel looks like after an operation
#[derive(Debug, Clone, PartialEq)]
pub struct SessionUpdate {
    pub channel: ChannelName,
    pub phase: Phase,
    pub status: String,
    /// Set on the operation that moved the lobby to Completed
    pub completed: Option<CompletedGame>,
}

impl SessionUpdate {
    fn of(session: &GameSession, completed: Option<CompletedGame>) -> Self {
        Self {
            channel: session.channel().clone(),
            phase: session.phase(),
            status: session.status_summary(),
            completed,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VoteOutcome {
    pub map: String,
    pub update: SessionUpdate,
}

/// Owns the lobby of every channel and the system-wide seat index.
///
/// Each session sits behind its own mutex, so operations on one channel
/// run in arrival order while other channels proceed independently. The
/// seat index maps a player to the one channel they are seated in and is
/// always taken after a session lock, never before.
pub struct SessionDirectory {
    sessions: RwLock<HashMap<ChannelName, Arc<Mutex<GameSession>>>>,
    seats: Mutex<HashMap<AccountName, ChannelName>>,
    pool: Arc<ServerPool>,
    bans: Arc<BanRegistry>,
}

impl SessionDirectory {
    pub fn new(pool: Arc<ServerPool>, bans: Arc<BanRegistry>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            seats: Mutex::new(HashMap::new()),
            pool,
            bans,
        }
    }

    pub fn pool(&self) -> &Arc<ServerPool> {
        &self.pool
    }

    pub fn bans(&self) -> &Arc<BanRegistry> {
        &self.bans
    }

    pub async fn register_channel(
        &self,
        channel: ChannelName,
        variant: GameVariant,
    ) -> Result<SessionUpdate, CoordinatorError> {
        let mut sessions = self.sessions.write().await;
        if sessions.contains_key(&channel) {
            return Err(CoordinatorError::DuplicateChannel(channel));
        }

        let session = GameSession::new(channel.clone(), variant);
        let update = SessionUpdate::of(&session, None);
        sessions.insert(channel, Arc::new(Mutex::new(session)));
        Ok(update)
    }

    /// Replaces the channel's lobby with an empty one, releasing its server
    /// and seats
    pub async fn reset_channel(&self, channel: ChannelName, variant: GameVariant) -> SessionUpdate {
        let fresh = GameSession::new(channel.clone(), variant);
        let update = SessionUpdate::of(&fresh, None);

        // Seats are cleared before the write guard drops so nobody can sit
        // down in the fresh lobby first.
        let mut sessions = self.sessions.write().await;
        let previous = sessions.insert(channel.clone(), Arc::new(Mutex::new(fresh)));
        if let Some(previous) = previous {
            let previous = previous.lock().await;
            if let Some(server) = previous.server() {
                self.pool.release(&server.address).await;
            }
        }
        self.release_seats(&channel).await;
        drop(sessions);

        update
    }

    /// Swaps a Completed lobby for a fresh one. The server stays locked for
    /// the match now running on it.
    pub async fn open_next_lobby(
        &self,
        channel: &ChannelName,
    ) -> Result<SessionUpdate, CoordinatorError> {
        let mut sessions = self.sessions.write().await;
        let handle = sessions
            .get(channel)
            .cloned()
            .ok_or_else(|| CoordinatorError::UnknownChannel(channel.clone()))?;

        let current = handle.lock().await;
        if current.phase() != Phase::Completed {
            return Ok(SessionUpdate::of(&current, None));
        }

        let fresh = GameSession::new(channel.clone(), current.variant().clone());
        let update = SessionUpdate::of(&fresh, None);
        sessions.insert(channel.clone(), Arc::new(Mutex::new(fresh)));
        self.release_seats(channel).await;
        drop(current);
        drop(sessions);

        Ok(update)
    }

    pub async fn lookup(&self, channel: &ChannelName) -> Option<Arc<Mutex<GameSession>>> {
        self.sessions.read().await.get(channel).cloned()
    }

    async fn session(
        &self,
        channel: &ChannelName,
    ) -> Result<Arc<Mutex<GameSession>>, CoordinatorError> {
        self.lookup(channel)
            .await
            .ok_or_else(|| CoordinatorError::UnknownChannel(channel.clone()))
    }

    pub async fn channels(&self) -> Vec<ChannelName> {
        let mut channels: Vec<ChannelName> = self.sessions.read().await.keys().cloned().collect();
        channels.sort();
        channels
    }

    pub async fn status(&self, channel: &ChannelName) -> Result<SessionUpdate, CoordinatorError> {
        let handle = self.session(channel).await?;
        let session = handle.lock().await;
        Ok(SessionUpdate::of(&session, None))
    }

    pub async fn snapshot(&self, channel: &ChannelName) -> Result<SessionSnapshot, CoordinatorError> {
        let handle = self.session(channel).await?;
        let session = handle.lock().await;
        Ok(session.snapshot())
    }

    /// Channel the player is seated in, if any
    pub async fn seat_of(&self, player: &AccountName) -> Option<ChannelName> {
        self.seats.lock().await.get(player).cloned()
    }

    pub async fn register_player(
        &self,
        channel: &ChannelName,
        player: &AccountName,
        role: &Role,
    ) -> Result<(RoleSlot, SessionUpdate), CoordinatorError> {
        self.bans.check(player).await?;

        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        if session.phase() != Phase::Registration {
            return Err(CoordinatorError::NotInRegistrationPhase);
        }

        let mut seats = self.seats.lock().await;
        let claimed = match seats.get(player) {
            Some(seated) if seated != channel => {
                return Err(CoordinatorError::AlreadyRegisteredElsewhere {
                    channel: seated.clone(),
                });
            }
            Some(_) => false,
            None => {
                seats.insert(player.clone(), channel.clone());
                true
            }
        };

        match session.register_player(player.clone(), role) {
            Ok(slot) => Ok((slot, SessionUpdate::of(&session, None))),
            Err(e) => {
                if claimed {
                    seats.remove(player);
                }
                Err(e)
            }
        }
    }

    /// Returns whether the player was seated in this channel
    pub async fn unregister_player(
        &self,
        channel: &ChannelName,
        player: &AccountName,
    ) -> Result<bool, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        let removed = session.unregister_player(player);
        if removed {
            self.release_seat(player, channel).await;
        }
        Ok(removed)
    }

    /// Drops the player from every lobby and returns the channels whose
    /// status changed
    pub async fn unregister_player_everywhere(&self, player: &AccountName) -> Vec<ChannelName> {
        let handles: Vec<Arc<Mutex<GameSession>>> =
            self.sessions.read().await.values().cloned().collect();

        let mut affected = Vec::new();
        for handle in handles {
            let mut session = handle.lock().await;
            if session.unregister_player(player) {
                self.release_seat(player, session.channel()).await;
                affected.push(session.channel().clone());
            }
        }

        affected.sort();
        affected
    }

    pub async fn set_ready(
        &self,
        channel: &ChannelName,
        player: &AccountName,
    ) -> Result<SessionUpdate, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        session.set_ready(player)?;
        Ok(SessionUpdate::of(&session, None))
    }

    /// Records a vote. When the last seated player votes the lobby moves on
    /// to server assignment in the same call.
    pub async fn cast_vote(
        &self,
        channel: &ChannelName,
        player: &AccountName,
        map_text: &str,
    ) -> Result<VoteOutcome, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        let map = session.cast_vote(player, map_text)?;
        let completed = self.try_assign(&mut session).await;

        Ok(VoteOutcome {
            map,
            update: SessionUpdate::of(&session, completed),
        })
    }

    /// Ends the map vote now. A no-op outside MapVote.
    pub async fn close_vote(&self, channel: &ChannelName) -> Result<SessionUpdate, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        session.close_vote();
        let completed = self.try_assign(&mut session).await;
        Ok(SessionUpdate::of(&session, completed))
    }

    /// Retries server acquisition for a lobby waiting on one. Fails with
    /// `NoServerAvailable` if it is still waiting afterwards.
    pub async fn assign_server(
        &self,
        channel: &ChannelName,
    ) -> Result<SessionUpdate, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        let completed = self.try_assign(&mut session).await;
        if session.phase() == Phase::ServerAssignment {
            return Err(CoordinatorError::NoServerAvailable);
        }
        Ok(SessionUpdate::of(&session, completed))
    }

    /// Advance-or-no-op trigger: closes a vote open longer than
    /// `vote_window` and retries server assignment. Returns an update only
    /// when the phase changed.
    pub async fn advance(
        &self,
        channel: &ChannelName,
        vote_window: Duration,
    ) -> Result<Option<SessionUpdate>, CoordinatorError> {
        let handle = self.session(channel).await?;
        let mut session = handle.lock().await;
        let before = session.phase();

        if before == Phase::MapVote && session.phase_entered_at() + vote_window <= Utc::now() {
            session.close_vote();
        }
        let completed = self.try_assign(&mut session).await;

        if session.phase() == before {
            return Ok(None);
        }
        Ok(Some(SessionUpdate::of(&session, completed)))
    }

    pub async fn advance_all(&self, vote_window: Duration) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        for channel in self.channels().await {
            if let Ok(Some(update)) = self.advance(&channel, vote_window).await {
                updates.push(update);
            }
        }
        updates
    }

    /// Retries every lobby waiting on a server, e.g. after an unlock
    pub async fn retry_assignments(&self) -> Vec<SessionUpdate> {
        let mut updates = Vec::new();
        for channel in self.channels().await {
            if let Ok(update) = self.assign_server(&channel).await {
                if update.completed.is_some() {
                    updates.push(update);
                }
            }
        }
        updates
    }

    /// Bans the player and evicts them from every lobby
    pub async fn ban_player(
        &self,
        player: &AccountName,
        days: u32,
        reason: Option<String>,
    ) -> Result<(Ban, Vec<ChannelName>), CoordinatorError> {
        let ban = self.bans.ban(player, days, reason).await?;
        let affected = self.unregister_player_everywhere(player).await;
        Ok((ban, affected))
    }

    pub async fn unban_player(&self, player: &AccountName) -> bool {
        self.bans.unban(player).await
    }

    async fn try_assign(&self, session: &mut GameSession) -> Option<CompletedGame> {
        if session.phase() != Phase::ServerAssignment {
            return None;
        }

        let server = self.pool.acquire(&session.variant().servers).await?;
        match session.complete(server.clone()) {
            Some(record) => Some(record),
            None => {
                self.pool.release(&server.address).await;
                None
            }
        }
    }

    async fn release_seat(&self, player: &AccountName, channel: &ChannelName) {
        let mut seats = self.seats.lock().await;
        if seats.get(player) == Some(channel) {
            seats.remove(player);
        }
    }

    async fn release_seats(&self, channel: &ChannelName) {
        self.seats.lock().await.retain(|_, seated| seated != channel);
    }
}
