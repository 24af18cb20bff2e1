// A session is one lobby bound to a channel. It walks
// Registration -> ReadyCheck -> MapVote -> ServerAssignment -> Completed.
// Vacating a seat before Completed sends it back to Registration.
//
// Every operation either applies fully or returns an error and leaves the
// session untouched.

use chrono::{DateTime, Utc};
use std::collections::HashSet;
use uuid::Uuid;

use super::errors::CoordinatorError;
use super::models::{
    AccountName, ChannelName, CompletedGame, GameVariant, Phase, Role, RoleSlot, Server,
    SessionSnapshot,
};
use super::roster::RoleRoster;
use super::vote::MapVoteTally;

#[derive(Debug, Clone)]
pub struct GameSession {
    channel: ChannelName,
    variant: GameVariant,
    roster: RoleRoster,
    tally: MapVoteTally,
    ready: HashSet<AccountName>,
    phase: Phase,
    phase_entered_at: DateTime<Utc>,
    map: Option<String>,
    server: Option<Server>,
}

impl GameSession {
    pub fn new(channel: ChannelName, variant: GameVariant) -> Self {
        let roster = RoleRoster::new(&variant.roles);
        Self {
            channel,
            variant,
            roster,
            tally: MapVoteTally::new(),
            ready: HashSet::new(),
            phase: Phase::Registration,
            phase_entered_at: Utc::now(),
            map: None,
            server: None,
        }
    }

    pub fn register_player(
        &mut self,
        player: AccountName,
        role: &Role,
    ) -> Result<RoleSlot, CoordinatorError> {
        if self.phase != Phase::Registration {
            return Err(CoordinatorError::NotInRegistrationPhase);
        }

        let slot = self.roster.assign(role, player)?;
        if self.roster.is_full() {
            self.enter(Phase::ReadyCheck);
        }

        Ok(slot)
    }

    /// Returns whether the player held a seat here
    pub fn unregister_player(&mut self, player: &AccountName) -> bool {
        if self.phase == Phase::Completed {
            return false;
        }

        if self.roster.vacate_by_player(player).is_none() {
            return false;
        }

        self.tally.withdraw(player);
        if self.phase != Phase::Registration {
            self.ready.clear();
            self.tally.clear();
            self.map = None;
            self.enter(Phase::Registration);
        }

        true
    }

    pub fn set_ready(&mut self, player: &AccountName) -> Result<(), CoordinatorError> {
        if self.phase != Phase::ReadyCheck {
            return Err(CoordinatorError::NotInReadyCheckPhase);
        }
        if !self.roster.is_seated(player) {
            return Err(CoordinatorError::NotSeated);
        }

        self.ready.insert(player.clone());
        if self.ready.len() == self.roster.seated_count() {
            self.enter(Phase::MapVote);
        }

        Ok(())
    }

    /// Records the player's vote and returns the resolved map name
    pub fn cast_vote(
        &mut self,
        player: &AccountName,
        map_text: &str,
    ) -> Result<String, CoordinatorError> {
        if self.phase != Phase::MapVote {
            return Err(CoordinatorError::NotInVotePhase);
        }
        if !self.roster.is_seated(player) {
            return Err(CoordinatorError::NotSeated);
        }

        let map = self.resolve_map(map_text)?;
        self.tally.cast_or_replace(player.clone(), &map);

        if self.tally.voter_count() == self.roster.seated_count() {
            self.close_vote();
        }

        Ok(map)
    }

    /// Closes the map vote. Returns false outside MapVote.
    pub fn close_vote(&mut self) -> bool {
        if self.phase != Phase::MapVote {
            return false;
        }

        let map = self
            .tally
            .winner()
            .or_else(|| self.variant.maps.first().cloned());
        self.map = map;
        self.enter(Phase::ServerAssignment);
        true
    }

    /// Exact (case-insensitive) name first, then a unique partial match
    pub fn resolve_map(&self, text: &str) -> Result<String, CoordinatorError> {
        let needle = text.trim().to_lowercase();
        if needle.is_empty() {
            return Err(CoordinatorError::UnknownMap(text.to_string()));
        }

        if let Some(exact) = self
            .variant
            .maps
            .iter()
            .find(|m| m.to_lowercase() == needle)
        {
            return Ok(exact.clone());
        }

        let mut partial = self
            .variant
            .maps
            .iter()
            .filter(|m| m.to_lowercase().contains(&needle));

        match (partial.next(), partial.next()) {
            (Some(only), None) => Ok(only.clone()),
            _ => Err(CoordinatorError::UnknownMap(text.to_string())),
        }
    }

    /// Binds the acquired server and finishes the lobby
    pub(crate) fn complete(&mut self, server: Server) -> Option<CompletedGame> {
        if self.phase != Phase::ServerAssignment {
            return None;
        }

        let map = self.map.clone()?;
        let roster = self
            .roster
            .slots()
            .iter()
            .filter_map(|(slot, occupant)| occupant.clone().map(|p| (slot.role.clone(), p)))
            .collect();

        self.server = Some(server.clone());
        self.enter(Phase::Completed);

        Some(CompletedGame {
            id: Uuid::new_v4(),
            channel: self.channel.clone(),
            variant: self.variant.name.clone(),
            map,
            server,
            roster,
            completed_at: self.phase_entered_at,
        })
    }

    fn enter(&mut self, phase: Phase) {
        self.phase = phase;
        self.phase_entered_at = Utc::now();
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn phase_entered_at(&self) -> DateTime<Utc> {
        self.phase_entered_at
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    pub fn variant(&self) -> &GameVariant {
        &self.variant
    }

    pub fn roster(&self) -> &RoleRoster {
        &self.roster
    }

    pub fn tally(&self) -> &MapVoteTally {
        &self.tally
    }

    pub fn is_ready(&self, player: &AccountName) -> bool {
        self.ready.contains(player)
    }

    pub fn map(&self) -> Option<&str> {
        self.map.as_deref()
    }

    pub fn server(&self) -> Option<&Server> {
        self.server.as_ref()
    }

    pub fn map_list(&self) -> String {
        format!("Maps: {}", self.variant.maps.join(", "))
    }

    /// One-line phase and roster projection for the channel topic
    pub fn status_summary(&self) -> String {
        match self.phase {
            Phase::Registration => {
                let mut parts = Vec::new();
                for spec in &self.variant.roles {
                    let names: Vec<String> = self
                        .roster
                        .slots()
                        .iter()
                        .filter(|(slot, _)| slot.role == spec.name)
                        .map(|(_, occupant)| {
                            occupant
                                .as_ref()
                                .map(|p| p.to_string())
                                .unwrap_or_else(|| "-".to_string())
                        })
                        .collect();
                    parts.push(format!("{}: {}", spec.name, names.join(", ")));
                }
                format!(
                    "Registration ({}/{}) | {}",
                    self.roster.seated_count(),
                    self.variant.total_slots(),
                    parts.join(" | ")
                )
            }
            Phase::ReadyCheck => {
                let waiting: Vec<String> = self
                    .roster
                    .seated_players()
                    .into_iter()
                    .filter(|p| !self.ready.contains(*p))
                    .map(|p| p.to_string())
                    .collect();
                format!(
                    "Ready check ({}/{} ready) | waiting for: {}",
                    self.ready.len(),
                    self.roster.seated_count(),
                    waiting.join(", ")
                )
            }
            Phase::MapVote => {
                let standings: Vec<String> = self
                    .tally
                    .standings()
                    .into_iter()
                    .map(|(map, count)| format!("{}: {}", map, count))
                    .collect();
                if standings.is_empty() {
                    "Map vote | no votes yet".to_string()
                } else {
                    format!("Map vote | {}", standings.join(", "))
                }
            }
            Phase::ServerAssignment => format!(
                "Waiting for a server | map: {}",
                self.map.as_deref().unwrap_or("-")
            ),
            Phase::Completed => format!(
                "Game started on {} at {}",
                self.map.as_deref().unwrap_or("-"),
                self.server
                    .as_ref()
                    .map(|s| s.address.as_str())
                    .unwrap_or("-")
            ),
        }
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let mut ready: Vec<AccountName> = self.ready.iter().cloned().collect();
        ready.sort();

        SessionSnapshot {
            channel: self.channel.clone(),
            phase: self.phase,
            slots: self.roster.slots().to_vec(),
            ready,
            votes: self.tally.standings(),
            map: self.map.clone(),
            server: self.server.as_ref().map(|s| s.address.clone()),
        }
    }
}
