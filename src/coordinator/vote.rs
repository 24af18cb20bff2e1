use std::collections::HashMap;

use super::models::AccountName;

#[derive(Debug, Clone)]
struct Ballot {
    map: String,
    seq: u64,
}

/// Per-lobby map vote. Each player holds at most one ballot; recasting
/// replaces it.
#[derive(Debug, Clone, Default)]
pub struct MapVoteTally {
    ballots: HashMap<AccountName, Ballot>,
    counts: HashMap<String, usize>,
    next_seq: u64,
}

impl MapVoteTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cast_or_replace(&mut self, player: AccountName, map: &str) {
        self.withdraw(&player);

        let seq = self.next_seq;
        self.next_seq += 1;

        *self.counts.entry(map.to_string()).or_insert(0) += 1;
        self.ballots.insert(
            player,
            Ballot {
                map: map.to_string(),
                seq,
            },
        );
    }

    /// Removes the player's ballot, returning the map it was for
    pub fn withdraw(&mut self, player: &AccountName) -> Option<String> {
        let ballot = self.ballots.remove(player)?;

        if let Some(count) = self.counts.get_mut(&ballot.map) {
            *count -= 1;
            if *count == 0 {
                self.counts.remove(&ballot.map);
            }
        }

        Some(ballot.map)
    }

    /// Map with the most votes. Ties go to the map whose earliest
    /// standing ballot was cast first.
    pub fn winner(&self) -> Option<String> {
        let mut first_seq: HashMap<&str, u64> = HashMap::new();
        for ballot in self.ballots.values() {
            let seq = first_seq.entry(ballot.map.as_str()).or_insert(ballot.seq);
            *seq = (*seq).min(ballot.seq);
        }

        self.counts
            .iter()
            .max_by(|(map_a, count_a), (map_b, count_b)| {
                count_a
                    .cmp(count_b)
                    .then_with(|| first_seq[map_b.as_str()].cmp(&first_seq[map_a.as_str()]))
            })
            .map(|(map, _)| map.clone())
    }

    pub fn vote_of(&self, player: &AccountName) -> Option<&str> {
        self.ballots.get(player).map(|b| b.map.as_str())
    }

    pub fn count_for(&self, map: &str) -> usize {
        self.counts.get(map).copied().unwrap_or(0)
    }

    pub fn voter_count(&self) -> usize {
        self.ballots.len()
    }

    /// (map, count) pairs, highest count first
    pub fn standings(&self) -> Vec<(String, usize)> {
        let mut standings: Vec<(String, usize)> =
            self.counts.iter().map(|(m, c)| (m.clone(), *c)).collect();
        standings.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        standings
    }

    pub fn clear(&mut self) {
        self.ballots.clear();
        self.counts.clear();
    }
}
