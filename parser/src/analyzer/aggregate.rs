use serde::Serialize;
use std::collections::BTreeMap;
use std::ops::AddAssign;
use tracing::debug;

use super::analyzer::Analyzer;
use super::{ReplayStats, TeamStatRecord};
use crate::types::{Outcome, StatsMode};

/// Running counters for one player or vehicle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatTotals {
    pub battles: u64,
    pub wins: u64,
    pub survived_count: u64,
    pub total_damage: i64,
    pub total_kills: i64,
    pub total_assisted: i64,
}

impl StatTotals {
    /// Counts one battle. Wins and survivals are only known for personal
    /// results, so team records never move those counters. Sums saturate at
    /// the `i64` bounds.
    pub fn record(&mut self, record: &TeamStatRecord) {
        self.battles += 1;
        if record.outcome.is_some_and(Outcome::is_win) {
            self.wins += 1;
        }
        if record.survived == Some(true) {
            self.survived_count += 1;
        }
        self.total_damage = self.total_damage.saturating_add(record.damage);
        self.total_kills = self.total_kills.saturating_add(record.kills);
        self.total_assisted = self.total_assisted.saturating_add(record.assisted_damage);
    }
}

impl AddAssign<&StatTotals> for StatTotals {
    fn add_assign(&mut self, other: &StatTotals) {
        self.battles += other.battles;
        self.wins += other.wins;
        self.survived_count += other.survived_count;
        self.total_damage = self.total_damage.saturating_add(other.total_damage);
        self.total_kills = self.total_kills.saturating_add(other.total_kills);
        self.total_assisted = self.total_assisted.saturating_add(other.total_assisted);
    }
}

/// One battle as it appeared in a player's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BattleLine {
    pub map: String,
    pub tank: String,
    pub damage: i64,
    pub kills: i64,
    pub assisted_damage: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    #[serde(flatten)]
    pub totals: StatTotals,
    /// The same counters split by map. They always sum to `totals`.
    pub maps: BTreeMap<String, StatTotals>,
    /// Team mode only, in processing order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub history: Vec<BattleLine>,
}

/// Battles and wins of the recording player's team on one map.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MapTally {
    pub battles: u64,
    pub wins: u64,
}

/// Folds per-replay records into totals keyed by player name (team mode)
/// or vehicle type (personal mode).
#[derive(Debug, Default, Serialize)]
pub struct StatsAggregator {
    replays: u64,
    entries: BTreeMap<String, AggregateEntry>,
    maps: BTreeMap<String, MapTally>,
}

impl StatsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fold(&mut self, replay: &ReplayStats) {
        self.replays += 1;

        let tally = self.maps.entry(replay.map_name.clone()).or_default();
        tally.battles += 1;
        if replay.outcome.is_win() {
            tally.wins += 1;
        }

        for record in &replay.records {
            let key = match replay.mode {
                StatsMode::Team => &record.name,
                StatsMode::Personal => &record.tank,
            };
            let entry = self.entries.entry(key.clone()).or_default();
            entry.totals.record(record);
            entry
                .maps
                .entry(replay.map_name.clone())
                .or_default()
                .record(record);

            if replay.mode == StatsMode::Team {
                entry.history.push(BattleLine {
                    map: replay.map_name.clone(),
                    tank: record.tank.clone(),
                    damage: record.damage,
                    kills: record.kills,
                    assisted_damage: record.assisted_damage,
                });
            }
        }
    }

    /// Replays folded so far.
    pub fn replays(&self) -> u64 {
        self.replays
    }

    pub fn get(&self, key: &str) -> Option<&AggregateEntry> {
        self.entries.get(key)
    }

    pub fn entries(&self) -> &BTreeMap<String, AggregateEntry> {
        &self.entries
    }

    pub fn map_tallies(&self) -> &BTreeMap<String, MapTally> {
        &self.maps
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Analyzer for StatsAggregator {
    fn finish(&mut self) {
        debug!(
            "aggregated {} replays into {} entries over {} maps",
            self.replays,
            self.entries.len(),
            self.maps.len()
        );
    }

    fn process(&mut self, replay: &ReplayStats) {
        self.fold(replay);
    }
}
