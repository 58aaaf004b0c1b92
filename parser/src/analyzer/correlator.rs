use serde::Serialize;

use super::classifier::{BattleResults, ClassifiedReplay, PersonalResults, VehicleResults};
use crate::ClassificationError;
use crate::types::{Outcome, StatsMode, TeamId, UNKNOWN_VEHICLE, tank_name};
use crate::wotreplay::{BattleMetadata, VehicleInfoMeta};

/// Normalized statistics for one player in one battle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamStatRecord {
    pub name: String,
    pub tank: String,
    pub damage: i64,
    pub kills: i64,
    pub assisted_damage: i64,
    /// Only known for personal results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub survived: Option<bool>,
    /// Only known for personal results.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
}

/// Everything one replay contributes to a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplayStats {
    pub map_name: String,
    pub mode: StatsMode,
    /// Outcome for the recording player's team.
    pub outcome: Outcome,
    pub records: Vec<TeamStatRecord>,
}

/// Cross-references metadata and results to produce the replay's records.
pub fn correlate(replay: &ClassifiedReplay) -> Result<ReplayStats, ClassificationError> {
    match &replay.results {
        BattleResults::Vehicles(results) => team_stats(&replay.metadata, results),
        BattleResults::Personal(results) => personal_stats(&replay.metadata, results),
    }
}

fn recording_player(metadata: &BattleMetadata) -> Result<&VehicleInfoMeta, ClassificationError> {
    let name = metadata
        .player_name()
        .ok_or(ClassificationError::MissingPlayerName)?;
    metadata
        .self_vehicle()
        .ok_or_else(|| ClassificationError::PlayerNotInRoster(name.to_owned()))
}

/// One record per vehicle on the recording player's team.
fn team_stats(
    metadata: &BattleMetadata,
    results: &VehicleResults,
) -> Result<ReplayStats, ClassificationError> {
    let player = recording_player(metadata)?;
    let team = player
        .team
        .ok_or_else(|| ClassificationError::MissingTeam(player.name.clone().unwrap_or_default()))?;

    let mut allies: Vec<TeamStatRecord> = results
        .vehicles
        .iter()
        .filter(|result| result.team == Some(team))
        .map(|result| TeamStatRecord {
            name: result.name.clone().unwrap_or_default(),
            tank: tank_name(result.vehicleType.as_deref().unwrap_or(UNKNOWN_VEHICLE)).to_owned(),
            damage: result.damageDealt,
            kills: result.kills,
            assisted_damage: result.assisted_damage(),
            survived: None,
            outcome: None,
        })
        .collect();

    relabel_allies(&mut allies, metadata, team);

    Ok(ReplayStats {
        map_name: metadata.map_name().to_owned(),
        mode: StatsMode::Team,
        outcome: Outcome::resolve(results.winner, Some(team)),
        records: allies,
    })
}

/// Result records carry no reliable identity, so names and tanks come from
/// the metadata roster by position: the n-th ally in the results is taken to
/// be the n-th ally in the roster. Allies past the end of the roster keep
/// their own labels.
// TODO: pair by account id once a replay with ids on both sides turns up.
fn relabel_allies(allies: &mut [TeamStatRecord], metadata: &BattleMetadata, team: TeamId) {
    for (record, vehicle) in allies.iter_mut().zip(metadata.team_roster(team)) {
        record.name = vehicle.name.clone().unwrap_or_default();
        record.tank = vehicle.tank().to_owned();
    }
    for record in allies.iter_mut().filter(|record| record.name.is_empty()) {
        record.name = format!("Player on {}", record.tank);
    }
}

/// The recording player's own record. The tank comes from the roster since
/// personal results carry no vehicle type.
fn personal_stats(
    metadata: &BattleMetadata,
    results: &PersonalResults,
) -> Result<ReplayStats, ClassificationError> {
    let player = recording_player(metadata)?;
    let record = results
        .record
        .as_ref()
        .ok_or(ClassificationError::MissingPersonalRecord)?;
    let outcome = Outcome::resolve(results.winner, record.team);

    Ok(ReplayStats {
        map_name: metadata.map_name().to_owned(),
        mode: StatsMode::Personal,
        outcome,
        records: vec![TeamStatRecord {
            name: player.name.clone().unwrap_or_default(),
            tank: player.tank().to_owned(),
            damage: record.damageDealt,
            kills: record.kills,
            assisted_damage: record.assisted_damage(),
            survived: Some(record.survived()),
            outcome: Some(outcome),
        }],
    })
}
