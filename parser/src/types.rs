use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Map name used when the metadata carries no display name.
pub const UNKNOWN_MAP: &str = "Unknown map";

/// Vehicle type used when a roster or result entry carries none.
pub const UNKNOWN_VEHICLE: &str = "N/A";

/// Per-battle team identifier. Real battles use 1 and 2; the results object
/// reports a winning team of 0 when nobody won.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub i64);

impl TeamId {
    pub fn raw(self) -> i64 {
        self.0
    }
}

/// Result of a battle from one team's point of view.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Outcome {
    Win,
    Loss,
    Draw,
}

impl Outcome {
    /// Compares the results object's winning team against `team`.
    ///
    /// A winner of 0 means the battle was not won by anyone. An unknown
    /// winner or team (missing or non-numeric in the replay) is a draw.
    pub fn resolve(winner: Option<TeamId>, team: Option<TeamId>) -> Outcome {
        match (winner, team) {
            (Some(winner), Some(team)) if winner == team => Outcome::Win,
            (Some(winner), Some(_)) if winner.raw() != 0 => Outcome::Loss,
            _ => Outcome::Draw,
        }
    }

    pub fn is_win(self) -> bool {
        self == Outcome::Win
    }
}

/// Which of the two result layouts a batch is built from.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum StatsMode {
    /// Per-vehicle result lists; one record per ally, keyed by player name.
    Team,
    /// `personal`/`common` blocks; one self record, keyed by vehicle type.
    Personal,
}

/// Strips the nation prefix from a vehicle type, e.g. `ussr:R04_T-34` becomes `R04_T-34`.
pub fn tank_name(vehicle_type: &str) -> &str {
    vehicle_type.rsplit(':').next().unwrap_or(vehicle_type)
}

/// Reads a loosely typed JSON scalar as an integer: integers as-is, floats
/// truncated, numeric strings parsed. Anything else is `None`.
pub fn lenient_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f as i64)
            })
        }
        _ => None,
    }
}

/// Counter fields: unreadable or null values count as zero.
pub(crate) fn de_counter<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_i64(&value).unwrap_or(0))
}

pub(crate) fn de_opt_counter<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_i64(&value))
}

pub(crate) fn de_team<'de, D>(deserializer: D) -> Result<Option<TeamId>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(lenient_i64(&value).map(TeamId))
}

/// Only JSON strings are names; numbers, nulls and containers are dropped.
pub(crate) fn de_opt_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(Some(s)),
        _ => Ok(None),
    }
}
