use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, trace};

use crate::ClassificationError;
use crate::scanner::EmbeddedObject;
use crate::types::{
    StatsMode, TeamId, de_counter, de_opt_counter, de_opt_string, de_team, lenient_i64,
};
use crate::wotreplay::BattleMetadata;

const DAMAGE_FIELD: &str = "damageDealt";

/// Structural role an embedded object can play. Replays carry no type tags,
/// so roles are recognised by the keys an object holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signature {
    /// `playerName`, `mapDisplayName` and a `vehicles` roster whose first entry has no damage.
    Metadata,
    /// `vehicles` whose first value is a non-empty list of result records.
    VehicleResults,
    /// `personal` and `common` blocks.
    PersonalResults,
}

impl Signature {
    pub const ALL: [Signature; 3] = [
        Signature::Metadata,
        Signature::VehicleResults,
        Signature::PersonalResults,
    ];

    pub fn matches(self, object: &Map<String, Value>) -> bool {
        match self {
            Signature::Metadata => {
                ["playerName", "mapDisplayName"]
                    .iter()
                    .all(|key| object.contains_key(*key))
                    && roster(object).is_some_and(|vehicles| {
                        vehicles.values().next().is_none_or(|first| !has_damage(first))
                    })
            }
            Signature::VehicleResults => roster(object)
                .and_then(|vehicles| vehicles.values().next())
                .and_then(Value::as_array)
                .and_then(|occupants| occupants.first())
                .is_some_and(has_damage),
            Signature::PersonalResults => {
                object.contains_key("personal") && object.contains_key("common")
            }
        }
    }

    /// Every role `object` qualifies for, in declaration order.
    pub fn matching(object: &Map<String, Value>) -> Vec<Signature> {
        Signature::ALL
            .into_iter()
            .filter(|signature| signature.matches(object))
            .collect()
    }
}

fn roster(object: &Map<String, Value>) -> Option<&Map<String, Value>> {
    object.get("vehicles")?.as_object()
}

fn has_damage(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|record| record.contains_key(DAMAGE_FIELD))
}

/// One player's post-battle record. Both result layouts share it.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[allow(non_snake_case)]
#[serde(default)]
pub struct PlayerResult {
    #[serde(deserialize_with = "de_opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_team")]
    pub team: Option<TeamId>,
    #[serde(deserialize_with = "de_opt_string")]
    pub vehicleType: Option<String>,
    #[serde(deserialize_with = "de_counter")]
    pub damageDealt: i64,
    #[serde(deserialize_with = "de_counter")]
    pub kills: i64,
    #[serde(deserialize_with = "de_counter")]
    pub damageAssistedTrack: i64,
    #[serde(deserialize_with = "de_counter")]
    pub damageAssistedRadio: i64,
    #[serde(deserialize_with = "de_opt_counter")]
    pub deathReason: Option<i64>,
}

impl PlayerResult {
    /// Track plus radio assist damage.
    pub fn assisted_damage(&self) -> i64 {
        self.damageAssistedTrack.saturating_add(self.damageAssistedRadio)
    }

    /// A death reason of -1 means the vehicle was never destroyed.
    pub fn survived(&self) -> bool {
        self.deathReason == Some(-1)
    }
}

/// Results with one list of occupant records per vehicle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VehicleResults {
    /// Primary occupant of each vehicle, in results order.
    pub vehicles: Vec<PlayerResult>,
    pub winner: Option<TeamId>,
}

impl VehicleResults {
    fn from_object(object: &Map<String, Value>) -> Self {
        let vehicles = roster(object)
            .map(|vehicles| {
                vehicles
                    .iter()
                    .filter_map(|(id, occupants)| {
                        let primary = occupants.as_array()?.first()?;
                        serde_json::from_value(primary.clone())
                            .inspect_err(|e| trace!("dropping result for vehicle {id}: {e}"))
                            .ok()
                    })
                    .collect()
            })
            .unwrap_or_default();

        VehicleResults {
            vehicles,
            winner: winner_team(object),
        }
    }
}

/// Results with the recording player's own `personal` record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersonalResults {
    pub record: Option<PlayerResult>,
    pub winner: Option<TeamId>,
}

impl PersonalResults {
    fn from_object(object: &Map<String, Value>) -> Self {
        let record = object
            .get("personal")
            .and_then(Value::as_object)
            .and_then(|personal| personal.values().find(|value| has_damage(value)))
            .and_then(|record| serde_json::from_value(record.clone()).ok());

        PersonalResults {
            record,
            winner: winner_team(object),
        }
    }
}

/// `common.winnerTeam`, 0 when absent. Present but non-numeric is unknown.
fn winner_team(object: &Map<String, Value>) -> Option<TeamId> {
    match object.get("common").and_then(|common| common.get("winnerTeam")) {
        None => Some(TeamId(0)),
        Some(winner) => lenient_i64(winner).map(TeamId),
    }
}

/// The results object a correlation runs against, tagged by layout.
#[derive(Debug, Clone, PartialEq)]
pub enum BattleResults {
    Vehicles(VehicleResults),
    Personal(PersonalResults),
}

impl BattleResults {
    pub fn mode(&self) -> StatsMode {
        match self {
            BattleResults::Vehicles(_) => StatsMode::Team,
            BattleResults::Personal(_) => StatsMode::Personal,
        }
    }
}

/// A metadata object paired with a results object from the same replay.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedReplay {
    pub metadata: BattleMetadata,
    pub results: BattleResults,
}

/// Keeps the best candidate per role while objects stream past.
///
/// When several objects match the same role the last one wins. Replays
/// normally hold one of each, so this only decides between incidental
/// look-alikes, and it matches the behaviour existing exports were built with.
#[derive(Debug, Default)]
pub struct ObjectClassifier {
    metadata: Option<Map<String, Value>>,
    vehicle_results: Option<Map<String, Value>>,
    personal_results: Option<Map<String, Value>>,
    observed: usize,
}

impl ObjectClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects seen so far, matching or not.
    pub fn observed(&self) -> usize {
        self.observed
    }

    fn slot(&mut self, signature: Signature) -> &mut Option<Map<String, Value>> {
        match signature {
            Signature::Metadata => &mut self.metadata,
            Signature::VehicleResults => &mut self.vehicle_results,
            Signature::PersonalResults => &mut self.personal_results,
        }
    }

    pub fn observe(&mut self, object: EmbeddedObject) {
        self.observed += 1;
        let roles = Signature::matching(&object.fields);
        let Some((last, rest)) = roles.split_last() else {
            return;
        };
        debug!("object at offset {} matches {roles:?}", object.offset);

        for role in rest {
            *self.slot(*role) = Some(object.fields.clone());
        }
        *self.slot(*last) = Some(object.fields);
    }

    /// Pairs the metadata with the results layout `mode` reads.
    pub fn finish(self, mode: StatsMode) -> Result<ClassifiedReplay, ClassificationError> {
        let metadata = self.metadata.ok_or(ClassificationError::MissingMetadata)?;
        let metadata: BattleMetadata = serde_json::from_value(Value::Object(metadata))
            .map_err(|_| ClassificationError::MissingMetadata)?;

        let results = match mode {
            StatsMode::Team => self
                .vehicle_results
                .map(|object| BattleResults::Vehicles(VehicleResults::from_object(&object))),
            StatsMode::Personal => self
                .personal_results
                .map(|object| BattleResults::Personal(PersonalResults::from_object(&object))),
        }
        .ok_or(ClassificationError::MissingResults)?;

        Ok(ClassifiedReplay { metadata, results })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{metadata, personal_results, vehicle_results};
    use serde_json::json;

    fn object(value: Value) -> EmbeddedObject {
        EmbeddedObject {
            offset: 0,
            len: 0,
            fields: value.as_object().cloned().unwrap(),
        }
    }

    fn roles(value: Value) -> Vec<Signature> {
        Signature::matching(value.as_object().unwrap())
    }

    #[test]
    fn metadata_signature() {
        assert_eq!(roles(metadata()), [Signature::Metadata]);
        assert_eq!(
            roles(json!({"playerName": "Ace", "mapDisplayName": "Himmelsdorf", "vehicles": {}})),
            [Signature::Metadata]
        );
        assert!(roles(json!({"playerName": "Ace", "mapDisplayName": "Himmelsdorf"})).is_empty());
    }

    #[test]
    fn roster_with_damage_is_not_metadata() {
        let lookalike = json!({
            "playerName": "Ace",
            "mapDisplayName": "Himmelsdorf",
            "vehicles": {"1": {"damageDealt": 10, "team": 1}}
        });
        assert!(roles(lookalike).is_empty());
    }

    #[test]
    fn result_signatures() {
        assert_eq!(roles(vehicle_results(&[(1, 500)], 0)), [Signature::VehicleResults]);
        assert_eq!(roles(personal_results(1, 2, -1)), [Signature::PersonalResults]);
        assert!(roles(json!({"vehicles": {"1": []}})).is_empty());
        assert!(roles(json!({"vehicles": {"1": [{"kills": 1}]}})).is_empty());
    }

    #[test]
    fn full_results_object_matches_both_layouts() {
        let mut full = vehicle_results(&[(1, 500)], 2);
        full["personal"] = json!({"42": {"damageDealt": 500, "team": 1}});
        assert_eq!(
            roles(full),
            [Signature::VehicleResults, Signature::PersonalResults]
        );
    }

    #[test]
    fn last_match_wins() {
        let mut classifier = ObjectClassifier::new();
        let mut early = metadata();
        early["mapDisplayName"] = json!("Early");
        classifier.observe(object(early));
        classifier.observe(object(json!({"unrelated": true})));
        classifier.observe(object(metadata()));
        classifier.observe(object(vehicle_results(&[(1, 1)], 0)));
        classifier.observe(object(vehicle_results(&[(1, 2)], 0)));
        assert_eq!(classifier.observed(), 5);

        let replay = classifier.finish(StatsMode::Team).unwrap();
        assert_eq!(replay.metadata.map_name(), "Prokhorovka");
        let BattleResults::Vehicles(results) = replay.results else {
            panic!("expected vehicle results");
        };
        assert_eq!(results.vehicles[0].damageDealt, 2);
    }

    #[test]
    fn missing_roles_fail() {
        let mut classifier = ObjectClassifier::new();
        classifier.observe(object(vehicle_results(&[(1, 1)], 0)));
        assert_eq!(
            classifier.finish(StatsMode::Team).unwrap_err(),
            ClassificationError::MissingMetadata
        );

        let mut classifier = ObjectClassifier::new();
        classifier.observe(object(metadata()));
        classifier.observe(object(vehicle_results(&[(1, 1)], 0)));
        assert_eq!(
            classifier.finish(StatsMode::Personal).unwrap_err(),
            ClassificationError::MissingResults
        );
    }

    #[test]
    fn vehicle_results_skip_empty_lists() {
        let object = json!({"vehicles": {
            "1": [{"damageDealt": "300", "team": 1, "damageAssistedTrack": 5, "damageAssistedRadio": 7.5}],
            "2": [],
            "3": {"damageDealt": 1}
        }});
        let results = VehicleResults::from_object(object.as_object().unwrap());
        assert_eq!(results.vehicles.len(), 1);
        assert_eq!(results.vehicles[0].damageDealt, 300);
        assert_eq!(results.vehicles[0].assisted_damage(), 12);
        assert_eq!(results.winner, Some(TeamId(0)));
    }

    #[test]
    fn personal_record_is_first_value_with_damage() {
        let object = json!({
            "personal": {"avatar": {"credits": 10}, "4242": {"damageDealt": 900, "team": 2, "deathReason": -1}},
            "common": {"winnerTeam": "x"}
        });
        let results = PersonalResults::from_object(object.as_object().unwrap());
        let record = results.record.unwrap();
        assert_eq!(record.damageDealt, 900);
        assert!(record.survived());
        assert_eq!(results.winner, None);
    }

    #[test]
    fn huge_assist_values_saturate() {
        let record: PlayerResult = serde_json::from_value(json!({
            "damageAssistedTrack": 1e300,
            "damageAssistedRadio": 1e300
        }))
        .unwrap();
        assert_eq!(record.assisted_damage(), i64::MAX);
    }

    #[test]
    fn numeric_strings_count_as_numbers() {
        let record: PlayerResult =
            serde_json::from_value(json!({"team": "1", "deathReason": "-1", "kills": "3"}))
                .unwrap();
        assert_eq!(record.team, Some(TeamId(1)));
        assert!(record.survived());
        assert_eq!(record.kills, 3);

        let record: PlayerResult =
            serde_json::from_value(json!({"team": "blue", "deathReason": "alive"})).unwrap();
        assert_eq!(record.team, None);
        assert!(!record.survived());
    }

    #[test]
    fn death_reason_decides_survival() {
        let dead: PlayerResult = serde_json::from_value(json!({"deathReason": 3})).unwrap();
        let missing: PlayerResult = serde_json::from_value(json!({})).unwrap();
        let alive: PlayerResult = serde_json::from_value(json!({"deathReason": -1})).unwrap();
        assert!(!dead.survived());
        assert!(!missing.survived());
        assert!(alive.survived());
    }
}
