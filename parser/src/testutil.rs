use flate2::Compression;
use flate2::write::ZlibEncoder;
use serde_json::{Map, Value, json};
use std::io::Write;

pub(crate) fn zlib(data: &[u8]) -> Vec<u8> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// Header, then the objects separated by binary noise, optionally compressed.
pub(crate) fn replay_bytes(objects: &[Value], compressed: bool) -> Vec<u8> {
    let mut body = b"\x01\x00\x00\x00\x9a".to_vec();
    for object in objects {
        body.extend_from_slice(serde_json::to_string(object).unwrap().as_bytes());
        body.extend_from_slice(b"\x00\x8f}\x03\x00");
    }

    let mut raw = vec![0x12, 0x32, 0x34, 0x11, 0x02, 0x00, 0x00, 0x00];
    if compressed {
        raw.extend_from_slice(&zlib(&body));
    } else {
        raw.extend_from_slice(&body);
    }
    raw
}

/// Ace and Bee on team 1, Cat on team 2.
pub(crate) fn metadata() -> Value {
    json!({
        "playerName": "Ace",
        "mapDisplayName": "Prokhorovka",
        "vehicles": {
            "11": {"name": "Ace", "team": 1, "vehicleType": "ussr:R04_T-34"},
            "12": {"name": "Bee", "team": 1, "vehicleType": "germany:G04_PzVI_Tiger_I"},
            "21": {"name": "Cat", "team": 2, "vehicleType": "usa:A01_M2"}
        }
    })
}

/// One vehicle per `(team, damage)` pair, with 30 assist damage and one kill each.
pub(crate) fn vehicle_results(entries: &[(i64, i64)], winner: i64) -> Value {
    let vehicles: Map<String, Value> = entries
        .iter()
        .enumerate()
        .map(|(i, (team, damage))| {
            (
                (100 + i).to_string(),
                json!([{
                    "name": "",
                    "team": team,
                    "vehicleType": "usa:Result_Tank",
                    "damageDealt": damage,
                    "kills": 1,
                    "damageAssistedTrack": 10,
                    "damageAssistedRadio": 20
                }]),
            )
        })
        .collect();
    json!({"vehicles": vehicles, "common": {"winnerTeam": winner}})
}

pub(crate) fn personal_results(team: i64, winner: i64, death_reason: i64) -> Value {
    json!({
        "personal": {
            "avatar": {"credits": 1000},
            "1001": {
                "team": team,
                "damageDealt": 1200,
                "kills": 2,
                "damageAssistedTrack": 100,
                "damageAssistedRadio": 50,
                "deathReason": death_reason
            }
        },
        "common": {"winnerTeam": winner}
    })
}
