use flate2::{Decompress, FlushDecompress, Status};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::io;
use std::path::Path;
use tracing::trace;

use crate::Result;
use crate::scanner::EmbeddedObjects;
use crate::types::{
    TeamId, UNKNOWN_MAP, UNKNOWN_VEHICLE, de_opt_string, de_team, tank_name,
};

/// Opaque header preceding the zlib stream.
pub const HEADER_LEN: usize = 8;

/// One entry of the pre-battle vehicle roster.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[allow(non_snake_case)]
#[serde(default)]
pub struct VehicleInfoMeta {
    /// Vehicle instance key from the roster map.
    #[serde(skip)]
    pub id: String,
    #[serde(deserialize_with = "de_opt_string")]
    pub name: Option<String>,
    #[serde(deserialize_with = "de_team")]
    pub team: Option<TeamId>,
    /// `<nation>:<TankName>`
    #[serde(deserialize_with = "de_opt_string")]
    pub vehicleType: Option<String>,
}

impl VehicleInfoMeta {
    pub fn tank(&self) -> &str {
        tank_name(self.vehicleType.as_deref().unwrap_or(UNKNOWN_VEHICLE))
    }
}

/// The pre-battle session object: who recorded the replay, where, and with whom.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[allow(non_snake_case)]
#[serde(default)]
pub struct BattleMetadata {
    #[serde(deserialize_with = "de_opt_string")]
    pub playerName: Option<String>,
    #[serde(deserialize_with = "de_opt_string")]
    pub mapDisplayName: Option<String>,
    /// Roster in replay order. The order matters when pairing with result lists.
    #[serde(deserialize_with = "de_roster")]
    pub vehicles: Vec<VehicleInfoMeta>,
}

impl BattleMetadata {
    pub fn map_name(&self) -> &str {
        self.mapDisplayName.as_deref().unwrap_or(UNKNOWN_MAP)
    }

    /// The recording player's name, if it is present and non-empty.
    pub fn player_name(&self) -> Option<&str> {
        self.playerName.as_deref().filter(|name| !name.is_empty())
    }

    /// Roster entry of the recording player.
    pub fn self_vehicle(&self) -> Option<&VehicleInfoMeta> {
        let name = self.player_name()?;
        self.vehicles
            .iter()
            .find(|vehicle| vehicle.name.as_deref() == Some(name))
    }

    /// Roster entries on `team`, in roster order.
    pub fn team_roster(&self, team: TeamId) -> impl Iterator<Item = &VehicleInfoMeta> {
        self.vehicles
            .iter()
            .filter(move |vehicle| vehicle.team == Some(team))
    }
}

fn de_roster<'de, D>(deserializer: D) -> std::result::Result<Vec<VehicleInfoMeta>, D::Error>
where
    D: Deserializer<'de>,
{
    let Value::Object(roster) = Value::deserialize(deserializer)? else {
        return Ok(Vec::new());
    };

    Ok(roster
        .into_iter()
        .filter_map(
            |(id, entry)| match serde_json::from_value::<VehicleInfoMeta>(entry) {
                Ok(vehicle) => Some(VehicleInfoMeta { id, ..vehicle }),
                Err(e) => {
                    trace!("dropping roster entry {id}: {e}");
                    None
                }
            },
        )
        .collect())
}

/// The decoded working buffer of one replay file.
#[derive(Debug, Clone)]
pub struct ReplayFile {
    pub data: Vec<u8>,
    /// Whether `data` was inflated from the payload or is the raw file.
    pub compressed: bool,
}

impl ReplayFile {
    pub fn from_file(replayfile: &Path) -> Result<ReplayFile> {
        let contents = std::fs::read(replayfile)?;
        Ok(ReplayFile::from_bytes(contents))
    }

    /// Inflates everything after the header. If that is not a complete zlib
    /// stream the whole file, header included, becomes the buffer.
    pub fn from_bytes(raw: Vec<u8>) -> ReplayFile {
        match inflate(raw.get(HEADER_LEN..).unwrap_or(&[])) {
            Ok(data) => ReplayFile {
                data,
                compressed: true,
            },
            Err(e) => {
                trace!("payload is not a zlib stream ({e}), scanning raw bytes");
                ReplayFile {
                    data: raw,
                    compressed: false,
                }
            }
        }
    }

    pub fn objects(&self) -> EmbeddedObjects<'_> {
        EmbeddedObjects::new(&self.data)
    }
}

/// Inflates a complete zlib stream. Truncated streams are an error, not a
/// short read. Bytes after the end of the stream are ignored.
fn inflate(input: &[u8]) -> io::Result<Vec<u8>> {
    let mut decompress = Decompress::new(true);
    let mut out = Vec::with_capacity(input.len().saturating_mul(4).max(1024));
    loop {
        if out.len() == out.capacity() {
            out.reserve(out.capacity());
        }
        let (total_in, total_out) = (decompress.total_in(), decompress.total_out());
        let status = decompress
            .decompress_vec(&input[total_in as usize..], &mut out, FlushDecompress::Finish)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        match status {
            Status::StreamEnd => return Ok(out),
            _ if decompress.total_in() == total_in && decompress.total_out() == total_out => {
                return Err(io::ErrorKind::UnexpectedEof.into());
            }
            _ => {}
        }
    }
}
