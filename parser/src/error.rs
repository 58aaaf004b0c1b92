use thiserror::Error;

/// Why a replay contributed no statistics.
#[derive(Debug, Error)]
pub enum Error {
    #[error("failed to read replay: {0}")]
    Io(#[from] std::io::Error),

    /// Neither the decompressed payload nor the raw bytes held any embedded object.
    #[error("no embedded objects found in replay data")]
    Decode,

    #[error("could not classify replay: {0}")]
    Classification(#[from] ClassificationError),

    /// A balanced candidate span that is not a JSON object. The scanner drops these.
    #[error("malformed embedded object at offset {offset}: {source}")]
    MalformedEmbeddedObject {
        offset: usize,
        source: serde_json::Error,
    },
}

impl Error {
    /// Stable short name, used to tally skipped replays.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::Io(_) => "io",
            Error::Decode => "decode",
            Error::Classification(_) => "classification",
            Error::MalformedEmbeddedObject { .. } => "malformed_embedded_object",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassificationError {
    #[error("no battle metadata object found")]
    MissingMetadata,

    #[error("no battle results object found")]
    MissingResults,

    #[error("metadata has no player name")]
    MissingPlayerName,

    #[error("player {0:?} is not in the metadata roster")]
    PlayerNotInRoster(String),

    #[error("player {0:?} has no team in the metadata roster")]
    MissingTeam(String),

    #[error("personal block holds no result record")]
    MissingPersonalRecord,
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_names() {
        let io = Error::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "missing",
        ));
        assert_eq!(io.kind_name(), "io");
        assert_eq!(Error::Decode.kind_name(), "decode");
        assert_eq!(
            Error::from(ClassificationError::MissingResults).kind_name(),
            "classification"
        );
    }

    #[test]
    fn classification_message_names_player() {
        let err = Error::from(ClassificationError::PlayerNotInRoster("Ace".into()));
        assert_eq!(
            err.to_string(),
            "could not classify replay: player \"Ace\" is not in the metadata roster"
        );
    }
}
