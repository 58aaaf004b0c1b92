//! Per-replay pipeline: classify the embedded objects, correlate metadata with
//! results, and hand the outcome to batch consumers.

#[allow(clippy::module_inception)]
pub mod analyzer;
pub mod aggregate;
pub mod classifier;
pub mod correlator;
pub mod replay_dump;

pub use aggregate::{AggregateEntry, BattleLine, MapTally, StatTotals, StatsAggregator};
pub use analyzer::Analyzer;
pub use classifier::{
    BattleResults, ClassifiedReplay, ObjectClassifier, PersonalResults, PlayerResult, Signature,
    VehicleResults,
};
pub use correlator::{ReplayStats, TeamStatRecord, correlate};
pub use replay_dump::ReplayDump;

use tracing::debug;

use crate::types::StatsMode;
use crate::{Error, ReplayFile, Result};

/// Runs scanning, classification and correlation over one decoded replay.
pub fn parse_replay(replay: &ReplayFile, mode: StatsMode) -> Result<ReplayStats> {
    let mut classifier = ObjectClassifier::new();
    for object in replay.objects() {
        classifier.observe(object);
    }
    if classifier.observed() == 0 {
        return Err(Error::Decode);
    }
    debug!(
        "{} embedded objects in {} bytes (compressed: {})",
        classifier.observed(),
        replay.data.len(),
        replay.compressed
    );

    let classified = classifier.finish(mode)?;
    let stats = correlate(&classified)?;
    debug!(
        "{} ({} mode): {} records, {}",
        stats.map_name,
        stats.mode,
        stats.records.len(),
        stats.outcome
    );
    Ok(stats)
}
