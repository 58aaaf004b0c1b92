use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use walkdir::WalkDir;

use wot_replays::ReplayFile;
use wot_replays::analyzer::{Analyzer, ReplayStats, parse_replay};
use wot_replays::types::StatsMode;

pub const REPLAY_EXTENSION: &str = "wotreplay";

/// What happened to the files of one batch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub found: usize,
    pub parsed: usize,
    /// Skipped files by error kind.
    pub skipped: BTreeMap<&'static str, usize>,
}

/// Replay files directly inside `dir`, sorted by path.
pub fn replay_paths(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
        let entry =
            entry.with_context(|| format!("failed to list replays in {}", dir.display()))?;
        let is_replay = entry
            .path()
            .extension()
            .is_some_and(|ext| ext == REPLAY_EXTENSION);
        if entry.file_type().is_file() && is_replay {
            paths.push(entry.into_path());
        }
    }
    paths.sort();
    Ok(paths)
}

pub fn process_replay(path: &Path, mode: StatsMode) -> wot_replays::Result<ReplayStats> {
    let replay = ReplayFile::from_file(path)?;
    parse_replay(&replay, mode)
}

/// Feeds every replay that correlates to each analyzer, in path order.
/// Files that fail are logged and counted, never fatal.
pub fn run(paths: &[PathBuf], mode: StatsMode, analyzers: &mut [&mut dyn Analyzer]) -> BatchSummary {
    let mut summary = BatchSummary {
        found: paths.len(),
        ..Default::default()
    };

    for path in paths {
        match process_replay(path, mode) {
            Ok(stats) => {
                summary.parsed += 1;
                for analyzer in analyzers.iter_mut() {
                    analyzer.process(&stats);
                }
            }
            Err(e) => {
                warn!("skipping {}: {e}", path.display());
                *summary.skipped.entry(e.kind_name()).or_default() += 1;
            }
        }
    }

    for analyzer in analyzers.iter_mut() {
        analyzer.finish();
    }

    info!(
        "{mode} mode: {} replays found, {} parsed, {} skipped",
        summary.found,
        summary.parsed,
        summary.found - summary.parsed
    );
    summary
}
