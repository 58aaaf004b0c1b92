//! Battle statistics from World of Tanks replay files.
//!
//! A replay is an 8 byte header followed by a zlib stream (or, for some
//! files, plain bytes) with JSON objects embedded at unknown offsets. The
//! pipeline recovers those objects, picks out the session metadata and the
//! battle results, and turns them into per-player records that an
//! [`analyzer::StatsAggregator`] can fold across many replays.

pub mod analyzer;
mod error;
pub mod scanner;
pub mod types;
mod wotreplay;

#[cfg(test)]
mod testutil;

pub use error::*;
pub use strum;
pub use wotreplay::*;
