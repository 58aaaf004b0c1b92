use std::io::Write;

use tracing::warn;

use super::ReplayStats;
use super::analyzer::Analyzer;

/// Writes every replay's result as one JSON line.
pub struct ReplayDump<W: Write> {
    output: W,
    written: usize,
}

impl<W: Write> ReplayDump<W> {
    pub fn new(output: W) -> Self {
        Self { output, written: 0 }
    }

    /// Lines written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    pub fn into_inner(self) -> W {
        self.output
    }

    fn write_line(&mut self, replay: &ReplayStats) -> std::io::Result<()> {
        serde_json::to_writer(&mut self.output, replay)?;
        self.output.write_all(b"\n")
    }
}

impl<W: Write> Analyzer for ReplayDump<W> {
    fn finish(&mut self) {
        if let Err(e) = self.output.flush() {
            warn!("failed to flush replay dump: {e}");
        }
    }

    fn process(&mut self, replay: &ReplayStats) {
        match self.write_line(replay) {
            Ok(()) => self.written += 1,
            Err(e) => warn!("failed to write replay dump line: {e}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::TeamStatRecord;
    use crate::types::{Outcome, StatsMode};

    #[test]
    fn one_line_per_replay() {
        let replay = ReplayStats {
            map_name: "Mines".into(),
            mode: StatsMode::Personal,
            outcome: Outcome::Win,
            records: vec![TeamStatRecord {
                name: "Ace".into(),
                tank: "R04_T-34".into(),
                damage: 10,
                kills: 0,
                assisted_damage: 5,
                survived: Some(false),
                outcome: Some(Outcome::Win),
            }],
        };

        let mut dump = ReplayDump::new(Vec::new());
        dump.process(&replay);
        dump.process(&replay);
        dump.finish();
        assert_eq!(dump.written(), 2);

        let text = String::from_utf8(dump.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(
            lines[0],
            r#"{"map_name":"Mines","mode":"personal","outcome":"win","records":[{"name":"Ace","tank":"R04_T-34","damage":10,"kills":0,"assisted_damage":5,"survived":false,"outcome":"win"}]}"#
        );
    }
}
