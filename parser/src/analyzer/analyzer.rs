use super::ReplayStats;

/// Consumer of per-replay results across a batch.
pub trait Analyzer {
    fn process(&mut self, replay: &ReplayStats);
    fn finish(&mut self);
}
