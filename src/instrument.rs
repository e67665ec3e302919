//! Call-timing instrumentation for the hot paths of the poller and the
//! query API. Pure observability: nothing here affects control flow, and
//! a caller that never reads [`report`] sees no difference in behavior.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use once_cell::sync::Lazy;
use parking_lot::Mutex;

#[derive(Debug, Clone, Copy, Default)]
pub struct Sample {
    pub calls: u64,
    pub total: Duration,
}

static TABLE: Lazy<Mutex<HashMap<&'static str, Sample>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// RAII guard: records one call's elapsed time against `label` when dropped.
pub struct Watch {
    label: &'static str,
    start: Instant,
}

/// Starts timing a labeled section. Kept deliberately allocation-free so it
/// is cheap enough to leave on the hot path of `Station::poll` and
/// `Farm::query`/`Farm::query_block`.
pub fn watch(label: &'static str) -> Watch {
    Watch {
        label,
        start: Instant::now(),
    }
}

impl Drop for Watch {
    fn drop(&mut self) {
        let elapsed = self.start.elapsed();
        let mut table = TABLE.lock();
        let sample = table.entry(self.label).or_default();
        sample.calls += 1;
        sample.total += elapsed;
    }
}

/// Snapshot of every labeled section observed so far, for an embedding
/// application to log or expose — never consulted by the crate itself.
pub fn report() -> Vec<(&'static str, Sample)> {
    TABLE.lock().iter().map(|(k, v)| (*k, *v)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_records_a_call() {
        let label = "instrument::tests::watch_records_a_call";
        {
            let _w = watch(label);
        }
        let report = report();
        let sample = report.iter().find(|(l, _)| *l == label).unwrap().1;
        assert!(sample.calls >= 1);
    }
}
