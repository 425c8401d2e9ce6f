//! Observable run counters, recorded both as `tracing` fields at
//! stage-completion and as `metrics` crate instruments so a host process can
//! wire in whatever exporter it likes. Purely informational: nothing here
//! feeds back into the pipeline's correctness.

use std::time::Instant;

#[derive(Debug, Default, Clone, Copy)]
pub struct Progress {
    pub batches_processed: u64,
    pub tuples_processed: u64,
    pub bytes_spilled: u64,
    pub bytes_written_to_store: u64,
    pub unique_keys_written: u64,
    pub merge_passes: u64,
}

impl Progress {
    pub fn record_batch(&mut self, tuples: u64) {
        self.batches_processed += 1;
        self.tuples_processed += tuples;
        metrics::counter!("posindex_batches_total").increment(1);
        metrics::counter!("posindex_tuples_total").increment(tuples);
        tracing::info!(batches = self.batches_processed, tuples = self.tuples_processed, "batch processed");
    }

    pub fn record_spill(&mut self, bytes: u64) {
        self.bytes_spilled += bytes;
        metrics::counter!("posindex_bytes_spilled_total").increment(bytes);
        tracing::debug!(bytes, total = self.bytes_spilled, "spill written");
    }

    pub fn record_merge_pass(&mut self) {
        self.merge_passes += 1;
        metrics::counter!("posindex_merge_passes_total").increment(1);
        tracing::debug!(passes = self.merge_passes, "merge pass completed");
    }

    pub fn record_load(&mut self, keys: u64, bytes: u64) {
        self.unique_keys_written += keys;
        self.bytes_written_to_store += bytes;
        metrics::counter!("posindex_keys_written_total").increment(keys);
        metrics::counter!("posindex_bytes_written_total").increment(bytes);
        tracing::info!(keys, bytes, "load batch flushed to store");
    }
}

/// Wall-clock timer for one run, reported on `Drop`-free completion via
/// [`RunTimer::finish`] (explicit rather than `Drop`-based so the elapsed
/// time can be attached to the final summary event).
pub struct RunTimer {
    started: Instant,
}

impl RunTimer {
    pub fn start() -> Self {
        metrics::gauge!("posindex_run_active").set(1.0);
        RunTimer { started: Instant::now() }
    }

    pub fn finish(self, progress: &Progress) {
        let elapsed = self.started.elapsed();
        metrics::gauge!("posindex_run_active").set(0.0);
        tracing::info!(
            elapsed_ms = elapsed.as_millis() as u64,
            batches = progress.batches_processed,
            tuples = progress.tuples_processed,
            keys_written = progress.unique_keys_written,
            merge_passes = progress.merge_passes,
            "run complete"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_accumulate_across_calls() {
        let mut progress = Progress::default();
        progress.record_batch(100);
        progress.record_batch(50);
        assert_eq!(progress.batches_processed, 2);
        assert_eq!(progress.tuples_processed, 150);
    }
}
