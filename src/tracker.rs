//! Statistics tracking for a translation job.
//!
//! Counts batches, entries and service calls as they complete so the
//! progress bar and the final report read from a single place.

use crate::processor::BatchOutcome;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

/// Statistics tracker for one worker.
#[derive(Debug)]
pub struct StatsTracker {
    /// Start time of processing.
    start_time: Instant,
    /// Batches finished.
    batches: AtomicU64,
    /// Batches that received a translation.
    translated_batches: AtomicU64,
    /// Batches kept untranslated.
    passthrough_batches: AtomicU64,
    /// Entries finished.
    entries: AtomicUsize,
    /// Completion calls made.
    calls: AtomicU64,
    /// Generic-failure retries.
    retries: AtomicU64,
    /// Credential rotations.
    rotations: AtomicU64,
    /// Entries the job has to process.
    total_entries: AtomicUsize,
}

impl StatsTracker {
    /// Create a new statistics tracker.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            batches: AtomicU64::new(0),
            translated_batches: AtomicU64::new(0),
            passthrough_batches: AtomicU64::new(0),
            entries: AtomicUsize::new(0),
            calls: AtomicU64::new(0),
            retries: AtomicU64::new(0),
            rotations: AtomicU64::new(0),
            total_entries: AtomicUsize::new(0),
        }
    }

    /// Set the number of entries the job has to process.
    pub fn set_total_entries(&self, total: usize) {
        self.total_entries.store(total, Ordering::Relaxed);
    }

    /// Record a finished batch of `size` entries.
    pub fn record_batch(&self, size: usize, outcome: &BatchOutcome) {
        self.batches.fetch_add(1, Ordering::Relaxed);
        if outcome.translation.is_translated() {
            self.translated_batches.fetch_add(1, Ordering::Relaxed);
        } else {
            self.passthrough_batches.fetch_add(1, Ordering::Relaxed);
        }
        self.entries.fetch_add(size, Ordering::Relaxed);
        self.calls
            .fetch_add(u64::from(outcome.calls), Ordering::Relaxed);
        self.retries
            .fetch_add(u64::from(outcome.retries), Ordering::Relaxed);
        self.rotations
            .fetch_add(u64::from(outcome.rotations), Ordering::Relaxed);
    }

    /// Get the current statistics snapshot.
    pub fn snapshot(&self) -> StatsSnapshot {
        let elapsed = self.start_time.elapsed();
        let entries = self.entries.load(Ordering::Relaxed);
        let total_entries = self.total_entries.load(Ordering::Relaxed);

        let entries_per_minute = if elapsed.as_secs_f64() > 0.0 {
            entries as f64 / elapsed.as_secs_f64() * 60.0
        } else {
            0.0
        };

        StatsSnapshot {
            elapsed,
            batches: self.batches.load(Ordering::Relaxed),
            translated_batches: self.translated_batches.load(Ordering::Relaxed),
            passthrough_batches: self.passthrough_batches.load(Ordering::Relaxed),
            entries,
            total_entries,
            calls: self.calls.load(Ordering::Relaxed),
            retries: self.retries.load(Ordering::Relaxed),
            rotations: self.rotations.load(Ordering::Relaxed),
            entries_per_minute,
        }
    }
}

impl Default for StatsTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// A snapshot of current statistics.
#[derive(Debug, Clone, PartialEq)]
pub struct StatsSnapshot {
    /// Elapsed time since start.
    pub elapsed: Duration,
    /// Batches finished.
    pub batches: u64,
    /// Batches that received a translation.
    pub translated_batches: u64,
    /// Batches kept untranslated.
    pub passthrough_batches: u64,
    /// Entries finished.
    pub entries: usize,
    /// Entries the job has to process.
    pub total_entries: usize,
    /// Completion calls made.
    pub calls: u64,
    /// Generic-failure retries.
    pub retries: u64,
    /// Credential rotations.
    pub rotations: u64,
    /// Throughput over the whole run.
    pub entries_per_minute: f64,
}

impl StatsSnapshot {
    /// Share of batches that were translated, as a percentage.
    pub fn translated_rate(&self) -> f64 {
        if self.batches > 0 {
            (self.translated_batches as f64 / self.batches as f64) * 100.0
        } else {
            100.0
        }
    }

    /// Get the estimated time remaining.
    pub fn eta(&self) -> Option<Duration> {
        if self.entries_per_minute > 0.0 && self.total_entries > 0 {
            let remaining = self.total_entries.saturating_sub(self.entries);
            let seconds = remaining as f64 / self.entries_per_minute * 60.0;
            Some(Duration::from_secs_f64(seconds))
        } else {
            None
        }
    }

    /// Format as a one-line summary for the progress bar.
    pub fn summary(&self) -> String {
        format!(
            "ok: {} | passthrough: {} | retries: {} | key switches: {}",
            self.translated_batches, self.passthrough_batches, self.retries, self.rotations
        )
    }
}
