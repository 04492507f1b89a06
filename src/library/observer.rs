use super::IndexReport;
use crate::catalog_store::Track;
use crate::metadata::ExtractionError;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, info};

/// Progress hooks called by [`Library`](super::Library) while indexing.
///
/// All methods default to doing nothing. Calls arrive from the indexing
/// thread, in traversal order.
pub trait IndexObserver: Send + Sync {
    fn scan_started(&self, _total_files: usize) {}

    fn file_indexed(&self, _path: &Path, _track: &Track) {}

    fn file_skipped(&self, _path: &Path, _error: &ExtractionError) {}

    fn scan_finished(&self, _report: &IndexReport) {}
}

pub struct NoopObserver;

impl IndexObserver for NoopObserver {}

/// Logs indexing progress every `every` processed files.
pub struct TracingObserver {
    every: usize,
    total: AtomicUsize,
    processed: AtomicUsize,
}

impl TracingObserver {
    pub fn new(every: usize) -> Self {
        Self {
            every: every.max(1),
            total: AtomicUsize::new(0),
            processed: AtomicUsize::new(0),
        }
    }

    fn tick(&self) {
        let done = self.processed.fetch_add(1, Ordering::Relaxed) + 1;
        if done % self.every == 0 {
            info!(
                "Indexed {}/{} files",
                done,
                self.total.load(Ordering::Relaxed)
            );
        }
    }
}

impl Default for TracingObserver {
    fn default() -> Self {
        Self::new(100)
    }
}

impl IndexObserver for TracingObserver {
    fn scan_started(&self, total_files: usize) {
        self.total.store(total_files, Ordering::Relaxed);
        self.processed.store(0, Ordering::Relaxed);
        info!("Indexing {} audio files", total_files);
    }

    fn file_indexed(&self, path: &Path, track: &Track) {
        debug!("Indexed {:?} as track {}", path, track.id);
        self.tick();
    }

    fn file_skipped(&self, _path: &Path, _error: &ExtractionError) {
        self.tick();
    }

    fn scan_finished(&self, report: &IndexReport) {
        info!(
            "Indexing finished: {} indexed, {} skipped in {}ms",
            report.tracks_indexed,
            report.failures.len(),
            report.elapsed_ms
        );
    }
}
