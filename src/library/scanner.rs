//! Directory traversal and batched metadata extraction.

use super::ScanError;
use crate::catalog_store::CandidateTrack;
use crate::metadata::{extract, is_audio_file, ExtractionError};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Extraction workers. 1 extracts on the calling thread.
    pub threads: usize,
    /// Files extracted per batch before results are handed back in order.
    pub batch_size: usize,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            threads: 1,
            batch_size: 64,
        }
    }
}

/// Result of a scan that did not persist anything.
#[derive(Debug, Default)]
pub struct ScanOutcome {
    /// In traversal order.
    pub tracks: Vec<CandidateTrack>,
    pub failures: Vec<(PathBuf, String)>,
}

pub struct Scanner {
    pool: Option<rayon::ThreadPool>,
    batch_size: usize,
}

impl Scanner {
    pub fn new(options: &ScanOptions) -> Result<Self, ScanError> {
        let pool = if options.threads > 1 {
            Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(options.threads)
                    .thread_name(|i| format!("scan-{}", i))
                    .build()?,
            )
        } else {
            None
        };
        Ok(Self {
            pool,
            batch_size: options.batch_size.max(1),
        })
    }

    /// Lists audio files under every root, sorted by name within each
    /// directory. A root that cannot be read fails the whole listing;
    /// unreadable entries further down are logged and skipped.
    pub fn collect_audio_files(
        &self,
        roots: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<Vec<PathBuf>, ScanError> {
        let mut files = Vec::new();
        for root in roots {
            let walker = WalkDir::new(root)
                .follow_links(false)
                .sort_by_file_name()
                .into_iter();
            for entry in walker {
                if cancel.is_cancelled() {
                    return Err(ScanError::Cancelled);
                }
                match entry {
                    Ok(entry) => {
                        if entry.file_type().is_file() && is_audio_file(entry.path()) {
                            files.push(entry.into_path());
                        }
                    }
                    Err(err) if err.depth() == 0 => {
                        return Err(ScanError::DirectoryUnreadable {
                            path: root.clone(),
                            source: err,
                        });
                    }
                    Err(err) => {
                        warn!("Skipping unreadable entry under {:?}: {}", root, err);
                    }
                }
            }
        }
        debug!("Found {} audio files under {} roots", files.len(), roots.len());
        Ok(files)
    }

    /// Same traversal and filter as a scan, without extraction.
    pub fn count_files(&self, roots: &[PathBuf]) -> Result<usize, ScanError> {
        Ok(self
            .collect_audio_files(roots, &CancellationToken::new())?
            .len())
    }

    fn extract_batch(&self, files: &[PathBuf]) -> Vec<Result<CandidateTrack, ExtractionError>> {
        match &self.pool {
            Some(pool) => pool.install(|| files.par_iter().map(|p| extract(p)).collect()),
            None => files.iter().map(|p| extract(p)).collect(),
        }
    }

    /// Extracts `files` and hands every result to `sink` in input order.
    /// Cancellation is checked before each file is handed over.
    pub fn for_each_extracted<E, F>(
        &self,
        files: &[PathBuf],
        cancel: &CancellationToken,
        mut sink: F,
    ) -> Result<(), E>
    where
        E: From<ScanError>,
        F: FnMut(&Path, Result<CandidateTrack, ExtractionError>) -> Result<(), E>,
    {
        for batch in files.chunks(self.batch_size) {
            if cancel.is_cancelled() {
                return Err(ScanError::Cancelled.into());
            }
            let results = self.extract_batch(batch);
            for (path, result) in batch.iter().zip(results) {
                if cancel.is_cancelled() {
                    return Err(ScanError::Cancelled.into());
                }
                sink(path, result)?;
            }
        }
        Ok(())
    }

    /// Walks `roots` and extracts every audio file. Per-file failures are
    /// collected, never returned as errors.
    pub fn scan(
        &self,
        roots: &[PathBuf],
        cancel: &CancellationToken,
    ) -> Result<ScanOutcome, ScanError> {
        let files = self.collect_audio_files(roots, cancel)?;
        let mut outcome = ScanOutcome::default();
        self.for_each_extracted(&files, cancel, |path, result| {
            match result {
                Ok(track) => outcome.tracks.push(track),
                Err(err) => {
                    warn!("Skipping {:?}: {}", path, err);
                    outcome.failures.push((path.to_path_buf(), err.to_string()));
                }
            }
            Ok::<(), ScanError>(())
        })?;
        Ok(outcome)
    }
}
