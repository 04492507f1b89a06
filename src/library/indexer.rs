use super::observer::IndexObserver;
use super::scanner::{ScanOptions, Scanner};
use super::LibraryError;
use crate::catalog_store::{
    Album, Artist, CatalogCounts, CatalogStore, Config, Track, TrackFilter,
};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Summary of one indexing pass.
#[derive(Debug, Clone, Default, Serialize)]
pub struct IndexReport {
    pub files_found: usize,
    pub tracks_indexed: usize,
    /// Files that could not be read, with the reason.
    pub failures: Vec<(PathBuf, String)>,
    pub elapsed_ms: u64,
}

/// A background indexing run started with [`Library::spawn_initialize`].
pub struct InitializeHandle {
    cancel: CancellationToken,
    join: JoinHandle<Result<IndexReport, LibraryError>>,
}

impl InitializeHandle {
    /// Asks the run to stop before its next file. The initialized flag stays
    /// untouched when the run stops early.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    pub async fn wait(self) -> Result<IndexReport, LibraryError> {
        self.join.await?
    }
}

/// The music library: configured directories, the indexing engine and the
/// catalog it fills.
pub struct Library {
    store: Arc<dyn CatalogStore>,
    observer: Arc<dyn IndexObserver>,
    scanner: Scanner,
}

impl Library {
    pub fn new(
        store: Arc<dyn CatalogStore>,
        observer: Arc<dyn IndexObserver>,
        options: ScanOptions,
    ) -> Result<Self, LibraryError> {
        Ok(Self {
            store,
            observer,
            scanner: Scanner::new(&options)?,
        })
    }

    pub fn store(&self) -> &Arc<dyn CatalogStore> {
        &self.store
    }

    fn directory_paths(&self) -> Result<Vec<PathBuf>, LibraryError> {
        Ok(self
            .store
            .get_directories()?
            .into_iter()
            .map(PathBuf::from)
            .collect())
    }

    // =========================================================================
    // Indexing
    // =========================================================================

    /// Number of audio files under the configured directories.
    pub fn count_files(&self) -> Result<usize, LibraryError> {
        let roots = self.directory_paths()?;
        Ok(self.scanner.count_files(&roots)?)
    }

    /// Scans every configured directory and inserts one track per readable
    /// audio file, in traversal order, then marks the library initialized.
    ///
    /// Unreadable files are skipped and reported. A storage error, an
    /// unreadable root directory or cancellation aborts the run and leaves
    /// the initialized flag as it was; tracks inserted before the abort stay.
    pub fn initialize_library(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, LibraryError> {
        let started = Instant::now();
        let roots = self.directory_paths()?;
        let files = self.scanner.collect_audio_files(&roots, cancel)?;
        info!(
            "Initializing library from {} directories, {} audio files",
            roots.len(),
            files.len()
        );
        self.observer.scan_started(files.len());

        let mut report = IndexReport {
            files_found: files.len(),
            ..Default::default()
        };
        let outcome = self
            .scanner
            .for_each_extracted(&files, cancel, |path, result| {
                match result {
                    Ok(candidate) => {
                        let track = self.store.insert_track(&candidate)?;
                        report.tracks_indexed += 1;
                        self.observer.file_indexed(path, &track);
                    }
                    Err(err) => {
                        warn!("Skipping {:?}: {}", path, err);
                        self.observer.file_skipped(path, &err);
                        report.failures.push((path.to_path_buf(), err.to_string()));
                    }
                }
                Ok::<(), LibraryError>(())
            });
        if let Err(err) = outcome {
            if err.is_cancelled() {
                warn!(
                    "Library initialization cancelled after {} tracks",
                    report.tracks_indexed
                );
            }
            return Err(err);
        }

        self.store.set_initialized(true)?;
        report.elapsed_ms = started.elapsed().as_millis() as u64;
        self.observer.scan_finished(&report);
        Ok(report)
    }

    /// Runs [`initialize_library`](Self::initialize_library) on the blocking
    /// thread pool. Must be called from within a tokio runtime.
    pub fn spawn_initialize(self: &Arc<Self>) -> InitializeHandle {
        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let library = Arc::clone(self);
        let join = tokio::task::spawn_blocking(move || library.initialize_library(&token));
        InitializeHandle { cancel, join }
    }

    /// Drops every track, album and artist and indexes from scratch.
    pub fn rescan_library(
        &self,
        cancel: &CancellationToken,
    ) -> Result<IndexReport, LibraryError> {
        info!("Clearing catalog for a full rescan");
        self.store.clear_catalog()?;
        self.initialize_library(cancel)
    }

    // =========================================================================
    // Library State
    // =========================================================================

    pub fn directories(&self) -> Result<Vec<String>, LibraryError> {
        Ok(self.store.get_directories()?)
    }

    pub fn set_directories(&self, directories: &[String]) -> Result<(), LibraryError> {
        Ok(self.store.set_directories(directories)?)
    }

    pub fn is_initialized(&self) -> Result<bool, LibraryError> {
        Ok(self.store.get_initialized()?)
    }

    pub fn set_initialized(&self, initialized: bool) -> Result<(), LibraryError> {
        Ok(self.store.set_initialized(initialized)?)
    }

    pub fn config(&self) -> Result<Config, LibraryError> {
        Ok(self.store.get_config()?)
    }

    pub fn update_config(&self, config: &Config) -> Result<(), LibraryError> {
        Ok(self.store.update_config(config)?)
    }

    pub fn counts(&self) -> Result<CatalogCounts, LibraryError> {
        Ok(self.store.counts()?)
    }

    // =========================================================================
    // Catalog
    // =========================================================================

    pub fn tracks(&self, filter: TrackFilter) -> Result<Vec<Track>, LibraryError> {
        Ok(self.store.list_tracks(filter)?)
    }

    pub fn track(&self, id: i64) -> Result<Track, LibraryError> {
        Ok(self.store.get_track(id)?)
    }

    pub fn search_tracks(&self, query: &str) -> Result<Vec<Track>, LibraryError> {
        Ok(self.store.search_tracks(query)?)
    }

    /// Tracks worth a lyrics lookup under the stored skip preferences.
    pub fn tracks_needing_lyrics(&self) -> Result<Vec<Track>, LibraryError> {
        let config = self.store.get_config()?;
        Ok(self.store.list_tracks_needing_lyrics(&config)?)
    }

    pub fn albums(&self) -> Result<Vec<Album>, LibraryError> {
        Ok(self.store.list_albums()?)
    }

    pub fn album(&self, id: i64) -> Result<Album, LibraryError> {
        Ok(self.store.get_album(id)?)
    }

    pub fn artists(&self) -> Result<Vec<Artist>, LibraryError> {
        Ok(self.store.list_artists()?)
    }

    pub fn artist(&self, id: i64) -> Result<Artist, LibraryError> {
        Ok(self.store.get_artist(id)?)
    }
}
