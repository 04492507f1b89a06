//! Library indexing: walking configured directories, extracting metadata and
//! persisting the resulting tracks, plus applying downloaded lyrics.

mod indexer;
mod lyrics;
mod observer;
mod scanner;

pub use indexer::{IndexReport, InitializeHandle, Library};
pub use lyrics::{plain_from_synced, LyricsOutcome, LyricsProvider, LyricsQuery, LyricsResponse};
pub use observer::{IndexObserver, NoopObserver, TracingObserver};
pub use scanner::{ScanOptions, ScanOutcome, Scanner};

use crate::catalog_store::CatalogError;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Cannot read directory {path:?}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("Scan cancelled")]
    Cancelled,

    #[error("Cannot start extraction workers: {0}")]
    WorkerPool(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Debug, Error)]
pub enum LibraryError {
    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Scan(#[from] ScanError),

    #[error("Lyrics provider failed: {0}")]
    Provider(#[source] anyhow::Error),

    #[error("Background indexing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl LibraryError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, LibraryError::Scan(ScanError::Cancelled))
    }
}
