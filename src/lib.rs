//! Music library catalog for an LRC lyrics manager.
//!
//! Scans music directories, reads audio metadata and sidecar lyrics, and
//! keeps a deduplicated artist/album/track catalog in SQLite.

pub mod catalog_store;
pub mod cli_style;
pub mod config;
pub mod library;
pub mod metadata;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{CatalogError, CatalogStore, SqliteCatalogStore};
pub use library::{IndexObserver, Library, LibraryError, LyricsProvider, LyricsResponse};
