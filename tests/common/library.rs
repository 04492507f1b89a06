//! A catalog and a music directory living in one temp dir.

use super::fixtures::{write_corrupt, write_tagged_wav, TrackTags};
use lrc_catalog::catalog_store::{CatalogStore, SqliteCatalogStore};
use lrc_catalog::library::{IndexReport, Library, NoopObserver, ScanOptions};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

#[allow(dead_code)]
pub struct TestLibrary {
    // Kept alive for the lifetime of the test
    _dir: TempDir,
    pub music_dir: PathBuf,
    pub db_path: PathBuf,
    pub store: Arc<SqliteCatalogStore>,
    pub library: Arc<Library>,
}

#[allow(dead_code)]
impl TestLibrary {
    pub fn new() -> Self {
        Self::with_options(ScanOptions::default())
    }

    /// Opens a fresh catalog whose only directory is `music_dir`.
    pub fn with_options(options: ScanOptions) -> Self {
        let dir = TempDir::new().unwrap();
        let music_dir = dir.path().join("music");
        std::fs::create_dir_all(&music_dir).unwrap();
        let db_path = dir.path().join("catalog").join("db.sqlite3");

        let store = Arc::new(SqliteCatalogStore::open(&db_path, 2).unwrap());
        store
            .set_directories(&[music_dir.to_string_lossy().into_owned()])
            .unwrap();
        let library = Arc::new(
            Library::new(store.clone(), Arc::new(NoopObserver), options).unwrap(),
        );

        Self {
            _dir: dir,
            music_dir,
            db_path,
            store,
            library,
        }
    }

    pub fn add_track(&self, relative: &str, tags: &TrackTags<'_>) -> PathBuf {
        let path = self.music_dir.join(relative);
        write_tagged_wav(&path, tags);
        path
    }

    pub fn add_corrupt(&self, relative: &str) -> PathBuf {
        let path = self.music_dir.join(relative);
        write_corrupt(&path);
        path
    }

    pub fn add_file(&self, relative: &str, contents: &str) -> PathBuf {
        let path = self.music_dir.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn index(&self) -> IndexReport {
        self.library
            .initialize_library(&CancellationToken::new())
            .unwrap()
    }
}
