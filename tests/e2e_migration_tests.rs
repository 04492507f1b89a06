//! End-to-end tests for opening and upgrading catalog files.

use lrc_catalog::catalog_store::{
    CandidateTrack, CatalogError, CatalogStore, SqliteCatalogStore, ThemeMode,
    CATALOG_MIGRATIONS, CURRENT_CATALOG_VERSION,
};
use rusqlite::Connection;
use std::path::Path;
use tempfile::TempDir;

fn user_version(path: &Path) -> usize {
    let conn = Connection::open(path).unwrap();
    conn.query_row("PRAGMA user_version", [], |r| r.get::<_, i64>(0))
        .unwrap() as usize
}

/// Writes a catalog as an older release would have left it at `version`.
fn create_catalog_at(path: &Path, version: usize) -> Connection {
    let mut conn = Connection::open(path).unwrap();
    for step in CATALOG_MIGRATIONS.iter().filter(|s| s.version <= version) {
        if let Some(outside) = step.outside_transaction {
            outside(&conn).unwrap();
        }
        let tx = conn.transaction().unwrap();
        (step.run)(&tx).unwrap();
        tx.commit().unwrap();
    }
    conn.pragma_update(None, "user_version", version as i64)
        .unwrap();
    conn
}

/// First-generation layout as the desktop app shipped it: every column
/// created up front, loosely typed, in its own order.
const DESKTOP_APP_V1_SCHEMA: &str = "
    CREATE TABLE directories (
        id INTEGER PRIMARY KEY,
        path TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE library_data (
        id INTEGER PRIMARY KEY,
        init BOOLEAN,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE config_data (
        id INTEGER PRIMARY KEY,
        skip_not_needed_tracks BOOLEAN,
        try_embed_lyrics BOOLEAN,
        skip_tracks_with_synced_lyrics BOOLEAN DEFAULT 0,
        skip_tracks_with_plain_lyrics BOOLEAN DEFAULT 0,
        show_line_count BOOLEAN DEFAULT 1,
        theme_mode TEXT DEFAULT 'system',
        lrclib_instance TEXT DEFAULT 'https://lrclib.net',
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE artists (
        id INTEGER PRIMARY KEY,
        name TEXT,
        name_lower TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
    );
    CREATE TABLE albums (
        id INTEGER PRIMARY KEY,
        name TEXT,
        artist_id INTEGER,
        image_path TEXT,
        artist_name TEXT,
        album_artist_name TEXT,
        name_lower TEXT,
        album_artist_name_lower TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY(artist_id) REFERENCES artists(id)
    );
    CREATE TABLE tracks (
        id INTEGER PRIMARY KEY,
        file_path TEXT,
        file_name TEXT,
        title TEXT,
        album_name TEXT,
        artist_name TEXT,
        album_artist_name TEXT,
        album_id INTEGER,
        artist_id INTEGER,
        image_path TEXT,
        track_number INTEGER,
        txt_lyrics TEXT,
        duration FLOAT,
        lrc_lyrics TEXT,
        instrumental BOOLEAN,
        title_lower TEXT,
        created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
        FOREIGN KEY(artist_id) REFERENCES artists(id),
        FOREIGN KEY(album_id) REFERENCES albums(id)
    );
    INSERT INTO library_data (init) VALUES (1);
    INSERT INTO config_data (skip_not_needed_tracks, try_embed_lyrics,
        skip_tracks_with_synced_lyrics, skip_tracks_with_plain_lyrics, show_line_count,
        theme_mode, lrclib_instance)
        VALUES (1, 0, 1, 0, 1, 'system', 'https://lrclib.net');
    INSERT INTO directories (path) VALUES ('/music'), ('/music');
    INSERT INTO artists (name, name_lower) VALUES ('Old', 'old');
    INSERT INTO albums (name, artist_id, artist_name) VALUES ('Record', 1, 'Old');
    INSERT INTO tracks (file_path, file_name, title, album_id, artist_id, duration, instrumental)
        VALUES ('/music/a.mp3', 'a.mp3', 'A', 1, 1, 12.5, 0);
";

fn create_desktop_app_catalog(path: &Path, version: usize) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(DESKTOP_APP_V1_SCHEMA).unwrap();
    conn.pragma_update(None, "user_version", version as i64)
        .unwrap();
}

fn candidate(title: &str) -> CandidateTrack {
    CandidateTrack {
        file_path: format!("/music/{}.mp3", title).into(),
        file_name: format!("{}.mp3", title),
        title: title.to_string(),
        title_lower: title.to_lowercase(),
        album_name: "Record".to_string(),
        artist_name: "Band".to_string(),
        album_artist_name: "Band".to_string(),
        image_path: None,
        track_number: Some(1),
        duration: 180.0,
        plain_lyrics: None,
        synced_lyrics: None,
    }
}

#[test]
fn test_desktop_app_catalogs_open_at_every_version() {
    for version in [1, 3, 5, 7] {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("db.sqlite3");
        create_desktop_app_catalog(&path, version);

        let store = SqliteCatalogStore::open(&path, 1)
            .unwrap_or_else(|e| panic!("version {} failed to open: {}", version, e));
        let report = store.migration_report();
        assert_eq!(report.from_version, version);
        assert_eq!(
            report.applied,
            (version + 1..=CURRENT_CATALOG_VERSION).collect::<Vec<_>>()
        );

        // Scanned rows are dropped and directories deduplicated
        assert_eq!(store.get_directories().unwrap(), vec!["/music".to_string()]);
        let counts = store.counts().unwrap();
        assert_eq!((counts.artists, counts.albums, counts.tracks), (0, 0, 0));
        assert!(!store.get_initialized().unwrap());

        let config = store.get_config().unwrap();
        assert!(config.skip_tracks_with_synced_lyrics);
        assert_eq!(config.theme_mode, ThemeMode::Auto);

        // The upgraded catalog takes new rows and keeps names unique
        let first = store.insert_track(&candidate("one")).unwrap();
        let second = store.insert_track(&candidate("two")).unwrap();
        assert_eq!(first.album_id, second.album_id);
        assert_eq!(store.counts().unwrap().artists, 1);
        drop(store);

        assert_eq!(user_version(&path), CURRENT_CATALOG_VERSION);
        let reopened = SqliteCatalogStore::open(&path, 1).unwrap();
        assert!(reopened.migration_report().is_noop());
    }
}

#[test]
fn test_fresh_catalog_reaches_current_version() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("nested").join("db.sqlite3");

    let store = SqliteCatalogStore::open(&path, 1).unwrap();
    let report = store.migration_report();
    assert_eq!(report.from_version, 0);
    assert_eq!(report.to_version, CURRENT_CATALOG_VERSION);
    assert_eq!(
        report.applied,
        (1..=CURRENT_CATALOG_VERSION).collect::<Vec<_>>()
    );
    drop(store);

    assert_eq!(user_version(&path), CURRENT_CATALOG_VERSION);
}

#[test]
fn test_reopening_current_catalog_is_a_noop() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");

    let first = SqliteCatalogStore::open(&path, 1).unwrap();
    first.set_directories(&["/music".to_string()]).unwrap();
    drop(first);

    let second = SqliteCatalogStore::open(&path, 1).unwrap();
    assert!(second.migration_report().is_noop());
    assert_eq!(second.get_directories().unwrap(), vec!["/music".to_string()]);
}

#[test]
fn test_legacy_catalog_is_upgraded_and_cleared() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");

    let conn = create_catalog_at(&path, 5);
    conn.execute_batch(
        "INSERT INTO directories (path) VALUES ('/music'), ('/music'), ('/podcasts');
         INSERT INTO artists (id, name, name_lower) VALUES (1, 'Old', 'old');
         INSERT INTO albums (id, name, name_lower, artist_id, artist_name)
             VALUES (1, 'Record', 'record', 1, 'Old');
         INSERT INTO tracks (file_path, file_name, title, title_lower, album_id, artist_id)
             VALUES ('/music/a.mp3', 'a.mp3', 'A', 'a', 1, 1);
         UPDATE library_data SET init = 1;",
    )
    .unwrap();
    drop(conn);

    let store = SqliteCatalogStore::open(&path, 1).unwrap();
    let report = store.migration_report();
    assert_eq!(report.from_version, 5);
    assert_eq!(report.applied, vec![6, 7, 8]);

    // Duplicated directory rows collapse, scanned data is dropped
    assert_eq!(
        store.get_directories().unwrap(),
        vec!["/music".to_string(), "/podcasts".to_string()]
    );
    let counts = store.counts().unwrap();
    assert_eq!((counts.artists, counts.albums, counts.tracks), (0, 0, 0));
    assert!(!store.get_initialized().unwrap());

    // The legacy skip flag seeds the synced-lyrics preference
    let config = store.get_config().unwrap();
    assert!(config.skip_tracks_with_synced_lyrics);
    assert!(!config.skip_tracks_with_plain_lyrics);
    assert!(config.show_line_count);
    assert_eq!(config.lrclib_instance, "https://lrclib.net");
}

#[test]
fn test_v7_catalog_only_runs_last_step() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    drop(create_catalog_at(&path, 7));

    let store = SqliteCatalogStore::open(&path, 1).unwrap();
    assert_eq!(store.migration_report().applied, vec![8]);
    assert_eq!(user_version(&path), CURRENT_CATALOG_VERSION);
}

#[test]
fn test_newer_catalog_is_refused() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    let conn = Connection::open(&path).unwrap();
    conn.pragma_update(None, "user_version", 99i64).unwrap();
    drop(conn);

    let err = SqliteCatalogStore::open(&path, 1).err().unwrap();
    assert!(matches!(err, CatalogError::MigrationFailed { .. }));
    // Nothing was rewritten
    assert_eq!(user_version(&path), 99);
}

#[test]
fn test_garbage_file_is_storage_unavailable() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("db.sqlite3");
    std::fs::write(&path, vec![b'x'; 4096]).unwrap();

    let err = SqliteCatalogStore::open(&path, 1).err().unwrap();
    assert!(matches!(err, CatalogError::StorageUnavailable(_)));
    assert!(err.is_retryable());
}

#[test]
fn test_missing_rows_are_not_found_not_unavailable() {
    let dir = TempDir::new().unwrap();
    let store = SqliteCatalogStore::open(dir.path().join("db.sqlite3"), 1).unwrap();

    assert!(matches!(
        store.get_track(404),
        Err(CatalogError::NotFound { .. })
    ));
    assert!(matches!(
        store.get_album(404),
        Err(CatalogError::NotFound { .. })
    ));
    assert!(matches!(
        store.mark_track_instrumental(404),
        Err(CatalogError::NotFound { .. })
    ));
}
