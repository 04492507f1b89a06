//! Versioned, additive evolution of the catalog schema.
//!
//! The schema version lives in `PRAGMA user_version`. A catalog at version
//! `n` receives every step whose version is greater than `n`, one step per
//! transaction, in table order. Steps only create tables and indices or
//! append columns; a step that changes what existing rows mean clears the
//! derived catalog tables and resets the initialized flag so the next
//! startup re-scans.

use super::errors::{CatalogError, CatalogResult};
use super::schema::*;
use crate::sqlite_persistence::{
    add_column, create_index, read_user_version, validate_tables, write_user_version,
    ColumnMatch, DEFAULT_TIMESTAMP,
};
use anyhow::{anyhow, Result};
use rusqlite::{params, Connection};
use serde::Serialize;
use tracing::{debug, info};

pub const CURRENT_CATALOG_VERSION: usize = 8;

pub struct MigrationStep {
    /// Version the catalog is at once this step commits.
    pub version: usize,
    pub description: &'static str,
    /// Runs before the step's transaction opens, for statements SQLite
    /// refuses inside one.
    pub outside_transaction: Option<fn(&Connection) -> Result<()>>,
    pub run: fn(&Connection) -> Result<()>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationReport {
    pub from_version: usize,
    pub to_version: usize,
    pub applied: Vec<usize>,
}

impl MigrationReport {
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Drops everything derived from a scan and marks the library
/// uninitialized.
fn clear_scanned_catalog(conn: &Connection) -> Result<()> {
    conn.execute("DELETE FROM tracks", [])?;
    conn.execute("DELETE FROM albums", [])?;
    conn.execute("DELETE FROM artists", [])?;
    conn.execute("UPDATE library_data SET init = 0", [])?;
    Ok(())
}

/// Fills a shadow column with the Unicode lowercase of its source.
fn backfill_lowercase(conn: &Connection, table: &str, source: &str, target: &str) -> Result<()> {
    let rows: Vec<(i64, Option<String>)> = {
        let mut stmt = conn.prepare(&format!("SELECT id, {} FROM {}", source, table))?;
        let rows = stmt
            .query_map([], |r| Ok((r.get(0)?, r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        rows
    };
    let mut update = conn.prepare(&format!("UPDATE {} SET {} = ?1 WHERE id = ?2", table, target))?;
    for (id, value) in rows {
        update.execute(params![value.map(|v| v.to_lowercase()), id])?;
    }
    Ok(())
}

// =============================================================================
// Steps
// =============================================================================

fn enable_wal(conn: &Connection) -> Result<()> {
    conn.pragma_update(None, "journal_mode", "WAL")?;
    Ok(())
}

fn migrate_v0_to_v1(conn: &Connection) -> Result<()> {
    for table in TABLES_V1 {
        table.create(conn)?;
    }
    conn.execute(
        "INSERT OR IGNORE INTO library_data (id, init) VALUES (1, 0)",
        [],
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO config_data (id, skip_not_needed_tracks, try_embed_lyrics) VALUES (1, 1, 0)",
        [],
    )?;
    Ok(())
}

fn migrate_v1_to_v2(conn: &Connection) -> Result<()> {
    add_column(conn, "tracks", &TRACKS_TXT_LYRICS)?;
    create_index(conn, "idx_tracks_title", "tracks", "title", false)?;
    create_index(conn, "idx_albums_name", "albums", "name", false)?;
    create_index(conn, "idx_artists_name", "artists", "name", false)?;
    Ok(())
}

fn migrate_v2_to_v3(conn: &Connection) -> Result<()> {
    add_column(conn, "tracks", &TRACKS_INSTRUMENTAL)
}

fn migrate_v3_to_v4(conn: &Connection) -> Result<()> {
    add_column(conn, "tracks", &TRACKS_TITLE_LOWER)?;
    add_column(conn, "albums", &NAME_LOWER)?;
    add_column(conn, "artists", &NAME_LOWER)?;

    backfill_lowercase(conn, "tracks", "title", "title_lower")?;
    backfill_lowercase(conn, "albums", "name", "name_lower")?;
    backfill_lowercase(conn, "artists", "name", "name_lower")?;

    create_index(conn, "idx_tracks_title_lower", "tracks", "title_lower", false)?;
    create_index(conn, "idx_albums_name_lower", "albums", "name_lower", false)?;
    create_index(conn, "idx_artists_name_lower", "artists", "name_lower", false)?;
    Ok(())
}

fn migrate_v4_to_v5(conn: &Connection) -> Result<()> {
    add_column(conn, "tracks", &TRACKS_TRACK_NUMBER)?;
    add_column(conn, "tracks", &ALBUM_ARTIST_NAME)?;
    add_column(conn, "albums", &ALBUM_ARTIST_NAME)?;
    add_column(conn, "albums", &ALBUMS_ALBUM_ARTIST_NAME_LOWER)?;
    add_column(conn, "config_data", &CONFIG_THEME_MODE)?;
    add_column(conn, "config_data", &CONFIG_LRCLIB_INSTANCE)?;
    create_index(
        conn,
        "idx_albums_album_artist_name_lower",
        "albums",
        "album_artist_name_lower",
        false,
    )?;
    create_index(conn, "idx_tracks_track_number", "tracks", "track_number", false)?;
    // Album grouping now depends on album artist, old rows are stale
    clear_scanned_catalog(conn)
}

fn migrate_v5_to_v6(conn: &Connection) -> Result<()> {
    add_column(conn, "config_data", &CONFIG_SKIP_SYNCED)?;
    add_column(conn, "config_data", &CONFIG_SKIP_PLAIN)?;
    conn.execute(
        "UPDATE config_data SET skip_tracks_with_synced_lyrics = skip_not_needed_tracks",
        [],
    )?;

    for table in TIMESTAMPED_TABLES {
        add_column(conn, table, &CREATED_AT)?;
        add_column(conn, table, &UPDATED_AT)?;
        conn.execute(
            &format!(
                "UPDATE {} SET created_at = {ts}, updated_at = {ts}",
                table,
                ts = DEFAULT_TIMESTAMP
            ),
            [],
        )?;
    }
    Ok(())
}

fn migrate_v6_to_v7(conn: &Connection) -> Result<()> {
    add_column(conn, "config_data", &CONFIG_SHOW_LINE_COUNT)
}

fn migrate_v7_to_v8(conn: &Connection) -> Result<()> {
    conn.execute(
        "DELETE FROM directories WHERE id NOT IN (SELECT MIN(id) FROM directories GROUP BY path)",
        [],
    )?;
    // Existing rows may hold duplicates the unique indices would reject
    clear_scanned_catalog(conn)?;

    create_index(conn, "idx_directories_path_unique", "directories", "path", true)?;
    create_index(conn, "idx_artists_name_unique", "artists", "name", true)?;
    create_index(
        conn,
        "idx_albums_name_artist_unique",
        "albums",
        "name, artist_id",
        true,
    )?;
    // Catalogs written by other tools may lack earlier indices
    for table in CATALOG_TABLES {
        for (index_name, columns) in table.indices {
            create_index(conn, index_name, table.name, columns, false)?;
        }
    }
    Ok(())
}

/// Every step ever shipped, oldest first. Append only.
pub const CATALOG_MIGRATIONS: &[MigrationStep] = &[
    MigrationStep {
        version: 1,
        description: "initial tables",
        outside_transaction: Some(enable_wal),
        run: migrate_v0_to_v1,
    },
    MigrationStep {
        version: 2,
        description: "plain lyrics column and name indices",
        outside_transaction: None,
        run: migrate_v1_to_v2,
    },
    MigrationStep {
        version: 3,
        description: "instrumental flag",
        outside_transaction: None,
        run: migrate_v2_to_v3,
    },
    MigrationStep {
        version: 4,
        description: "lowercase shadow columns",
        outside_transaction: None,
        run: migrate_v3_to_v4,
    },
    MigrationStep {
        version: 5,
        description: "track numbers, album artists, theme and lyrics instance",
        outside_transaction: None,
        run: migrate_v4_to_v5,
    },
    MigrationStep {
        version: 6,
        description: "split skip preferences and row timestamps",
        outside_transaction: None,
        run: migrate_v5_to_v6,
    },
    MigrationStep {
        version: 7,
        description: "line count preference",
        outside_transaction: None,
        run: migrate_v6_to_v7,
    },
    MigrationStep {
        version: 8,
        description: "unique natural keys",
        outside_transaction: None,
        run: migrate_v7_to_v8,
    },
];

// =============================================================================
// Driver
// =============================================================================

fn step_failed(version: usize) -> impl Fn(anyhow::Error) -> CatalogError {
    move |source| CatalogError::MigrationFailed { version, source }
}

/// Brings the catalog up to [`CURRENT_CATALOG_VERSION`].
pub fn migrate(conn: &mut Connection) -> CatalogResult<MigrationReport> {
    migrate_with(conn, CATALOG_MIGRATIONS)
}

fn migrate_with(conn: &mut Connection, steps: &[MigrationStep]) -> CatalogResult<MigrationReport> {
    let from_version = read_user_version(conn)
        .map_err(|e| CatalogError::StorageUnavailable(format!("{:#}", e)))?;
    let target = steps.last().map(|s| s.version).unwrap_or(0);

    if from_version > target {
        return Err(CatalogError::MigrationFailed {
            version: from_version,
            source: anyhow!(
                "catalog is at version {} but this build only knows up to {}",
                from_version,
                target
            ),
        });
    }

    let mut applied = Vec::new();
    let mut current = from_version;
    for step in steps.iter().filter(|s| s.version > from_version) {
        info!(
            "Migrating catalog db from version {} to {} ({})",
            current, step.version, step.description
        );
        if let Some(outside) = step.outside_transaction {
            outside(conn).map_err(step_failed(step.version))?;
        }

        let tx = conn
            .transaction()
            .map_err(|e| step_failed(step.version)(e.into()))?;
        (step.run)(&tx).map_err(step_failed(step.version))?;
        write_user_version(&tx, step.version).map_err(step_failed(step.version))?;
        tx.commit()
            .map_err(|e| step_failed(step.version)(e.into()))?;

        current = step.version;
        applied.push(step.version);
    }

    if applied.is_empty() {
        debug!("Catalog db already at version {}", current);
    }

    if !cfg!(feature = "no_checks") && target == CURRENT_CATALOG_VERSION {
        // Only a catalog built here from scratch has the exact declared layout
        let column_match = if from_version == 0 {
            ColumnMatch::Exact
        } else {
            ColumnMatch::Compatible
        };
        validate_tables(conn, CATALOG_TABLES, column_match).map_err(step_failed(current))?;
    }

    Ok(MigrationReport {
        from_version,
        to_version: current,
        applied,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn version(conn: &Connection) -> usize {
        read_user_version(conn).unwrap()
    }

    #[test]
    fn steps_are_contiguous_and_end_at_current_version() {
        for (index, step) in CATALOG_MIGRATIONS.iter().enumerate() {
            assert_eq!(step.version, index + 1);
        }
        assert_eq!(
            CATALOG_MIGRATIONS.last().unwrap().version,
            CURRENT_CATALOG_VERSION
        );
    }

    #[test]
    fn fresh_database_reaches_current_version() {
        let mut conn = Connection::open_in_memory().unwrap();
        let report = migrate(&mut conn).unwrap();

        assert_eq!(report.from_version, 0);
        assert_eq!(report.to_version, CURRENT_CATALOG_VERSION);
        assert_eq!(report.applied, (1..=CURRENT_CATALOG_VERSION).collect::<Vec<_>>());
        assert_eq!(version(&conn), CURRENT_CATALOG_VERSION);

        let init: i64 = conn
            .query_row("SELECT init FROM library_data WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(init, 0);
    }

    #[test]
    fn second_run_is_a_noop() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate(&mut conn).unwrap();
        let report = migrate(&mut conn).unwrap();
        assert!(report.is_noop());
        assert_eq!(version(&conn), CURRENT_CATALOG_VERSION);
    }

    #[test]
    fn newer_catalog_is_refused() {
        let mut conn = Connection::open_in_memory().unwrap();
        write_user_version(&conn, CURRENT_CATALOG_VERSION + 1).unwrap();
        let err = migrate(&mut conn).unwrap_err();
        assert!(matches!(
            err,
            CatalogError::MigrationFailed { version, .. } if version == CURRENT_CATALOG_VERSION + 1
        ));
    }

    #[test]
    fn v4_backfills_lowercase_shadows() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_with(&mut conn, &CATALOG_MIGRATIONS[..3]).unwrap();
        conn.execute("INSERT INTO artists (id, name) VALUES (1, 'ÉLAN Vital')", [])
            .unwrap();

        migrate_with(&mut conn, &CATALOG_MIGRATIONS[..4]).unwrap();
        let lower: String = conn
            .query_row("SELECT name_lower FROM artists WHERE id = 1", [], |r| r.get(0))
            .unwrap();
        assert_eq!(lower, "élan vital");
    }

    #[test]
    fn v5_indexes_track_numbers() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_with(&mut conn, &CATALOG_MIGRATIONS[..5]).unwrap();
        let exists: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master
                 WHERE type = 'index' AND name = 'idx_tracks_track_number'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(exists, 1);
    }

    #[test]
    fn v6_carries_legacy_skip_preference() {
        let mut conn = Connection::open_in_memory().unwrap();
        migrate_with(&mut conn, &CATALOG_MIGRATIONS[..5]).unwrap();
        conn.execute("UPDATE config_data SET skip_not_needed_tracks = 1", [])
            .unwrap();

        migrate(&mut conn).unwrap();
        let (synced, plain, created): (bool, bool, Option<i64>) = conn
            .query_row(
                "SELECT skip_tracks_with_synced_lyrics, skip_tracks_with_plain_lyrics, created_at
                 FROM config_data WHERE id = 1",
                [],
                |r| Ok((r.get(0)?, r.get(1)?, r.get(2)?)),
            )
            .unwrap();
        assert!(synced);
        assert!(!plain);
        assert!(created.is_some());
    }

    #[test]
    fn failing_step_rolls_back_and_keeps_version() {
        fn broken(conn: &Connection) -> Result<()> {
            conn.execute("CREATE TABLE half_done (id INTEGER)", [])?;
            conn.execute("THIS IS NOT SQL", [])?;
            Ok(())
        }
        let steps = [
            MigrationStep {
                version: 1,
                description: "initial tables",
                outside_transaction: None,
                run: migrate_v0_to_v1,
            },
            MigrationStep {
                version: 2,
                description: "broken",
                outside_transaction: None,
                run: broken,
            },
        ];

        let mut conn = Connection::open_in_memory().unwrap();
        let err = migrate_with(&mut conn, &steps).unwrap_err();
        assert!(matches!(err, CatalogError::MigrationFailed { version: 2, .. }));
        assert_eq!(version(&conn), 1);

        let half_done: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE name = 'half_done'",
                [],
                |r| r.get(0),
            )
            .unwrap();
        assert_eq!(half_done, 0);
    }
}
