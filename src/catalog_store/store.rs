//! SQLite-backed catalog store.
//!
//! One write connection and a small pool of read-only connections share a
//! single database file in WAL mode. A `RwLock<()>` is taken around every
//! operation: shared for reads, exclusive for writes, held until the
//! statements (or the transaction) finish.

use super::errors::{CatalogError, CatalogResult};
use super::migration::{migrate, MigrationReport};
use super::models::*;
use super::resolver;
use super::trait_def::CatalogStore;
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Row};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_READ_POOL_SIZE: usize = 4;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const TRACK_COLUMNS: &str = "t.id, t.file_path, t.file_name, t.title, t.title_lower,
    t.album_name, t.album_artist_name, t.album_id, t.artist_name, t.artist_id, t.image_path,
    t.track_number, t.duration, t.txt_lyrics, t.lrc_lyrics, t.instrumental,
    t.created_at, t.updated_at";

const ALBUM_SELECT: &str = "SELECT a.id, a.name, a.name_lower, a.artist_id, a.artist_name,
    a.album_artist_name, a.album_artist_name_lower, a.image_path, COUNT(t.id),
    a.created_at, a.updated_at
    FROM albums a LEFT JOIN tracks t ON t.album_id = a.id";

const ARTIST_SELECT: &str = "SELECT a.id, a.name, a.name_lower, COUNT(t.id),
    a.created_at, a.updated_at
    FROM artists a LEFT JOIN tracks t ON t.artist_id = a.id";

#[derive(Clone)]
pub struct SqliteCatalogStore {
    lock: Arc<RwLock<()>>,
    write_conn: Arc<Mutex<Connection>>,
    read_pool: Vec<Arc<Mutex<Connection>>>,
    read_index: Arc<AtomicUsize>,
    migration: Arc<MigrationReport>,
}

impl SqliteCatalogStore {
    /// Opens (creating if needed) the catalog at `db_path` and migrates it
    /// to the current schema before any other access.
    pub fn open<P: AsRef<Path>>(db_path: P, read_pool_size: usize) -> CatalogResult<Self> {
        let db_path = db_path.as_ref();
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let mut write_conn = Connection::open_with_flags(
            db_path,
            OpenFlags::SQLITE_OPEN_READ_WRITE
                | OpenFlags::SQLITE_OPEN_CREATE
                | OpenFlags::SQLITE_OPEN_URI
                | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        write_conn.busy_timeout(BUSY_TIMEOUT)?;
        write_conn.pragma_update(None, "foreign_keys", "ON")?;

        let report = migrate(&mut write_conn)?;
        if !report.is_noop() {
            info!(
                "Catalog migrated from version {} to {}",
                report.from_version, report.to_version
            );
        }

        let counts = Self::counts_inner(&write_conn)?;
        info!(
            "Opened catalog: {} artists, {} albums, {} tracks",
            counts.artists, counts.albums, counts.tracks
        );

        let read_pool_size = read_pool_size.max(1);
        let mut read_pool = Vec::with_capacity(read_pool_size);
        for _ in 0..read_pool_size {
            let read_conn = Connection::open_with_flags(
                db_path,
                OpenFlags::SQLITE_OPEN_READ_ONLY
                    | OpenFlags::SQLITE_OPEN_URI
                    | OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?;
            read_conn.busy_timeout(BUSY_TIMEOUT)?;
            read_pool.push(Arc::new(Mutex::new(read_conn)));
        }

        Ok(SqliteCatalogStore {
            lock: Arc::new(RwLock::new(())),
            write_conn: Arc::new(Mutex::new(write_conn)),
            read_pool,
            read_index: Arc::new(AtomicUsize::new(0)),
            migration: Arc::new(report),
        })
    }

    /// What `open` did to bring the catalog to the current version.
    pub fn migration_report(&self) -> &MigrationReport {
        &self.migration
    }

    fn get_read_conn(&self) -> Arc<Mutex<Connection>> {
        let index = self.read_index.fetch_add(1, Ordering::Relaxed) % self.read_pool.len();
        self.read_pool[index].clone()
    }

    fn read<T>(&self, f: impl FnOnce(&Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let _guard = self.lock.read()?;
        let read_conn = self.get_read_conn();
        let conn = read_conn.lock()?;
        f(&conn)
    }

    fn write<T>(&self, f: impl FnOnce(&mut Connection) -> CatalogResult<T>) -> CatalogResult<T> {
        let _guard = self.lock.write()?;
        let mut conn = self.write_conn.lock()?;
        f(&mut conn)
    }

    // =========================================================================
    // Row Mapping
    // =========================================================================

    fn parse_track_row(row: &Row) -> rusqlite::Result<Track> {
        let title: String = row.get(3)?;
        let title_lower = row
            .get::<_, Option<String>>(4)?
            .unwrap_or_else(|| title.to_lowercase());
        Ok(Track {
            id: row.get(0)?,
            file_path: row.get(1)?,
            file_name: row.get(2)?,
            title,
            title_lower,
            album_name: row.get::<_, Option<String>>(5)?.unwrap_or_default(),
            album_artist_name: row.get(6)?,
            album_id: row.get::<_, Option<i64>>(7)?.unwrap_or_default(),
            artist_name: row.get::<_, Option<String>>(8)?.unwrap_or_default(),
            artist_id: row.get::<_, Option<i64>>(9)?.unwrap_or_default(),
            image_path: row.get(10)?,
            track_number: row
                .get::<_, Option<i64>>(11)?
                .and_then(|n| u32::try_from(n).ok()),
            duration: row.get(12)?,
            plain_lyrics: row.get(13)?,
            synced_lyrics: row.get(14)?,
            instrumental: row.get(15)?,
            created_at: row.get(16)?,
            updated_at: row.get(17)?,
        })
    }

    fn parse_album_row(row: &Row) -> rusqlite::Result<Album> {
        Ok(Album {
            id: row.get(0)?,
            name: row.get(1)?,
            name_lower: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            artist_id: row.get::<_, Option<i64>>(3)?.unwrap_or_default(),
            artist_name: row.get::<_, Option<String>>(4)?.unwrap_or_default(),
            album_artist_name: row.get(5)?,
            album_artist_name_lower: row.get(6)?,
            image_path: row.get(7)?,
            tracks_count: row.get(8)?,
            created_at: row.get(9)?,
            updated_at: row.get(10)?,
        })
    }

    fn parse_artist_row(row: &Row) -> rusqlite::Result<Artist> {
        Ok(Artist {
            id: row.get(0)?,
            name: row.get(1)?,
            name_lower: row.get::<_, Option<String>>(2)?.unwrap_or_default(),
            tracks_count: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    // =========================================================================
    // Internal Helpers
    // =========================================================================

    fn query_tracks(
        conn: &Connection,
        sql: &str,
        params: impl rusqlite::Params,
    ) -> CatalogResult<Vec<Track>> {
        let mut stmt = conn.prepare_cached(sql)?;
        let tracks = stmt
            .query_map(params, Self::parse_track_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tracks)
    }

    fn get_track_inner(conn: &Connection, id: i64) -> CatalogResult<Track> {
        conn.prepare_cached(&format!(
            "SELECT {} FROM tracks t WHERE t.id = ?1",
            TRACK_COLUMNS
        ))?
        .query_row(params![id], Self::parse_track_row)
        .optional()?
        .ok_or_else(|| CatalogError::not_found("track", id))
    }

    fn counts_inner(conn: &Connection) -> CatalogResult<CatalogCounts> {
        let count = |table: &str| -> CatalogResult<usize> {
            let n: i64 =
                conn.query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |r| r.get(0))?;
            Ok(n as usize)
        };
        Ok(CatalogCounts {
            artists: count("artists")?,
            albums: count("albums")?,
            tracks: count("tracks")?,
        })
    }

    /// Runs a single-row track update, mapping "no row changed" to NotFound.
    fn update_track(&self, id: i64, sql: &str, values: &[&dyn rusqlite::ToSql]) -> CatalogResult<()> {
        self.write(|conn| {
            let changed = conn.prepare_cached(sql)?.execute(values)?;
            if changed == 0 {
                return Err(CatalogError::not_found("track", id));
            }
            Ok(())
        })
    }
}

fn escape_like(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl CatalogStore for SqliteCatalogStore {
    // =========================================================================
    // Tracks
    // =========================================================================

    fn list_tracks(&self, filter: TrackFilter) -> CatalogResult<Vec<Track>> {
        self.read(|conn| match filter {
            TrackFilter::All => Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t
                     ORDER BY t.artist_name, t.album_name, t.track_number, t.id",
                    TRACK_COLUMNS
                ),
                [],
            ),
            TrackFilter::Album(album_id) => Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t WHERE t.album_id = ?1
                     ORDER BY t.track_number, t.title, t.id",
                    TRACK_COLUMNS
                ),
                params![album_id],
            ),
            TrackFilter::Artist(artist_id) => Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t WHERE t.artist_id = ?1
                     ORDER BY t.album_name, t.track_number, t.title, t.id",
                    TRACK_COLUMNS
                ),
                params![artist_id],
            ),
        })
    }

    fn get_track(&self, id: i64) -> CatalogResult<Track> {
        self.read(|conn| Self::get_track_inner(conn, id))
    }

    fn insert_track(&self, candidate: &CandidateTrack) -> CatalogResult<Track> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let artist_id = resolver::resolve_artist(&tx, &candidate.artist_name)?;
            let album_id = resolver::resolve_album(&tx, &candidate.album_key(artist_id))?;

            let now = Utc::now().timestamp();
            tx.prepare_cached(
                "INSERT INTO tracks (file_path, file_name, title, title_lower, album_name,
                                     album_artist_name, album_id, artist_name, artist_id,
                                     image_path, track_number, duration, txt_lyrics,
                                     lrc_lyrics, instrumental, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, 0, ?15, ?15)",
            )?
            .execute(params![
                candidate.file_path.to_string_lossy(),
                candidate.file_name,
                candidate.title,
                candidate.title_lower,
                candidate.album_name,
                candidate.album_artist_name,
                album_id,
                candidate.artist_name,
                artist_id,
                candidate.image_path,
                candidate.track_number,
                candidate.duration,
                candidate.plain_lyrics,
                candidate.synced_lyrics,
                now
            ])?;
            let track = Self::get_track_inner(&tx, tx.last_insert_rowid())?;
            tx.commit()?;
            debug!("Indexed track {} ({})", track.id, track.file_path);
            Ok(track)
        })
    }

    fn update_track_synced_lyrics(&self, id: i64, synced: &str, plain: &str) -> CatalogResult<()> {
        self.update_track(
            id,
            "UPDATE tracks SET lrc_lyrics = ?1, txt_lyrics = ?2, updated_at = ?3 WHERE id = ?4",
            params![synced, plain, Utc::now().timestamp(), id],
        )
    }

    fn update_track_plain_lyrics(&self, id: i64, plain: &str) -> CatalogResult<()> {
        self.update_track(
            id,
            "UPDATE tracks SET txt_lyrics = ?1, updated_at = ?2 WHERE id = ?3",
            params![plain, Utc::now().timestamp(), id],
        )
    }

    fn mark_track_instrumental(&self, id: i64) -> CatalogResult<()> {
        self.update_track(
            id,
            "UPDATE tracks SET instrumental = 1, updated_at = ?1 WHERE id = ?2",
            params![Utc::now().timestamp(), id],
        )
    }

    fn search_tracks(&self, query: &str) -> CatalogResult<Vec<Track>> {
        let pattern = format!("%{}%", escape_like(&query.trim().to_lowercase()));
        self.read(|conn| {
            Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t
                     LEFT JOIN artists ar ON ar.id = t.artist_id
                     LEFT JOIN albums al ON al.id = t.album_id
                     WHERE t.title_lower LIKE ?1 ESCAPE '\\'
                        OR ar.name_lower LIKE ?1 ESCAPE '\\'
                        OR al.name_lower LIKE ?1 ESCAPE '\\'
                     ORDER BY t.artist_name, t.album_name, t.track_number, t.id",
                    TRACK_COLUMNS
                ),
                params![pattern],
            )
        })
    }

    fn list_tracks_needing_lyrics(&self, config: &Config) -> CatalogResult<Vec<Track>> {
        self.read(|conn| {
            Self::query_tracks(
                conn,
                &format!(
                    "SELECT {} FROM tracks t
                     WHERE t.instrumental = 0
                       AND (?1 = 0 OR t.lrc_lyrics IS NULL OR t.lrc_lyrics = '')
                       AND (?2 = 0 OR t.txt_lyrics IS NULL OR t.txt_lyrics = '')
                     ORDER BY t.artist_name, t.album_name, t.track_number, t.id",
                    TRACK_COLUMNS
                ),
                params![
                    config.skip_tracks_with_synced_lyrics,
                    config.skip_tracks_with_plain_lyrics
                ],
            )
        })
    }

    // =========================================================================
    // Albums and Artists
    // =========================================================================

    fn list_albums(&self) -> CatalogResult<Vec<Album>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{} GROUP BY a.id ORDER BY a.artist_name, a.name, a.id",
                ALBUM_SELECT
            ))?;
            let albums = stmt
                .query_map([], Self::parse_album_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(albums)
        })
    }

    fn get_album(&self, id: i64) -> CatalogResult<Album> {
        self.read(|conn| {
            conn.prepare_cached(&format!("{} WHERE a.id = ?1 GROUP BY a.id", ALBUM_SELECT))?
                .query_row(params![id], Self::parse_album_row)
                .optional()?
                .ok_or_else(|| CatalogError::not_found("album", id))
        })
    }

    fn list_artists(&self) -> CatalogResult<Vec<Artist>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached(&format!(
                "{} GROUP BY a.id ORDER BY a.name, a.id",
                ARTIST_SELECT
            ))?;
            let artists = stmt
                .query_map([], Self::parse_artist_row)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(artists)
        })
    }

    fn get_artist(&self, id: i64) -> CatalogResult<Artist> {
        self.read(|conn| {
            conn.prepare_cached(&format!("{} WHERE a.id = ?1 GROUP BY a.id", ARTIST_SELECT))?
                .query_row(params![id], Self::parse_artist_row)
                .optional()?
                .ok_or_else(|| CatalogError::not_found("artist", id))
        })
    }

    fn resolve_artist(&self, name: &str) -> CatalogResult<i64> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let id = resolver::resolve_artist(&tx, name)?;
            tx.commit()?;
            Ok(id)
        })
    }

    fn resolve_album(&self, key: &AlbumKey<'_>) -> CatalogResult<i64> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            let id = resolver::resolve_album(&tx, key)?;
            tx.commit()?;
            Ok(id)
        })
    }

    // =========================================================================
    // Library State
    // =========================================================================

    fn get_directories(&self) -> CatalogResult<Vec<String>> {
        self.read(|conn| {
            let mut stmt = conn.prepare_cached("SELECT path FROM directories ORDER BY path")?;
            let paths = stmt
                .query_map([], |r| r.get(0))?
                .collect::<Result<Vec<String>, _>>()?;
            Ok(paths)
        })
    }

    fn set_directories(&self, directories: &[String]) -> CatalogResult<()> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM directories", [])?;
            {
                let now = Utc::now().timestamp();
                let mut insert = tx.prepare_cached(
                    "INSERT INTO directories (path, created_at, updated_at) VALUES (?1, ?2, ?2)
                     ON CONFLICT(path) DO NOTHING",
                )?;
                for path in directories.iter().map(|d| d.trim()).filter(|d| !d.is_empty()) {
                    insert.execute(params![path, now])?;
                }
            }
            tx.commit()?;
            Ok(())
        })
    }

    fn get_config(&self) -> CatalogResult<Config> {
        self.read(|conn| {
            let config = conn
                .prepare_cached(
                    "SELECT skip_tracks_with_synced_lyrics, skip_tracks_with_plain_lyrics,
                            show_line_count, try_embed_lyrics, theme_mode, lrclib_instance
                     FROM config_data WHERE id = 1",
                )?
                .query_row([], |r| {
                    Ok(Config {
                        skip_tracks_with_synced_lyrics: r.get(0)?,
                        skip_tracks_with_plain_lyrics: r.get(1)?,
                        show_line_count: r.get(2)?,
                        try_embed_lyrics: r.get(3)?,
                        theme_mode: ThemeMode::from_db_str(&r.get::<_, String>(4)?),
                        lrclib_instance: r.get(5)?,
                    })
                })
                .optional()?;
            Ok(config.unwrap_or_default())
        })
    }

    fn update_config(&self, config: &Config) -> CatalogResult<()> {
        self.write(|conn| {
            let now = Utc::now().timestamp();
            // skip_not_needed_tracks mirrors the synced preference for older readers
            conn.prepare_cached(
                "INSERT INTO config_data (id, skip_not_needed_tracks, skip_tracks_with_synced_lyrics,
                                          skip_tracks_with_plain_lyrics, show_line_count,
                                          try_embed_lyrics, theme_mode, lrclib_instance,
                                          created_at, updated_at)
                 VALUES (1, ?1, ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?7)
                 ON CONFLICT(id) DO UPDATE SET
                    skip_not_needed_tracks = excluded.skip_not_needed_tracks,
                    skip_tracks_with_synced_lyrics = excluded.skip_tracks_with_synced_lyrics,
                    skip_tracks_with_plain_lyrics = excluded.skip_tracks_with_plain_lyrics,
                    show_line_count = excluded.show_line_count,
                    try_embed_lyrics = excluded.try_embed_lyrics,
                    theme_mode = excluded.theme_mode,
                    lrclib_instance = excluded.lrclib_instance,
                    updated_at = excluded.updated_at",
            )?
            .execute(params![
                config.skip_tracks_with_synced_lyrics,
                config.skip_tracks_with_plain_lyrics,
                config.show_line_count,
                config.try_embed_lyrics,
                config.theme_mode.to_db_str(),
                config.lrclib_instance,
                now
            ])?;
            Ok(())
        })
    }

    fn get_initialized(&self) -> CatalogResult<bool> {
        self.read(|conn| {
            let init: Option<bool> = conn
                .prepare_cached("SELECT init FROM library_data WHERE id = 1")?
                .query_row([], |r| r.get(0))
                .optional()?;
            Ok(init.unwrap_or(false))
        })
    }

    fn set_initialized(&self, initialized: bool) -> CatalogResult<()> {
        self.write(|conn| {
            conn.prepare_cached(
                "INSERT INTO library_data (id, init, created_at, updated_at) VALUES (1, ?1, ?2, ?2)
                 ON CONFLICT(id) DO UPDATE SET init = excluded.init, updated_at = excluded.updated_at",
            )?
            .execute(params![initialized, Utc::now().timestamp()])?;
            Ok(())
        })
    }

    fn clear_catalog(&self) -> CatalogResult<()> {
        self.write(|conn| {
            let tx = conn.transaction()?;
            tx.execute("DELETE FROM tracks", [])?;
            tx.execute("DELETE FROM albums", [])?;
            tx.execute("DELETE FROM artists", [])?;
            tx.execute(
                "UPDATE library_data SET init = 0, updated_at = ?1",
                params![Utc::now().timestamp()],
            )?;
            tx.commit()?;
            Ok(())
        })
    }

    fn counts(&self) -> CatalogResult<CatalogCounts> {
        self.read(Self::counts_inner)
    }
}
