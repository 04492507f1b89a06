//! Get-or-create for artists and albums.
//!
//! Both functions run on a transaction the store opened under its exclusive
//! lock. The unique indices on `artists(name)` and `albums(name, artist_id)`
//! make the insert a no-op when another writer got there first, so the
//! follow-up lookup always lands on the single surviving row.

use super::errors::{CatalogError, CatalogResult};
use super::models::AlbumKey;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};

fn find_artist(conn: &Connection, name: &str) -> CatalogResult<Option<i64>> {
    Ok(conn
        .prepare_cached("SELECT id FROM artists WHERE name = ?1")?
        .query_row(params![name], |r| r.get(0))
        .optional()?)
}

fn find_album(conn: &Connection, name: &str, artist_id: i64) -> CatalogResult<Option<i64>> {
    Ok(conn
        .prepare_cached("SELECT id FROM albums WHERE name = ?1 AND artist_id = ?2")?
        .query_row(params![name, artist_id], |r| r.get(0))
        .optional()?)
}

/// Returns the id of the artist named exactly `name`, creating it if needed.
/// Matching is byte-for-byte; `name_lower` only serves searches.
pub fn resolve_artist(conn: &Connection, name: &str) -> CatalogResult<i64> {
    if let Some(id) = find_artist(conn, name)? {
        return Ok(id);
    }

    let now = Utc::now().timestamp();
    conn.prepare_cached(
        "INSERT INTO artists (name, name_lower, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?3)
         ON CONFLICT(name) DO NOTHING",
    )?
    .execute(params![name, name.to_lowercase(), now])?;

    find_artist(conn, name)?.ok_or_else(|| {
        CatalogError::IntegrityViolation(format!("artist '{}' vanished after insert", name))
    })
}

/// Returns the id of the album `key.name` under `key.artist_id`, creating
/// it with the key's display fields if needed.
pub fn resolve_album(conn: &Connection, key: &AlbumKey<'_>) -> CatalogResult<i64> {
    if let Some(id) = find_album(conn, key.name, key.artist_id)? {
        return Ok(id);
    }

    let artist_exists = conn
        .prepare_cached("SELECT 1 FROM artists WHERE id = ?1")?
        .query_row(params![key.artist_id], |_| Ok(()))
        .optional()?
        .is_some();
    if !artist_exists {
        return Err(CatalogError::IntegrityViolation(format!(
            "album '{}' references missing artist {}",
            key.name, key.artist_id
        )));
    }

    let now = Utc::now().timestamp();
    conn.prepare_cached(
        "INSERT INTO albums (name, name_lower, artist_id, artist_name, album_artist_name,
                             album_artist_name_lower, image_path, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
         ON CONFLICT(name, artist_id) DO NOTHING",
    )?
    .execute(params![
        key.name,
        key.name.to_lowercase(),
        key.artist_id,
        key.artist_name,
        key.album_artist_name,
        key.album_artist_name.to_lowercase(),
        key.image_path,
        now
    ])?;

    find_album(conn, key.name, key.artist_id)?.ok_or_else(|| {
        CatalogError::IntegrityViolation(format!(
            "album '{}' for artist {} vanished after insert",
            key.name, key.artist_id
        ))
    })
}
