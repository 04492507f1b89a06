//! CatalogStore trait definition.

use super::errors::CatalogResult;
use super::models::*;

/// Storage backend for the music catalog.
///
/// Reads may run concurrently; writes are serialized by the implementation.
/// Lookups by id report a missing row as `CatalogError::NotFound`, never as a
/// storage failure.
pub trait CatalogStore: Send + Sync {
    // =========================================================================
    // Tracks
    // =========================================================================

    /// All tracks are ordered by artist, album, track number; album listings
    /// by track number then title; artist listings by album, track number,
    /// then title.
    fn list_tracks(&self, filter: TrackFilter) -> CatalogResult<Vec<Track>>;

    fn get_track(&self, id: i64) -> CatalogResult<Track>;

    /// Resolves the candidate's artist and album and inserts the track, all
    /// in one transaction.
    fn insert_track(&self, candidate: &CandidateTrack) -> CatalogResult<Track>;

    fn update_track_synced_lyrics(&self, id: i64, synced: &str, plain: &str) -> CatalogResult<()>;

    fn update_track_plain_lyrics(&self, id: i64, plain: &str) -> CatalogResult<()>;

    fn mark_track_instrumental(&self, id: i64) -> CatalogResult<()>;

    /// Case-insensitive substring match on title, artist and album.
    fn search_tracks(&self, query: &str) -> CatalogResult<Vec<Track>>;

    /// Non-instrumental tracks still worth a lyrics lookup under `config`'s
    /// skip preferences.
    fn list_tracks_needing_lyrics(&self, config: &Config) -> CatalogResult<Vec<Track>>;

    // =========================================================================
    // Albums and Artists
    // =========================================================================

    fn list_albums(&self) -> CatalogResult<Vec<Album>>;

    fn get_album(&self, id: i64) -> CatalogResult<Album>;

    fn list_artists(&self) -> CatalogResult<Vec<Artist>>;

    fn get_artist(&self, id: i64) -> CatalogResult<Artist>;

    fn resolve_artist(&self, name: &str) -> CatalogResult<i64>;

    fn resolve_album(&self, key: &AlbumKey<'_>) -> CatalogResult<i64>;

    // =========================================================================
    // Library State
    // =========================================================================

    fn get_directories(&self) -> CatalogResult<Vec<String>>;

    /// Replaces the whole directory list.
    fn set_directories(&self, directories: &[String]) -> CatalogResult<()>;

    fn get_config(&self) -> CatalogResult<Config>;

    fn update_config(&self, config: &Config) -> CatalogResult<()>;

    fn get_initialized(&self) -> CatalogResult<bool>;

    fn set_initialized(&self, initialized: bool) -> CatalogResult<()>;

    /// Deletes tracks, albums and artists and resets the initialized flag.
    fn clear_catalog(&self) -> CatalogResult<()>;

    fn counts(&self) -> CatalogResult<CatalogCounts>;
}
