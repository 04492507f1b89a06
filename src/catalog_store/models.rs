//! Catalog models.
//!
//! Persisted entities carry their database id; `CandidateTrack` is what the
//! metadata extractor produces before artist and album ids are resolved.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

// =============================================================================
// Enumerations
// =============================================================================

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Auto,
    Light,
    Dark,
}

impl ThemeMode {
    pub fn from_db_str(s: &str) -> Self {
        s.parse().unwrap_or_default()
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            ThemeMode::Auto => "auto",
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

impl FromStr for ThemeMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            // Older catalogs stored "system"
            "auto" | "system" => Ok(ThemeMode::Auto),
            "light" => Ok(ThemeMode::Light),
            "dark" => Ok(ThemeMode::Dark),
            other => Err(format!("unknown theme mode '{}'", other)),
        }
    }
}

/// Which tracks a listing covers.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TrackFilter {
    All,
    Album(i64),
    Artist(i64),
}

// =============================================================================
// Core Entities
// =============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: i64,
    pub file_path: String,
    pub file_name: String,
    pub title: String,
    pub title_lower: String,
    pub album_name: String,
    pub album_artist_name: Option<String>,
    pub album_id: i64,
    pub artist_name: String,
    pub artist_id: i64,
    pub image_path: Option<String>,
    pub track_number: Option<u32>,
    /// Seconds.
    pub duration: f64,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
    pub instrumental: bool,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub name_lower: String,
    pub artist_id: i64,
    pub artist_name: String,
    pub album_artist_name: Option<String>,
    pub album_artist_name_lower: Option<String>,
    pub image_path: Option<String>,
    pub tracks_count: i64,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Artist {
    pub id: i64,
    pub name: String,
    pub name_lower: String,
    pub tracks_count: i64,
    pub created_at: Option<i64>,
    pub updated_at: Option<i64>,
}

/// Singleton user preferences row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    pub skip_tracks_with_synced_lyrics: bool,
    pub skip_tracks_with_plain_lyrics: bool,
    pub show_line_count: bool,
    pub try_embed_lyrics: bool,
    pub theme_mode: ThemeMode,
    pub lrclib_instance: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            skip_tracks_with_synced_lyrics: true,
            skip_tracks_with_plain_lyrics: false,
            show_line_count: true,
            try_embed_lyrics: false,
            theme_mode: ThemeMode::Auto,
            lrclib_instance: "https://lrclib.net".to_string(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CatalogCounts {
    pub artists: usize,
    pub albums: usize,
    pub tracks: usize,
}

// =============================================================================
// Ingestion Types
// =============================================================================

/// A track as read from disk, before identity resolution.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CandidateTrack {
    pub file_path: PathBuf,
    pub file_name: String,
    pub title: String,
    pub title_lower: String,
    pub album_name: String,
    pub artist_name: String,
    pub album_artist_name: String,
    pub image_path: Option<String>,
    pub track_number: Option<u32>,
    pub duration: f64,
    pub plain_lyrics: Option<String>,
    pub synced_lyrics: Option<String>,
}

impl CandidateTrack {
    pub fn album_key(&self, artist_id: i64) -> AlbumKey<'_> {
        AlbumKey {
            name: &self.album_name,
            album_artist_name: &self.album_artist_name,
            image_path: self.image_path.as_deref(),
            artist_id,
            artist_name: &self.artist_name,
        }
    }
}

/// Natural key of an album plus the display fields stamped on creation.
#[derive(Clone, Copy, Debug)]
pub struct AlbumKey<'a> {
    pub name: &'a str,
    pub album_artist_name: &'a str,
    pub image_path: Option<&'a str>,
    pub artist_id: i64,
    pub artist_name: &'a str,
}
