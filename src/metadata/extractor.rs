use super::sidecar::{read_sidecars, SidecarLyrics};
use super::{is_audio_file, ExtractionError};
use crate::catalog_store::CandidateTrack;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::tag::ItemKey;
use std::path::Path;
use tracing::warn;

pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_ARTIST: &str = "Unknown Artist";

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Reads one audio file into a candidate track.
///
/// Empty tag fields fall back to the file stem (title), "Unknown Album",
/// "Unknown Artist", and the track artist (album artist). Sidecar `.txt`
/// and `.lrc` files next to the audio file become its plain and synced
/// lyrics.
pub fn extract(path: &Path) -> Result<CandidateTrack, ExtractionError> {
    if !is_audio_file(path) {
        return Err(ExtractionError::NotAudio(path.to_path_buf()));
    }
    // Surfaces missing or unreadable files as IO errors rather than tag errors
    std::fs::metadata(path)?;

    let tagged_file = lofty::read_from_path(path)?;
    let tag = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag());

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    let title = tag
        .and_then(|t| non_empty(t.title().as_deref()))
        .unwrap_or(stem);
    let album_name = tag
        .and_then(|t| non_empty(t.album().as_deref()))
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());
    let artist_name = tag
        .and_then(|t| non_empty(t.artist().as_deref()))
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album_artist_name = tag
        .and_then(|t| non_empty(t.get_string(ItemKey::AlbumArtist)))
        .unwrap_or_else(|| artist_name.clone());
    let track_number = tag.and_then(|t| t.track()).filter(|n| *n > 0);

    let duration = tagged_file.properties().duration().as_secs_f64();

    let lyrics = read_sidecars(path).unwrap_or_else(|e| {
        warn!("Ignoring unreadable lyrics next to {:?}: {}", path, e);
        SidecarLyrics::default()
    });

    Ok(CandidateTrack {
        file_path: path.to_path_buf(),
        file_name,
        title_lower: title.to_lowercase(),
        title,
        album_name,
        artist_name,
        album_artist_name,
        image_path: None,
        track_number,
        duration,
        plain_lyrics: lyrics.plain.filter(|l| !l.trim().is_empty()),
        synced_lyrics: lyrics.synced.filter(|l| !l.trim().is_empty()),
    })
}
