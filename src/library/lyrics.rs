//! Applying lyrics lookups to catalog tracks.

use super::{Library, LibraryError};
use crate::catalog_store::Track;
use serde::Serialize;
use tracing::{debug, info};

/// What a lyrics provider found for one track.
#[derive(Debug, Clone, PartialEq)]
pub enum LyricsResponse {
    /// Time-stamped LRC text plus its plain rendition. An empty `plain` is
    /// derived from `synced`.
    Synced { synced: String, plain: String },
    Plain { plain: String },
    Instrumental,
    NotFound,
}

/// The track fields a provider matches on.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LyricsQuery {
    pub title: String,
    pub artist_name: String,
    pub album_name: String,
    /// Seconds.
    pub duration: f64,
}

impl From<&Track> for LyricsQuery {
    fn from(track: &Track) -> Self {
        Self {
            title: track.title.clone(),
            artist_name: track.artist_name.clone(),
            album_name: track.album_name.clone(),
            duration: track.duration,
        }
    }
}

pub trait LyricsProvider: Send + Sync {
    fn fetch(&self, query: &LyricsQuery) -> anyhow::Result<LyricsResponse>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LyricsOutcome {
    Synced,
    Plain,
    Instrumental,
    NotFound,
}

/// Strips LRC timestamps and metadata lines, leaving the lyric text.
///
/// `[00:12.34]` prefixes (possibly several per line) are removed and lines
/// made only of a tag such as `[ar:Someone]` are dropped. Any other bracket
/// group, like `[Chorus]`, is lyric text and stays. Leading and trailing
/// blank lines are trimmed.
pub fn plain_from_synced(lrc: &str) -> String {
    let lines: Vec<&str> = lrc
        .lines()
        .filter_map(|line| {
            let line = line.trim();
            if is_metadata_tag(line) {
                return None;
            }
            let mut rest = line;
            let mut timed = false;
            while let Some(inner) = rest.strip_prefix('[') {
                let Some(end) = inner.find(']') else {
                    break;
                };
                if !inner.starts_with(|c: char| c.is_ascii_digit()) {
                    break;
                }
                timed = true;
                rest = inner[end + 1..].trim_start();
            }
            if timed || !rest.is_empty() {
                Some(rest.trim_end())
            } else {
                None
            }
        })
        .collect();

    let start = lines.iter().position(|l| !l.is_empty()).unwrap_or(lines.len());
    let end = lines
        .iter()
        .rposition(|l| !l.is_empty())
        .map(|i| i + 1)
        .unwrap_or(start);
    lines[start..end].join("\n")
}

/// `[key:value]` filling the whole line, with an alphabetic key.
fn is_metadata_tag(line: &str) -> bool {
    let Some(inner) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) else {
        return false;
    };
    match inner.split_once(':') {
        Some((key, _)) => {
            !key.is_empty() && !inner.contains(']') && key.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

impl Library {
    /// Stores a provider response on track `track_id`. `NotFound` leaves the
    /// track unchanged.
    pub fn apply_lyrics(
        &self,
        track_id: i64,
        response: LyricsResponse,
    ) -> Result<LyricsOutcome, LibraryError> {
        let store = self.store();
        let outcome = match response {
            LyricsResponse::Synced { synced, plain } => {
                let plain = if plain.trim().is_empty() {
                    plain_from_synced(&synced)
                } else {
                    plain
                };
                store.update_track_synced_lyrics(track_id, &synced, &plain)?;
                LyricsOutcome::Synced
            }
            LyricsResponse::Plain { plain } => {
                store.update_track_plain_lyrics(track_id, &plain)?;
                LyricsOutcome::Plain
            }
            LyricsResponse::Instrumental => {
                store.mark_track_instrumental(track_id)?;
                LyricsOutcome::Instrumental
            }
            LyricsResponse::NotFound => {
                // Still report a missing track as such
                store.get_track(track_id)?;
                LyricsOutcome::NotFound
            }
        };
        debug!("Applied lyrics to track {}: {:?}", track_id, outcome);
        Ok(outcome)
    }

    /// Looks up lyrics for `track_id` with `provider` and stores the result.
    pub fn download_lyrics(
        &self,
        track_id: i64,
        provider: &dyn LyricsProvider,
    ) -> Result<LyricsOutcome, LibraryError> {
        let track = self.store().get_track(track_id)?;
        let query = LyricsQuery::from(&track);
        let response = provider
            .fetch(&query)
            .map_err(LibraryError::Provider)?;
        let outcome = self.apply_lyrics(track_id, response)?;
        info!(
            "Lyrics for '{}' by {}: {:?}",
            track.title, track.artist_name, outcome
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_timestamps_and_metadata() {
        let lrc = "[ar:Someone]\n[ti:Song]\n[00:01.00]Hello\n[00:02.50] World\n[00:03.00]";
        assert_eq!(plain_from_synced(lrc), "Hello\nWorld");
    }

    #[test]
    fn keeps_timed_blank_lines_between_verses() {
        let lrc = "[00:01.00]One\n[00:02.00]\n[00:03.00]Two";
        assert_eq!(plain_from_synced(lrc), "One\n\nTwo");
    }

    #[test]
    fn handles_repeated_timestamps() {
        let lrc = "[00:10.00][01:10.00]Chorus\n[00:20.00]Verse";
        assert_eq!(plain_from_synced(lrc), "Chorus\nVerse");
    }

    #[test]
    fn bracketed_lyric_text_is_kept() {
        let lrc = "[00:01.00]Hello\n[00:02.00][Chorus] Sing along\n[00:03.00] [laughs] ha ha\n[Outro]";
        assert_eq!(
            plain_from_synced(lrc),
            "Hello\n[Chorus] Sing along\n[laughs] ha ha\n[Outro]"
        );
    }

    #[test]
    fn untimed_text_passes_through() {
        assert_eq!(plain_from_synced("just words\n\nmore"), "just words\nmore");
        assert_eq!(plain_from_synced(""), "");
    }

    #[test]
    fn query_copies_track_fields() {
        let track = Track {
            id: 3,
            file_path: "/m/a.mp3".to_string(),
            file_name: "a.mp3".to_string(),
            title: "Song".to_string(),
            title_lower: "song".to_string(),
            album_name: "Album".to_string(),
            album_artist_name: None,
            album_id: 1,
            artist_name: "Artist".to_string(),
            artist_id: 1,
            image_path: None,
            track_number: Some(1),
            duration: 201.5,
            plain_lyrics: None,
            synced_lyrics: None,
            instrumental: false,
            created_at: None,
            updated_at: None,
        };
        let query = LyricsQuery::from(&track);
        assert_eq!(query.title, "Song");
        assert_eq!(query.artist_name, "Artist");
        assert_eq!(query.album_name, "Album");
        assert_eq!(query.duration, 201.5);
    }
}
