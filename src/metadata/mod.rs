//! Per-file metadata extraction.
//!
//! Turns one audio file (plus its sidecar lyric files) into a
//! [`CandidateTrack`](crate::catalog_store::CandidateTrack).

mod extractor;
mod sidecar;

pub use extractor::{extract, UNKNOWN_ALBUM, UNKNOWN_ARTIST};
pub use sidecar::{read_sidecars, sidecar_paths, SidecarLyrics};

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Extensions the library scanner treats as audio, compared case-insensitively.
pub const AUDIO_EXTENSIONS: &[&str] = &["mp3", "m4a", "flac", "ogg", "opus", "wav", "aac", "wma"];

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unreadable tags: {0}")]
    Tags(#[from] lofty::error::LoftyError),

    #[error("Not an audio file: {0:?}")]
    NotAudio(PathBuf),
}

pub fn is_audio_file(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|ext| {
            AUDIO_EXTENSIONS
                .iter()
                .any(|known| known.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}
