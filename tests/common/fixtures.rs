//! Audio fixtures written on the fly.
//!
//! Files are minimal PCM WAVs tagged through lofty, so whatever is written
//! here reads back through the same tag mapping the extractor uses.

use lofty::config::WriteOptions;
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::prelude::Accessor;
use lofty::tag::{ItemKey, Tag};
use std::fs;
use std::path::Path;

/// Tags to write into a fixture. `None` fields are left out.
#[derive(Debug, Clone, Default)]
pub struct TrackTags<'a> {
    pub title: Option<&'a str>,
    pub artist: Option<&'a str>,
    pub album: Option<&'a str>,
    pub album_artist: Option<&'a str>,
    pub track_number: Option<u32>,
}

impl<'a> TrackTags<'a> {
    pub fn new(title: &'a str, artist: &'a str, album: &'a str) -> Self {
        Self {
            title: Some(title),
            artist: Some(artist),
            album: Some(album),
            ..Default::default()
        }
    }

    pub fn track(mut self, number: u32) -> Self {
        self.track_number = Some(number);
        self
    }

    pub fn album_artist(mut self, name: &'a str) -> Self {
        self.album_artist = Some(name);
        self
    }
}

/// Half a second of 8 kHz mono 16-bit silence.
pub fn write_wav(path: &Path) {
    let sample_rate: u32 = 8000;
    let data_len: u32 = 8000;
    let mut bytes = Vec::with_capacity(44 + data_len as usize);
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_len).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&1u16.to_le_bytes()); // PCM
    bytes.extend_from_slice(&1u16.to_le_bytes()); // mono
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    bytes.extend_from_slice(&2u16.to_le_bytes());
    bytes.extend_from_slice(&16u16.to_le_bytes());
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_len.to_le_bytes());
    bytes.resize(44 + data_len as usize, 0);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, bytes).unwrap();
}

pub fn write_tagged_wav(path: &Path, tags: &TrackTags<'_>) {
    write_wav(path);

    let mut tagged = lofty::read_from_path(path).unwrap();
    let tag_type = tagged.primary_tag_type();
    tagged.insert_tag(Tag::new(tag_type));
    let tag = tagged.primary_tag_mut().unwrap();
    if let Some(title) = tags.title {
        tag.set_title(title.to_string());
    }
    if let Some(artist) = tags.artist {
        tag.set_artist(artist.to_string());
    }
    if let Some(album) = tags.album {
        tag.set_album(album.to_string());
    }
    if let Some(album_artist) = tags.album_artist {
        tag.insert_text(ItemKey::AlbumArtist, album_artist.to_string());
    }
    if let Some(number) = tags.track_number {
        tag.set_track(number);
    }
    tagged.save_to_path(path, WriteOptions::default()).unwrap();
}

/// A file with an audio extension and contents no decoder accepts.
pub fn write_corrupt(path: &Path) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, b"this is not audio at all, just some bytes").unwrap();
}
