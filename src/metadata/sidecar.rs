use std::io;
use std::path::{Path, PathBuf};

/// Lyrics found next to an audio file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SidecarLyrics {
    /// Contents of `<name>.txt`.
    pub plain: Option<String>,
    /// Contents of `<name>.lrc`.
    pub synced: Option<String>,
}

/// `(txt, lrc)` paths sharing the audio file's base name.
pub fn sidecar_paths(audio_path: &Path) -> (PathBuf, PathBuf) {
    (
        audio_path.with_extension("txt"),
        audio_path.with_extension("lrc"),
    )
}

fn read_optional(path: &Path) -> io::Result<Option<String>> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(Some(String::from_utf8_lossy(&bytes).into_owned())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Missing sidecars are not an error; unreadable ones are.
pub fn read_sidecars(audio_path: &Path) -> io::Result<SidecarLyrics> {
    let (txt, lrc) = sidecar_paths(audio_path);
    Ok(SidecarLyrics {
        plain: read_optional(&txt)?,
        synced: read_optional(&lrc)?,
    })
}
