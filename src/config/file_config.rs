use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct FileConfig {
    // Core settings (can override CLI)
    pub db_path: Option<String>,
    pub log_level: Option<String>,
    pub scan_threads: Option<usize>,
    pub read_pool_size: Option<usize>,

    pub lyrics: Option<LyricsFileConfig>,
}

#[derive(Debug, Deserialize, Default, Clone)]
#[serde(default)]
pub struct LyricsFileConfig {
    /// Base URL of the LRCLIB instance stored in the catalog config.
    pub instance: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;
        toml::from_str(&content).with_context(|| format!("Failed to parse config file: {:?}", path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_partial_file() {
        let config: FileConfig = toml::from_str(
            r#"
            db_path = "/var/lib/lrc/db.sqlite3"
            scan_threads = 4

            [lyrics]
            instance = "https://lyrics.example.org"
            "#,
        )
        .unwrap();

        assert_eq!(config.db_path.as_deref(), Some("/var/lib/lrc/db.sqlite3"));
        assert_eq!(config.scan_threads, Some(4));
        assert_eq!(config.log_level, None);
        assert_eq!(
            config.lyrics.unwrap().instance.as_deref(),
            Some("https://lyrics.example.org")
        );
    }

    #[test]
    fn load_reports_parse_errors_with_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "scan_threads = \"many\"").unwrap();

        let err = FileConfig::load(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config file"));
    }
}
