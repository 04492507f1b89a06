mod file_config;

pub use file_config::{FileConfig, LyricsFileConfig};

use crate::catalog_store::DEFAULT_READ_POOL_SIZE;
use anyhow::{bail, Result};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::Level;

const APP_DIR_NAME: &str = "lrc-catalog";
const DB_FILE_NAME: &str = "db.sqlite3";

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub db_path: Option<PathBuf>,
    pub log_level: Level,
    pub scan_threads: usize,
    pub read_pool_size: usize,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: Level::INFO,
            scan_threads: 1,
            read_pool_size: DEFAULT_READ_POOL_SIZE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub log_level: Level,
    pub scan_threads: usize,
    pub read_pool_size: usize,
    /// When set, written into the catalog's stored config on startup.
    pub lrclib_instance: Option<String>,
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        Self::resolve_with_default(cli, file_config, default_db_path())
    }

    fn resolve_with_default(
        cli: &CliConfig,
        file_config: Option<FileConfig>,
        default_db_path: Option<PathBuf>,
    ) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let db_path = file
            .db_path
            .map(PathBuf::from)
            .or_else(|| cli.db_path.clone())
            .or(default_db_path)
            .ok_or_else(|| {
                anyhow::anyhow!("db_path must be specified via --db-path or in config file")
            })?;
        if db_path.is_dir() {
            bail!("db_path is a directory: {:?}", db_path);
        }

        let log_level = file
            .log_level
            .and_then(|s| Level::from_str(&s).ok())
            .unwrap_or(cli.log_level);

        let scan_threads = file.scan_threads.unwrap_or(cli.scan_threads);
        if scan_threads == 0 {
            bail!("scan_threads must be at least 1");
        }
        let read_pool_size = file.read_pool_size.unwrap_or(cli.read_pool_size).max(1);

        let lrclib_instance = file
            .lyrics
            .and_then(|l| l.instance)
            .map(|url| url.trim().trim_end_matches('/').to_string())
            .filter(|url| !url.is_empty());

        Ok(AppConfig {
            db_path,
            log_level,
            scan_threads,
            read_pool_size,
            lrclib_instance,
        })
    }
}

/// `<data dir>/lrc-catalog/db.sqlite3`, with the data dir taken from
/// `$XDG_DATA_HOME` or `$HOME/.local/share`.
pub fn default_db_path() -> Option<PathBuf> {
    default_db_path_from(
        std::env::var_os("XDG_DATA_HOME").map(PathBuf::from).as_deref(),
        std::env::var_os("HOME").map(PathBuf::from).as_deref(),
    )
}

fn default_db_path_from(xdg_data_home: Option<&Path>, home: Option<&Path>) -> Option<PathBuf> {
    let data_dir = xdg_data_home
        .filter(|p| p.is_absolute())
        .map(Path::to_path_buf)
        .or_else(|| home.map(|h| h.join(".local").join("share")))?;
    Some(data_dir.join(APP_DIR_NAME).join(DB_FILE_NAME))
}
