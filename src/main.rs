use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use lrc_catalog::catalog_store::{
    CatalogStore, Config, SqliteCatalogStore, ThemeMode, TrackFilter, CURRENT_CATALOG_VERSION,
};
use lrc_catalog::cli_style::get_styles;
use lrc_catalog::config::{AppConfig, CliConfig, FileConfig};
use lrc_catalog::library::{Library, ScanOptions, TracingObserver};

fn parse_path(s: &str) -> Result<PathBuf> {
    let original_path = PathBuf::from(s);
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir()?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
#[command(
    styles = get_styles(),
    version = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH")),
    about = "Music library catalog for LRC lyrics management"
)]
struct CliArgs {
    /// Path to the SQLite catalog database file.
    #[clap(long, value_parser = parse_path)]
    pub db_path: Option<PathBuf>,

    /// Path to a TOML config file. Its values override command line flags.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// Number of threads used to read audio metadata while scanning.
    #[clap(long, default_value_t = 1)]
    pub scan_threads: usize,

    /// Default log level, overridden by the LOG_LEVEL environment variable.
    #[clap(long, default_value = "info")]
    pub log_level: tracing::Level,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Brings the catalog schema to the current version and reports what ran.
    Migrate,

    /// Shows schema version, initialized flag, directories and counts.
    Status,

    /// Lists or replaces the scanned directories.
    Dirs {
        #[command(subcommand)]
        command: DirsCommand,
    },

    /// Counts audio files under the configured directories.
    Count,

    /// Indexes the configured directories. Ctrl-C stops before the next file.
    Scan {
        /// Drop all tracks, albums and artists before indexing.
        #[clap(long)]
        rescan: bool,
    },

    /// Lists tracks, optionally restricted to an album, an artist or a search.
    Tracks {
        #[clap(long, conflicts_with_all = ["artist", "search"])]
        album: Option<i64>,
        #[clap(long, conflicts_with = "search")]
        artist: Option<i64>,
        #[clap(long)]
        search: Option<String>,
    },

    /// Lists albums with their track counts.
    Albums,

    /// Lists artists with their track counts.
    Artists,

    /// Shows or edits the stored user preferences.
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Subcommand, Debug)]
enum DirsCommand {
    List,
    /// Replaces the directory list with the given paths.
    Set {
        #[clap(value_parser = parse_path)]
        paths: Vec<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
enum ConfigCommand {
    Show,
    /// Keys: skip_tracks_with_synced_lyrics, skip_tracks_with_plain_lyrics,
    /// show_line_count, try_embed_lyrics, theme_mode, lrclib_instance.
    Set { key: String, value: String },
}

#[derive(Serialize)]
struct Status {
    db_path: PathBuf,
    schema_version: usize,
    initialized: bool,
    directories: Vec<String>,
    artists: usize,
    albums: usize,
    tracks: usize,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    value
        .parse()
        .with_context(|| format!("{} expects true or false, got '{}'", key, value))
}

fn apply_config_value(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "skip_tracks_with_synced_lyrics" => {
            config.skip_tracks_with_synced_lyrics = parse_bool(key, value)?
        }
        "skip_tracks_with_plain_lyrics" => {
            config.skip_tracks_with_plain_lyrics = parse_bool(key, value)?
        }
        "show_line_count" => config.show_line_count = parse_bool(key, value)?,
        "try_embed_lyrics" => config.try_embed_lyrics = parse_bool(key, value)?,
        "theme_mode" => {
            config.theme_mode = value.parse::<ThemeMode>().map_err(anyhow::Error::msg)?
        }
        "lrclib_instance" => {
            let url = value.trim().trim_end_matches('/');
            if url.is_empty() {
                bail!("lrclib_instance cannot be empty");
            }
            config.lrclib_instance = url.to_string();
        }
        other => bail!("Unknown config key '{}'", other),
    }
    Ok(())
}

fn watch_ctrl_c(cancel: CancellationToken) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted, stopping after the current file...");
            cancel.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let cli_config = CliConfig {
        db_path: cli_args.db_path.clone(),
        log_level: cli_args.log_level,
        scan_threads: cli_args.scan_threads,
        ..Default::default()
    };
    let app_config = AppConfig::resolve(&cli_config, file_config)?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(app_config.log_level).into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()?;

    info!("Opening catalog at {:?}...", app_config.db_path);
    let store = SqliteCatalogStore::open(&app_config.db_path, app_config.read_pool_size)?;

    if let Some(instance) = &app_config.lrclib_instance {
        let mut config = store.get_config()?;
        if &config.lrclib_instance != instance {
            info!("Setting LRCLIB instance to {}", instance);
            config.lrclib_instance = instance.clone();
            store.update_config(&config)?;
        }
    }

    let migration = store.migration_report().clone();
    let library = Arc::new(Library::new(
        Arc::new(store),
        Arc::new(TracingObserver::default()),
        ScanOptions {
            threads: app_config.scan_threads,
            ..Default::default()
        },
    )?);

    match cli_args.command {
        Command::Migrate => print_json(&migration)?,
        Command::Status => {
            let counts = library.counts()?;
            print_json(&Status {
                db_path: app_config.db_path.clone(),
                schema_version: CURRENT_CATALOG_VERSION,
                initialized: library.is_initialized()?,
                directories: library.directories()?,
                artists: counts.artists,
                albums: counts.albums,
                tracks: counts.tracks,
            })?
        }
        Command::Dirs { command } => match command {
            DirsCommand::List => print_json(&library.directories()?)?,
            DirsCommand::Set { paths } => {
                let paths: Vec<String> = paths
                    .iter()
                    .map(|p| p.to_string_lossy().into_owned())
                    .collect();
                library.set_directories(&paths)?;
                print_json(&library.directories()?)?
            }
        },
        Command::Count => print_json(&library.count_files()?)?,
        Command::Scan { rescan } => {
            let report = if rescan {
                let cancel = CancellationToken::new();
                watch_ctrl_c(cancel.clone());
                let library = library.clone();
                tokio::task::spawn_blocking(move || library.rescan_library(&cancel)).await??
            } else {
                let handle = library.spawn_initialize();
                watch_ctrl_c(handle.cancellation_token());
                handle.wait().await?
            };
            print_json(&report)?
        }
        Command::Tracks {
            album,
            artist,
            search,
        } => {
            let tracks = match (album, artist, search) {
                (_, _, Some(query)) => library.search_tracks(&query)?,
                (Some(id), _, _) => library.tracks(TrackFilter::Album(id))?,
                (_, Some(id), _) => library.tracks(TrackFilter::Artist(id))?,
                _ => library.tracks(TrackFilter::All)?,
            };
            print_json(&tracks)?
        }
        Command::Albums => print_json(&library.albums()?)?,
        Command::Artists => print_json(&library.artists()?)?,
        Command::Config { command } => match command {
            ConfigCommand::Show => print_json(&library.config()?)?,
            ConfigCommand::Set { key, value } => {
                let mut config = library.config()?;
                apply_config_value(&mut config, &key, &value)?;
                library.update_config(&config)?;
                print_json(&config)?
            }
        },
    }

    Ok(())
}
