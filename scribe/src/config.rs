//! User configuration loaded from `config.toml`.
//!
//! Every key is optional. A missing file means defaults; an unreadable or
//! unparseable file is a soft failure reported on stderr, never an abort.

use std::path::{Path, PathBuf};

use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// SQLite database holding committed files and turn history.
    pub db_path: PathBuf,
    /// Bytes read from the input per chunk.
    pub chunk_size: usize,
    /// `tracing` filter directive used when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: PathBuf::from(".scribe/history.db"),
            chunk_size: 4096,
            log_filter: "warn".to_owned(),
        }
    }
}

/// Returns the path to the scribe config file.
///
/// Prefers `$XDG_CONFIG_HOME/scribe/config.toml`; falls back to
/// `~/.config/scribe/config.toml` when the env var is absent.
pub fn config_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("HOME")
                .ok()
                .map(|h| PathBuf::from(h).join(".config"))
        })
        .unwrap_or_else(|| PathBuf::from(".config"));
    base.join("scribe").join("config.toml")
}

/// Loads the config from [`config_path`].
pub fn load() -> Config {
    load_from(&config_path())
}

/// Loads the config at `path`, falling back to defaults on any problem.
///
/// Runs before logging is initialised, so problems go straight to stderr.
pub fn load_from(path: &Path) -> Config {
    let raw = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Config::default(),
        Err(e) => {
            eprintln!("scribe: cannot read config {:?}: {}", path, e);
            return Config::default();
        }
    };
    match toml::from_str::<Config>(&raw) {
        Ok(config) if config.chunk_size == 0 => {
            eprintln!("scribe: chunk_size in {:?} must be positive, using defaults", path);
            Config { chunk_size: Config::default().chunk_size, ..config }
        }
        Ok(config) => config,
        Err(e) => {
            eprintln!("scribe: config parse error in {:?}: {}", path, e);
            Config::default()
        }
    }
}
