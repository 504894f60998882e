use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::Deserialize;

use crate::recommend::DEFAULT_COUNT;
use crate::resolver::DEFAULT_MIN_SCORE;

/// Settings read from `config.toml`. Every field is optional and
/// falls back to its default when absent.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Catalog CSV files, concatenated in this order.
    pub sources: Vec<PathBuf>,
    /// Directory searched for `*.csv` when `sources` is empty.
    pub data_dir: Option<PathBuf>,
    /// Minimum fuzzy title score (0–100) for a query to resolve.
    pub min_score: f64,
    /// Recommendations returned when no count is given.
    pub default_count: usize,
    /// Number of search threads. 0 = auto-detect (cores / 2, min 1).
    pub workers: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            data_dir: None,
            min_score: DEFAULT_MIN_SCORE,
            default_count: DEFAULT_COUNT,
            workers: 0,
        }
    }
}

impl AppConfig {
    /// Load config from `~/.config/soundalike/config.toml`.
    /// Returns default config if file doesn't exist.
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => {
                log::debug!("No config file found, using defaults");
                Self::default()
            }
        }
    }

    /// Load config from an explicit path.
    /// Logs a warning and falls back to defaults if the file can't be read or parsed.
    pub fn load_from(path: &Path) -> Self {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", path.display(), e);
                return Self::default();
            }
        };

        match Self::parse(&contents) {
            Ok(config) => {
                log::info!("Loaded config from {}", path.display());
                config
            }
            Err(e) => {
                log::warn!("Failed to parse {}: {}. Using defaults.", path.display(), e);
                Self::default()
            }
        }
    }

    fn parse(contents: &str) -> Result<Self, toml::de::Error> {
        let mut config: AppConfig = toml::from_str(contents)?;
        if !(0.0..=100.0).contains(&config.min_score) {
            log::warn!(
                "min_score {} outside 0–100, using {}",
                config.min_score,
                DEFAULT_MIN_SCORE
            );
            config.min_score = DEFAULT_MIN_SCORE;
        }
        if config.default_count == 0 {
            log::warn!("default_count must be at least 1, using {}", DEFAULT_COUNT);
            config.default_count = DEFAULT_COUNT;
        }
        Ok(config)
    }

    /// Count to request: the CLI value if given, else `default_count`
    /// saturated into `i64`.
    pub fn requested_count(&self, cli_count: Option<i64>) -> i64 {
        cli_count.unwrap_or_else(|| i64::try_from(self.default_count).unwrap_or(i64::MAX))
    }

    /// Resolve worker count: 0 → auto-detect (cores / 2, min 1).
    pub fn resolve_workers(&self) -> usize {
        if self.workers > 0 {
            self.workers
        } else {
            let cores = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(2);
            (cores / 2).max(1)
        }
    }

    /// Get the config file path.
    fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", crate::APP_NAME)
            .map(|dirs| dirs.config_dir().join("config.toml"))
    }
}

/// Default CSV discovery root: the XDG data directory.
pub fn default_data_dir() -> Option<PathBuf> {
    ProjectDirs::from("", "", crate::APP_NAME).map(|dirs| dirs.data_dir().to_path_buf())
}
