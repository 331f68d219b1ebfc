//! Configuration loading and data folder resolution
//!
//! Bootstrap settings come from an optional TOML file. Every field has a
//! built-in default, so a missing file is a warning, never a startup failure.
//!
//! # Resolution order
//!
//! Config file:
//! 1. Explicit path (command line)
//! 2. `ABSOUND_CONFIG` environment variable
//! 3. `<user config dir>/absound/config.toml`
//! 4. Built-in defaults
//!
//! Data folder:
//! 1. Command-line argument
//! 2. `ABSOUND_DATA_DIR` environment variable
//! 3. `data_dir` in the TOML file
//! 4. OS-dependent default

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

use crate::{Error, Result};

/// Environment variable naming the config file
pub const CONFIG_ENV_VAR: &str = "ABSOUND_CONFIG";

/// Environment variable naming the data folder
pub const DATA_DIR_ENV_VAR: &str = "ABSOUND_DATA_DIR";

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TomlConfig {
    /// Folder holding persisted tournament state
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub catalog: CatalogConfig,

    #[serde(default)]
    pub tournament: TournamentSettings,
}

/// HTTP listener settings
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Where the sample list and audio files come from
#[derive(Debug, Clone, Deserialize)]
pub struct CatalogConfig {
    /// File listing audio filenames (text, one per line, or a JSON array)
    #[serde(default)]
    pub list_file: Option<PathBuf>,

    /// Directory the audio files are served from
    #[serde(default)]
    pub audio_dir: Option<PathBuf>,

    /// URL prefix under which audio files are resolvable
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            list_file: None,
            audio_dir: None,
            base_url: default_base_url(),
        }
    }
}

/// Tunables of the adaptive schedule
///
/// Defaults reproduce the fixed heuristic schedule. They are exposed because
/// the region radius and depth target are not known to be tuned values.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct TournamentSettings {
    /// Recent matches whose pairs are not repeated
    pub recent_exclusion: usize,
    /// Random draws before falling back to a fixed pair
    pub max_pair_attempts: usize,
    /// Leaders whose neighbourhoods form the refine region
    pub refine_top_k: usize,
    /// Refine neighbourhood radius as a fraction of the parameter-space diameter
    pub refine_radius_factor: f64,
    /// Finalists entering each showdown bracket
    pub showdown_finalists: usize,
    /// Catalog prefix used as finalists when too few samples have played
    pub showdown_fallback_size: usize,
    /// Resolved matches per sample for full depth credit
    pub depth_target_per_sample: f64,
    pub coverage_weight: f64,
    pub depth_weight: f64,
    pub phase_bonus_weight: f64,
    /// Fixed RNG seed for reproducible pairings
    pub seed: Option<u64>,
}

impl Default for TournamentSettings {
    fn default() -> Self {
        Self {
            recent_exclusion: 20,
            max_pair_attempts: 50,
            refine_top_k: 15,
            refine_radius_factor: 0.3,
            showdown_finalists: 10,
            showdown_fallback_size: 8,
            depth_target_per_sample: 2.0,
            coverage_weight: 0.6,
            depth_weight: 0.3,
            phase_bonus_weight: 0.1,
            seed: None,
        }
    }
}

impl TournamentSettings {
    /// Reject values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.max_pair_attempts == 0 {
            return Err(Error::Config("max_pair_attempts must be at least 1".to_string()));
        }
        if self.refine_top_k == 0 {
            return Err(Error::Config("refine_top_k must be at least 1".to_string()));
        }
        if self.showdown_finalists < 2 || self.showdown_fallback_size < 2 {
            return Err(Error::Config(
                "showdown_finalists and showdown_fallback_size must be at least 2".to_string(),
            ));
        }
        if !(self.refine_radius_factor > 0.0 && self.refine_radius_factor.is_finite()) {
            return Err(Error::Config(format!(
                "refine_radius_factor must be positive, got {}",
                self.refine_radius_factor
            )));
        }
        if !(self.depth_target_per_sample > 0.0 && self.depth_target_per_sample.is_finite()) {
            return Err(Error::Config(format!(
                "depth_target_per_sample must be positive, got {}",
                self.depth_target_per_sample
            )));
        }
        for (name, weight) in [
            ("coverage_weight", self.coverage_weight),
            ("depth_weight", self.depth_weight),
            ("phase_bonus_weight", self.phase_bonus_weight),
        ] {
            if !(0.0..=1.0).contains(&weight) {
                return Err(Error::Config(format!("{} must be within [0, 1], got {}", name, weight)));
            }
        }
        Ok(())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5790
}

fn default_base_url() -> String {
    "/assets/audio".to_string()
}

impl TomlConfig {
    /// Parse TOML text and validate the tournament section
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: TomlConfig = toml::from_str(content)
            .map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))?;
        config.tournament.validate()?;
        Ok(config)
    }

    /// Load a config file that must exist
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Resolve and load the config file, falling back to defaults
    ///
    /// An explicitly named file (argument or environment) must exist and
    /// parse. The per-user default location is optional.
    pub fn resolve(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            info!("Loading config from {}", path.display());
            return Self::load(path);
        }

        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            let path = PathBuf::from(path);
            info!("Loading config from {} ({})", path.display(), CONFIG_ENV_VAR);
            return Self::load(&path);
        }

        if let Some(path) = default_config_path() {
            if path.exists() {
                info!("Loading config from {}", path.display());
                return Self::load(&path);
            }
        }

        warn!("No config file found, using built-in defaults");
        Ok(Self::default())
    }
}

/// Per-user config file location, if the platform has a config dir
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("absound").join("config.toml"))
}

/// Resolve the data folder following the documented priority order
pub fn resolve_data_dir(cli_arg: Option<&Path>, config: &TomlConfig) -> PathBuf {
    // Priority 1: Command-line argument
    if let Some(path) = cli_arg {
        return path.to_path_buf();
    }

    // Priority 2: Environment variable
    if let Ok(path) = std::env::var(DATA_DIR_ENV_VAR) {
        return PathBuf::from(path);
    }

    // Priority 3: TOML config file
    if let Some(path) = &config.data_dir {
        return path.clone();
    }

    // Priority 4: OS-dependent compiled default
    default_data_dir()
}

/// OS-dependent default data folder
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("absound"))
        .unwrap_or_else(|| PathBuf::from("./absound_data"))
}
