use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{
    error::EngineError,
    grid::{DEFAULT_DIVISION, Grid},
    history::DEFAULT_HISTORY_LIMIT,
    model::DEFAULT_BPM,
    shuffle::{DEFAULT_SUB_CHUNKS, MagicConfig},
    waveform::ReducerConfig,
};

pub const CONFIG_FILE_NAME: &str = "loopsmith.config.toml";
pub const CONFIG_PATH_ENV: &str = "LOOPSMITH_CONFIG_PATH";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub reducer: ReducerConfig,
    pub grid: GridConfig,
    pub shuffle: ShuffleConfig,
    pub editor: EditorConfig,
    pub diagnostics: DiagnosticsConfig,
    pub paths: PathsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GridConfig {
    pub bpm: f64,
    pub division: u32,
    pub snap_enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShuffleConfig {
    pub sub_chunks: usize,
    pub magic: MagicConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EditorConfig {
    pub history_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiagnosticsConfig {
    pub rust_log_filter: String,
    pub trace_file_prefix: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PathsConfig {
    pub logs_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            bpm: DEFAULT_BPM,
            division: DEFAULT_DIVISION,
            snap_enabled: true,
        }
    }
}

impl Default for ShuffleConfig {
    fn default() -> Self {
        Self {
            sub_chunks: DEFAULT_SUB_CHUNKS,
            magic: MagicConfig::default(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl Default for DiagnosticsConfig {
    fn default() -> Self {
        Self {
            rust_log_filter: "info,loopsmith_core=trace".to_string(),
            trace_file_prefix: "loopsmith".to_string(),
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            logs_dir: PathBuf::from("logs"),
            output_dir: PathBuf::from("data/output"),
        }
    }
}

impl GridConfig {
    /// Bad tempo settings in a config file are an error, not a silent default.
    pub fn to_grid(&self) -> Result<Grid, EngineError> {
        Grid::new(self.bpm, self.division)
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content).context("failed to parse config TOML")?;
        config.grid.to_grid().context("config grid section is invalid")?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to load config from {}", path.display()))
    }

    pub fn load() -> Result<Self> {
        let config_path = discover_config_path().with_context(|| {
            format!("failed to locate {CONFIG_FILE_NAME}; looked in cwd and parent directory")
        })?;
        Self::load_from(&config_path)
    }

    /// Like [`Self::load`] but falls back to defaults when no file exists.
    /// A file that exists and fails to parse is still an error.
    pub fn load_or_default() -> Result<Self> {
        match discover_config_path() {
            Ok(path) => Self::load_from(&path),
            Err(_) => {
                debug!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }
}

fn discover_config_path() -> Result<PathBuf> {
    if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
        let path = PathBuf::from(path);
        if path.is_file() {
            return Ok(path);
        }
    }

    let cwd = env::current_dir().context("failed to resolve current directory")?;
    let candidates = [
        cwd.join(CONFIG_FILE_NAME),
        cwd.join("..").join(CONFIG_FILE_NAME),
    ];

    candidates
        .into_iter()
        .find(|path| path.is_file())
        .ok_or_else(|| anyhow::anyhow!("{CONFIG_FILE_NAME} not found"))
}
