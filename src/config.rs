/// Optional `remind.toml` settings and the command line
///
/// ```toml
/// [general]
/// template_dir = "."
/// rdm_gateway = "//server/gateway"
/// font_size = 13.0
/// theme = "dark"
/// ```

use std::path::{Path, PathBuf};

use clap::Parser;
use serde::Deserialize;

use crate::error::{ReadmeError, Result};
use crate::gui::theme::{AppTheme, DEFAULT_FONT_SIZE, MAX_FONT_SIZE, MIN_FONT_SIZE};

pub const DEFAULT_CONFIG_FILE: &str = "remind.toml";

#[derive(Parser, Debug)]
#[command(name = "remind_gui")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Settings file (defaults to ./remind.toml when present)
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Image (.czi, .lif, .nd2) or ReadMe (.txt) to open at startup
    pub file: Option<PathBuf>,
}

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Directory searched for `*_ReadME_template.txt` files
    pub template_dir: PathBuf,
    /// Directory whose sub-folders are the RDM projects; not checked when unset
    pub rdm_gateway: Option<PathBuf>,
    pub font_size: f32,
    pub theme: AppTheme,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            template_dir: PathBuf::from("."),
            rdm_gateway: None,
            font_size: DEFAULT_FONT_SIZE,
            theme: AppTheme::default(),
        }
    }
}

impl Config {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ReadmeError::io(path, e))?;
        Self::from_str(&content)
    }

    pub fn from_str(content: &str) -> Result<Self> {
        let mut config: Config =
            toml::from_str(content).map_err(|e| ReadmeError::Config(e.to_string()))?;
        config.general.font_size = config.general.font_size.clamp(MIN_FONT_SIZE, MAX_FONT_SIZE);
        Ok(config)
    }

    /// Load `path` (or `./remind.toml`). A missing file gives the defaults;
    /// an unreadable or malformed one is logged and also gives the defaults.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let path = path.unwrap_or_else(|| Path::new(DEFAULT_CONFIG_FILE));
        if !path.exists() {
            log::debug!("No configuration at {}, using defaults", path.display());
            return Self::default();
        }
        match Self::from_file(path) {
            Ok(config) => {
                log::info!("Loaded configuration from {}", path.display());
                config
            }
            Err(e) => {
                log::error!("{} ({}), using defaults", e, path.display());
                Self::default()
            }
        }
    }
}
