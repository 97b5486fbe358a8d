use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{Result, ShufflerError};

pub const DEFAULT_NUMBER_RANGE: u64 = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShufflerConfig {
    pub levels_dir: PathBuf,
    pub dats_dir: PathBuf,
    pub output_dir: PathBuf,
    pub audit_log: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    /// Distance either side of a level number when range grouping is on.
    pub number_range: u64,
}

impl Default for ShufflerConfig {
    fn default() -> Self {
        Self {
            levels_dir: PathBuf::from("levelstoshuffle"),
            dats_dir: PathBuf::from("recommendeddats"),
            output_dir: PathBuf::from("."),
            audit_log: Some(PathBuf::from("levelshuffle_audit.jsonl")),
            log_file: None,
            number_range: DEFAULT_NUMBER_RANGE,
        }
    }
}

impl ShufflerConfig {
    /// Read a JSON config. Fields left out keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            ShufflerError::Config(format!("cannot read config {}: {}", path.display(), e))
        })?;
        let config: Self = serde_json::from_str(&data)?;
        config.validate()?;
        Ok(config)
    }

    /// Like [`load`](Self::load), but anything short of a valid file gives the
    /// defaults.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                if path.exists() {
                    log::warn!("ignoring config {}: {}", path.display(), e);
                }
                Self::default()
            }
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.number_range == 0 {
            return Err(ShufflerError::Config(
                "number_range must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
