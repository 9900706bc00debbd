use crate::cache::CacheLayout;
use crate::cli::ComputeActionsArgs;
use crate::error::ConfigError;
use crate::frame::GalactocentricFrame;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Settings shared by the batch pipeline and the calibration objective
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Config {
    pub cache: CacheLayout,
    #[serde(default)]
    pub frame: GalactocentricFrame,
}

impl Config {
    /// Reference frame with the cache rooted at `cache_root`
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache: CacheLayout::new(cache_root),
            frame: GalactocentricFrame::default(),
        }
    }

    pub fn with_frame(self, frame: GalactocentricFrame) -> Self {
        Self { frame, ..self }
    }

    pub fn from_args(args: &ComputeActionsArgs) -> Result<Self, ConfigError> {
        let config = Self::new(&args.cache_path);
        match &args.frame {
            Some(path) => Ok(config.with_frame(Self::read_frame(path)?)),
            None => Ok(config),
        }
    }

    /// Read a JSON frame file, missing fields take reference values
    pub fn read_frame(path: &Path) -> Result<GalactocentricFrame, ConfigError> {
        let json = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        serde_json::from_str(&json).map_err(|source| ConfigError::Json {
            path: path.to_owned(),
            source,
        })
    }
}
