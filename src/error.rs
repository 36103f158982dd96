use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ConfigError>;

/// Failures that leave the process without a usable configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("open config err: {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("decode config err: {path}: {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("decode config err: {path}: no JSON value in file")]
    Empty { path: PathBuf },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Open { path, .. } => path,
            ConfigError::Decode { path, .. } => path,
            ConfigError::Empty { path } => path,
        }
    }
}
