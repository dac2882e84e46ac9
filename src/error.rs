//! Error types for the enhancement engines and their collaborators.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the engines and the profile layer.
///
/// Invalid parameters are programmer errors: engines report them instead of
/// silently clamping the value into range.
#[derive(Debug, Error)]
pub enum EnhanceError {
    #[error("invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },

    #[error("expected a 3-channel image, got {channels} channel(s)")]
    ChannelCount { channels: usize },

    #[error("configuration error: {0}")]
    Config(String),

    #[error("failed to read configuration {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse configuration: {0}")]
    ConfigParse(#[from] serde_yaml::Error),
}

impl EnhanceError {
    pub(crate) fn invalid(name: &'static str, value: impl Into<f64>, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value: value.into(),
            reason,
        }
    }
}

/// Signals returned by an image source for identities it cannot provide.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("image {identity} not found at {path}")]
    NotFound { identity: String, path: PathBuf },

    #[error("image {identity} at {path} is unreadable: {reason}")]
    Unreadable {
        identity: String,
        path: PathBuf,
        reason: String,
    },
}

/// Failures while persisting a comparison artifact.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode {path}: {source}")]
    Encode {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
}

pub type Result<T, E = EnhanceError> = std::result::Result<T, E>;
