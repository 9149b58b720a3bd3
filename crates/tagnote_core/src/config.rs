//! Annotation engine configuration.
//!
//! Loaded from JSON. Every field has a default, so `{}` is a valid config.

use crate::codec::{CategoryCodec, CodecError, CodecTable};
use crate::surface::layout::BoxMetrics;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};

#[derive(Debug)]
pub enum ConfigError {
    Io { path: PathBuf, source: std::io::Error },
    Parse(serde_json::Error),
    Codec(CodecError),
    Metrics(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => {
                write!(f, "failed to read config `{}`: {source}", path.display())
            }
            Self::Parse(err) => write!(f, "invalid config json: {err}"),
            Self::Codec(err) => write!(f, "invalid codec table: {err}"),
            Self::Metrics(reason) => write!(f, "invalid surface metrics: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Parse(err) => Some(err),
            Self::Codec(err) => Some(err),
            Self::Metrics(_) => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Parse(value)
    }
}

impl From<CodecError> for ConfigError {
    fn from(value: CodecError) -> Self {
        Self::Codec(value)
    }
}

/// Settings shared by the codec, the surface and the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnnotationConfig {
    pub codec: CodecTable,
    pub surface: BoxMetrics,
    /// Ask before a mode switch drops spans.
    pub confirm_destructive_mode_switch: bool,
}

impl Default for AnnotationConfig {
    fn default() -> Self {
        Self {
            codec: CodecTable::default(),
            surface: BoxMetrics::default(),
            confirm_destructive_mode_switch: true,
        }
    }
}

impl AnnotationConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(raw: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        CategoryCodec::new(self.codec)?;
        self.surface.validate().map_err(ConfigError::Metrics)
    }

    /// Builds the codec described by `codec`.
    pub fn category_codec(&self) -> Result<CategoryCodec, ConfigError> {
        Ok(CategoryCodec::new(self.codec)?)
    }
}
