//! Configuration types for ucm

use serde::{Deserialize, Serialize};

use crate::codec::Endian;
use crate::{Result, UcmError};

/// Main configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Decode limits
    #[serde(default)]
    pub limits: LimitsConfig,
    /// Output options
    #[serde(default)]
    pub output: OutputConfig,
}

/// Upper bounds applied while decoding.
///
/// Counts read from a corrupt file are checked against these before any
/// allocation is sized from them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of header items
    pub max_header_items: usize,
    /// Maximum length of any string, in bytes
    pub max_string_len: usize,
    /// Maximum element count of a header vector
    pub max_vector_len: usize,
    /// Maximum number of CCDs
    pub max_ccds: usize,
    /// Maximum number of windows per CCD
    pub max_windows: usize,
    /// Maximum number of pixels in one window
    pub max_window_pixels: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_header_items: 65_536,
            max_string_len: 1024 * 1024,
            max_vector_len: 1024 * 1024,
            max_ccds: 1024,
            max_windows: 4096,
            max_window_pixels: 64 * 1024 * 1024,
        }
    }
}

/// Byte order used when writing
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Host byte order
    #[default]
    Native,
    /// Little-endian
    Little,
    /// Big-endian
    Big,
}

impl ByteOrder {
    /// Resolve to a concrete byte order
    #[must_use]
    pub fn endian(self) -> Endian {
        match self {
            ByteOrder::Native => Endian::NATIVE,
            ByteOrder::Little => Endian::Little,
            ByteOrder::Big => Endian::Big,
        }
    }
}

/// Output options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Byte order of written files
    pub byte_order: ByteOrder,
    /// Append `.ucm` to file names that lack it
    pub append_extension: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            byte_order: ByteOrder::Native,
            append_extension: true,
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    ///
    /// # Errors
    ///
    /// Returns error if file cannot be read or parsed
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| UcmError::ConfigError(format!("Failed to read config file: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| UcmError::ConfigError(format!("Failed to parse config: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns error if any limit is zero
    pub fn validate(&self) -> Result<()> {
        let limits = &self.limits;
        for (name, value) in [
            ("max_header_items", limits.max_header_items),
            ("max_string_len", limits.max_string_len),
            ("max_vector_len", limits.max_vector_len),
            ("max_ccds", limits.max_ccds),
            ("max_windows", limits.max_windows),
            ("max_window_pixels", limits.max_window_pixels),
        ] {
            if value == 0 {
                return Err(UcmError::ConfigError(format!("{name} must be > 0")));
            }
        }

        Ok(())
    }
}
