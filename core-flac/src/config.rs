//! # Codec Configuration
//!
//! Optional tuning applied to the native engine before stream initialization.
//! Leaving every field at its default keeps libFLAC's own defaults, which is
//! what makes a decode/re-encode round trip byte-identical.

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};

/// Highest compression preset libFLAC understands.
pub const MAX_COMPRESSION_LEVEL: u32 = 8;

/// Smallest block size allowed in a FLAC frame.
pub const MIN_BLOCK_SIZE: u32 = 16;

/// Largest block size allowed in a FLAC frame.
pub const MAX_BLOCK_SIZE: u32 = 65535;

/// Encoder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Compression preset, 0 (fastest) to 8 (smallest).
    ///
    /// Default: `None` (engine default, level 5).
    #[serde(default)]
    pub compression_level: Option<u32>,

    /// Samples per channel in each encoded frame.
    ///
    /// Default: `None` (engine default, 4096 at level 5).
    #[serde(default)]
    pub block_size: Option<u32>,

    /// Run a verification decoder alongside the encoder.
    ///
    /// Default: false.
    #[serde(default)]
    pub verify: bool,

    /// Expected samples per channel, written into STREAMINFO up front.
    ///
    /// Only useful for sinks that cannot seek back to patch the header.
    #[serde(default)]
    pub total_samples_estimate: Option<u64>,
}

impl EncoderConfig {
    /// Fastest preset (compression level 0).
    pub fn fast() -> Self {
        Self {
            compression_level: Some(0),
            ..Default::default()
        }
    }

    /// Smallest-output preset (compression level 8) with verification.
    pub fn best() -> Self {
        Self {
            compression_level: Some(MAX_COMPRESSION_LEVEL),
            verify: true,
            ..Default::default()
        }
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    pub fn with_block_size(mut self, block_size: u32) -> Self {
        self.block_size = Some(block_size);
        self
    }

    pub fn with_verify(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    pub fn with_total_samples_estimate(mut self, total_samples: u64) -> Self {
        self.total_samples_estimate = Some(total_samples);
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if let Some(level) = self.compression_level {
            if level > MAX_COMPRESSION_LEVEL {
                return Err(CodecError::InvalidConfig(format!(
                    "compression_level must be between 0 and {}, got {}",
                    MAX_COMPRESSION_LEVEL, level
                )));
            }
        }

        if let Some(block_size) = self.block_size {
            if !(MIN_BLOCK_SIZE..=MAX_BLOCK_SIZE).contains(&block_size) {
                return Err(CodecError::InvalidConfig(format!(
                    "block_size must be between {} and {}, got {}",
                    MIN_BLOCK_SIZE, MAX_BLOCK_SIZE, block_size
                )));
            }
        }

        Ok(())
    }
}

/// Decoder configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecoderConfig {
    /// Compare the decoded audio's MD5 against the STREAMINFO signature.
    ///
    /// A mismatch is reported by `Decoder::close()` once the stream has been
    /// read to its end. Default: false.
    #[serde(default)]
    pub md5_checking: bool,
}

impl DecoderConfig {
    pub fn with_md5_checking(mut self, enabled: bool) -> Self {
        self.md5_checking = enabled;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_keeps_engine_defaults() {
        let config = EncoderConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.compression_level, None);
        assert_eq!(config.block_size, None);
        assert!(!config.verify);
        assert_eq!(config.total_samples_estimate, None);
    }

    #[test]
    fn test_presets() {
        let fast = EncoderConfig::fast();
        assert!(fast.validate().is_ok());
        assert_eq!(fast.compression_level, Some(0));

        let best = EncoderConfig::best();
        assert!(best.validate().is_ok());
        assert_eq!(best.compression_level, Some(8));
        assert!(best.verify);
    }

    #[test]
    fn test_config_validation() {
        let mut config = EncoderConfig::default();

        // Invalid: compression level out of range
        config.compression_level = Some(9);
        assert!(matches!(config.validate(), Err(CodecError::InvalidConfig(_))));
        config.compression_level = Some(8);
        assert!(config.validate().is_ok());

        // Invalid: block size too small
        config.block_size = Some(15);
        assert!(config.validate().is_err());

        // Invalid: block size too large
        config.block_size = Some(65536);
        assert!(config.validate().is_err());

        config.block_size = Some(1152);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = EncoderConfig::default()
            .with_compression_level(3)
            .with_block_size(2048)
            .with_verify(true)
            .with_total_samples_estimate(48000);

        assert_eq!(config.compression_level, Some(3));
        assert_eq!(config.block_size, Some(2048));
        assert!(config.verify);
        assert_eq!(config.total_samples_estimate, Some(48000));
    }

    #[test]
    fn test_deserialize_with_defaults() {
        let config: EncoderConfig = serde_json::from_str(r#"{"compression_level": 2}"#).unwrap();
        assert_eq!(config.compression_level, Some(2));
        assert_eq!(config.block_size, None);
        assert!(!config.verify);

        let decoder: DecoderConfig = serde_json::from_str("{}").unwrap();
        assert!(!decoder.md5_checking);
        assert!(DecoderConfig::default().with_md5_checking(true).md5_checking);
    }
}
