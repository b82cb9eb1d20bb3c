//! # Frame Types
//!
//! The language-level unit of audio exchanged with [`Decoder`](crate::Decoder)
//! and [`Encoder`](crate::Encoder), plus the stream parameters it is tagged with.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Bit depths the encoder accepts.
pub const SUPPORTED_DEPTHS: [u32; 2] = [16, 24];

/// Channel count, bit depth and sample rate of a stream.
///
/// `depth` is metadata: samples are always stored as `i32` regardless of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamFormat {
    /// Number of interleaved channels
    pub channels: u32,
    /// Bits per sample
    pub depth: u32,
    /// Samples per second, per channel
    pub rate: u32,
}

impl StreamFormat {
    pub fn new(channels: u32, depth: u32, rate: u32) -> Self {
        Self {
            channels,
            depth,
            rate,
        }
    }

    /// CD audio: stereo, 16-bit, 44.1 kHz.
    pub fn cd_quality() -> Self {
        Self::new(2, 16, 44100)
    }

    /// Returns `true` if the encoder can be declared with this format.
    pub fn is_encodable(&self) -> bool {
        self.channels > 0 && self.rate > 0 && SUPPORTED_DEPTHS.contains(&self.depth)
    }
}

impl fmt::Display for StreamFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ch/{}bit/{}Hz", self.channels, self.depth, self.rate)
    }
}

/// Stream parameters read from the STREAMINFO metadata block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamInfo {
    pub format: StreamFormat,
    /// Samples per channel in the whole stream, `0` when the encoder did not know.
    pub total_samples: u64,
}

impl StreamInfo {
    /// Number of interleaved samples the stream decodes to, if known.
    pub fn total_interleaved_samples(&self) -> Option<u64> {
        if self.total_samples == 0 {
            None
        } else {
            Some(self.total_samples * u64::from(self.format.channels))
        }
    }
}

/// An interleaved block of audio with the parameters it was produced under.
///
/// The sample for channel `c` at block index `i` sits at `i * channels + c`.
/// Frames are immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    format: StreamFormat,
    buffer: Vec<i32>,
}

impl Frame {
    /// Build a frame from an interleaved sample buffer.
    pub fn new(format: StreamFormat, buffer: Vec<i32>) -> Self {
        Self { format, buffer }
    }

    /// A frame carrying no samples.
    pub fn empty(format: StreamFormat) -> Self {
        Self::new(format, Vec::new())
    }

    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn channels(&self) -> u32 {
        self.format.channels
    }

    pub fn depth(&self) -> u32 {
        self.format.depth
    }

    pub fn rate(&self) -> u32 {
        self.format.rate
    }

    /// Interleaved samples.
    pub fn buffer(&self) -> &[i32] {
        &self.buffer
    }

    /// Samples per channel, rounded down.
    pub fn block_size(&self) -> usize {
        match self.format.channels {
            0 => 0,
            channels => self.buffer.len() / channels as usize,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Take ownership of the sample buffer.
    pub fn into_buffer(self) -> Vec<i32> {
        self.buffer
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encodable_formats() {
        assert!(StreamFormat::new(1, 16, 48000).is_encodable());
        assert!(StreamFormat::new(2, 24, 96000).is_encodable());
        assert!(!StreamFormat::new(0, 16, 44100).is_encodable());
        assert!(!StreamFormat::new(2, 8, 44100).is_encodable());
        assert!(!StreamFormat::new(2, 32, 44100).is_encodable());
        assert!(!StreamFormat::new(2, 16, 0).is_encodable());
    }

    #[test]
    fn test_frame_block_size() {
        let frame = Frame::new(StreamFormat::cd_quality(), vec![0; 200]);
        assert_eq!(frame.block_size(), 100);
        assert_eq!(frame.channels(), 2);
        assert_eq!(frame.depth(), 16);
        assert_eq!(frame.rate(), 44100);
        assert!(!frame.is_empty());
        assert!(Frame::empty(StreamFormat::cd_quality()).is_empty());
    }

    #[test]
    fn test_total_interleaved_samples() {
        let info = StreamInfo {
            format: StreamFormat::new(2, 16, 44100),
            total_samples: 1000,
        };
        assert_eq!(info.total_interleaved_samples(), Some(2000));

        let unknown = StreamInfo {
            total_samples: 0,
            ..info
        };
        assert_eq!(unknown.total_interleaved_samples(), None);
    }

    #[test]
    fn test_format_display() {
        assert_eq!(StreamFormat::new(1, 24, 48000).to_string(), "1ch/24bit/48000Hz");
    }
}
