//! # Sample Buffer Marshaller
//!
//! Converts between libFLAC's per-channel sample planes and the single
//! interleaved buffer carried by [`Frame`](crate::Frame).

use crate::error::{CodecError, Result};

/// Stateless converter between planar and interleaved sample layouts.
pub struct SampleConverter;

impl SampleConverter {
    /// Interleave per-channel planes into one owned buffer.
    ///
    /// Element `i * planes.len() + c` of the output is `planes[c][i]`.
    /// Samples are copied unchanged; bit depth is not applied here.
    ///
    /// Every plane must hold at least `block_size` samples.
    pub fn interleave_planes(planes: &[&[i32]], block_size: usize) -> Vec<i32> {
        let channels = planes.len();
        let mut interleaved = Vec::with_capacity(block_size * channels);

        for i in 0..block_size {
            for plane in planes {
                interleaved.push(plane[i]);
            }
        }

        interleaved
    }

    /// Number of samples per channel in an interleaved buffer.
    ///
    /// A buffer whose length is not a multiple of `channels` is rejected
    /// instead of being truncated.
    pub fn block_count(buffer_len: usize, channels: u32) -> Result<usize> {
        if channels == 0 {
            return Err(CodecError::FormatMismatch(
                "frame declares zero channels".to_string(),
            ));
        }

        let channels = channels as usize;
        if buffer_len % channels != 0 {
            return Err(CodecError::FormatMismatch(format!(
                "buffer length {} is not a multiple of {} channels",
                buffer_len, channels
            )));
        }

        Ok(buffer_len / channels)
    }
}
