//! Decoder → encoder passthrough.

use crate::decoder::Decoder;
use crate::encoder::Encoder;
use crate::error::{CodecError, Result};
use tracing::{debug, instrument};

/// Read every remaining frame from `decoder` and write it to `encoder`.
///
/// Returns the number of interleaved samples copied. Neither side is closed;
/// the caller still has to `close()` the encoder to finish the output.
///
/// # Errors
///
/// Fails with [`CodecError::FormatMismatch`] before reading anything if the
/// two streams were declared with different formats, otherwise with the first
/// decode or encode error.
#[instrument(skip_all)]
pub fn copy_frames(decoder: &mut Decoder, encoder: &mut Encoder) -> Result<u64> {
    if decoder.format() != encoder.format() {
        return Err(CodecError::FormatMismatch(format!(
            "decoder produces {} but the encoder expects {}",
            decoder.format(),
            encoder.format()
        )));
    }

    let mut copied = 0u64;
    let mut frames = 0u64;
    for frame in decoder.frames() {
        let frame = frame?;
        encoder.write_frame(&frame)?;
        copied += frame.buffer().len() as u64;
        frames += 1;
    }

    debug!(frames, samples = copied, "Copied frames");
    Ok(copied)
}
