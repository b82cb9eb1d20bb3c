//! Callback dispatch shim.
//!
//! libFLAC only accepts plain `extern "C"` functions, so every callback lands
//! here first. Each trampoline resolves `client_data` through the registry to
//! the owning instance's context and forwards to it. Panics are caught at
//! this boundary and turned into the callback's abort status; an unknown
//! token is treated the same way.

use crate::decoder::{DecoderContext, ReadOutcome};
use crate::encoder::EncoderContext;
use crate::native::registry::{Registry, Token};
use crate::native::status;
use crate::frame::{StreamFormat, StreamInfo};
use libc::c_void;
use libflac_sys as ffi;
use parking_lot::Mutex;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, LazyLock};
use tracing::{error, warn};

pub(crate) static DECODERS: LazyLock<Registry<DecoderContext>> = LazyLock::new(Registry::new);
pub(crate) static ENCODERS: LazyLock<Registry<EncoderContext>> = LazyLock::new(Registry::new);

/// Run `body`, mapping a panic or a `None` to the callback's `fallback` status.
fn guarded<T>(callback: &'static str, fallback: T, body: impl FnOnce() -> Option<T>) -> T {
    match catch_unwind(AssertUnwindSafe(body)) {
        Ok(Some(status)) => status,
        Ok(None) => fallback,
        Err(_) => {
            error!(callback, "Panic caught at libFLAC callback boundary");
            fallback
        }
    }
}

fn decoder_context(client_data: *mut c_void) -> Option<Arc<Mutex<DecoderContext>>> {
    let context = DECODERS.lookup(Token::from_client_data(client_data));
    if context.is_none() {
        warn!("Decoder callback for an unregistered token");
    }
    context
}

fn encoder_context(client_data: *mut c_void) -> Option<Arc<Mutex<EncoderContext>>> {
    let context = ENCODERS.lookup(Token::from_client_data(client_data));
    if context.is_none() {
        warn!("Encoder callback for an unregistered token");
    }
    context
}

// ============================================================================
// Decoder trampolines
// ============================================================================

pub(crate) unsafe extern "C" fn decoder_read(
    _decoder: *const ffi::FLAC__StreamDecoder,
    buffer: *mut ffi::FLAC__byte,
    bytes: *mut usize,
    client_data: *mut c_void,
) -> ffi::FLAC__StreamDecoderReadStatus {
    guarded("read", ffi::FLAC__STREAM_DECODER_READ_STATUS_ABORT, || {
        if bytes.is_null() {
            return None;
        }
        let requested = *bytes;
        *bytes = 0;
        if requested == 0 || buffer.is_null() {
            return None;
        }

        let context = decoder_context(client_data)?;
        let buf = std::slice::from_raw_parts_mut(buffer, requested);
        let outcome = context.lock().read_into(buf);

        Some(match outcome {
            ReadOutcome::Continue(n) => {
                *bytes = n;
                ffi::FLAC__STREAM_DECODER_READ_STATUS_CONTINUE
            }
            ReadOutcome::EndOfStream => ffi::FLAC__STREAM_DECODER_READ_STATUS_END_OF_STREAM,
            ReadOutcome::Abort => ffi::FLAC__STREAM_DECODER_READ_STATUS_ABORT,
        })
    })
}

pub(crate) unsafe extern "C" fn decoder_write(
    _decoder: *const ffi::FLAC__StreamDecoder,
    frame: *const ffi::FLAC__Frame,
    buffer: *const *const ffi::FLAC__int32,
    client_data: *mut c_void,
) -> ffi::FLAC__StreamDecoderWriteStatus {
    guarded("write", ffi::FLAC__STREAM_DECODER_WRITE_STATUS_ABORT, || {
        if frame.is_null() || buffer.is_null() {
            return None;
        }
        let context = decoder_context(client_data)?;

        let header = &(*frame).header;
        let channels = header.channels as usize;
        let block_size = header.blocksize as usize;

        let mut planes = Vec::with_capacity(channels);
        for c in 0..channels {
            let plane = *buffer.add(c);
            if plane.is_null() {
                return None;
            }
            planes.push(std::slice::from_raw_parts(plane, block_size));
        }

        if context.lock().on_planes(&planes, block_size) {
            Some(ffi::FLAC__STREAM_DECODER_WRITE_STATUS_CONTINUE)
        } else {
            None
        }
    })
}

pub(crate) unsafe extern "C" fn decoder_metadata(
    _decoder: *const ffi::FLAC__StreamDecoder,
    metadata: *const ffi::FLAC__StreamMetadata,
    client_data: *mut c_void,
) {
    guarded("metadata", (), || {
        if metadata.is_null() || (*metadata).type_ != ffi::FLAC__METADATA_TYPE_STREAMINFO {
            // Other block types are not surfaced
            return Some(());
        }
        let context = decoder_context(client_data)?;

        let stream_info = &(*metadata).data.stream_info;
        context.lock().on_stream_info(StreamInfo {
            format: StreamFormat::new(
                stream_info.channels,
                stream_info.bits_per_sample,
                stream_info.sample_rate,
            ),
            total_samples: stream_info.total_samples,
        });
        Some(())
    })
}

pub(crate) unsafe extern "C" fn decoder_error(
    _decoder: *const ffi::FLAC__StreamDecoder,
    error_status: ffi::FLAC__StreamDecoderErrorStatus,
    client_data: *mut c_void,
) {
    guarded("error", (), || {
        let context = decoder_context(client_data)?;
        context.lock().on_error(status::decoder_error_status(error_status));
        Some(())
    })
}

// ============================================================================
// Encoder trampolines
// ============================================================================

pub(crate) unsafe extern "C" fn encoder_write(
    _encoder: *const ffi::FLAC__StreamEncoder,
    buffer: *const ffi::FLAC__byte,
    bytes: usize,
    _samples: u32,
    _current_frame: u32,
    client_data: *mut c_void,
) -> ffi::FLAC__StreamEncoderWriteStatus {
    guarded("write", ffi::FLAC__STREAM_ENCODER_WRITE_STATUS_FATAL_ERROR, || {
        if bytes == 0 {
            return Some(ffi::FLAC__STREAM_ENCODER_WRITE_STATUS_OK);
        }
        if buffer.is_null() {
            return None;
        }
        let context = encoder_context(client_data)?;
        let buf = std::slice::from_raw_parts(buffer, bytes);

        if context.lock().write_all(buf) {
            Some(ffi::FLAC__STREAM_ENCODER_WRITE_STATUS_OK)
        } else {
            None
        }
    })
}

pub(crate) unsafe extern "C" fn encoder_seek(
    _encoder: *const ffi::FLAC__StreamEncoder,
    absolute_byte_offset: ffi::FLAC__uint64,
    client_data: *mut c_void,
) -> ffi::FLAC__StreamEncoderSeekStatus {
    guarded("seek", ffi::FLAC__STREAM_ENCODER_SEEK_STATUS_ERROR, || {
        let context = encoder_context(client_data)?;
        if context.lock().seek_to(absolute_byte_offset) {
            Some(ffi::FLAC__STREAM_ENCODER_SEEK_STATUS_OK)
        } else {
            None
        }
    })
}

pub(crate) unsafe extern "C" fn encoder_tell(
    _encoder: *const ffi::FLAC__StreamEncoder,
    absolute_byte_offset: *mut ffi::FLAC__uint64,
    client_data: *mut c_void,
) -> ffi::FLAC__StreamEncoderTellStatus {
    guarded("tell", ffi::FLAC__STREAM_ENCODER_TELL_STATUS_ERROR, || {
        if absolute_byte_offset.is_null() {
            return None;
        }
        let context = encoder_context(client_data)?;
        let position = context.lock().position()?;
        *absolute_byte_offset = position;
        Some(ffi::FLAC__STREAM_ENCODER_TELL_STATUS_OK)
    })
}
