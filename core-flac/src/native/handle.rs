//! Exclusive ownership of libFLAC engine instances.
//!
//! Each handle owns one `FLAC__StreamDecoder`/`FLAC__StreamEncoder` and
//! releases it exactly once: either through an explicit `release()` or when
//! dropped. After release every accessor reports [`CodecError::Closed`].

use crate::error::{CodecError, Result};
use crate::native::status;
use libflac_sys as ffi;
use std::ptr::NonNull;
use tracing::trace;

/// Owned `FLAC__StreamDecoder`.
pub(crate) struct DecoderHandle {
    ptr: Option<NonNull<ffi::FLAC__StreamDecoder>>,
}

// libFLAC instances carry no thread affinity; exclusive ownership is enforced
// by `&mut` access through the owning Decoder.
unsafe impl Send for DecoderHandle {}

impl DecoderHandle {
    /// Allocate a fresh, uninitialized decoder.
    pub(crate) fn new() -> Result<Self> {
        let ptr = unsafe { ffi::FLAC__stream_decoder_new() };
        let ptr = NonNull::new(ptr).ok_or(CodecError::Creation("decoder"))?;
        trace!("Allocated native decoder");
        Ok(Self { ptr: Some(ptr) })
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut ffi::FLAC__StreamDecoder> {
        self.ptr.map(NonNull::as_ptr).ok_or(CodecError::Closed)
    }

    pub(crate) fn state(&self) -> Result<ffi::FLAC__StreamDecoderState> {
        let ptr = self.as_ptr()?;
        Ok(unsafe { ffi::FLAC__stream_decoder_get_state(ptr) })
    }

    /// Engine state rendered as its libFLAC name.
    pub(crate) fn state_string(&self) -> String {
        match self.state() {
            Ok(state) => status::decoder_state(state),
            Err(err) => err.to_string(),
        }
    }

    #[cfg(test)]
    pub(crate) fn is_released(&self) -> bool {
        self.ptr.is_none()
    }

    /// Finish and delete the engine.
    ///
    /// Returns libFLAC's finish verdict (`false` only on MD5 mismatch), or
    /// `None` when the handle was already released.
    pub(crate) fn release(&mut self) -> Option<bool> {
        let ptr = self.ptr.take()?;
        let finished = unsafe {
            let finished = ffi::FLAC__stream_decoder_finish(ptr.as_ptr()) != 0;
            ffi::FLAC__stream_decoder_delete(ptr.as_ptr());
            finished
        };
        trace!(finished, "Released native decoder");
        Some(finished)
    }
}

impl Drop for DecoderHandle {
    fn drop(&mut self) {
        self.release();
    }
}

/// Owned `FLAC__StreamEncoder`.
pub(crate) struct EncoderHandle {
    ptr: Option<NonNull<ffi::FLAC__StreamEncoder>>,
}

unsafe impl Send for EncoderHandle {}

impl EncoderHandle {
    /// Allocate a fresh, uninitialized encoder.
    pub(crate) fn new() -> Result<Self> {
        let ptr = unsafe { ffi::FLAC__stream_encoder_new() };
        let ptr = NonNull::new(ptr).ok_or(CodecError::Creation("encoder"))?;
        trace!("Allocated native encoder");
        Ok(Self { ptr: Some(ptr) })
    }

    pub(crate) fn as_ptr(&self) -> Result<*mut ffi::FLAC__StreamEncoder> {
        self.ptr.map(NonNull::as_ptr).ok_or(CodecError::Closed)
    }

    pub(crate) fn state_string(&self) -> String {
        match self.as_ptr() {
            Ok(ptr) => status::encoder_state(unsafe { ffi::FLAC__stream_encoder_get_state(ptr) }),
            Err(err) => err.to_string(),
        }
    }

    /// Flush, finish and delete the engine.
    ///
    /// Finishing drains buffered samples and rewrites STREAMINFO, so it can
    /// re-enter the write/seek/tell callbacks. A failed finish reports the
    /// engine state it stopped in. Returns `None` when the handle was already
    /// released.
    pub(crate) fn release(&mut self) -> Option<std::result::Result<(), String>> {
        let ptr = self.ptr.take()?;
        let outcome = unsafe {
            let outcome = if ffi::FLAC__stream_encoder_finish(ptr.as_ptr()) != 0 {
                Ok(())
            } else {
                Err(status::encoder_state(ffi::FLAC__stream_encoder_get_state(
                    ptr.as_ptr(),
                )))
            };
            ffi::FLAC__stream_encoder_delete(ptr.as_ptr());
            outcome
        };
        trace!(finished = outcome.is_ok(), "Released native encoder");
        Some(outcome)
    }
}

impl Drop for EncoderHandle {
    fn drop(&mut self) {
        self.release();
    }
}
