//! # FLAC Decoder
//!
//! Drives a libFLAC stream decoder one block at a time and hands each decoded
//! block back as an owned, interleaved [`Frame`].
//!
//! ## Lifecycle
//!
//! ```text
//! open/from_source ──► MetadataReady ──► Reading ⟲ ──► EndOfStream
//!                                            │
//!                                            └──────► Errored
//!                       (any state) ── close() ──► Closed
//! ```
//!
//! Construction creates the engine, initializes its input and processes the
//! stream up to the end of metadata as a single step; a failure at any point
//! returns an error and no decoder. `close()` is idempotent and also runs on
//! drop.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use core_flac::Decoder;
//!
//! # fn example() -> core_flac::Result<()> {
//! let mut decoder = Decoder::open("/path/to/song.flac")?;
//! println!("Format: {}", decoder.format());
//!
//! for frame in decoder.frames() {
//!     let frame = frame?;
//!     println!("Decoded {} samples per channel", frame.block_size());
//! }
//! decoder.close()?;
//! # Ok(())
//! # }
//! ```

use crate::config::DecoderConfig;
use crate::error::{CodecError, Result};
use crate::frame::{Frame, StreamFormat, StreamInfo};
use crate::io::ByteSource;
use crate::native::callbacks::{self, DECODERS};
use crate::native::handle::DecoderHandle;
use crate::native::registry::Registration;
use crate::native::status;
use crate::sample_converter::SampleConverter;
use bytes::Bytes;
use core_runtime::logging::strip_path;
use libflac_sys as ffi;
use parking_lot::Mutex;
use std::ffi::CString;
use std::io::{self, Cursor};
use std::path::Path;
use tracing::{debug, error, info, instrument, warn};

/// Observable state of a [`Decoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecoderState {
    /// Metadata processed, no audio read yet.
    MetadataReady,
    /// At least one block has been read.
    Reading,
    /// The stream is exhausted; further reads keep reporting end of stream.
    EndOfStream,
    /// The engine reported a failure; the decoder should be closed.
    Errored,
    /// Native resources released.
    Closed,
}

impl DecoderState {
    /// Returns `true` if no further audio can be produced.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::EndOfStream | Self::Errored | Self::Closed)
    }
}

/// Result of one [`Decoder::read_frame`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameRead {
    /// Block decoded during this call, if any.
    pub frame: Option<Frame>,
    /// Set once the engine has reached the end of the stream.
    pub end_of_stream: bool,
}

impl FrameRead {
    fn end() -> Self {
        Self {
            frame: None,
            end_of_stream: true,
        }
    }
}

/// Outcome of a read callback, translated to a libFLAC status by the shim.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ReadOutcome {
    Continue(usize),
    EndOfStream,
    Abort,
}

/// State shared between a [`Decoder`] and its libFLAC callbacks.
///
/// Callbacks only run inside the decoder's own calls into libFLAC, on the same
/// thread, so the lock is never contended.
pub(crate) struct DecoderContext {
    source: Option<Box<dyn ByteSource>>,
    info: Option<StreamInfo>,
    error: Option<String>,
    pending: Option<Frame>,
}

impl DecoderContext {
    pub(crate) fn new(source: Option<Box<dyn ByteSource>>) -> Self {
        Self {
            source,
            info: None,
            error: None,
            pending: None,
        }
    }

    /// Fill `buf` from the byte source.
    pub(crate) fn read_into(&mut self, buf: &mut [u8]) -> ReadOutcome {
        if buf.is_empty() {
            return ReadOutcome::Abort;
        }
        let Some(source) = self.source.as_mut() else {
            return ReadOutcome::Abort;
        };

        loop {
            match source.read(buf) {
                Ok(0) => return ReadOutcome::EndOfStream,
                Ok(n) => return ReadOutcome::Continue(n),
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.error = Some(format!("byte source read failed: {}", e));
                    return ReadOutcome::Abort;
                }
            }
        }
    }

    pub(crate) fn on_stream_info(&mut self, info: StreamInfo) {
        debug!(format = %info.format, total_samples = info.total_samples, "STREAMINFO received");
        self.info = Some(info);
    }

    /// Interleave a decoded block into the pending slot.
    ///
    /// Returns `false` when the block cannot be represented in the stream's
    /// declared format, which aborts decoding.
    pub(crate) fn on_planes(&mut self, planes: &[&[i32]], block_size: usize) -> bool {
        let Some(info) = self.info else {
            self.error = Some("audio frame arrived before STREAMINFO".to_string());
            return false;
        };

        if planes.len() != info.format.channels as usize {
            self.error = Some(format!(
                "frame has {} channels but STREAMINFO declares {}",
                planes.len(),
                info.format.channels
            ));
            return false;
        }

        if self.pending.is_some() {
            warn!("Replacing an unconsumed decoded frame");
        }

        let buffer = SampleConverter::interleave_planes(planes, block_size);
        self.pending = Some(Frame::new(info.format, buffer));
        true
    }

    pub(crate) fn on_error(&mut self, message: String) {
        // Keep the first failure of a call; later ones are usually fallout
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }

    fn take_frame(&mut self) -> Option<Frame> {
        self.pending.take()
    }
}

/// FLAC stream decoder backed by libFLAC.
pub struct Decoder {
    handle: DecoderHandle,
    registration: Option<Registration<DecoderContext>>,
    info: StreamInfo,
    config: DecoderConfig,
    state: DecoderState,
    last_error: Option<String>,
    origin: String,
    frames_read: u64,
    samples_read: u64,
}

impl Decoder {
    /// Open a FLAC file; libFLAC opens and reads the file itself.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, DecoderConfig::default())
    }

    /// Open a FLAC file with explicit decoder configuration.
    #[instrument(skip_all)]
    pub fn open_with_config(path: impl AsRef<Path>, config: DecoderConfig) -> Result<Self> {
        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| {
            CodecError::Open(format!("path is not valid UTF-8: {}", path.display()))
        })?;
        let origin = strip_path(name).to_string();
        let c_name = CString::new(name)
            .map_err(|_| CodecError::Open(format!("{}: path contains a NUL byte", origin)))?;

        let registration = DECODERS.register(DecoderContext::new(None));
        let handle = DecoderHandle::new()?;
        Self::configure(&handle, &config)?;

        let init_status = unsafe {
            ffi::FLAC__stream_decoder_init_file(
                handle.as_ptr()?,
                c_name.as_ptr(),
                Some(callbacks::decoder_write),
                Some(callbacks::decoder_metadata),
                Some(callbacks::decoder_error),
                registration.token().as_client_data(),
            )
        };
        if init_status != ffi::FLAC__STREAM_DECODER_INIT_STATUS_OK {
            let reason = status::decoder_init_status(init_status);
            error!(file = %origin, %reason, "Failed to open FLAC file");
            return Err(CodecError::Open(format!("{}: {}", origin, reason)));
        }

        Self::finish_opening(registration, handle, config, origin)
    }

    /// Decode from a caller-supplied byte source, which the decoder now owns.
    pub fn from_source(source: impl ByteSource + 'static) -> Result<Self> {
        Self::from_source_with_config(source, DecoderConfig::default())
    }

    /// Decode an in-memory FLAC stream.
    pub fn from_bytes(data: Bytes) -> Result<Self> {
        Self::from_source(Cursor::new(data))
    }

    /// Decode from a byte source with explicit decoder configuration.
    #[instrument(skip_all)]
    pub fn from_source_with_config(
        source: impl ByteSource + 'static,
        config: DecoderConfig,
    ) -> Result<Self> {
        let registration = DECODERS.register(DecoderContext::new(Some(Box::new(source))));
        let handle = DecoderHandle::new()?;
        Self::configure(&handle, &config)?;

        let init_status = unsafe {
            ffi::FLAC__stream_decoder_init_stream(
                handle.as_ptr()?,
                Some(callbacks::decoder_read),
                None,
                None,
                None,
                None,
                Some(callbacks::decoder_write),
                Some(callbacks::decoder_metadata),
                Some(callbacks::decoder_error),
                registration.token().as_client_data(),
            )
        };
        if init_status != ffi::FLAC__STREAM_DECODER_INIT_STATUS_OK {
            let reason = status::decoder_init_status(init_status);
            error!(%reason, "Failed to initialize FLAC stream decoder");
            return Err(CodecError::Open(reason));
        }

        Self::finish_opening(registration, handle, config, "byte source".to_string())
    }

    fn configure(handle: &DecoderHandle, config: &DecoderConfig) -> Result<()> {
        let ptr = handle.as_ptr()?;
        let accepted = unsafe {
            ffi::FLAC__stream_decoder_set_md5_checking(ptr, config.md5_checking as ffi::FLAC__bool)
        };
        if accepted == 0 {
            return Err(CodecError::InvalidConfig(
                "md5_checking rejected by the native decoder".to_string(),
            ));
        }
        Ok(())
    }

    /// Process metadata and build the decoder, or fail with `Metadata`.
    ///
    /// Parameters drop in reverse order, so on failure the handle is
    /// finished before the registration goes away.
    fn finish_opening(
        registration: Registration<DecoderContext>,
        handle: DecoderHandle,
        config: DecoderConfig,
        origin: String,
    ) -> Result<Self> {
        let processed =
            unsafe { ffi::FLAC__stream_decoder_process_until_end_of_metadata(handle.as_ptr()?) }
                != 0;

        let (info, callback_error) = {
            let mut context = registration.context().lock();
            (context.info, context.take_error())
        };

        if !processed || callback_error.is_some() {
            let reason = callback_error.unwrap_or_else(|| handle.state_string());
            error!(source = %origin, %reason, "Metadata processing failed");
            return Err(CodecError::Metadata(reason));
        }

        let info = match info {
            Some(info) if info.format.channels > 0 => info,
            _ => {
                error!(source = %origin, "Stream has no STREAMINFO block");
                return Err(CodecError::Metadata("no STREAMINFO block found".to_string()));
            }
        };

        info!(
            source = %origin,
            format = %info.format,
            total_samples = info.total_samples,
            "Opened FLAC stream"
        );

        Ok(Self {
            handle,
            registration: Some(registration),
            info,
            config,
            state: DecoderState::MetadataReady,
            last_error: None,
            origin,
            frames_read: 0,
            samples_read: 0,
        })
    }

    /// Stream parameters from STREAMINFO.
    pub fn info(&self) -> StreamInfo {
        self.info
    }

    pub fn format(&self) -> StreamFormat {
        self.info.format
    }

    pub fn channels(&self) -> u32 {
        self.info.format.channels
    }

    pub fn depth(&self) -> u32 {
        self.info.format.depth
    }

    pub fn rate(&self) -> u32 {
        self.info.format.rate
    }

    /// Samples per channel declared by STREAMINFO, `0` if unknown.
    pub fn total_samples(&self) -> u64 {
        self.info.total_samples
    }

    pub fn state(&self) -> DecoderState {
        self.state
    }

    fn context(&self) -> Result<&Mutex<DecoderContext>> {
        self.registration
            .as_ref()
            .map(Registration::context)
            .ok_or(CodecError::Closed)
    }

    /// Decode the next block.
    ///
    /// Each call advances the engine by one block and returns at most one
    /// frame. Once the end of the stream is reached every later call returns
    /// `end_of_stream` with no frame. The final frame may arrive either with
    /// the end-of-stream flag or one call before it.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Decode`] if the engine or the byte source failed during
    ///   this call; the decoder is then unusable and should be closed.
    /// - [`CodecError::Closed`] after [`close`](Self::close).
    pub fn read_frame(&mut self) -> Result<FrameRead> {
        match self.state {
            DecoderState::Closed => return Err(CodecError::Closed),
            DecoderState::Errored => {
                return Err(CodecError::Decode(
                    self.last_error.clone().unwrap_or_default(),
                ))
            }
            DecoderState::EndOfStream => return Ok(FrameRead::end()),
            DecoderState::MetadataReady | DecoderState::Reading => {}
        }

        let ptr = self.handle.as_ptr()?;
        let processed = unsafe { ffi::FLAC__stream_decoder_process_single(ptr) } != 0;

        let (frame, callback_error) = {
            let mut context = self.context()?.lock();
            (context.take_frame(), context.take_error())
        };

        if !processed || callback_error.is_some() {
            let reason = callback_error.unwrap_or_else(|| self.handle.state_string());
            error!(source = %self.origin, %reason, frames_read = self.frames_read, "Decoding failed");
            self.state = DecoderState::Errored;
            self.last_error = Some(reason.clone());
            return Err(CodecError::Decode(reason));
        }

        if let Some(frame) = &frame {
            self.frames_read += 1;
            self.samples_read += frame.buffer().len() as u64;
        }

        if self.handle.state()? == ffi::FLAC__STREAM_DECODER_END_OF_STREAM {
            debug!(
                source = %self.origin,
                frames_read = self.frames_read,
                with_frame = frame.is_some(),
                "Reached end of stream"
            );
            self.state = DecoderState::EndOfStream;
            return Ok(FrameRead {
                frame,
                end_of_stream: true,
            });
        }

        self.state = DecoderState::Reading;
        Ok(FrameRead {
            frame,
            end_of_stream: false,
        })
    }

    /// Iterate over the remaining frames.
    ///
    /// The iterator ends after the end of the stream, or after yielding the
    /// first error.
    pub fn frames(&mut self) -> Frames<'_> {
        Frames {
            decoder: self,
            done: false,
        }
    }

    /// Release the native decoder and close an owned byte source.
    ///
    /// Safe to call more than once; only the first call does any work.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Decode`] if MD5 checking was enabled, the stream was
    ///   read to its end and the decoded audio did not match the signature.
    /// - [`CodecError::Io`] if closing the byte source failed.
    pub fn close(&mut self) -> Result<()> {
        if self.state == DecoderState::Closed {
            return Ok(());
        }
        let reached_end = self.state == DecoderState::EndOfStream;
        self.state = DecoderState::Closed;

        let finished = self.handle.release();
        let source = match self.registration.take() {
            Some(registration) => {
                let source = registration.context().lock().source.take();
                source
            }
            None => None,
        };

        info!(
            source = %self.origin,
            frames_read = self.frames_read,
            samples_read = self.samples_read,
            "Closed FLAC decoder"
        );

        let source_result = match source {
            Some(mut source) => source.close(),
            None => Ok(()),
        };

        if self.config.md5_checking && reached_end && finished == Some(false) {
            error!(source = %self.origin, "MD5 signature mismatch");
            return Err(CodecError::Decode(
                "decoded audio does not match the STREAMINFO MD5 signature".to_string(),
            ));
        }

        source_result.map_err(CodecError::from)
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(source = %self.origin, "Error while closing decoder on drop: {}", e);
        }
    }
}

/// Iterator over a decoder's remaining frames, see [`Decoder::frames`].
pub struct Frames<'a> {
    decoder: &'a mut Decoder,
    done: bool,
}

impl Iterator for Frames<'_> {
    type Item = Result<Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            match self.decoder.read_frame() {
                Ok(read) => {
                    self.done = read.end_of_stream;
                    if let Some(frame) = read.frame {
                        return Some(Ok(frame));
                    }
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
