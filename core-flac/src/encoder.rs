//! # FLAC Encoder
//!
//! Feeds interleaved [`Frame`]s into a libFLAC stream encoder, writing either
//! to a file libFLAC manages itself or to a seekable [`ByteSink`].
//!
//! The stream format is fixed at construction. Every frame written must carry
//! exactly that format; a mismatched frame is rejected without touching the
//! engine, so the encoder stays usable.
//!
//! `close()` must run for the output to be complete: finishing drains the
//! engine's buffered samples and patches STREAMINFO with the final sample
//! count and MD5 signature. Dropping an open encoder closes it as a fallback.

use crate::config::EncoderConfig;
use crate::error::{CodecError, Result};
use crate::frame::{Frame, StreamFormat, SUPPORTED_DEPTHS};
use crate::io::ByteSink;
use crate::native::callbacks::{self, ENCODERS};
use crate::native::handle::EncoderHandle;
use crate::native::registry::Registration;
use crate::native::status;
use crate::sample_converter::SampleConverter;
use core_runtime::logging::strip_path;
use libflac_sys as ffi;
use std::ffi::CString;
use std::io::SeekFrom;
use std::path::Path;
use std::ptr;
use tracing::{debug, error, info, instrument, trace, warn};

/// Observable state of an [`Encoder`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderState {
    /// Initialized, nothing written yet.
    Ready,
    /// At least one non-empty frame has been accepted.
    Encoding,
    /// The engine reported a failure; the encoder should be closed.
    Errored,
    /// Stream finished and native resources released.
    Closed,
}

/// State shared between an [`Encoder`] in sink mode and its callbacks.
pub(crate) struct EncoderContext {
    sink: Option<Box<dyn ByteSink>>,
    error: Option<String>,
}

impl EncoderContext {
    pub(crate) fn new(sink: Option<Box<dyn ByteSink>>) -> Self {
        Self { sink, error: None }
    }

    pub(crate) fn write_all(&mut self, buf: &[u8]) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.write_all(buf) {
            Ok(()) => true,
            Err(e) => {
                self.record(format!("byte sink write failed: {}", e));
                false
            }
        }
    }

    pub(crate) fn seek_to(&mut self, offset: u64) -> bool {
        let Some(sink) = self.sink.as_mut() else {
            return false;
        };
        match sink.seek(SeekFrom::Start(offset)) {
            Ok(_) => true,
            Err(e) => {
                self.record(format!("byte sink seek to {} failed: {}", offset, e));
                false
            }
        }
    }

    pub(crate) fn position(&mut self) -> Option<u64> {
        let sink = self.sink.as_mut()?;
        match sink.stream_position() {
            Ok(position) => Some(position),
            Err(e) => {
                self.record(format!("byte sink tell failed: {}", e));
                None
            }
        }
    }

    fn record(&mut self, message: String) {
        if self.error.is_none() {
            self.error = Some(message);
        }
    }

    pub(crate) fn take_error(&mut self) -> Option<String> {
        self.error.take()
    }
}

/// FLAC stream encoder backed by libFLAC.
pub struct Encoder {
    handle: EncoderHandle,
    registration: Option<Registration<EncoderContext>>,
    format: StreamFormat,
    state: EncoderState,
    last_error: Option<String>,
    origin: String,
    frames_written: u64,
    samples_written: u64,
}

impl Encoder {
    /// Create `path` and encode into it with libFLAC's default settings.
    pub fn create(path: impl AsRef<Path>, channels: u32, depth: u32, rate: u32) -> Result<Self> {
        Self::create_with_config(
            path,
            StreamFormat::new(channels, depth, rate),
            EncoderConfig::default(),
        )
    }

    /// Create `path` and encode into it with explicit configuration.
    #[instrument(skip_all, fields(format = %format))]
    pub fn create_with_config(
        path: impl AsRef<Path>,
        format: StreamFormat,
        config: EncoderConfig,
    ) -> Result<Self> {
        validate_format(format)?;
        config.validate()?;

        let path = path.as_ref();
        let name = path.to_str().ok_or_else(|| {
            CodecError::Open(format!("path is not valid UTF-8: {}", path.display()))
        })?;
        let origin = strip_path(name).to_string();
        let c_name = CString::new(name)
            .map_err(|_| CodecError::Open(format!("{}: path contains a NUL byte", origin)))?;

        let handle = EncoderHandle::new()?;
        configure(&handle, format, &config)?;

        let init_status = unsafe {
            ffi::FLAC__stream_encoder_init_file(
                handle.as_ptr()?,
                c_name.as_ptr(),
                None,
                ptr::null_mut(),
            )
        };
        if init_status != ffi::FLAC__STREAM_ENCODER_INIT_STATUS_OK {
            let reason = init_failure(&handle, init_status);
            error!(file = %origin, %reason, "Failed to create FLAC file");
            return Err(CodecError::Open(format!("{}: {}", origin, reason)));
        }

        info!(file = %origin, %format, "Created FLAC encoder");
        Ok(Self::ready(handle, None, format, origin))
    }

    /// Encode into a caller-supplied sink, which the encoder now owns.
    pub fn to_sink(
        sink: impl ByteSink + 'static,
        channels: u32,
        depth: u32,
        rate: u32,
    ) -> Result<Self> {
        Self::to_sink_with_config(
            sink,
            StreamFormat::new(channels, depth, rate),
            EncoderConfig::default(),
        )
    }

    /// Encode into a sink with explicit configuration.
    #[instrument(skip_all, fields(format = %format))]
    pub fn to_sink_with_config(
        sink: impl ByteSink + 'static,
        format: StreamFormat,
        config: EncoderConfig,
    ) -> Result<Self> {
        validate_format(format)?;
        config.validate()?;

        let registration = ENCODERS.register(EncoderContext::new(Some(Box::new(sink))));
        let handle = EncoderHandle::new()?;
        configure(&handle, format, &config)?;

        let init_status = unsafe {
            ffi::FLAC__stream_encoder_init_stream(
                handle.as_ptr()?,
                Some(callbacks::encoder_write),
                Some(callbacks::encoder_seek),
                Some(callbacks::encoder_tell),
                None,
                registration.token().as_client_data(),
            )
        };
        if init_status != ffi::FLAC__STREAM_ENCODER_INIT_STATUS_OK {
            let reason = registration
                .context()
                .lock()
                .take_error()
                .unwrap_or_else(|| init_failure(&handle, init_status));
            error!(%reason, "Failed to initialize FLAC stream encoder");
            return Err(CodecError::Open(reason));
        }

        info!(%format, "Created FLAC encoder on byte sink");
        Ok(Self::ready(
            handle,
            Some(registration),
            format,
            "byte sink".to_string(),
        ))
    }

    fn ready(
        handle: EncoderHandle,
        registration: Option<Registration<EncoderContext>>,
        format: StreamFormat,
        origin: String,
    ) -> Self {
        Self {
            handle,
            registration,
            format,
            state: EncoderState::Ready,
            last_error: None,
            origin,
            frames_written: 0,
            samples_written: 0,
        }
    }

    /// Format every written frame must match.
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    pub fn state(&self) -> EncoderState {
        self.state
    }

    /// Interleaved samples accepted so far.
    pub fn samples_written(&self) -> u64 {
        self.samples_written
    }

    /// Encode one frame.
    ///
    /// An empty frame is accepted and changes nothing. A frame whose format
    /// differs from the encoder's, or whose buffer length is not a multiple
    /// of its channel count, is rejected with [`CodecError::FormatMismatch`]
    /// and leaves the encoder usable.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Encode`] if the engine or the sink failed; the encoder
    ///   is then unusable and should be closed.
    /// - [`CodecError::Closed`] after [`close`](Self::close).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        match self.state {
            EncoderState::Closed => return Err(CodecError::Closed),
            EncoderState::Errored => {
                return Err(CodecError::Encode(
                    self.last_error.clone().unwrap_or_default(),
                ))
            }
            EncoderState::Ready | EncoderState::Encoding => {}
        }

        if frame.format() != self.format {
            warn!(expected = %self.format, actual = %frame.format(), "Rejected mismatched frame");
            return Err(CodecError::FormatMismatch(format!(
                "frame is {} but the encoder was declared {}",
                frame.format(),
                self.format
            )));
        }

        if frame.is_empty() {
            return Ok(());
        }

        let blocks = SampleConverter::block_count(frame.buffer().len(), self.format.channels)?;
        let blocks = u32::try_from(blocks).map_err(|_| {
            CodecError::FormatMismatch(format!("{} samples per channel exceeds one call", blocks))
        })?;

        let ptr = self.handle.as_ptr()?;
        let processed = unsafe {
            ffi::FLAC__stream_encoder_process_interleaved(ptr, frame.buffer().as_ptr(), blocks)
        } != 0;

        if !processed {
            let reason = self
                .registration
                .as_ref()
                .and_then(|registration| registration.context().lock().take_error())
                .unwrap_or_else(|| self.handle.state_string());
            error!(sink = %self.origin, %reason, frames_written = self.frames_written, "Encoding failed");
            self.state = EncoderState::Errored;
            self.last_error = Some(reason.clone());
            return Err(CodecError::Encode(reason));
        }

        self.frames_written += 1;
        self.samples_written += frame.buffer().len() as u64;
        self.state = EncoderState::Encoding;
        trace!(blocks, "Encoded frame");
        Ok(())
    }

    /// Finish the stream, release the native encoder and close an owned sink.
    ///
    /// Safe to call more than once; only the first call does any work.
    ///
    /// # Errors
    ///
    /// - [`CodecError::Encode`] if finishing the stream failed, or if an
    ///   earlier write already left the encoder errored; the output is then
    ///   incomplete.
    /// - [`CodecError::Io`] if closing the sink failed.
    pub fn close(&mut self) -> Result<()> {
        if self.state == EncoderState::Closed {
            return Ok(());
        }
        // libFLAC's finish reports success for an engine already in an error state
        let earlier_failure = if self.state == EncoderState::Errored {
            Some(self.last_error.clone().unwrap_or_default())
        } else {
            None
        };
        self.state = EncoderState::Closed;

        // Finishing re-enters the sink callbacks, so the registration must
        // still be live here
        let finished = self.handle.release().unwrap_or(Ok(()));

        let (sink, callback_error) = match self.registration.take() {
            Some(registration) => {
                let mut context = registration.context().lock();
                (context.sink.take(), context.take_error())
            }
            None => (None, None),
        };

        debug!(
            sink = %self.origin,
            frames_written = self.frames_written,
            samples_written = self.samples_written,
            "Finished FLAC stream"
        );

        let sink_result = match sink {
            Some(mut sink) => sink.close(),
            None => Ok(()),
        };

        if let Some(reason) = earlier_failure {
            warn!(sink = %self.origin, %reason, "Closed an errored encoder; output is incomplete");
            return Err(CodecError::Encode(reason));
        }

        if let Err(state) = finished {
            let reason = callback_error.unwrap_or(state);
            error!(sink = %self.origin, %reason, "Failed to finish FLAC stream");
            return Err(CodecError::Encode(reason));
        }

        sink_result?;
        info!(sink = %self.origin, samples_written = self.samples_written, "Closed FLAC encoder");
        Ok(())
    }
}

impl Drop for Encoder {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(sink = %self.origin, "Error while closing encoder on drop: {}", e);
        }
    }
}

fn validate_format(format: StreamFormat) -> Result<()> {
    if format.channels == 0 {
        return Err(CodecError::InvalidFormat(
            "channel count must be positive".to_string(),
        ));
    }
    if !SUPPORTED_DEPTHS.contains(&format.depth) {
        return Err(CodecError::InvalidFormat(format!(
            "bit depth must be 16 or 24, got {}",
            format.depth
        )));
    }
    if format.rate == 0 {
        return Err(CodecError::InvalidFormat(
            "sample rate must be positive".to_string(),
        ));
    }
    Ok(())
}

/// Apply stream format and tuning to an uninitialized engine.
fn configure(handle: &EncoderHandle, format: StreamFormat, config: &EncoderConfig) -> Result<()> {
    let ptr = handle.as_ptr()?;
    let check = |accepted: ffi::FLAC__bool, setting: &str| {
        if accepted == 0 {
            Err(CodecError::InvalidConfig(format!(
                "{} rejected by the native encoder",
                setting
            )))
        } else {
            Ok(())
        }
    };

    unsafe {
        check(ffi::FLAC__stream_encoder_set_channels(ptr, format.channels), "channels")?;
        check(
            ffi::FLAC__stream_encoder_set_bits_per_sample(ptr, format.depth),
            "bits_per_sample",
        )?;
        check(ffi::FLAC__stream_encoder_set_sample_rate(ptr, format.rate), "sample_rate")?;

        if let Some(level) = config.compression_level {
            check(
                ffi::FLAC__stream_encoder_set_compression_level(ptr, level),
                "compression_level",
            )?;
        }
        if let Some(block_size) = config.block_size {
            check(ffi::FLAC__stream_encoder_set_blocksize(ptr, block_size), "block_size")?;
        }
        if config.verify {
            check(ffi::FLAC__stream_encoder_set_verify(ptr, 1), "verify")?;
        }
        if let Some(total) = config.total_samples_estimate {
            check(
                ffi::FLAC__stream_encoder_set_total_samples_estimate(ptr, total),
                "total_samples_estimate",
            )?;
        }
    }

    debug!(%format, ?config, "Configured native encoder");
    Ok(())
}

fn init_failure(handle: &EncoderHandle, init_status: ffi::FLAC__StreamEncoderInitStatus) -> String {
    if init_status == ffi::FLAC__STREAM_ENCODER_INIT_STATUS_ENCODER_ERROR {
        // The detail lives in the engine state (e.g. IO_ERROR for an unwritable path)
        handle.state_string()
    } else {
        status::encoder_init_status(init_status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::MemorySink;
    use mockall::mock;
    use std::io::{self, Seek, Write};

    mock! {
        pub Sink {}

        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize>;
            fn flush(&mut self) -> io::Result<()>;
        }

        impl Seek for Sink {
            fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
        }

        impl ByteSink for Sink {
            fn close(&mut self) -> io::Result<()>;
        }
    }

    #[test]
    fn test_context_write_failure_is_recorded() {
        let mut sink = MockSink::new();
        sink.expect_write()
            .returning(|_| Err(io::Error::new(io::ErrorKind::StorageFull, "disk full")));

        let mut context = EncoderContext::new(Some(Box::new(sink)));
        assert!(!context.write_all(b"fLaC"));
        assert!(context.take_error().unwrap().contains("disk full"));
    }

    #[test]
    fn test_context_seek_is_absolute() {
        let mut sink = MockSink::new();
        sink.expect_seek()
            .withf(|pos| *pos == SeekFrom::Start(42))
            .times(1)
            .returning(|_| Ok(42));

        let mut context = EncoderContext::new(Some(Box::new(sink)));
        assert!(context.seek_to(42));
        assert!(context.take_error().is_none());
    }

    #[test]
    fn test_context_seek_failure_is_recorded() {
        let mut sink = MockSink::new();
        sink.expect_seek()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Unsupported, "pipe")));

        let mut context = EncoderContext::new(Some(Box::new(sink)));
        assert!(!context.seek_to(4));
        assert!(context.take_error().unwrap().contains("seek to 4"));
    }

    #[test]
    fn test_context_tell_failure_is_recorded() {
        let mut sink = MockSink::new();
        sink.expect_seek()
            .returning(|_| Err(io::Error::new(io::ErrorKind::Unsupported, "pipe")));

        let mut context = EncoderContext::new(Some(Box::new(sink)));
        assert_eq!(context.position(), None);
        assert!(context.take_error().unwrap().contains("tell"));
    }

    #[test]
    fn test_context_without_sink_fails_every_call() {
        let mut context = EncoderContext::new(None);
        assert!(!context.write_all(b"x"));
        assert!(!context.seek_to(0));
        assert_eq!(context.position(), None);
    }

    #[test]
    fn test_validate_format() {
        assert!(validate_format(StreamFormat::new(2, 16, 44100)).is_ok());
        assert!(validate_format(StreamFormat::new(1, 24, 48000)).is_ok());

        for format in [
            StreamFormat::new(0, 16, 44100),
            StreamFormat::new(2, 8, 44100),
            StreamFormat::new(2, 32, 44100),
            StreamFormat::new(2, 16, 0),
        ] {
            assert!(matches!(
                validate_format(format),
                Err(CodecError::InvalidFormat(_))
            ));
        }
    }

    #[test]
    fn test_invalid_config_rejected_before_sink_is_touched() {
        // No expectations: any call on the sink would panic
        let sink = MockSink::new();
        let config = EncoderConfig::default().with_compression_level(12);
        let result = Encoder::to_sink_with_config(sink, StreamFormat::cd_quality(), config);
        assert!(matches!(result, Err(CodecError::InvalidConfig(_))));
    }

    #[test]
    fn test_sink_failure_during_init_is_open_error() {
        let mut sink = MockSink::new();
        sink.expect_write()
            .returning(|_| Err(io::Error::new(io::ErrorKind::BrokenPipe, "reader went away")));
        sink.expect_seek().returning(|_| Ok(0));
        sink.expect_flush().returning(|| Ok(()));
        sink.expect_close().returning(|| Ok(()));

        // The stream header is written during initialization
        let result = Encoder::to_sink(sink, 2, 16, 44100);
        match result {
            Err(CodecError::Open(reason)) => assert!(reason.contains("reader went away")),
            Err(other) => panic!("unexpected error: {}", other),
            Ok(_) => panic!("initialization should fail when the sink rejects writes"),
        }
    }

    #[test]
    fn test_state_transitions() {
        let sink = MemorySink::new();
        let mut encoder = Encoder::to_sink(sink.clone(), 1, 16, 8000).unwrap();
        assert_eq!(encoder.state(), EncoderState::Ready);

        encoder.write_frame(&Frame::empty(encoder.format())).unwrap();
        assert_eq!(encoder.state(), EncoderState::Ready);

        let frame = Frame::new(encoder.format(), vec![0, 1, 2, 3]);
        encoder.write_frame(&frame).unwrap();
        assert_eq!(encoder.state(), EncoderState::Encoding);
        assert_eq!(encoder.samples_written(), 4);

        encoder.close().unwrap();
        assert_eq!(encoder.state(), EncoderState::Closed);
        encoder.close().unwrap();
        assert!(matches!(encoder.write_frame(&frame), Err(CodecError::Closed)));
        assert!(sink.contents().starts_with(b"fLaC"));
    }
}
