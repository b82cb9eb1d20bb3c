//! # FLAC Codec Module
//!
//! Safe frame-level encoding and decoding of FLAC streams on top of libFLAC.
//!
//! ## Overview
//!
//! This module handles:
//! - Decoding from a file or any [`ByteSource`] into interleaved [`Frame`]s
//! - Encoding frames into a file or any seekable [`ByteSink`]
//! - Bridging libFLAC's read/write/seek/tell/metadata/error callbacks
//! - Releasing every native engine exactly once, on `close()` or drop
//!
//! ## Transcoding
//!
//! ```rust,no_run
//! use core_flac::{copy_frames, Decoder, Encoder};
//!
//! # fn example() -> core_flac::Result<()> {
//! let mut decoder = Decoder::open("in.flac")?;
//! let format = decoder.format();
//! let mut encoder = Encoder::create("out.flac", format.channels, format.depth, format.rate)?;
//!
//! let copied = copy_frames(&mut decoder, &mut encoder)?;
//! encoder.close()?;
//! decoder.close()?;
//! println!("copied {} samples", copied);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod frame;
pub mod io;
pub mod pipeline;
pub mod sample_converter;

mod native;

pub use config::{DecoderConfig, EncoderConfig};
pub use decoder::{Decoder, DecoderState, FrameRead, Frames};
pub use encoder::{Encoder, EncoderState};
pub use error::{CodecError, Result};
pub use frame::{Frame, StreamFormat, StreamInfo};
pub use io::{ByteSink, ByteSource, MemorySink};
pub use pipeline::copy_frames;
pub use sample_converter::SampleConverter;
