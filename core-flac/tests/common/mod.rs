//! Shared fixtures for the integration suites.
//!
//! Nothing is checked in: every FLAC stream used by the tests is synthesised
//! here by the crate's own encoder.

#![allow(dead_code)]

use core_flac::{Decoder, Encoder, EncoderConfig, Frame, MemorySink, StreamFormat};
use sha2::{Digest, Sha256};
use std::f64::consts::PI;
use std::path::Path;

/// Samples per channel handed to the encoder per `write_frame` call.
pub const CHUNK: usize = 1000;

/// Interleaved sine tones, one frequency per channel, at half full scale.
pub fn sine_samples(format: StreamFormat, samples_per_channel: usize) -> Vec<i32> {
    let amplitude = f64::from(1u32 << (format.depth - 1)) * 0.5;
    let channels = format.channels as usize;
    let mut samples = Vec::with_capacity(samples_per_channel * channels);

    for i in 0..samples_per_channel {
        let t = i as f64 / f64::from(format.rate);
        for c in 0..channels {
            let frequency = 440.0 * (c + 1) as f64;
            samples.push((amplitude * (2.0 * PI * frequency * t).sin()) as i32);
        }
    }
    samples
}

/// Split interleaved samples into frames of at most `CHUNK` samples per channel.
pub fn frames_of(format: StreamFormat, samples: &[i32]) -> Vec<Frame> {
    samples
        .chunks(CHUNK * format.channels as usize)
        .map(|chunk| Frame::new(format, chunk.to_vec()))
        .collect()
}

/// Encode a sine fixture into `path`; returns the samples written.
pub fn write_fixture(path: &Path, format: StreamFormat, samples_per_channel: usize) -> Vec<i32> {
    write_fixture_with_config(path, format, samples_per_channel, EncoderConfig::default())
}

pub fn write_fixture_with_config(
    path: &Path,
    format: StreamFormat,
    samples_per_channel: usize,
    config: EncoderConfig,
) -> Vec<i32> {
    let samples = sine_samples(format, samples_per_channel);
    let mut encoder =
        Encoder::create_with_config(path, format, config).expect("fixture encoder");
    for frame in frames_of(format, &samples) {
        encoder.write_frame(&frame).expect("fixture frame");
    }
    encoder.close().expect("fixture close");
    samples
}

/// Encode a sine fixture in memory; returns the stream and the samples.
pub fn encode_in_memory(format: StreamFormat, samples_per_channel: usize) -> (Vec<u8>, Vec<i32>) {
    let samples = sine_samples(format, samples_per_channel);
    let sink = MemorySink::new();
    let mut encoder = Encoder::to_sink(sink.clone(), format.channels, format.depth, format.rate)
        .expect("fixture encoder");
    for frame in frames_of(format, &samples) {
        encoder.write_frame(&frame).expect("fixture frame");
    }
    encoder.close().expect("fixture close");
    (sink.contents(), samples)
}

/// Decode every remaining frame into one interleaved buffer.
pub fn decode_all(decoder: &mut Decoder) -> Vec<i32> {
    let format = decoder.format();
    let mut samples = Vec::new();
    for frame in decoder.frames() {
        let frame = frame.expect("decode frame");
        assert_eq!(frame.format(), format);
        samples.extend_from_slice(frame.buffer());
    }
    samples
}

pub fn sha256(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

pub fn sha256_file(path: &Path) -> String {
    sha256(&std::fs::read(path).expect("read file for digest"))
}
