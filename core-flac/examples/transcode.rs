//! Re-encode a FLAC file frame by frame.
//!
//! ```text
//! cargo run -p core-flac --example transcode -- in.flac out.flac [level]
//! ```
//!
//! Set `RUST_LOG=core_flac=debug` for per-stream detail.

use core_flac::{copy_frames, Decoder, Encoder, EncoderConfig};
use core_runtime::logging::{init_logging, LogLevel, LoggingConfig};
use std::env;
use std::process::ExitCode;
use tracing::{error, info};

fn run(input: &str, output: &str, level: Option<u32>) -> Result<u64, Box<dyn std::error::Error>> {
    let mut decoder = Decoder::open(input)?;
    let format = decoder.format();

    let config = match level {
        Some(level) => EncoderConfig::default().with_compression_level(level),
        None => EncoderConfig::default(),
    };
    let mut encoder = Encoder::create_with_config(output, format, config)?;

    let copied = copy_frames(&mut decoder, &mut encoder)?;
    encoder.close()?;
    decoder.close()?;
    Ok(copied)
}

fn main() -> ExitCode {
    let config = LoggingConfig::default().with_level(LogLevel::Info);
    if let Err(e) = init_logging(config) {
        eprintln!("logging disabled: {}", e);
    }

    let args: Vec<String> = env::args().skip(1).collect();
    let (input, output) = match (args.first(), args.get(1)) {
        (Some(input), Some(output)) => (input, output),
        _ => {
            eprintln!("usage: transcode <input.flac> <output.flac> [compression-level]");
            return ExitCode::from(2);
        }
    };
    let level = match args.get(2).map(|s| s.parse::<u32>()) {
        None => None,
        Some(Ok(level)) => Some(level),
        Some(Err(e)) => {
            eprintln!("invalid compression level: {}", e);
            return ExitCode::from(2);
        }
    };

    match run(input, output, level) {
        Ok(samples) => {
            info!(samples, "Transcode complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("Transcode failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
