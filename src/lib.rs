//! Workspace facade crate.
//!
//! Re-exports the FLAC adapter surface from `core-flac` together with the
//! logging entry points of `core-runtime`, so host applications can depend on
//! a single crate.

pub use core_flac::*;

pub mod logging {
    pub use core_runtime::logging::{init_logging, LogFormat, LogLevel, LoggingConfig};
}
