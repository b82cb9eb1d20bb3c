//! Runtime infrastructure errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A logging or runtime setting could not be applied.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A global tracing subscriber was already installed for this process.
    #[error("Logging already initialized: {0}")]
    AlreadyInitialized(String),
}

pub type Result<T> = std::result::Result<T, Error>;
