//! # Core Runtime Module
//!
//! Provides the ambient runtime infrastructure shared by the workspace crates:
//! - Logging and tracing initialisation
//! - Log-field helpers for keeping paths out of structured output
//!
//! ## Overview
//!
//! Library crates only emit `tracing` events. Installing a subscriber is the
//! host's decision and happens once, through [`logging::init_logging`].

pub mod error;
pub mod logging;

pub use error::{Error, Result};
