//! Error types for remotectl.
//!
//! Malformed client input is never represented here: it is always converted
//! into a well-formed failure response on the wire (see [`crate::rpc`]).
//! These types cover the hard failures only: configuration problems and
//! transport-level faults.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors surfaced by the TCP server itself.
///
/// Per the error-handling design, only a bind failure at startup is a hard
/// error; everything after that is contained and reported on the wire or
/// logged.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The listening socket could not be bound.
    #[error("failed to bind TCP listener on port {port}")]
    Bind {
        /// Port the bind was attempted on.
        port: u16,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// `run()` was called before `start()`.
    #[error("server has not been started")]
    NotStarted,

    /// Transport-level I/O failure.
    #[error("transport I/O failure")]
    Io(#[from] std::io::Error),
}
