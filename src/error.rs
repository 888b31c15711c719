//! Error types

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
///
/// Malformed requests and registry conflicts are handled inside a connection
/// and never surface here; see [`ProtocolError`] and
/// [`RegistryError`](crate::registry::RegistryError).
#[derive(Debug, Error)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}

/// Reasons a text request is dropped
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid request line: {0:?}")]
    InvalidRequestLine(String),

    #[error("request head is not valid UTF-8")]
    InvalidUtf8,

    #[error("missing {0} header")]
    MissingHeader(&'static str),

    #[error("invalid {name} header: {value:?}")]
    InvalidHeader { name: &'static str, value: String },

    #[error("no channel in request URI {0:?}")]
    MissingChannel(String),

    #[error("incomplete request exceeds {0} bytes")]
    RequestTooLarge(usize),
}

/// Configuration file failures
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Read(#[from] io::Error),

    #[error("cannot parse config file: {0}")]
    Parse(#[from] serde_json::Error),
}
