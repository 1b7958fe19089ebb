//! Error types for sshdial.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Main error type for sshdial operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The connection URI could not be parsed
    #[error("Malformed URI: {0}")]
    MalformedUri(#[from] url::ParseError),

    /// A required parameter was missing or invalid
    #[error("Bad parameter {name}: '{value}'")]
    BadParameter { name: &'static str, value: String },

    /// The private key file could not be read
    #[error("Failed to read key file {}: {source}", path.display())]
    KeyFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The key file is not a valid private key, or the passphrase is wrong
    #[error("Failed to parse private key {}: {source}", path.display())]
    KeyParse {
        path: PathBuf,
        #[source]
        source: russh::keys::Error,
    },

    /// SSH handshake or authentication failed
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    /// Opening a connection to the target failed after the session was up
    #[error("Dial {addr} failed: {source}")]
    Dial {
        addr: String,
        #[source]
        source: DialError,
    },

    /// The dialer was closed, or its session has ended
    #[error("SSH session closed")]
    SessionClosed,

    /// The dial was cancelled before a connection was established
    #[error("Dial {addr} cancelled")]
    Cancelled { addr: String },
}

impl Error {
    pub(crate) fn bad_parameter(name: &'static str, value: impl Into<String>) -> Self {
        Self::BadParameter {
            name,
            value: value.into(),
        }
    }

    pub(crate) fn dial(addr: &str, source: impl Into<DialError>) -> Self {
        Self::Dial {
            addr: addr.to_string(),
            source: source.into(),
        }
    }
}

/// Errors raised while establishing the SSH session.
#[derive(Error, Debug)]
pub enum ConnectionError {
    /// TCP connect or SSH handshake failed
    #[error("SSH handshake with {addr} failed: {source}")]
    Handshake {
        addr: String,
        #[source]
        source: russh::Error,
    },

    /// The server refused the supplied credentials
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// The host key policy callback refused the server key
    #[error("Host key for {addr} rejected ({fingerprint})")]
    HostKeyRejected { addr: String, fingerprint: String },

    /// The server key does not match the pinned fingerprint
    #[error("Host key mismatch for {addr}: expected {expected}, got {actual}")]
    HostKeyMismatch {
        addr: String,
        expected: String,
        actual: String,
    },

    /// Connecting did not complete in time
    #[error("Connection to {addr} timed out after {timeout:?}")]
    Timeout { addr: String, timeout: Duration },

    /// SSH protocol error after the handshake
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),
}

/// Errors raised by a single dial.
#[derive(Error, Debug)]
pub enum DialError {
    /// Target address is not in `host:port` form
    #[error("invalid address, expected host:port")]
    InvalidAddress,

    /// The server refused or failed to open the forwarding channel
    #[error("channel open failed: {0}")]
    Channel(#[from] russh::Error),

    /// Direct TCP connect failed
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Direct TCP connect did not complete in time
    #[error("timed out after {0:?}")]
    Timeout(Duration),
}

/// Result type alias using sshdial's Error.
pub type Result<T> = std::result::Result<T, Error>;
