//! Error types for fleetscope.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Main error type for fleetscope operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Remote command execution errors
    #[error("Exec error: {0}")]
    Exec(#[from] ExecError),

    /// Neighbor output parsing errors
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Topology assembly errors
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),
}

/// Configuration errors. These are hard failures: no partial result is
/// meaningful when one of them occurs.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Host has no device-OS identifier, so no discovery chain can be chosen
    #[error("Host '{host}' has no device OS configured")]
    MissingDeviceOs { host: String },

    /// No inventory was supplied
    #[error("No inventory available")]
    MissingInventory,

    /// Invalid builder or settings value
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A chain or parser with this name is already registered
    #[error("'{name}' is already registered")]
    AlreadyRegistered { name: String },

    /// Inventory document could not be decoded
    #[error("Invalid inventory document: {0}")]
    Inventory(#[from] serde_json::Error),
}

/// Errors from running a single remote command.
///
/// These are per-attempt: the collector records them and moves on to the
/// next command in the fallback chain.
#[derive(Error, Debug)]
pub enum ExecError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// SSH key error
    #[error("SSH key error: {0}")]
    Key(String),

    /// Server host key differs from the one in known_hosts
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// Server host key is not in known_hosts and strict checking is on
    #[error("Host key for {host}:{port} is unknown")]
    HostKeyUnknown { host: String, port: u16 },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// Remote command exited with a non-zero status
    #[error("Remote command exited with status {status}: {stderr}")]
    ExitStatus { status: u32, stderr: String },

    /// Local ssh process was terminated by a signal
    #[error("ssh process terminated by signal")]
    Terminated,

    /// Connection was closed unexpectedly
    #[error("Connection disconnected")]
    Disconnected,

    /// Attempt exceeded its timeout
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// Attempt was aborted by cancellation
    #[error("Operation cancelled")]
    Cancelled,

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Errors from turning raw command output into neighbor entries.
#[derive(Error, Debug)]
pub enum ParseError {
    /// No parser registered under this id
    #[error("Unknown parser '{id}'")]
    UnknownParser { id: String },

    /// Output did not have the expected shape
    #[error("{parser}: {message}")]
    Malformed { parser: String, message: String },

    /// Output was expected to be JSON and was not
    #[error("Invalid JSON output: {0}")]
    Json(#[from] serde_json::Error),
}

impl ParseError {
    pub(crate) fn malformed(parser: &str, message: impl Into<String>) -> Self {
        ParseError::Malformed {
            parser: parser.to_string(),
            message: message.into(),
        }
    }
}

/// Topology assembly errors.
#[derive(Error, Debug)]
pub enum TopologyError {
    /// No inventory, so there is no identity context to reconcile against
    #[error("Cannot build topology without an inventory")]
    MissingInventory,
}

/// Result type alias using fleetscope's Error.
pub type Result<T> = std::result::Result<T, Error>;
