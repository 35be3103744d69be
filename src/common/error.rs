//! Error types for the training bridge
//!
//! Every error belongs to one of four kinds. Config and bind errors are
//! fatal at startup; transport and protocol errors are reported and the
//! surrounding loop keeps going.

use std::io;
use std::net::SocketAddr;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the training bridge
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    #[error("Unable to find a property value for {key} in {path}")]
    ConfigMissingKey { key: String, path: String },

    #[error("Invalid value '{value}' for {key}: {reason}")]
    ConfigInvalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("No configuration file found. Pass --config or create ./application.properties")]
    ConfigNotFound,

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Listener Errors ===
    #[error("Failed to bind listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },

    // === Transport Errors ===
    #[error("Remote call '{method}' failed: {reason}")]
    Transport { method: String, reason: String },

    #[error("Remote call '{method}' returned fault {code}: {message}")]
    RemoteFault {
        method: String,
        code: i32,
        message: String,
    },

    // === Protocol Errors ===
    #[error("Malformed request: {0}")]
    Protocol(String),

    #[error("Unknown method '{0}'")]
    UnknownMethod(String),

    #[error("Invalid parameters for '{method}': {reason}")]
    InvalidParams { method: String, reason: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Coarse classification used to decide between aborting and carrying on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Config,
    Bind,
    Transport,
    Protocol,
    Io,
}

impl Error {
    /// Create a transport error for a remote method
    pub fn transport(method: &str, reason: impl ToString) -> Self {
        Self::Transport {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid value configuration error
    pub fn config_invalid(key: &str, value: &str, reason: impl ToString) -> Self {
        Self::ConfigInvalid {
            key: key.to_string(),
            value: value.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Create an invalid parameters error for an inbound call
    pub fn invalid_params(method: &str, reason: impl ToString) -> Self {
        Self::InvalidParams {
            method: method.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::ConfigMissingKey { .. }
            | Error::ConfigInvalid { .. }
            | Error::ConfigParse(_)
            | Error::ConfigNotFound
            | Error::FileRead { .. } => ErrorKind::Config,
            Error::Bind { .. } => ErrorKind::Bind,
            Error::Transport { .. } | Error::RemoteFault { .. } => ErrorKind::Transport,
            Error::Protocol(_) | Error::UnknownMethod(_) | Error::InvalidParams { .. } => {
                ErrorKind::Protocol
            }
            Error::Io(_) => ErrorKind::Io,
        }
    }

    /// Whether the process must exit after reporting this error
    pub fn is_fatal(&self) -> bool {
        matches!(self.kind(), ErrorKind::Config | ErrorKind::Bind)
    }

    /// Process exit status: 2 when startup could not complete, 1 otherwise
    pub fn exit_code(&self) -> i32 {
        if self.is_fatal() {
            2
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kinds() {
        let missing = Error::ConfigMissingKey {
            key: "MY_XML_RPC_SERVER_PORT".to_string(),
            path: "application.properties".to_string(),
        };
        assert_eq!(missing.kind(), ErrorKind::Config);
        assert!(missing.is_fatal());

        let transport = Error::transport("test", "connection refused");
        assert_eq!(transport.kind(), ErrorKind::Transport);
        assert!(!transport.is_fatal());

        assert_eq!(Error::UnknownMethod("x".into()).kind(), ErrorKind::Protocol);
    }

    #[test]
    fn test_bind_is_fatal() {
        let err = Error::Bind {
            addr: "127.0.0.1:9000".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(err.is_fatal());
        assert_eq!(err.exit_code(), 2);
        assert!(err.to_string().contains("127.0.0.1:9000"));
        assert_eq!(Error::transport("test", "refused").exit_code(), 1);
    }
}
