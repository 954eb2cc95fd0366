use std::io;

use thiserror::Error;

use crate::resolver::LookupError;

/// Failure while establishing or driving one SMTP session.
///
/// All of these are transient from the prober's point of view: the attempt
/// counts against the retry budget and may be repeated.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no address resolved for {host}")]
    NoAddress { host: String },
    #[error("address lookup for {host} failed: {source}")]
    HostLookup {
        host: String,
        #[source]
        source: LookupError,
    },
    #[error("connection to {addr} failed: {source}")]
    Connect {
        addr: String,
        #[source]
        source: io::Error,
    },
    #[error("I/O error: {source}")]
    Io {
        #[source]
        source: io::Error,
    },
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl SessionError {
    pub(crate) fn io(source: io::Error) -> Self {
        match source.kind() {
            io::ErrorKind::InvalidData => Self::Protocol(source.to_string()),
            _ => Self::Io { source },
        }
    }

    pub fn is_timeout(&self) -> bool {
        let kind = match self {
            Self::Connect { source, .. } | Self::Io { source } => source.kind(),
            _ => return false,
        };
        matches!(kind, io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
    }
}
