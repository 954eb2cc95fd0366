use std::io;

use thiserror::Error;

use crate::config::ConfigError;

/// Run-fatal setup failures. Per-address problems never surface here; they
/// end up in the address's [`VerificationRecord`](crate::VerificationRecord).
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("cannot initialise DNS resolver: {source}")]
    ResolverInit {
        #[source]
        source: io::Error,
    },
}
