use std::fmt;

use thiserror::Error;

/// An address split into its local part and its (ASCII, lower-cased) domain.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ParsedAddress {
    pub local_part: String,
    pub domain: String,
}

impl ParsedAddress {
    pub fn new(local_part: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            local_part: local_part.into(),
            domain: domain.into(),
        }
    }
}

impl fmt::Display for ParsedAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.local_part, self.domain)
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxReport {
    pub ok: bool,
    pub reasons: Vec<String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("malformed address: missing '@'")]
    MissingAt,
    #[error("malformed address: empty local part")]
    EmptyLocalPart,
    #[error("malformed address: empty domain")]
    EmptyDomain,
    #[error("malformed address: invalid domain '{domain}'")]
    InvalidDomain { domain: String },
}
