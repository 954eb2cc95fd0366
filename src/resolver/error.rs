use thiserror::Error;

/// Error returned by a single DNS query through [`DnsLookup`](super::DnsLookup).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LookupError {
    #[error("no records found")]
    NoRecords,
    #[error("domain does not exist (NXDOMAIN)")]
    NxDomain,
    #[error("transient resolver error: {0}")]
    Transient(String),
}

impl LookupError {
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }
}

impl From<trust_dns_resolver::error::ResolveError> for LookupError {
    fn from(err: trust_dns_resolver::error::ResolveError) -> Self {
        use trust_dns_resolver::error::ResolveErrorKind;
        use trust_dns_resolver::proto::op::ResponseCode;

        match err.kind() {
            ResolveErrorKind::NoRecordsFound { response_code, .. } => {
                if *response_code == ResponseCode::NXDomain {
                    Self::NxDomain
                } else {
                    Self::NoRecords
                }
            }
            _ => Self::Transient(err.to_string()),
        }
    }
}

/// Why a domain could not be turned into a list of mail servers.
///
/// Every variant means the domain is unresolvable for mail purposes.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ResolveFailure {
    #[error("domain {domain} does not exist")]
    NxDomain { domain: String },
    #[error("domain {domain} has no MX or A/AAAA records")]
    NoRecords { domain: String },
    #[error("domain {domain} publishes a null MX and accepts no mail")]
    NullMx { domain: String },
    #[error("DNS lookup for {domain} failed after {attempts} attempt(s): {message}")]
    Exhausted {
        domain: String,
        attempts: u32,
        message: String,
    },
}

impl ResolveFailure {
    pub fn domain(&self) -> &str {
        match self {
            Self::NxDomain { domain }
            | Self::NoRecords { domain }
            | Self::NullMx { domain }
            | Self::Exhausted { domain, .. } => domain,
        }
    }

    pub(crate) fn exhausted(domain: &str, attempts: u32, message: String) -> Self {
        Self::Exhausted {
            domain: domain.to_string(),
            attempts,
            message,
        }
    }
}
