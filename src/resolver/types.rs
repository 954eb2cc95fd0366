#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct MxRecord {
    pub preference: u16,
    pub exchange: String,
}

impl MxRecord {
    pub fn new(preference: u16, exchange: impl Into<String>) -> Self {
        Self {
            preference,
            exchange: exchange.into(),
        }
    }

    /// RFC 7505: an empty (root) exchange means "this domain accepts no mail".
    pub fn is_null(&self) -> bool {
        self.exchange.is_empty() || self.exchange == "."
    }
}

/// Where the candidate mail servers came from.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordSource {
    Mx,
    /// No MX published; the domain's own A/AAAA record acts as an implicit MX.
    ImplicitA,
}

/// A host to open SMTP sessions against.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailServer {
    pub host: String,
    pub preference: u16,
}

impl MailServer {
    pub fn new(host: impl Into<String>, preference: u16) -> Self {
        Self {
            host: host.into(),
            preference,
        }
    }
}

/// Outcome of a successful resolution: candidate servers in the order they
/// must be tried.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub domain: String,
    pub source: RecordSource,
    pub servers: Vec<MailServer>,
}

impl Resolution {
    pub fn hosts(&self) -> Vec<&str> {
        self.servers.iter().map(|s| s.host.as_str()).collect()
    }
}

/// Knobs for [`resolve_mail_servers`](super::resolve_mail_servers).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    pub attempts: u32,
    pub max_servers: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self {
            attempts: 2,
            max_servers: 5,
        }
    }
}
