use std::io;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use trust_dns_resolver::Resolver;
use trust_dns_resolver::system_conf::read_system_conf;

use super::{LookupError, MxRecord};

/// The DNS queries the pipeline needs. Implemented for the blocking
/// `trust-dns` [`Resolver`]; tests plug in stubs.
pub trait DnsLookup {
    fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError>;
    fn host_addresses(&self, host: &str) -> Result<Vec<IpAddr>, LookupError>;
}

impl<T: DnsLookup + ?Sized> DnsLookup for Arc<T> {
    fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        (**self).mx_records(domain)
    }

    fn host_addresses(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        (**self).host_addresses(host)
    }
}

impl DnsLookup for Resolver {
    fn mx_records(&self, domain: &str) -> Result<Vec<MxRecord>, LookupError> {
        let lookup = Resolver::mx_lookup(self, domain)?;
        Ok(lookup
            .iter()
            .map(|mx| MxRecord::new(mx.preference(), normalize_exchange(&mx.exchange().to_utf8())))
            .collect())
    }

    fn host_addresses(&self, host: &str) -> Result<Vec<IpAddr>, LookupError> {
        let lookup = Resolver::lookup_ip(self, host)?;
        Ok(lookup.iter().collect())
    }
}

/// System resolver with a bounded per-query timeout. Retries are driven by
/// the caller, so the resolver itself makes a single attempt per query.
pub fn build_resolver(timeout: Duration) -> io::Result<Resolver> {
    let (config, mut opts) = read_system_conf().map_err(|err| io::Error::other(err.to_string()))?;
    opts.timeout = timeout;
    opts.attempts = 1;
    Resolver::new(config, opts)
}

pub(crate) fn normalize_exchange(exchange: &str) -> String {
    let trimmed = exchange.trim_end_matches('.');
    trimmed.to_ascii_lowercase()
}
