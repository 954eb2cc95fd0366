//! Mail-server resolution for a domain.
//!
//! The entry point is [`resolve_mail_servers`]: MX lookup first, implicit MX
//! (A/AAAA of the domain itself) when none is published, transient resolver
//! errors retried immediately up to the configured attempt count.

mod error;
mod lookup;
mod types;

pub use error::{LookupError, ResolveFailure};
pub use lookup::{DnsLookup, build_resolver};
pub use types::{MailServer, MxRecord, RecordSource, Resolution, ResolveOptions};

use tracing::debug;

pub fn resolve_mail_servers<R>(
    resolver: &R,
    domain: &str,
    options: &ResolveOptions,
) -> Result<Resolution, ResolveFailure>
where
    R: DnsLookup + ?Sized,
{
    let attempts = options.attempts.max(1);

    match with_retries(attempts, domain, "MX", || resolver.mx_records(domain)) {
        Ok(records) if !records.is_empty() => {
            if records.iter().all(MxRecord::is_null) {
                return Err(ResolveFailure::NullMx {
                    domain: domain.to_string(),
                });
            }
            let servers = order_records(records, options.max_servers);
            debug!(domain, servers = servers.len(), "MX records resolved");
            return Ok(Resolution {
                domain: domain.to_string(),
                source: RecordSource::Mx,
                servers,
            });
        }
        Ok(_) | Err(LookupError::NoRecords) => {}
        Err(LookupError::NxDomain) => {
            return Err(ResolveFailure::NxDomain {
                domain: domain.to_string(),
            });
        }
        Err(LookupError::Transient(message)) => {
            return Err(ResolveFailure::exhausted(domain, attempts, message));
        }
    }

    // RFC 5321 §5.1: pas de MX -> MX implicite (A/AAAA du domaine, priorité 0)
    match with_retries(attempts, domain, "A/AAAA", || resolver.host_addresses(domain)) {
        Ok(addrs) if !addrs.is_empty() => {
            debug!(domain, "no MX, using implicit MX");
            Ok(Resolution {
                domain: domain.to_string(),
                source: RecordSource::ImplicitA,
                servers: vec![MailServer::new(domain, 0)],
            })
        }
        Ok(_) | Err(LookupError::NoRecords) => Err(ResolveFailure::NoRecords {
            domain: domain.to_string(),
        }),
        Err(LookupError::NxDomain) => Err(ResolveFailure::NxDomain {
            domain: domain.to_string(),
        }),
        Err(LookupError::Transient(message)) => {
            Err(ResolveFailure::exhausted(domain, attempts, message))
        }
    }
}

fn with_retries<T, F>(
    attempts: u32,
    domain: &str,
    kind: &str,
    mut query: F,
) -> Result<T, LookupError>
where
    F: FnMut() -> Result<T, LookupError>,
{
    let mut attempt = 1;
    loop {
        match query() {
            Err(err) if err.is_transient() && attempt < attempts => {
                debug!(domain, kind, attempt, error = %err, "transient DNS failure, retrying");
                attempt += 1;
            }
            other => return other,
        }
    }
}

/// Stable sort by preference (ties keep record order), duplicates and null
/// exchanges dropped, truncated to `max_servers`.
fn order_records(records: Vec<MxRecord>, max_servers: usize) -> Vec<MailServer> {
    let mut servers: Vec<MailServer> = Vec::with_capacity(records.len());
    for record in records {
        if record.is_null() || servers.iter().any(|s| s.host == record.exchange) {
            continue;
        }
        servers.push(MailServer::new(record.exchange, record.preference));
    }
    servers.sort_by_key(|s| s.preference);
    servers.truncate(max_servers.max(1));
    servers
}
