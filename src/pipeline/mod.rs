//! Run orchestration: parse, validate, resolve, probe, classify.
//!
//! A [`Verifier`] owns the run-scoped state (configuration and wildcard
//! cache) and turns every input address into exactly one
//! [`VerificationRecord`], in input order.

mod classify;
mod pool;
mod types;

pub use classify::WILDCARD_REASON;
pub use types::{FailureKind, Outcome, RunEvent, RunReport, Stage, VerificationRecord};

use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};
use trust_dns_resolver::Resolver;

use crate::config::{ValidationConfig, ValidationMethod};
use crate::error::Error;
use crate::resolver::{DnsLookup, build_resolver, resolve_mail_servers};
use crate::smtp::{Connector, MailboxVerdict, TcpConnector, probe_mailbox};
use crate::validator::{parse_address, validate_syntax};
use crate::wildcard::{DomainProbeResult, WildcardDetector, WildcardStatus, random_local_part};

pub struct Verifier<R, C> {
    config: ValidationConfig,
    resolver: R,
    connector: C,
    wildcards: WildcardDetector,
}

/// Verifier on the system DNS configuration and real TCP.
pub type SystemVerifier = Verifier<Arc<Resolver>, TcpConnector<Arc<Resolver>>>;

impl SystemVerifier {
    pub fn from_system(config: ValidationConfig) -> Result<Self, Error> {
        config.validate()?;
        let resolver = Arc::new(
            build_resolver(config.dns_timeout).map_err(|source| Error::ResolverInit { source })?,
        );
        let connector = TcpConnector::new(
            Arc::clone(&resolver),
            config.smtp_port,
            config.connect_timeout,
            config.response_timeout,
        );
        Self::with_parts(config, resolver, connector)
    }
}

impl<R, C> Verifier<R, C>
where
    R: DnsLookup,
    C: Connector,
{
    pub fn with_parts(config: ValidationConfig, resolver: R, connector: C) -> Result<Self, Error> {
        config.validate()?;
        Ok(Self {
            config,
            resolver,
            connector,
            wildcards: WildcardDetector::new(),
        })
    }

    pub fn config(&self) -> &ValidationConfig {
        &self.config
    }

    /// Verifies one address. Never fails: every problem ends up in the
    /// record.
    pub fn verify(&self, raw: &str) -> VerificationRecord {
        let record = self.classify(raw);
        info!(
            address = raw,
            outcome = %record.outcome,
            stage = %record.stage_reached,
            "address verified"
        );
        record
    }

    fn classify(&self, raw: &str) -> VerificationRecord {
        let method = self.config.method;
        let parsed = match parse_address(raw) {
            Ok(parsed) => parsed,
            Err(err) => return classify::malformed(raw, method, &err),
        };
        let syntax = validate_syntax(&parsed);
        if !syntax.ok {
            return classify::syntax_rejected(raw, method, &syntax);
        }
        if method == ValidationMethod::Regex {
            return classify::syntax_accepted(raw, method);
        }

        let resolution = match resolve_mail_servers(
            &self.resolver,
            &parsed.domain,
            &self.config.resolve_options(),
        ) {
            Ok(resolution) => resolution,
            Err(failure) => return classify::unresolvable(raw, method, &failure),
        };
        if method == ValidationMethod::Mx {
            return classify::resolved(raw, method, &resolution);
        }

        let report = probe_mailbox(
            &self.connector,
            &resolution.servers,
            &parsed.to_string(),
            &self.config.probe_options(),
        );
        let wildcard = if !self.config.detects_wildcards() {
            None
        } else if report.verdict == MailboxVerdict::Accepted {
            Some(self.wildcard_status(&parsed.domain))
        } else {
            self.wildcards.cached(&parsed.domain)
        };
        classify::probed(raw, method, &resolution, &report, wildcard.as_ref())
    }

    /// Probes `domain` with a random mailbox, once per run.
    pub fn wildcard_status(&self, domain: &str) -> DomainProbeResult {
        self.wildcards
            .status_for(domain, |domain| self.probe_wildcard(domain))
    }

    /// Wildcard probes actually issued so far.
    pub fn wildcard_probe_count(&self) -> usize {
        self.wildcards.probe_count()
    }

    fn probe_wildcard(&self, domain: &str) -> DomainProbeResult {
        let resolution =
            match resolve_mail_servers(&self.resolver, domain, &self.config.resolve_options()) {
                Ok(resolution) => resolution,
                Err(failure) => {
                    return DomainProbeResult::new(
                        domain,
                        WildcardStatus::Unknown,
                        Some(failure.to_string()),
                    );
                }
            };

        let target = format!("{}@{domain}", random_local_part());
        let report = probe_mailbox(
            &self.connector,
            &resolution.servers,
            &target,
            &self.config.probe_options(),
        );
        let reply = report.last_reply.as_ref().map(ToString::to_string);
        match report.verdict {
            MailboxVerdict::Accepted => {
                warn!(domain, "domain accepts all recipients");
                DomainProbeResult::new(domain, WildcardStatus::Wildcard, reply)
            }
            MailboxVerdict::Rejected => {
                DomainProbeResult::new(domain, WildcardStatus::NotWildcard, reply)
            }
            MailboxVerdict::Undetermined => DomainProbeResult::new(
                domain,
                WildcardStatus::Unknown,
                report.detail.or(reply),
            ),
        }
    }
}

impl<R, C> Verifier<R, C>
where
    R: DnsLookup + Sync,
    C: Connector + Sync,
{
    pub fn verify_all<S>(&self, inputs: &[S]) -> RunReport
    where
        S: AsRef<str> + Sync,
    {
        self.verify_all_with(inputs, |_| {})
    }

    /// Whole run. Wildcard domains are probed first (distinct domains, in
    /// order of first appearance), then every address; `on_event` hears
    /// about each domain probe and about each record as it completes.
    pub fn verify_all_with<S, F>(&self, inputs: &[S], on_event: F) -> RunReport
    where
        S: AsRef<str> + Sync,
        F: FnMut(RunEvent<'_>) + Send,
    {
        let workers = self.config.workers;
        let on_event = Mutex::new(on_event);

        let domains = if self.config.detects_wildcards() {
            distinct_domains(inputs)
        } else {
            Vec::new()
        };
        let probes = pool::run_indexed(domains.len(), workers, |idx| {
            self.wildcard_status(&domains[idx])
        });
        for probe in &probes {
            (&mut *on_event.lock())(RunEvent::Domain(probe));
        }

        let records = pool::run_indexed(inputs.len(), workers, |idx| {
            let record = self.verify(inputs[idx].as_ref());
            (&mut *on_event.lock())(RunEvent::Record(&record));
            record
        });

        RunReport {
            records,
            domains: probes,
        }
    }
}

/// Domains of syntactically valid addresses, deduplicated, first-seen order.
fn distinct_domains<S: AsRef<str>>(inputs: &[S]) -> Vec<String> {
    let mut seen = HashSet::new();
    inputs
        .iter()
        .filter_map(|raw| parse_address(raw.as_ref()).ok())
        .filter(|parsed| validate_syntax(parsed).ok)
        .map(|parsed| parsed.domain)
        .filter(|domain| seen.insert(domain.clone()))
        .collect()
}
