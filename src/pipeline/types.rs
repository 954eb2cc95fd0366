use std::collections::BTreeMap;
use std::fmt;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};

use crate::wildcard::DomainProbeResult;

#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Valid,
    Invalid,
    Undetermined,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Valid => "valid",
            Self::Invalid => "invalid",
            Self::Undetermined => "undetermined",
        })
    }
}

/// Last pipeline stage an address reached.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Syntax,
    Resolution,
    Smtp,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Syntax => "syntax",
            Self::Resolution => "resolution",
            Self::Smtp => "smtp",
        })
    }
}

/// Why an address is not `valid`.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    MalformedAddress,
    DomainUnresolvable,
    TransientNetworkFailure,
    PermanentSmtpRejection,
    AmbiguousSmtpResponse,
    WildcardDomain,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::MalformedAddress => "malformed address",
            Self::DomainUnresolvable => "domain unresolvable",
            Self::TransientNetworkFailure => "transient network failure",
            Self::PermanentSmtpRejection => "permanent SMTP rejection",
            Self::AmbiguousSmtpResponse => "ambiguous SMTP response",
            Self::WildcardDomain => "wildcard domain",
        })
    }
}

/// Final verdict for one input address. Built once, never mutated.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationRecord {
    pub address: String,
    pub outcome: Outcome,
    pub stage_reached: Stage,
    pub failure: Option<FailureKind>,
    pub diagnostics: BTreeMap<String, String>,
}

impl VerificationRecord {
    pub fn is_valid(&self) -> bool {
        self.outcome == Outcome::Valid
    }

    pub fn diagnostic(&self, key: &str) -> Option<&str> {
        self.diagnostics.get(key).map(String::as_str)
    }
}

/// All records of a run, in input order, plus the wildcard probes made.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RunReport {
    pub records: Vec<VerificationRecord>,
    pub domains: Vec<DomainProbeResult>,
}

impl RunReport {
    pub fn valid_addresses(&self) -> Vec<&str> {
        self.records
            .iter()
            .filter(|r| r.is_valid())
            .map(|r| r.address.as_str())
            .collect()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.records.iter().filter(|r| r.outcome == outcome).count()
    }
}

/// Progress notifications emitted while a run is going.
#[derive(Debug, Clone, Copy)]
pub enum RunEvent<'a> {
    /// A domain was probed for wildcard acceptance.
    Domain(&'a DomainProbeResult),
    /// One address is done.
    Record(&'a VerificationRecord),
}
