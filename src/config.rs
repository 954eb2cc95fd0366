use std::fmt;
use std::str::FromStr;
use std::time::Duration;

#[cfg(feature = "with-serde")]
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::ResolveOptions;
use crate::smtp::ProbeOptions;
use crate::validator::{parse_address, validate_address, validate_domain};

/// Replies one session waits for at most: greeting, EHLO, HELO, MAIL FROM,
/// RCPT TO, RSET, QUIT, plus one spare.
const REPLIES_PER_ATTEMPT: u32 = 8;

/// How deep each address is checked.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "with-serde", serde(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ValidationMethod {
    /// Syntax only, no network.
    Regex,
    /// Syntax plus a mail server for the domain.
    Mx,
    /// Syntax, mail server, and the server accepting the mailbox.
    #[default]
    Smtp,
}

impl ValidationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Regex => "regex",
            Self::Mx => "mx",
            Self::Smtp => "smtp",
        }
    }

    /// Lenient parse: anything unknown becomes `Smtp`, flagged so the
    /// caller can warn about it.
    pub fn parse_with_fallback(raw: &str) -> MethodChoice {
        match raw.parse() {
            Ok(method) => MethodChoice {
                method,
                fell_back: false,
            },
            Err(_) => MethodChoice {
                method: Self::Smtp,
                fell_back: true,
            },
        }
    }
}

impl fmt::Display for ValidationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ValidationMethod {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "regex" => Ok(Self::Regex),
            "mx" => Ok(Self::Mx),
            "smtp" => Ok(Self::Smtp),
            other => Err(ConfigError::UnknownMethod(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MethodChoice {
    pub method: ValidationMethod,
    pub fell_back: bool,
}

/// Identity presented to remote servers: HELO domain and MAIL FROM address.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierIdentity {
    pub email: String,
    pub domain: String,
}

impl VerifierIdentity {
    pub fn new(email: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            domain: domain.into(),
        }
    }
}

impl Default for VerifierIdentity {
    fn default() -> Self {
        Self::new("verifier@example.com", "example.com")
    }
}

/// Settings for one validation run. Built once, then shared read-only.
#[cfg_attr(feature = "with-serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationConfig {
    pub method: ValidationMethod,
    pub verifier: VerifierIdentity,
    pub connection_attempts: u32,
    pub fail_fast: bool,
    pub wildcard_detection: bool,
    pub safe_check: bool,
    pub smtp_port: u16,
    pub connect_timeout: Duration,
    pub response_timeout: Duration,
    pub dns_timeout: Duration,
    pub max_servers: usize,
    pub workers: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            method: ValidationMethod::Smtp,
            verifier: VerifierIdentity::default(),
            connection_attempts: 2,
            fail_fast: true,
            wildcard_detection: true,
            safe_check: false,
            smtp_port: 25,
            connect_timeout: Duration::from_secs(2),
            response_timeout: Duration::from_secs(2),
            dns_timeout: Duration::from_secs(2),
            max_servers: 5,
            workers: 1,
        }
    }
}

impl ValidationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.connection_attempts == 0 {
            return Err(ConfigError::ZeroValue("connection_attempts"));
        }
        if self.workers == 0 {
            return Err(ConfigError::ZeroValue("workers"));
        }
        if self.max_servers == 0 {
            return Err(ConfigError::ZeroValue("max_servers"));
        }

        let report = validate_address(&self.verifier.email);
        if !report.ok {
            return Err(ConfigError::VerifierEmail {
                email: self.verifier.email.clone(),
                reasons: report.reasons,
            });
        }

        let ascii = parse_address(&format!("x@{}", self.verifier.domain))
            .map(|parsed| parsed.domain)
            .map_err(|err| ConfigError::VerifierDomain {
                domain: self.verifier.domain.clone(),
                reasons: vec![err.to_string()],
            })?;
        let reasons = validate_domain(&ascii);
        if !reasons.is_empty() {
            return Err(ConfigError::VerifierDomain {
                domain: self.verifier.domain.clone(),
                reasons,
            });
        }
        Ok(())
    }

    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            attempts: self.connection_attempts,
            max_servers: self.max_servers,
        }
    }

    pub fn probe_options(&self) -> ProbeOptions<'_> {
        ProbeOptions {
            verifier: &self.verifier,
            attempts: self.connection_attempts,
            fail_fast: self.fail_fast,
            safe_check: self.safe_check,
            attempt_timeout: self.attempt_timeout(),
        }
    }

    /// Total time one SMTP session may take, derived from the per-reply
    /// timeout.
    pub fn attempt_timeout(&self) -> Duration {
        self.response_timeout * REPLIES_PER_ATTEMPT
    }

    /// Wildcard probing only makes sense when mailboxes are probed.
    pub fn detects_wildcards(&self) -> bool {
        self.method == ValidationMethod::Smtp && self.wildcard_detection
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown validation method '{0}' (expected regex, mx or smtp)")]
    UnknownMethod(String),
    #[error("{0} must be at least 1")]
    ZeroValue(&'static str),
    #[error("invalid verifier email '{email}': {}", reasons.join(", "))]
    VerifierEmail { email: String, reasons: Vec<String> },
    #[error("invalid verifier domain '{domain}': {}", reasons.join(", "))]
    VerifierDomain { domain: String, reasons: Vec<String> },
}
