#![forbid(unsafe_code)]
//! mailsift_lib: vérification en masse de listes d'adresses e-mail
//! (syntaxe, MX, sonde SMTP, détection des domaines catch-all)

pub mod config;
pub mod error;
pub mod pipeline;
pub mod resolver;
pub mod smtp;
pub mod validator;
pub mod wildcard;

pub use config::{ConfigError, MethodChoice, ValidationConfig, ValidationMethod, VerifierIdentity};
pub use error::Error;
pub use pipeline::{
    FailureKind, Outcome, RunEvent, RunReport, Stage, SystemVerifier, VerificationRecord, Verifier,
};
pub use resolver::{DnsLookup, MailServer, Resolution, ResolveFailure, resolve_mail_servers};
pub use smtp::{Connector, ProbeReport, TcpConnector, probe_mailbox};
pub use validator::{
    AddressError, ParsedAddress, SyntaxReport, parse_address, validate_address, validate_syntax,
};
pub use wildcard::{DomainProbeResult, WildcardStatus};
