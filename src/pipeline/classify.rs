//! Folds stage results into one [`VerificationRecord`] per address.

use std::collections::BTreeMap;

use super::types::{FailureKind, Outcome, Stage, VerificationRecord};
use crate::config::ValidationMethod;
use crate::resolver::{Resolution, ResolveFailure};
use crate::smtp::{MailboxVerdict, ProbeReport};
use crate::validator::{AddressError, SyntaxReport};
use crate::wildcard::DomainProbeResult;

pub const WILDCARD_REASON: &str =
    "domain accepts all recipients, cannot confirm individual mailbox";

struct RecordBuilder {
    address: String,
    diagnostics: BTreeMap<String, String>,
}

impl RecordBuilder {
    fn new(address: &str, method: ValidationMethod) -> Self {
        let mut diagnostics = BTreeMap::new();
        diagnostics.insert("method".to_string(), method.to_string());
        Self {
            address: address.to_string(),
            diagnostics,
        }
    }

    fn note(mut self, key: &str, value: impl ToString) -> Self {
        self.diagnostics.insert(key.to_string(), value.to_string());
        self
    }

    fn note_opt<T: ToString>(self, key: &str, value: Option<T>) -> Self {
        match value {
            Some(value) => self.note(key, value),
            None => self,
        }
    }

    fn finish(
        mut self,
        outcome: Outcome,
        stage: Stage,
        failure: Option<FailureKind>,
    ) -> VerificationRecord {
        self.diagnostics
            .insert("stage".to_string(), stage.to_string());
        VerificationRecord {
            address: self.address,
            outcome,
            stage_reached: stage,
            failure,
            diagnostics: self.diagnostics,
        }
    }
}

pub(crate) fn malformed(
    address: &str,
    method: ValidationMethod,
    err: &AddressError,
) -> VerificationRecord {
    RecordBuilder::new(address, method)
        .note("error", err)
        .finish(Outcome::Invalid, Stage::Syntax, Some(FailureKind::MalformedAddress))
}

pub(crate) fn syntax_rejected(
    address: &str,
    method: ValidationMethod,
    report: &SyntaxReport,
) -> VerificationRecord {
    RecordBuilder::new(address, method)
        .note("reason", report.reasons.join("; "))
        .finish(Outcome::Invalid, Stage::Syntax, Some(FailureKind::MalformedAddress))
}

pub(crate) fn syntax_accepted(address: &str, method: ValidationMethod) -> VerificationRecord {
    RecordBuilder::new(address, method).finish(Outcome::Valid, Stage::Syntax, None)
}

pub(crate) fn unresolvable(
    address: &str,
    method: ValidationMethod,
    failure: &ResolveFailure,
) -> VerificationRecord {
    RecordBuilder::new(address, method)
        .note("error", failure)
        .finish(
            Outcome::Invalid,
            Stage::Resolution,
            Some(FailureKind::DomainUnresolvable),
        )
}

pub(crate) fn resolved(
    address: &str,
    method: ValidationMethod,
    resolution: &Resolution,
) -> VerificationRecord {
    RecordBuilder::new(address, method)
        .note("mx", resolution.hosts().join(","))
        .finish(Outcome::Valid, Stage::Resolution, None)
}

/// SMTP verdict, downgraded from valid to undetermined on wildcard domains.
pub(crate) fn probed(
    address: &str,
    method: ValidationMethod,
    resolution: &Resolution,
    report: &ProbeReport,
    wildcard: Option<&DomainProbeResult>,
) -> VerificationRecord {
    let builder = RecordBuilder::new(address, method)
        .note("mx", resolution.hosts().join(","))
        .note("attempts", report.attempts.len())
        .note_opt("responding_server", report.responding_server.as_deref())
        .note_opt("smtp_code", report.last_reply.as_ref().map(|r| r.code))
        .note_opt(
            "smtp_message",
            report
                .last_reply
                .as_ref()
                .map(|r| r.message.replace('\n', " / ")),
        )
        .note_opt("wildcard", wildcard.map(|w| w.status))
        .note_opt("reason", report.detail.as_deref());
    let transcript = report.transcript();
    let builder = if transcript.is_empty() {
        builder
    } else {
        builder.note("transcript", transcript.join("\n"))
    };

    match report.verdict {
        MailboxVerdict::Accepted if wildcard.is_some_and(DomainProbeResult::is_wildcard) => builder
            .note("reason", WILDCARD_REASON)
            .finish(
                Outcome::Undetermined,
                Stage::Smtp,
                Some(FailureKind::WildcardDomain),
            ),
        MailboxVerdict::Accepted => builder.finish(Outcome::Valid, Stage::Smtp, None),
        MailboxVerdict::Rejected => builder.finish(
            Outcome::Invalid,
            Stage::Smtp,
            Some(FailureKind::PermanentSmtpRejection),
        ),
        MailboxVerdict::Undetermined => {
            let failure = if report.only_network_failures() {
                FailureKind::TransientNetworkFailure
            } else {
                FailureKind::AmbiguousSmtpResponse
            };
            builder.finish(Outcome::Undetermined, Stage::Smtp, Some(failure))
        }
    }
}
