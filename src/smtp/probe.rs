use std::io::{Read, Write};
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use regex::Regex;
use tracing::{debug, info};

use super::connector::{Connected, Connector};
use super::error::SessionError;
use super::session::SmtpSession;
use super::types::{
    AttemptOutcome, MailboxVerdict, ProbeReport, ServerAttempt, SessionStage, SmtpEvent, SmtpReply,
};
use crate::config::VerifierIdentity;
use crate::resolver::MailServer;

pub const SAFE_CHECK_DETAIL: &str = "safe check: rejection not mailbox-specific";

static MAILBOX_WORDING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(user|account|customer|mailbox|recipient|address)").expect("valid regex")
});

/// How a probe behaves; borrowed from the run configuration.
#[derive(Debug, Clone, Copy)]
pub struct ProbeOptions<'a> {
    pub verifier: &'a VerifierIdentity,
    /// Sessions per server before moving to the next one (>= 1).
    pub attempts: u32,
    /// Stop the whole probe at the first permanent rejection.
    pub fail_fast: bool,
    /// Only trust 5xx replies that name the recipient as unknown.
    pub safe_check: bool,
    /// Wall-clock budget for one session, from connect to QUIT.
    pub attempt_timeout: Duration,
}

/// Asks each server in turn whether it accepts `target` as a recipient.
///
/// A 2xx to RCPT TO ends the probe. Temporary failures (4xx, connection
/// errors, timeouts, garbled replies) are retried on the same server up to
/// `attempts` times. A permanent rejection is never retried on the same
/// server; with `fail_fast` it ends the probe, otherwise the remaining
/// servers still get a chance to accept. No DATA is ever sent.
pub fn probe_mailbox<C>(
    connector: &C,
    servers: &[MailServer],
    target: &str,
    options: &ProbeOptions<'_>,
) -> ProbeReport
where
    C: Connector + ?Sized,
{
    let attempts = options.attempts.max(1);
    let mut report = ProbeReport {
        verdict: MailboxVerdict::Undetermined,
        responding_server: None,
        last_reply: None,
        detail: None,
        attempts: Vec::new(),
    };
    let mut rejection: Option<(String, SmtpReply)> = None;
    let mut suspect_rejection = false;

    'servers: for server in servers {
        for attempt in 1..=attempts {
            let record = run_attempt(connector, &server.host, attempt, target, options);
            let outcome = record.outcome.clone();
            report.attempts.push(record);

            match outcome {
                AttemptOutcome::Accepted { reply } => {
                    debug!(
                        recipient = target,
                        server = %server.host,
                        attempt,
                        "recipient accepted"
                    );
                    report.verdict = MailboxVerdict::Accepted;
                    report.responding_server = Some(server.host.clone());
                    report.last_reply = Some(reply);
                    return report;
                }
                AttemptOutcome::Rejected { stage, reply } => {
                    if options.safe_check && !is_mailbox_rejection(&reply) {
                        info!(
                            recipient = target,
                            server = %server.host,
                            %stage,
                            reply = %reply,
                            "rejection not mailbox-specific, ignored"
                        );
                        suspect_rejection = true;
                        report.responding_server = Some(server.host.clone());
                        report.last_reply = Some(reply);
                        continue 'servers;
                    }
                    debug!(
                        recipient = target,
                        server = %server.host,
                        %stage,
                        reply = %reply,
                        "permanent rejection"
                    );
                    if options.fail_fast {
                        report.verdict = MailboxVerdict::Rejected;
                        report.responding_server = Some(server.host.clone());
                        report.last_reply = Some(reply);
                        return report;
                    }
                    rejection.get_or_insert((server.host.clone(), reply));
                    continue 'servers;
                }
                AttemptOutcome::TemporaryFailure { stage, reply } => {
                    debug!(
                        recipient = target,
                        server = %server.host,
                        attempt,
                        %stage,
                        reply = %reply,
                        "temporary failure"
                    );
                    report.responding_server = Some(server.host.clone());
                    report.last_reply = Some(reply);
                }
                AttemptOutcome::Unreachable { message } => {
                    debug!(
                        recipient = target,
                        server = %server.host,
                        attempt,
                        error = %message,
                        "server unreachable"
                    );
                }
                AttemptOutcome::Interrupted { stage, message } => {
                    debug!(
                        recipient = target,
                        server = %server.host,
                        attempt,
                        %stage,
                        error = %message,
                        "session interrupted"
                    );
                }
            }
        }
        debug!(
            recipient = target,
            server = %server.host,
            attempts,
            "attempts exhausted,
            next server"
        );
    }

    if let Some((server, reply)) = rejection {
        report.verdict = MailboxVerdict::Rejected;
        report.responding_server = Some(server);
        report.last_reply = Some(reply);
        return report;
    }

    report.detail = Some(if servers.is_empty() {
        "no candidate mail server".to_string()
    } else if suspect_rejection {
        SAFE_CHECK_DETAIL.to_string()
    } else if report.only_network_failures() {
        "all candidate servers unreachable".to_string()
    } else {
        "no definitive answer from any candidate server".to_string()
    });
    report
}

/// 550 + wording about the recipient, or the 5.1.1 enhanced status.
pub fn is_mailbox_rejection(reply: &SmtpReply) -> bool {
    if !reply.is_permanent_failure() {
        return false;
    }
    if reply.message.contains("5.1.1") {
        return true;
    }
    reply.code == 550 && MAILBOX_WORDING.is_match(&reply.message)
}

fn run_attempt<C>(
    connector: &C,
    host: &str,
    attempt: u32,
    target: &str,
    options: &ProbeOptions<'_>,
) -> ServerAttempt
where
    C: Connector + ?Sized,
{
    let mut record = ServerAttempt::new(host, attempt);
    let Connected { stream, peer } = match connector.connect(host) {
        Ok(connected) => connected,
        Err(err) => {
            let message = err.to_string();
            record.events.push(SmtpEvent::Error {
                stage: SessionStage::Connect,
                message: message.clone(),
            });
            record.outcome = AttemptOutcome::Unreachable { message };
            return record;
        }
    };
    record.peer = Some(peer);

    let mut session = SmtpSession::new(stream, Instant::now() + options.attempt_timeout);
    record.outcome = match dialogue(&mut session, target, options) {
        Ok((outcome, in_transaction)) => {
            session.close(in_transaction);
            outcome
        }
        // connexion morte: pas de QUIT
        Err(outcome) => outcome,
    };
    record.events = session.into_events();
    record
}

/// Greeting, EHLO (HELO si refusé), MAIL FROM, RCPT TO.
///
/// `Ok` carries the outcome plus whether a mail transaction is open (so
/// the caller knows to RSET). `Err` means the connection is unusable.
fn dialogue<S: Read + Write>(
    session: &mut SmtpSession<S>,
    target: &str,
    options: &ProbeOptions<'_>,
) -> Result<(AttemptOutcome, bool), AttemptOutcome> {
    let greeting = session
        .read_reply(SessionStage::Greeting)
        .map_err(broken(SessionStage::Greeting))?;
    if let Some(outcome) = verdict_for(SessionStage::Greeting, &greeting) {
        return Ok((outcome, false));
    }

    let helo_domain = &options.verifier.domain;
    let mut helo = session
        .command(SessionStage::Helo, &format!("EHLO {helo_domain}"))
        .map_err(broken(SessionStage::Helo))?;
    if matches!(helo.code, 500 | 502) {
        debug!(code = helo.code, "EHLO not supported, falling back to HELO");
        helo = session
            .command(SessionStage::Helo, &format!("HELO {helo_domain}"))
            .map_err(broken(SessionStage::Helo))?;
    }
    if let Some(outcome) = verdict_for(SessionStage::Helo, &helo) {
        return Ok((outcome, false));
    }

    let mail_from = session
        .command(
            SessionStage::MailFrom,
            &format!("MAIL FROM:<{}>", options.verifier.email),
        )
        .map_err(broken(SessionStage::MailFrom))?;
    if let Some(outcome) = verdict_for(SessionStage::MailFrom, &mail_from) {
        return Ok((outcome, false));
    }

    let rcpt = session
        .command(SessionStage::RcptTo, &format!("RCPT TO:<{target}>"))
        .map_err(broken(SessionStage::RcptTo))?;
    let outcome = match verdict_for(SessionStage::RcptTo, &rcpt) {
        Some(outcome) => outcome,
        None => AttemptOutcome::Accepted { reply: rcpt },
    };
    Ok((outcome, true))
}

/// `None` when the reply lets the dialogue continue.
fn verdict_for(stage: SessionStage, reply: &SmtpReply) -> Option<AttemptOutcome> {
    if reply.is_positive_completion() {
        None
    } else if reply.is_transient_failure() {
        Some(AttemptOutcome::TemporaryFailure {
            stage,
            reply: reply.clone(),
        })
    } else if reply.is_permanent_failure() {
        Some(AttemptOutcome::Rejected {
            stage,
            reply: reply.clone(),
        })
    } else {
        Some(AttemptOutcome::Interrupted {
            stage,
            message: format!("unexpected reply: {reply}"),
        })
    }
}

fn broken(stage: SessionStage) -> impl Fn(SessionError) -> AttemptOutcome {
    move |err| {
        debug!(%stage, timeout = err.is_timeout(), error = %err, "session broken");
        AttemptOutcome::Interrupted {
            stage,
            message: err.to_string(),
        }
    }
}
