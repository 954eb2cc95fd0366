//! Mailbox probing over SMTP: greeting, EHLO, MAIL FROM, RCPT TO, then
//! RSET/QUIT. The message body is never sent.

mod connector;
mod error;
mod probe;
mod session;
mod types;

pub use connector::{Connected, Connector, TcpConnector};
pub use error::SessionError;
pub use probe::{ProbeOptions, SAFE_CHECK_DETAIL, is_mailbox_rejection, probe_mailbox};
pub use types::{
    AttemptOutcome, MailboxVerdict, ProbeReport, ServerAttempt, SessionStage, SmtpEvent, SmtpReply,
};

#[cfg(test)]
pub(crate) mod tests;
