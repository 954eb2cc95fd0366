use std::fmt;

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStage {
    Connect,
    Greeting,
    Helo,
    MailFrom,
    RcptTo,
    Rset,
    Quit,
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Connect => "connect",
            Self::Greeting => "greeting",
            Self::Helo => "helo",
            Self::MailFrom => "mail_from",
            Self::RcptTo => "rcpt_to",
            Self::Rset => "rset",
            Self::Quit => "quit",
        })
    }
}

/// A raw SMTP reply, preserving the numeric status code and message text.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpReply {
    pub code: u16,
    pub message: String,
}

impl SmtpReply {
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn is_positive_completion(&self) -> bool {
        (200..300).contains(&self.code)
    }

    pub fn is_transient_failure(&self) -> bool {
        (400..500).contains(&self.code)
    }

    pub fn is_permanent_failure(&self) -> bool {
        (500..600).contains(&self.code)
    }
}

impl fmt::Display for SmtpReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.message.replace('\n', " / "))
    }
}

/// A recorded SMTP transcript event used for diagnostics.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmtpEvent {
    Sent {
        stage: SessionStage,
        command: String,
    },
    Received {
        stage: SessionStage,
        reply: SmtpReply,
    },
    Error {
        stage: SessionStage,
        message: String,
    },
}

impl fmt::Display for SmtpEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sent { command, .. } => write!(f, "C: {command}"),
            Self::Received { reply, .. } => write!(f, "S: {reply}"),
            Self::Error { stage, message } => write!(f, "! {stage}: {message}"),
        }
    }
}

/// Outcome of one session (one attempt) against one server.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttemptOutcome {
    /// RCPT TO answered 2xx.
    Accepted { reply: SmtpReply },
    /// 5xx at any stage of the transaction.
    Rejected { stage: SessionStage, reply: SmtpReply },
    /// 4xx at any stage of the transaction.
    TemporaryFailure { stage: SessionStage, reply: SmtpReply },
    /// TCP connection could not be established.
    Unreachable { message: String },
    /// Connection dropped, timed out or spoke garbage mid-session.
    Interrupted { stage: SessionStage, message: String },
}

impl AttemptOutcome {
    pub fn reply(&self) -> Option<&SmtpReply> {
        match self {
            Self::Accepted { reply }
            | Self::Rejected { reply, .. }
            | Self::TemporaryFailure { reply, .. } => Some(reply),
            _ => None,
        }
    }

    /// Network-level failure: nothing was learnt from the server.
    pub fn is_network_failure(&self) -> bool {
        matches!(self, Self::Unreachable { .. } | Self::Interrupted { .. })
    }
}

/// Detailed report for a single SMTP session.
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerAttempt {
    pub server: String,
    pub attempt: u32,
    pub peer: Option<String>,
    pub events: Vec<SmtpEvent>,
    pub outcome: AttemptOutcome,
}

impl ServerAttempt {
    pub fn new(server: impl Into<String>, attempt: u32) -> Self {
        Self {
            server: server.into(),
            attempt,
            peer: None,
            events: Vec::new(),
            outcome: AttemptOutcome::Unreachable {
                message: "not attempted".to_string(),
            },
        }
    }

    pub fn transcript(&self) -> Vec<String> {
        self.events
            .iter()
            .map(|event| format!("[{} #{}] {event}", self.server, self.attempt))
            .collect()
    }
}

#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MailboxVerdict {
    Accepted,
    Rejected,
    Undetermined,
}

/// Aggregated result of [`probe_mailbox`](super::probe_mailbox).
#[cfg_attr(feature = "with-serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeReport {
    pub verdict: MailboxVerdict,
    /// Server that gave the deciding (or last meaningful) answer.
    pub responding_server: Option<String>,
    pub last_reply: Option<SmtpReply>,
    /// Why the verdict is not conclusive, when it is not.
    pub detail: Option<String>,
    pub attempts: Vec<ServerAttempt>,
}

impl ProbeReport {
    /// True when every attempt failed at the network level.
    pub fn only_network_failures(&self) -> bool {
        !self.attempts.is_empty() && self.attempts.iter().all(|a| a.outcome.is_network_failure())
    }

    pub fn transcript(&self) -> Vec<String> {
        self.attempts.iter().flat_map(ServerAttempt::transcript).collect()
    }

    pub fn attempts_for(&self, server: &str) -> usize {
        self.attempts.iter().filter(|a| a.server == server).count()
    }
}
