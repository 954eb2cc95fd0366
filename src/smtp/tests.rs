use std::collections::{HashMap, VecDeque};
use std::io::{self, Read, Write};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    AttemptOutcome, Connected, Connector, MailboxVerdict, ProbeOptions, SAFE_CHECK_DETAIL,
    SessionError, SmtpReply, is_mailbox_rejection, probe_mailbox,
};
use crate::config::VerifierIdentity;
use crate::resolver::MailServer;

type ConnectFn = dyn Fn(&str, usize) -> Option<String> + Send + Sync;
type CommandFn = dyn Fn(&str, &str) -> String + Send + Sync;

/// In-memory mail servers. `on_connect(host, n)` gives the greeting for the
/// n-th connection to `host` (`None` refuses it); `on_command(host, line)`
/// answers each command. Replies may span lines (`250-a\n250 b`); an empty
/// reply drops the connection and `TIMEOUT` makes the next read time out.
pub(crate) struct ScriptedConnector {
    on_connect: Box<ConnectFn>,
    on_command: Arc<CommandFn>,
    connects: Mutex<HashMap<String, usize>>,
    commands: Arc<Mutex<Vec<String>>>,
}

impl ScriptedConnector {
    pub(crate) fn new<G, H>(on_connect: G, on_command: H) -> Self
    where
        G: Fn(&str, usize) -> Option<String> + Send + Sync + 'static,
        H: Fn(&str, &str) -> String + Send + Sync + 'static,
    {
        Self {
            on_connect: Box::new(on_connect),
            on_command: Arc::new(on_command),
            connects: Mutex::new(HashMap::new()),
            commands: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Well-behaved servers that accept exactly the recipients `accepts`
    /// says yes to and answer `550 5.1.1` for the rest.
    pub(crate) fn accepting<P>(accepts: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self::new(
            |host, _| Some(format!("220 {host} ESMTP")),
            move |_, command| smtp_reply(command, &accepts),
        )
    }

    /// Connector that must never be used.
    pub(crate) fn unreachable() -> Self {
        Self::new(
            |host, _| panic!("unexpected SMTP connection to {host}"),
            |_, _| String::new(),
        )
    }

    pub(crate) fn connects_to(&self, host: &str) -> usize {
        self.connects.lock().get(host).copied().unwrap_or(0)
    }

    pub(crate) fn total_connects(&self) -> usize {
        self.connects.lock().values().sum()
    }

    /// Every command received, as `host: COMMAND`.
    pub(crate) fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    pub(crate) fn rcpt_targets(&self) -> Vec<String> {
        self.commands()
            .iter()
            .filter_map(|line| line.split_once("RCPT TO:<"))
            .map(|(_, rest)| rest.trim_end_matches('>').to_string())
            .collect()
    }
}

/// Replies of an ordinary server.
pub(crate) fn smtp_reply(command: &str, accepts: impl Fn(&str) -> bool) -> String {
    let upper = command.to_ascii_uppercase();
    if upper.starts_with("EHLO") {
        "250-mx.test\n250-PIPELINING\n250 8BITMIME".to_string()
    } else if upper.starts_with("HELO") {
        "250 mx.test".to_string()
    } else if upper.starts_with("MAIL FROM") {
        "250 2.1.0 Ok".to_string()
    } else if let Some(rest) = command.strip_prefix("RCPT TO:<") {
        let recipient = rest.trim_end_matches('>');
        if accepts(recipient) {
            "250 2.1.5 Ok".to_string()
        } else {
            format!("550 5.1.1 <{recipient}>: Recipient address rejected: User unknown")
        }
    } else if upper == "RSET" {
        "250 2.0.0 Ok".to_string()
    } else if upper == "QUIT" {
        "221 2.0.0 Bye".to_string()
    } else {
        "502 5.5.2 Error: command not recognized".to_string()
    }
}

impl Connector for ScriptedConnector {
    type Stream = ScriptedStream;

    fn connect(&self, host: &str) -> Result<Connected<ScriptedStream>, SessionError> {
        let n = {
            let mut connects = self.connects.lock();
            let count = connects.entry(host.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let Some(greeting) = (self.on_connect)(host, n) else {
            return Err(SessionError::Connect {
                addr: format!("{host}:25"),
                source: io::Error::new(io::ErrorKind::ConnectionRefused, "connection refused"),
            });
        };
        let mut stream = ScriptedStream {
            host: host.to_string(),
            pending: VecDeque::new(),
            partial: Vec::new(),
            closed: false,
            timeout_next_read: false,
            on_command: Arc::clone(&self.on_command),
            log: Arc::clone(&self.commands),
        };
        stream.push_reply(&greeting);
        Ok(Connected {
            stream,
            peer: format!("{host}:25"),
        })
    }
}

pub(crate) struct ScriptedStream {
    host: String,
    pending: VecDeque<u8>,
    partial: Vec<u8>,
    closed: bool,
    timeout_next_read: bool,
    on_command: Arc<CommandFn>,
    log: Arc<Mutex<Vec<String>>>,
}

impl ScriptedStream {
    fn push_reply(&mut self, reply: &str) {
        match reply {
            "" => self.closed = true,
            "TIMEOUT" => self.timeout_next_read = true,
            _ => {
                for line in reply.split('\n') {
                    self.pending.extend(line.as_bytes());
                    self.pending.extend(b"\r\n");
                }
            }
        }
    }
}

impl Read for ScriptedStream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.timeout_next_read {
            self.timeout_next_read = false;
            return Err(io::Error::new(io::ErrorKind::TimedOut, "read timed out"));
        }
        let n = buf.len().min(self.pending.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }
}

impl Write for ScriptedStream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.closed {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "connection closed"));
        }
        self.partial.extend_from_slice(buf);
        while let Some(pos) = self.partial.windows(2).position(|w| w == b"\r\n") {
            let line: Vec<u8> = self.partial.drain(..pos + 2).collect();
            let command = String::from_utf8_lossy(&line[..pos]).into_owned();
            self.log.lock().push(format!("{}: {command}", self.host));
            let reply = (self.on_command)(&self.host, &command);
            self.push_reply(&reply);
        }
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn servers(hosts: &[&str]) -> Vec<MailServer> {
    hosts
        .iter()
        .enumerate()
        .map(|(idx, host)| MailServer::new(*host, 10 * (idx as u16 + 1)))
        .collect()
}

fn options(verifier: &VerifierIdentity, attempts: u32, fail_fast: bool) -> ProbeOptions<'_> {
    ProbeOptions {
        verifier,
        attempts,
        fail_fast,
        safe_check: false,
        attempt_timeout: Duration::from_secs(30),
    }
}

/// Server whose RCPT TO always gets `rcpt_reply`.
fn rcpt_answer(reply: &'static str) -> impl Fn(&str, &str) -> String + Send + Sync + 'static {
    move |_, command| {
        if command.starts_with("RCPT TO") {
            reply.to_string()
        } else {
            smtp_reply(command, |_| true)
        }
    }
}

#[test]
fn accepted_recipient_is_accepted_without_data() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::accepting(|_| true);
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com"]),
        "alice@example.com",
        &options(&verifier, 2, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Accepted);
    assert_eq!(report.responding_server.as_deref(), Some("mx1.example.com"));
    assert_eq!(report.last_reply.as_ref().map(|r| r.code), Some(250));
    assert_eq!(
        connector.commands(),
        vec![
            "mx1.example.com: EHLO example.com",
            "mx1.example.com: MAIL FROM:<verifier@example.com>",
            "mx1.example.com: RCPT TO:<alice@example.com>",
            "mx1.example.com: RSET",
            "mx1.example.com: QUIT",
        ]
    );
    assert!(report.transcript().iter().any(|line| line.contains("S: 250 2.1.5 Ok")));
}

#[test]
fn permanent_rejection_is_not_retried() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::accepting(|_| false);
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "ghost@example.com",
        &options(&verifier, 3, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Rejected);
    assert_eq!(report.last_reply.as_ref().map(|r| r.code), Some(550));
    assert_eq!(connector.connects_to("mx1.example.com"), 1);
    assert_eq!(connector.connects_to("mx2.example.com"), 0, "fail_fast stops the probe");
}

#[test]
fn without_fail_fast_other_servers_are_tried() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::new(
        |_, _| Some("220 ready".to_string()),
        |host, command| smtp_reply(command, |_| host == "mx2.example.com"),
    );
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "bob@example.com",
        &options(&verifier, 2, false),
    );

    assert_eq!(report.verdict, MailboxVerdict::Accepted);
    assert_eq!(report.responding_server.as_deref(), Some("mx2.example.com"));
    assert_eq!(connector.connects_to("mx1.example.com"), 1);
}

#[test]
fn without_fail_fast_unanimous_rejection_reports_first_server() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::accepting(|_| false);
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "ghost@example.com",
        &options(&verifier, 2, false),
    );

    assert_eq!(report.verdict, MailboxVerdict::Rejected);
    assert_eq!(report.responding_server.as_deref(), Some("mx1.example.com"));
    assert_eq!(connector.total_connects(), 2);
}

#[test]
fn temporary_failures_are_retried_then_next_server() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::new(
        |_, _| Some("220 ready".to_string()),
        |host, command| {
            if host == "mx1.example.com" && command.starts_with("RCPT TO") {
                "451 4.7.1 Greylisted, try again later".to_string()
            } else {
                smtp_reply(command, |_| true)
            }
        },
    );
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "carol@example.com",
        &options(&verifier, 3, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Accepted);
    assert_eq!(connector.connects_to("mx1.example.com"), 3);
    assert_eq!(connector.connects_to("mx2.example.com"), 1);
    assert_eq!(report.attempts_for("mx1.example.com"), 3);
}

#[test]
fn greeting_tempfail_on_first_connect_then_success() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::new(
        |_, n| {
            Some(if n == 1 {
                "421 4.3.2 Service not available".to_string()
            } else {
                "220 ready".to_string()
            })
        },
        |_, command| smtp_reply(command, |_| true),
    );
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com"]),
        "dave@example.com",
        &options(&verifier, 2, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Accepted);
    assert_eq!(connector.connects_to("mx1.example.com"), 2);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::TemporaryFailure { .. }
    ));
}

#[test]
fn unreachable_servers_yield_undetermined() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::new(|_, _| None, |_, _| String::new());
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "erin@example.com",
        &options(&verifier, 2, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Undetermined);
    assert!(report.only_network_failures());
    assert_eq!(report.detail.as_deref(), Some("all candidate servers unreachable"));
    assert_eq!(connector.connects_to("mx1.example.com"), 2);
    assert_eq!(connector.connects_to("mx2.example.com"), 2);
}

#[test]
fn dropped_connection_and_timeout_count_as_attempts() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::new(
        |_, _| Some("220 ready".to_string()),
        |host, command| match (host, command.starts_with("MAIL FROM")) {
            ("mx1.example.com", true) => String::new(),
            ("mx2.example.com", true) => "TIMEOUT".to_string(),
            _ => smtp_reply(command, |_| true),
        },
    );
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com", "mx2.example.com"]),
        "frank@example.com",
        &options(&verifier, 1, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Undetermined);
    assert_eq!(report.attempts.len(), 2);
    assert!(report.only_network_failures());
    assert!(!connector.commands().iter().any(|c| c.ends_with("QUIT")));
}

#[test]
fn ehlo_refused_falls_back_to_helo() {
    let verifier = VerifierIdentity::new("probe@verifier.test", "verifier.test");
    let connector = ScriptedConnector::new(
        |_, _| Some("220 old-school".to_string()),
        |_, command| {
            if command.starts_with("EHLO") {
                "502 5.5.1 Unrecognized command".to_string()
            } else {
                smtp_reply(command, |_| true)
            }
        },
    );
    let report = probe_mailbox(
        &connector,
        &servers(&["mx.legacy.test"]),
        "gina@legacy.test",
        &options(&verifier, 1, true),
    );

    assert_eq!(report.verdict, MailboxVerdict::Accepted);
    let commands = connector.commands();
    assert_eq!(commands[0], "mx.legacy.test: EHLO verifier.test");
    assert_eq!(commands[1], "mx.legacy.test: HELO verifier.test");
    assert_eq!(commands[2], "mx.legacy.test: MAIL FROM:<probe@verifier.test>");
}

#[test]
fn safe_check_distrusts_policy_rejections() {
    let verifier = VerifierIdentity::default();
    let blocked = "554 5.7.1 Service unavailable; client host blocked using zen.spamhaus.org";

    let connector =
        ScriptedConnector::new(|_, _| Some("220 ready".to_string()), rcpt_answer(blocked));
    let mut opts = options(&verifier, 2, true);
    opts.safe_check = true;
    let report = probe_mailbox(&connector, &servers(&["mx1.example.com"]), "h@example.com", &opts);
    assert_eq!(report.verdict, MailboxVerdict::Undetermined);
    assert_eq!(report.detail.as_deref(), Some(SAFE_CHECK_DETAIL));
    assert_eq!(connector.connects_to("mx1.example.com"), 1);

    let connector =
        ScriptedConnector::new(|_, _| Some("220 ready".to_string()), rcpt_answer(blocked));
    let report = probe_mailbox(
        &connector,
        &servers(&["mx1.example.com"]),
        "h@example.com",
        &options(&verifier, 2, true),
    );
    assert_eq!(report.verdict, MailboxVerdict::Rejected);
}

#[test]
fn safe_check_trusts_unknown_user_rejections() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::accepting(|_| false);
    let mut opts = options(&verifier, 2, true);
    opts.safe_check = true;
    let report = probe_mailbox(&connector, &servers(&["mx1.example.com"]), "i@example.com", &opts);
    assert_eq!(report.verdict, MailboxVerdict::Rejected);
}

#[test]
fn no_servers_is_undetermined() {
    let verifier = VerifierIdentity::default();
    let connector = ScriptedConnector::unreachable();
    let report = probe_mailbox(&connector, &[], "j@example.com", &options(&verifier, 2, true));
    assert_eq!(report.verdict, MailboxVerdict::Undetermined);
    assert_eq!(report.detail.as_deref(), Some("no candidate mail server"));
}

#[test]
fn mailbox_rejection_wording() {
    assert!(is_mailbox_rejection(&SmtpReply::new(550, "No such user here")));
    assert!(is_mailbox_rejection(&SmtpReply::new(
        550,
        "Requested action not taken: mailbox unavailable"
    )));
    assert!(is_mailbox_rejection(&SmtpReply::new(553, "5.1.1 bad destination mailbox address")));
    assert!(!is_mailbox_rejection(&SmtpReply::new(
        550,
        "5.7.1 Message rejected due to local policy"
    )));
    assert!(!is_mailbox_rejection(&SmtpReply::new(554, "Your IP is blacklisted")));
    assert!(!is_mailbox_rejection(&SmtpReply::new(450, "mailbox busy")));
}

#[test]
fn dripping_greeting_is_cut_by_attempt_deadline() {
    use crate::resolver::tests::StubResolver;
    use crate::smtp::TcpConnector;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Instant;

    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().expect("addr").port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().expect("accept");
        // une ligne de continuation toutes les 50ms, jusqu'à ce que le client coupe
        for _ in 0..200 {
            if stream.write_all(b"220-still greeting\r\n").is_err() {
                break;
            }
            thread::sleep(Duration::from_millis(50));
        }
    });

    let connector = TcpConnector::new(
        StubResolver::unreachable(),
        port,
        Duration::from_secs(1),
        Duration::from_millis(500),
    );
    let verifier = VerifierIdentity::default();
    let mut opts = options(&verifier, 1, true);
    opts.attempt_timeout = Duration::from_millis(300);

    let started = Instant::now();
    let report = probe_mailbox(
        &connector,
        &servers(&["127.0.0.1"]),
        "alice@example.com",
        &opts,
    );
    assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
    assert_eq!(report.verdict, MailboxVerdict::Undetermined);
    assert!(matches!(
        report.attempts[0].outcome,
        AttemptOutcome::Interrupted { .. }
    ));
    server.join().expect("server");
}
