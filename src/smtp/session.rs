use std::io::{self, BufRead, BufReader, Read, Write};
use std::time::Instant;

use tracing::debug;

use super::error::SessionError;
use super::types::{SessionStage, SmtpEvent, SmtpReply};

/// RFC 5321 caps a reply line at 512 octets; real servers go a bit over.
const MAX_REPLY_LINE: u64 = 1024;
const MAX_REPLY_LINES: usize = 64;

/// Fails every read and write once the attempt deadline has passed, so a
/// server dripping bytes cannot hold the attempt open.
struct Deadline<S> {
    inner: S,
    at: Instant,
}

impl<S> Deadline<S> {
    fn check(&self) -> io::Result<()> {
        if Instant::now() >= self.at {
            return Err(io::Error::new(
                io::ErrorKind::TimedOut,
                "attempt deadline exceeded",
            ));
        }
        Ok(())
    }
}

impl<S: Read> Read for Deadline<S> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.read(buf)
    }
}

impl<S: Write> Write for Deadline<S> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.check()?;
        self.inner.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One SMTP conversation over any byte stream, recording a transcript.
pub(crate) struct SmtpSession<S: Read + Write> {
    reader: BufReader<Deadline<S>>,
    events: Vec<SmtpEvent>,
}

impl<S: Read + Write> SmtpSession<S> {
    /// Every read and write after `deadline` fails with `TimedOut`.
    pub(crate) fn new(stream: S, deadline: Instant) -> Self {
        Self {
            reader: BufReader::new(Deadline {
                inner: stream,
                at: deadline,
            }),
            events: Vec::new(),
        }
    }

    pub(crate) fn read_reply(&mut self, stage: SessionStage) -> Result<SmtpReply, SessionError> {
        match parse_reply(&mut self.reader) {
            Ok(reply) => {
                debug!(%stage, code = reply.code, "S: {}", reply.message);
                self.events.push(SmtpEvent::Received {
                    stage,
                    reply: reply.clone(),
                });
                Ok(reply)
            }
            Err(err) => {
                let err = SessionError::io(err);
                self.record_error(stage, &err);
                Err(err)
            }
        }
    }

    pub(crate) fn command(
        &mut self,
        stage: SessionStage,
        command: &str,
    ) -> Result<SmtpReply, SessionError> {
        debug!(%stage, "C: {command}");
        self.events.push(SmtpEvent::Sent {
            stage,
            command: command.to_string(),
        });
        if let Err(err) = self.write_line(command) {
            let err = SessionError::io(err);
            self.record_error(stage, &err);
            return Err(err);
        }
        self.read_reply(stage)
    }

    /// Best effort: RSET (when a transaction is open) then QUIT. Errors only
    /// land in the transcript.
    pub(crate) fn close(&mut self, reset: bool) {
        if reset && self.command(SessionStage::Rset, "RSET").is_err() {
            return;
        }
        let _ = self.command(SessionStage::Quit, "QUIT");
    }

    pub(crate) fn record_error(&mut self, stage: SessionStage, err: &SessionError) {
        self.events.push(SmtpEvent::Error {
            stage,
            message: err.to_string(),
        });
    }

    pub(crate) fn into_events(self) -> Vec<SmtpEvent> {
        self.events
    }

    fn write_line(&mut self, command: &str) -> io::Result<()> {
        let stream = self.reader.get_mut();
        let mut line = command.as_bytes().to_vec();
        line.extend_from_slice(b"\r\n");
        stream.write_all(&line)?;
        stream.flush()
    }
}

/// Reads one (possibly multi-line) reply: `250-first`, ..., `250 last`.
pub(crate) fn parse_reply<R: BufRead>(reader: &mut R) -> io::Result<SmtpReply> {
    let mut code = None;
    let mut message_lines = Vec::new();
    loop {
        if message_lines.len() >= MAX_REPLY_LINES {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply longer than {MAX_REPLY_LINES} lines"),
            ));
        }
        let mut raw = String::new();
        let bytes = (&mut *reader).take(MAX_REPLY_LINE).read_line(&mut raw)?;
        if bytes == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed while reading reply",
            ));
        }
        if !raw.ends_with('\n') && bytes as u64 >= MAX_REPLY_LINE {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("SMTP reply line longer than {MAX_REPLY_LINE} bytes"),
            ));
        }
        if raw.ends_with('\n') {
            raw.pop();
            if raw.ends_with('\r') {
                raw.pop();
            }
        }

        if raw.len() < 3 || !raw.is_char_boundary(3) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SMTP reply: '{raw}'"),
            ));
        }
        let code_part = &raw[..3];
        let parsed_code = code_part.parse::<u16>().map_err(|_| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid SMTP status code: '{code_part}'"),
            )
        })?;
        if let Some(existing) = code {
            if existing != parsed_code {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!("inconsistent SMTP reply codes: {existing} vs {parsed_code}"),
                ));
            }
        } else {
            code = Some(parsed_code);
        }
        let continuation = raw.as_bytes().get(3).copied() == Some(b'-');
        let text = raw.get(4..).unwrap_or_default().to_string();
        message_lines.push(text);
        if !continuation {
            break;
        }
    }
    Ok(SmtpReply {
        code: code.ok_or_else(|| {
            io::Error::new(io::ErrorKind::InvalidData, "SMTP reply missing status code")
        })?,
        message: message_lines.join("\n"),
    })
}
