use std::path::Path;

use mailsift_lib::{DomainProbeResult, Outcome, RunEvent, VerificationRecord};

use crate::output::OutputFormat;

const INDENT: &str = "        ";

/// Progress report on stdout; diagnostics only when verbose.
pub struct Console {
    verbose: bool,
}

impl Console {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    pub fn on_event(&mut self, event: RunEvent<'_>) {
        let lines = match event {
            RunEvent::Domain(probe) => domain_lines(probe, self.verbose),
            RunEvent::Record(record) => record_lines(record, self.verbose),
        };
        for line in lines {
            println!("{line}");
        }
    }
}

pub fn marker(outcome: Outcome) -> &'static str {
    match outcome {
        Outcome::Valid => "[+]",
        Outcome::Invalid => "[-]",
        Outcome::Undetermined => "[?]",
    }
}

pub fn record_lines(record: &VerificationRecord, verbose: bool) -> Vec<String> {
    let mut lines = vec![format!("{} {}", marker(record.outcome), record.address)];
    if verbose {
        lines.push(format!("{INDENT}outcome: {}", record.outcome));
        if let Some(failure) = record.failure {
            lines.push(format!("{INDENT}failure: {failure}"));
        }
        for (key, value) in &record.diagnostics {
            let mut values = value.lines();
            let first = values.next().unwrap_or_default();
            lines.push(format!("{INDENT}{key}: {first}"));
            // transcript: une ligne par événement
            for rest in values {
                lines.push(format!("{INDENT}  {rest}"));
            }
        }
    }
    lines
}

pub fn domain_lines(probe: &DomainProbeResult, verbose: bool) -> Vec<String> {
    let mut lines = Vec::new();
    if verbose {
        lines.push(format!("[*] Checking for wildcard on domain: {}", probe.domain));
        lines.push(format!("{INDENT}status: {}", probe.status));
        if let Some(diagnostic) = &probe.diagnostic {
            lines.push(format!("{INDENT}{diagnostic}"));
        }
    }
    if probe.is_wildcard() {
        lines.push(format!("[!] Wildcard on domain {} detected", probe.domain));
    }
    lines
}

pub fn tally(valid: usize, total: usize, written: Option<(&Path, OutputFormat)>) -> String {
    let mut line = format!("[*] {valid} valid emails out of {total} input emails");
    if let Some((path, format)) = written {
        line.push_str(&format!(
            " were written to file: {} as {format}",
            path.display()
        ));
    }
    line
}
