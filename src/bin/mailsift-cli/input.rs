use std::fs;
use std::io::{self, IsTerminal, Read};

use anyhow::{Context, Result};

use crate::args::Cli;

/// Addresses from `-i FILE` (or piped stdin), then the positional ones.
/// Empty when there is nothing to read.
pub fn load(cli: &Cli) -> Result<Vec<String>> {
    let mut raw = String::new();
    if let Some(path) = &cli.input {
        raw = fs::read_to_string(path)
            .with_context(|| format!("read input file {}", path.display()))?;
    } else if cli.emails.is_empty() && !io::stdin().is_terminal() {
        io::stdin()
            .lock()
            .read_to_string(&mut raw)
            .context("read stdin")?;
    }

    let mut addresses = split_addresses(&raw);
    addresses.extend(cli.emails.iter().cloned());
    Ok(addresses)
}

/// Any whitespace separates addresses; no deduplication.
pub fn split_addresses(raw: &str) -> Vec<String> {
    raw.split_whitespace().map(str::to_string).collect()
}
