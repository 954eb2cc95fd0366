use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Error, Result, bail};
use mailsift_lib::RunReport;

pub const GOPHISH_HEADER: [&str; 4] = ["First Name", "Last Name", "Email", "Position"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// une adresse valide par ligne
    List,
    /// modèle CSV de groupe gophish
    Gophish,
    /// tous les enregistrements (feature `with-serde`)
    Json,
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::List => "list",
            Self::Gophish => "gophish csv",
            Self::Json => "json",
        })
    }
}

impl FromStr for OutputFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "list" => Ok(Self::List),
            "gophish" | "csv" => Ok(Self::Gophish),
            "json" => Ok(Self::Json),
            other => bail!("unknown --format '{other}', use: list|gophish|json"),
        }
    }
}

pub fn render(format: OutputFormat, report: &RunReport) -> Result<Vec<u8>> {
    match format {
        OutputFormat::List => Ok(render_list(&report.valid_addresses())),
        OutputFormat::Gophish => render_gophish(&report.valid_addresses()),
        OutputFormat::Json => render_json(report),
    }
}

/// Newline-joined, no trailing newline.
pub fn render_list(valid: &[&str]) -> Vec<u8> {
    valid.join("\n").into_bytes()
}

pub fn render_gophish(valid: &[&str]) -> Result<Vec<u8>> {
    let mut wtr = csv::Writer::from_writer(Vec::new());
    wtr.write_record(GOPHISH_HEADER)?;
    for email in valid {
        wtr.write_record(["", "", *email, ""])?;
    }
    wtr.into_inner().context("flush gophish csv")
}

#[cfg(feature = "with-serde")]
fn render_json(report: &RunReport) -> Result<Vec<u8>> {
    Ok(serde_json::to_vec_pretty(&report.records)?)
}

#[cfg(not(feature = "with-serde"))]
fn render_json(_: &RunReport) -> Result<Vec<u8>> {
    bail!("format=json nécessite la feature 'with-serde'")
}

/// Fails early for formats this build cannot produce.
pub fn ensure_supported(format: OutputFormat) -> Result<()> {
    if format == OutputFormat::Json && !cfg!(feature = "with-serde") {
        bail!("format=json nécessite la feature 'with-serde'");
    }
    Ok(())
}

/// `valid.csv` -> `valid.csv.tmp`, never touching a sibling `valid.tmp`.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".tmp");
    PathBuf::from(name)
}

pub fn write_all_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    use std::io::Write;

    let tmp = temp_path(path);
    {
        let mut f = std::fs::File::create(&tmp)
            .with_context(|| format!("create {}", tmp.display()))?;
        f.write_all(bytes)?;
        f.sync_all()?;
    }
    std::fs::rename(&tmp, path)
        .with_context(|| format!("rename {} -> {}", tmp.display(), path.display()))?;
    Ok(())
}
