mod args;
mod input;
mod logging;
mod output;
mod report;

use anyhow::{Context, Result};
use mailsift_lib::{Outcome, SystemVerifier};
use tracing::{info, warn};

use crate::args::Cli;
use crate::output::OutputFormat;
use crate::report::Console;

// codes de sortie : 0 OK, 1 fatal (anyhow)
fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    // format invalide = fatal, avant toute vérification
    let format: OutputFormat = cli.format.parse()?;
    output::ensure_supported(format)?;

    let addresses = input::load(&cli)?;
    if addresses.is_empty() {
        Cli::clap_command().print_help()?;
        println!();
        return Ok(());
    }

    let choice = cli.method_choice();
    if choice.fell_back {
        warn!(method = %cli.method, "unknown validation method, falling back to smtp");
    }
    let verifier =
        SystemVerifier::from_system(cli.to_config(choice.method)).context("setup failed")?;
    info!(
        method = %verifier.config().method,
        addresses = addresses.len(),
        workers = verifier.config().workers,
        "starting run"
    );

    let mut console = Console::new(cli.verbose > 0);
    let report = verifier.verify_all_with(&addresses, |event| console.on_event(event));

    let written = match &cli.output {
        Some(path) => {
            let bytes = output::render(format, &report)?;
            output::write_all_atomically(path, &bytes)
                .with_context(|| format!("write output file {}", path.display()))?;
            Some((path.as_path(), format))
        }
        None => None,
    };
    println!(
        "{}",
        report::tally(report.count(Outcome::Valid), addresses.len(), written)
    );
    Ok(())
}
