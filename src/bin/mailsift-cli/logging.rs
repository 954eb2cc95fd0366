use std::io;

use tracing_subscriber::EnvFilter;

/// Logs go to stderr so stdout stays the report. `RUST_LOG` wins over `-vv`.
pub fn init(verbosity: u8) {
    let default = if verbosity >= 2 {
        "mailsift_lib=debug,mailsift_cli=debug"
    } else {
        "warn"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    // déjà initialisé (tests): on ignore
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .try_init();
}
