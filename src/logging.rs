//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Crates whose debug output drowns the scraper's own.
const QUIET: [&str; 4] = ["html5ever", "selectors", "reqwest", "hyper"];

/// Filter directives for a `-v` count, used when `RUST_LOG` is unset.
pub fn default_directives(verbosity: u8) -> String {
    let level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let mut directives = vec![level.to_string()];
    directives.extend(QUIET.iter().map(|krate| format!("{krate}=warn")));
    directives.join(",")
}

/// Install the global subscriber. Logs go to stderr; stdout carries reports.
pub fn init(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directives(verbosity)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
