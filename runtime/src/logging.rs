//! Tracing subscriber setup for the binary.

use tracing_subscriber::EnvFilter;

/// Default directives by verbosity.
pub fn default_directives(verbose: bool, quiet: bool) -> &'static str {
    if verbose {
        "course_harvest=debug,harvest_core=debug"
    } else if quiet {
        "course_harvest=warn,harvest_core=warn"
    } else {
        "course_harvest=info,harvest_core=info"
    }
}

/// Initialize tracing. `RUST_LOG` wins over the verbosity flags; `json`
/// switches to one JSON object per line.
pub fn init(verbose: bool, quiet: bool, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(verbose, quiet)));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false);
    let _ = if json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
}
