//! Logger setup for the command-line tool

use log::LevelFilter;

/// Map `-v`/`-q` flags onto a log level, `info` by default
pub const fn level_for(verbose: u8, quiet: bool) -> LevelFilter {
    if quiet {
        return LevelFilter::Error;
    }
    match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    }
}

/// Install the global logger; `RUST_LOG` takes precedence over the flags
///
/// Calling this more than once keeps the first logger.
pub fn setup_logging(verbose: u8, quiet: bool) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level_for(verbose, quiet))
        .format_timestamp_millis()
        .parse_default_env();

    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }
}
