//! tracing-subscriber setup for the bot.
//!
//! The configured level is a filter string: a bare level (`info`) or
//! comma-separated `target=level` directives (`warn,bcdice_bot=debug`).
//! [`parse_filter`] is shared with config loading so a typo in
//! `[bot].log_level` fails at startup instead of silently filtering
//! everything out.

use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::error::AppError;

/// Validate `directives` and build the filter.
///
/// `EnvFilter` alone reads an unknown word such as `verbose` as a target
/// name, so every directive's level part is checked first.
pub fn parse_filter(directives: &str) -> Result<EnvFilter, AppError> {
    let mut seen = 0;
    for directive in directives.split(',').map(str::trim).filter(|d| !d.is_empty()) {
        let level = directive.rsplit_once('=').map_or(directive, |(_, level)| level);
        level.parse::<LevelFilter>().map_err(|_| {
            AppError::Logger(format!("unrecognised log level '{level}' in '{directives}'"))
        })?;
        seen += 1;
    }
    if seen == 0 {
        return Err(AppError::Logger("log level must not be empty".into()));
    }
    EnvFilter::try_new(directives)
        .map_err(|e| AppError::Logger(format!("invalid log level '{directives}': {e}")))
}

/// Install the global subscriber, writing to stderr.
///
/// With `level_wins` (an explicit `-v`), `level` beats `RUST_LOG`. Otherwise
/// `RUST_LOG` beats `level`. Either way the other one is the fallback when
/// the first does not parse.
pub fn init(level: &str, level_wins: bool) -> Result<(), AppError> {
    let from_env = EnvFilter::try_from_default_env().ok();
    let filter = match from_env {
        Some(env) if !level_wins => env,
        from_env => match parse_filter(level) {
            Ok(filter) => filter,
            Err(e) => from_env.ok_or(e)?,
        },
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| AppError::Logger(format!("failed to set subscriber: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_and_directives_are_accepted() {
        for ok in ["error", "WARN", "info", "debug", "trace", "off", "warn,bcdice_bot=debug", "bcdice_bot::dice=trace"] {
            assert!(parse_filter(ok).is_ok(), "expected '{ok}' to be valid");
        }
    }

    #[test]
    fn unknown_levels_are_rejected() {
        for bad in ["", " , ", "verbose", "info,bcdice_bot=loud"] {
            assert!(matches!(parse_filter(bad), Err(AppError::Logger(_))), "expected '{bad}' to fail");
        }
    }

    #[test]
    fn init_succeeds_or_already_set() {
        // Another test in this process may have installed a subscriber first.
        match init("info", false) {
            Ok(()) => {}
            Err(AppError::Logger(msg)) if msg.contains("set subscriber") => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
