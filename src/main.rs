//! BCDice bot — entry point.
//!
//! Startup sequence:
//!   1. Load .env (if present)
//!   2. Load config (file + BCDICE_* env overrides)
//!   3. Resolve effective log level (CLI `-v` flags > env > config)
//!   4. Init logger once
//!   5. Build dice client and open the rule-file store
//!   6. Generate the admin password and print it once
//!   7. Spawn Ctrl-C → shutdown signal watcher
//!   8. Run comms channels until shutdown

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::info;

use bcdice_bot::dice::providers;
use bcdice_bot::dispatcher::Dispatcher;
use bcdice_bot::dispatcher::admin::AdminPassword;
use bcdice_bot::error::AppError;
use bcdice_bot::rules::RuleFileStore;
use bcdice_bot::{comms, config, logger};

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    // .env is optional.
    let _ = dotenvy::dotenv();

    let args = parse_cli_args();
    let config = config::load(args.config_path.as_deref())?;

    let effective_log_level = args.log_level.unwrap_or(config.log_level.as_str());
    logger::init(effective_log_level, args.log_level.is_some())?;

    info!(
        bot_name = %config.bot_name,
        keyword = %config.keyword,
        configured_log_level = %config.log_level,
        effective_log_level = %effective_log_level,
        "config loaded"
    );

    let client = providers::build(&config.dice, &config.keyword)?;
    let rules = RuleFileStore::open(
        &config.rules.dir,
        std::time::Duration::from_secs(config.dice.timeout_seconds),
    )
    .await?;

    let password = AdminPassword::generate();
    // Shown once on the operator console, never through tracing.
    println!("admin password: {}", password.reveal());

    let dispatcher = Arc::new(Dispatcher::new(&config, client, rules, password));

    let shutdown = CancellationToken::new();
    let ctrlc_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("ctrl-c received, shutting down");
            ctrlc_token.cancel();
        }
    });

    comms::run(comms::configured(), dispatcher, shutdown.clone()).await?;
    shutdown.cancel();

    println!("\nBye :) ...");
    Ok(())
}

struct CliArgs {
    config_path: Option<String>,
    log_level: Option<&'static str>,
}

fn parse_cli_args() -> CliArgs {
    let mut verbosity = 0u8;
    let mut config_path = None;

    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                println!("Usage: bcdice-bot [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -h, --help                 Print help");
                println!("  -f, --config <PATH>        Path to configuration file (default: config/default.toml)");
                println!("  -v, -vv, -vvv, -vvvv       Increase logging verbosity");
                std::process::exit(0);
            }
            "-f" | "--config" => {
                if let Some(path) = iter.next() {
                    config_path = Some(path);
                } else {
                    eprintln!("error: -f/--config requires a path argument");
                    std::process::exit(1);
                }
            }
            "--verbose" => verbosity = verbosity.saturating_add(1),
            a if a.starts_with('-') && a.len() > 1 && a.chars().skip(1).all(|c| c == 'v') => {
                verbosity = verbosity.saturating_add((a.len() - 1) as u8);
            }
            _ => {}
        }
    }

    //   -v → warn, -vv → info, -vvv → debug, -vvvv+ → trace
    let log_level = match verbosity {
        0 => None,
        1 => Some("warn"),
        2 => Some("info"),
        3 => Some("debug"),
        _ => Some("trace"),
    };

    CliArgs { config_path, log_level }
}
