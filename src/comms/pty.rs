//! PTY (console) channel — reads lines from stdin, dispatches them as one
//! user in one channel, prints the replies to stdout.
//!
//! Runs until the `shutdown` token is cancelled (Ctrl-C) or stdin is closed.

use std::io::Write as _;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::{Channel, ChannelFuture};
use crate::dispatcher::Dispatcher;
use crate::error::AppError;

/// Console input is a single user in a single channel.
const CONSOLE_USER: &str = "console";

pub struct PtyChannel {
    channel_id: String,
}

impl PtyChannel {
    pub fn new(channel_id: impl Into<String>) -> Self {
        Self { channel_id: channel_id.into() }
    }
}

impl Channel for PtyChannel {
    fn id(&self) -> &str {
        &self.channel_id
    }

    fn run(self: Box<Self>, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) -> ChannelFuture {
        Box::pin(run_pty(self.channel_id, dispatcher, shutdown))
    }
}

async fn run_pty(
    channel_id: String,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    info!(%channel_id, "pty channel started");
    println!("─────────────────────────────────");
    println!(" BCDice console  (Ctrl-C to quit)");
    println!("─────────────────────────────────");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("> ");
        let _ = std::io::stdout().flush();

        tokio::select! {
            biased;

            _ = shutdown.cancelled() => {
                info!("pty channel shutting down");
                break;
            }

            line = lines.next_line() => {
                match line {
                    Err(e) => {
                        warn!("pty read error: {e}");
                        return Err(AppError::Io(e));
                    }
                    Ok(None) => {
                        info!("pty stdin closed");
                        break;
                    }
                    Ok(Some(input)) => {
                        if input.trim().is_empty() {
                            continue;
                        }
                        debug!(input = %input, "pty received line");
                        let dispatch = dispatcher.handle(&input, CONSOLE_USER, &channel_id).await;
                        for reply in dispatch.replies {
                            println!("{reply}");
                        }
                        for secret in dispatch.outcomes.iter().filter(|o| o.is_secret()) {
                            println!("(secret) {}{}", secret.system(), secret.text());
                        }
                    }
                }
            }
        }
    }

    Ok(())
}
