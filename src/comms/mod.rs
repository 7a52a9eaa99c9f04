//! Comms — chat channels that feed lines into the [`Dispatcher`].
//!
//! Each channel implements [`Channel`] and runs as its own task. All channels
//! share one dispatcher and one shutdown token; if any channel exits with an
//! error the token is cancelled so the others stop too.

#[cfg(feature = "channel-pty")]
pub mod pty;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::dispatcher::Dispatcher;
use crate::error::AppError;

pub type ChannelFuture = Pin<Box<dyn Future<Output = Result<(), AppError>> + Send + 'static>>;

/// A chat surface. `run` owns the channel until it exits.
pub trait Channel: Send {
    fn id(&self) -> &str;
    fn run(self: Box<Self>, dispatcher: Arc<Dispatcher>, shutdown: CancellationToken) -> ChannelFuture;
}

/// Channels enabled by the build.
pub fn configured() -> Vec<Box<dyn Channel>> {
    #[allow(unused_mut)]
    let mut channels: Vec<Box<dyn Channel>> = Vec::new();
    #[cfg(feature = "channel-pty")]
    channels.push(Box::new(pty::PtyChannel::new("pty0")));
    channels
}

/// Run `channels` to completion. Returns the first channel error, if any.
pub async fn run(
    channels: Vec<Box<dyn Channel>>,
    dispatcher: Arc<Dispatcher>,
    shutdown: CancellationToken,
) -> Result<(), AppError> {
    if channels.is_empty() {
        warn!("no comms channel enabled; nothing to do");
        return Ok(());
    }

    let mut tasks = JoinSet::new();
    for channel in channels {
        info!(channel = channel.id(), "starting channel");
        tasks.spawn(channel.run(Arc::clone(&dispatcher), shutdown.clone()));
    }

    let mut first_error = None;
    while let Some(joined) = tasks.join_next().await {
        let result = joined.map_err(|e| AppError::Comms(format!("channel task failed: {e}")));
        if let Err(e) = result.and_then(|r| r) {
            warn!(error = %e, "channel exited with error");
            shutdown.cancel();
            first_error.get_or_insert(e);
        }
    }
    first_error.map_or(Ok(()), Err)
}
