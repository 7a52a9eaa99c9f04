//! Application-wide error types.
//!
//! Startup and wiring failures land here. Per-concern errors live next to
//! their modules ([`DiceError`], [`RuleFileError`], [`CommandError`]) and are
//! converted into reply text by the dispatcher rather than bubbling up.
//!
//! [`RuleFileError`]: crate::rules::RuleFileError
//! [`CommandError`]: crate::dispatcher::CommandError

use thiserror::Error;

use crate::dice::DiceError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(String),

    #[error("logger error: {0}")]
    Logger(String),

    #[error("dice backend error: {0}")]
    Dice(#[from] DiceError),

    #[error("comms error: {0}")]
    Comms(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
