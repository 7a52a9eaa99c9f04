//! BCDice bot — chat dice bot library.
//!
//! The binary wires these together: [`config`] → [`logger`] →
//! [`dice::providers::build`] + [`rules::RuleFileStore`] →
//! [`dispatcher::Dispatcher`] → [`comms`] channels.

pub mod comms;
pub mod config;
pub mod dice;
pub mod dispatcher;
pub mod error;
pub mod logger;
pub mod random;
pub mod rules;
