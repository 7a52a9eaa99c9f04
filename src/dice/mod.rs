//! Dice resolution — the client side of the remote BCDice-API service.
//!
//! [`DiceClient`] is an enum over concrete backends: the network client with
//! multi-endpoint failover, and an offline mock. Both expose the same
//! operations so the dispatcher never branches on which one it holds.
//! Pick one with [`providers::select_client`] or [`providers::build`].

pub mod endpoints;
pub mod normalize;
pub mod outcome;
pub mod prefixes;
pub mod providers;

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;

pub use endpoints::EndpointList;
pub use normalize::{looks_like_dice, normalize};
pub use outcome::RollOutcome;
pub use prefixes::CommandPrefixes;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum DiceError {
    /// Network failure or timeout talking to one endpoint.
    #[error("transport error: {0}")]
    Transport(String),
    /// The endpoint answered, but not with something usable.
    #[error("backend rejected request: {0}")]
    Rejected(String),
    /// Every endpoint in the rotation failed during one call.
    #[error("no dice server available ({attempts} endpoint(s) tried)")]
    Unavailable { attempts: usize },
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    #[error("client error: {0}")]
    Client(String),
}

impl DiceError {
    /// Errors that move the cursor to the next endpoint.
    pub fn triggers_failover(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Rejected(_))
    }
}

// ── Client enum ───────────────────────────────────────────────────────────────

/// All available dice backends.
///
/// Enum dispatch keeps the call sites `async fn` without trait objects.
/// Adding a backend = new module in `providers/` + new variant + new arms.
#[derive(Debug)]
pub enum DiceClient {
    Mock(providers::mock::MockDiceClient),
    Http(providers::http::HttpDiceClient),
}

impl DiceClient {
    /// Roll `command` under `system` once.
    pub async fn roll(&self, command: &str, system: &str) -> Result<RollOutcome, DiceError> {
        match self {
            Self::Mock(c) => Ok(c.roll(command, system)),
            Self::Http(c) => c.roll(command, system).await,
        }
    }

    /// Roll `command` `times` times, each an independent request that runs
    /// through the failover rotation on its own.
    pub async fn roll_many(
        &self,
        command: &str,
        system: &str,
        times: usize,
    ) -> Result<Vec<RollOutcome>, DiceError> {
        let mut outcomes = Vec::with_capacity(times);
        for _ in 0..times {
            outcomes.push(self.roll(command, system).await?);
        }
        Ok(outcomes)
    }

    /// Rule-system identifiers installed on the backend.
    pub async fn system_names(&self) -> Result<Vec<String>, DiceError> {
        match self {
            Self::Mock(c) => Ok(c.system_names()),
            Self::Http(c) => c.system_names().await,
        }
    }

    /// Help text for a built-in system, `None` if the backend does not know it.
    pub async fn system_info(&self, system: &str) -> Result<Option<String>, DiceError> {
        match self {
            Self::Mock(c) => Ok(c.system_info(system)),
            Self::Http(c) => c.system_info(system).await,
        }
    }

    /// Command prefix patterns the backend publishes for `system`. Empty when
    /// the system is unknown.
    pub async fn system_prefixes(&self, system: &str) -> Result<Vec<String>, DiceError> {
        match self {
            Self::Mock(c) => Ok(c.system_prefixes(system)),
            Self::Http(c) => c.system_prefixes(system).await,
        }
    }

    /// Trust `url` from now on; see [`EndpointList::set_endpoint`].
    pub fn set_endpoint(&self, url: &str) -> Result<usize, DiceError> {
        self.endpoints().lock().set_endpoint(url)
    }

    /// Snapshot of the endpoint list and its cursor.
    pub fn endpoint_list(&self) -> EndpointList {
        self.endpoints().lock().clone()
    }

    pub fn cursor(&self) -> usize {
        self.endpoints().lock().cursor()
    }

    /// Short backend tag used in logs and the admin `servers` reply.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Mock(_) => "mock",
            Self::Http(_) => "bcdice-api",
        }
    }

    fn endpoints(&self) -> &SharedEndpoints {
        match self {
            Self::Mock(c) => c.endpoints(),
            Self::Http(c) => c.endpoints(),
        }
    }
}

// ── Shared cursor ─────────────────────────────────────────────────────────────

/// Endpoint list behind a lock. Every read-modify-write of the cursor happens
/// inside one guard; the guard is never held across an `.await`.
#[derive(Debug)]
pub struct SharedEndpoints(Mutex<EndpointList>);

impl SharedEndpoints {
    pub fn new(list: EndpointList) -> Self {
        Self(Mutex::new(list))
    }

    /// Each mutation leaves the list valid, so a poisoned guard is still usable.
    pub fn lock(&self) -> MutexGuard<'_, EndpointList> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
