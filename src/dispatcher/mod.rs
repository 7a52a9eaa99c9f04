//! Dispatcher — turns one inbound chat line into replies.
//!
//! Every line goes through the same decision:
//!
//! ```text
//! text ──► meta command?  ── yes ──► execute ──► replies
//!              │ no
//!              ▼
//!          suppression (per channel) ── not admitted ──► nothing
//!              │
//!              ▼
//!          [N ][[labels] ]expr ──► rule file? ── yes ──► local table roll
//!                                      │ no
//!                                      ▼
//!                                 DiceClient (failover)
//! ```
//!
//! [`Dispatcher::handle`] never fails: every error becomes a reply line.

pub mod admin;
pub mod command;
pub mod messages;
pub mod scope;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dice::providers::{self, ClientOptions};
use crate::dice::{CommandPrefixes, DiceClient, DiceError, RollOutcome, looks_like_dice};
use crate::rules::{RuleBook, RuleFileError, RuleFileStore};

use admin::{AdminCommand, AdminPassword};
use command::{MetaCommand, RollRequest};
use scope::{Loaded, ScopeStore, Suppression};

pub use scope::ScopeSettings;

/// Upper bound for `N <expr>` and label lists.
pub const MAX_REPEAT: u64 = 20;

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArgument(String),
    #[error("wrong admin password")]
    AuthFailure,
    #[error(transparent)]
    RuleFile(#[from] RuleFileError),
    #[error("dice server error: {0}")]
    Backend(#[from] DiceError),
}

// ── Results ───────────────────────────────────────────────────────────────────

/// Everything one inbound line produced.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Dispatch {
    /// Public reply lines, in order.
    pub replies: Vec<String>,
    /// Raw roll outcomes, so a channel can deliver secret results privately.
    pub outcomes: Vec<RollOutcome>,
}

/// Outcomes of one roll line plus the labels it asked for.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RollBatch {
    pub labels: Vec<String>,
    pub outcomes: Vec<RollOutcome>,
}

impl RollBatch {
    /// One line per rolled or failed outcome, `[label] ` prefixed when a
    /// label exists for that position.
    pub fn replies(&self) -> Vec<String> {
        self.outcomes
            .iter()
            .enumerate()
            .filter_map(|(i, outcome)| {
                let body = if outcome.is_rolled() {
                    outcome.to_string()
                } else if outcome.is_error() {
                    outcome.text().to_string()
                } else {
                    return None;
                };
                Some(match self.labels.get(i) {
                    Some(label) => format!("[{label}] {body}"),
                    None => body,
                })
            })
            .collect()
    }
}

// ── Dispatcher ────────────────────────────────────────────────────────────────

pub struct Dispatcher {
    keyword: String,
    client: RwLock<Arc<DiceClient>>,
    client_options: ClientOptions,
    /// System → command prefixes, filled lazily from the current client.
    prefixes: Mutex<HashMap<String, Arc<CommandPrefixes>>>,
    rules: RuleFileStore,
    scopes: ScopeStore,
    password: AdminPassword,
}

impl Dispatcher {
    pub fn new(config: &Config, client: DiceClient, rules: RuleFileStore, password: AdminPassword) -> Self {
        Self {
            keyword: config.keyword.clone(),
            client: RwLock::new(Arc::new(client)),
            client_options: ClientOptions {
                timeout: std::time::Duration::from_secs(config.dice.timeout_seconds),
                keyword: config.keyword.clone(),
            },
            prefixes: Mutex::new(HashMap::new()),
            rules,
            scopes: ScopeStore::new(&config.dice.default_system, config.dice.save_cap),
            password,
        }
    }

    /// The current dice client. Admin `backend` swaps it; callers holding
    /// the old `Arc` finish on the old client.
    pub fn client(&self) -> Arc<DiceClient> {
        Arc::clone(&self.client.read().unwrap_or_else(PoisonError::into_inner))
    }

    pub fn settings(&self, channel: &str) -> ScopeSettings {
        self.scopes.settings(channel)
    }

    /// `true` if `text` starts with the command keyword as a whole word.
    pub fn is_command(&self, text: &str) -> bool {
        command::parse_meta(text, &self.keyword).is_some()
    }

    /// Full handling of one line. Never fails.
    pub async fn handle(&self, text: &str, user: &str, channel: &str) -> Dispatch {
        debug!(%channel, %user, len = text.len(), "inbound line");
        if let Some(cmd) = self.meta(text, channel) {
            let replies = self
                .execute(cmd, user, channel)
                .await
                .unwrap_or_else(|e| vec![self.render_error(&e)]);
            return Dispatch { replies, outcomes: Vec::new() };
        }

        match self.roll_batch(text, channel).await {
            Ok(batch) => Dispatch { replies: batch.replies(), outcomes: batch.outcomes },
            Err(e) => Dispatch { replies: vec![self.render_error(&e)], outcomes: Vec::new() },
        }
    }

    /// Meta commands only. Empty for anything that is not one.
    pub async fn input(&self, text: &str, user: &str, channel: &str) -> Vec<String> {
        let Some(cmd) = self.meta(text, channel) else {
            return Vec::new();
        };
        self.execute(cmd, user, channel)
            .await
            .unwrap_or_else(|e| vec![self.render_error(&e)])
    }

    /// Roll the whole line once. Suppressed text yields a non-rolled outcome.
    pub async fn roll(&self, text: &str, channel: &str) -> Result<RollOutcome, CommandError> {
        if self.meta(text, channel).is_some() {
            return Ok(RollOutcome::suppressed());
        }
        let settings = self.scopes.settings(channel);
        let Some(expr) = admit(text, &settings.suppression) else {
            return Ok(RollOutcome::suppressed());
        };
        if !self.is_rollable(expr, &settings).await {
            return Ok(RollOutcome::suppressed());
        }
        let mut outcomes = self.roll_expression(expr, &settings.system, 1).await?;
        Ok(outcomes.pop().unwrap_or_else(RollOutcome::suppressed))
    }

    /// Roll with `N ` repeat and `[labels] ` support. Empty when suppressed.
    pub async fn rolls(&self, text: &str, channel: &str) -> Result<Vec<RollOutcome>, CommandError> {
        Ok(self.roll_batch(text, channel).await?.outcomes)
    }

    pub async fn roll_batch(&self, text: &str, channel: &str) -> Result<RollBatch, CommandError> {
        if self.meta(text, channel).is_some() {
            return Ok(RollBatch::default());
        }
        let settings = self.scopes.settings(channel);
        let Some(admitted) = admit(text, &settings.suppression) else {
            return Ok(RollBatch::default());
        };
        let request = RollRequest::parse(admitted);
        if !self.is_rollable(request.expression, &settings).await {
            return Ok(RollBatch::default());
        }

        let times = request.times();
        if times == 0 || times > MAX_REPEAT {
            return Err(CommandError::InvalidArgument(format!(
                "the repeat count must be between 1 and {MAX_REPEAT}, got {times}"
            )));
        }
        let outcomes = self
            .roll_expression(request.expression, &settings.system, times as usize)
            .await?;
        Ok(RollBatch {
            labels: request.labels.iter().map(|l| (*l).to_string()).collect(),
            outcomes,
        })
    }

    // ── rolling ───────────────────────────────────────────────────────────────

    async fn is_rollable(&self, expr: &str, settings: &ScopeSettings) -> bool {
        if expr.is_empty() {
            return false;
        }
        match settings.suppression {
            Suppression::DiceOnly => {
                looks_like_dice(expr)
                    || self.rule_name(expr).is_some()
                    || self.command_prefixes(&settings.system).await.matches(expr)
            }
            Suppression::ForwardAll | Suppression::Prefix(_) => true,
        }
    }

    /// Prefixes of `system`, fetched once per client. A failed fetch is not
    /// cached, so the next line tries again.
    async fn command_prefixes(&self, system: &str) -> Arc<CommandPrefixes> {
        if let Some(cached) = self.prefix_cache().get(system) {
            return Arc::clone(cached);
        }
        match self.client().system_prefixes(system).await {
            Ok(patterns) => {
                let prefixes = Arc::new(CommandPrefixes::from_patterns(patterns.as_slice()));
                debug!(%system, patterns = patterns.len(), "command prefixes loaded");
                self.prefix_cache()
                    .insert(system.to_string(), Arc::clone(&prefixes));
                prefixes
            }
            Err(e) => {
                warn!(%system, error = %e, "could not load command prefixes");
                Arc::new(CommandPrefixes::default())
            }
        }
    }

    fn prefix_cache(&self) -> MutexGuard<'_, HashMap<String, Arc<CommandPrefixes>>> {
        self.prefixes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn rule_name<'a>(&self, expr: &'a str) -> Option<&'a str> {
        expr.split_whitespace().next().filter(|name| self.rules.contains(name))
    }

    async fn roll_expression(
        &self,
        expr: &str,
        system: &str,
        times: usize,
    ) -> Result<Vec<RollOutcome>, CommandError> {
        if let Some(name) = self.rule_name(expr) {
            let book = self.rules.definition(name).await?;
            return Ok((0..times).map(|_| table_outcome(&book)).collect());
        }
        let client = self.client();
        client.roll_many(expr, system, times).await.map_err(|e| {
            warn!(error = %e, %system, "roll failed");
            CommandError::from(e)
        })
    }

    // ── meta commands ─────────────────────────────────────────────────────────

    /// Parse a meta command, also after an active prefix.
    fn meta<'a>(&self, text: &'a str, channel: &str) -> Option<MetaCommand<'a>> {
        if let Some(cmd) = command::parse_meta(text, &self.keyword) {
            return Some(cmd);
        }
        let settings = self.scopes.settings(channel);
        match &settings.suppression {
            Suppression::Prefix(prefix) => text
                .trim_start()
                .strip_prefix(prefix.as_str())
                .and_then(|rest| command::parse_meta(rest, &self.keyword)),
            _ => None,
        }
    }

    async fn execute(
        &self,
        cmd: MetaCommand<'_>,
        user: &str,
        channel: &str,
    ) -> Result<Vec<String>, CommandError> {
        let reply = match cmd {
            MetaCommand::Help(None) => messages::help(&self.keyword),
            MetaCommand::Help(Some(topic)) => self.topic_help(topic).await?,
            MetaCommand::List => {
                let mut names = self.client().system_names().await?;
                names.extend(self.rules.names());
                names.join("\n")
            }
            MetaCommand::Set(None) => {
                return Err(CommandError::InvalidArgument(format!(
                    "usage: `{} set <system>`",
                    self.keyword
                )));
            }
            MetaCommand::Set(Some(system)) => {
                self.scopes.update(channel, |s| s.system = system.to_string());
                info!(%channel, %system, "system changed");
                format!("System set to {system}")
            }
            MetaCommand::Save(text) => match self.scopes.push_save(channel, user, text) {
                Ok(len) => len.to_string(),
                Err(full) => {
                    return Err(CommandError::InvalidArgument(format!(
                        "your saved stack is full ({} entries)",
                        full.cap
                    )));
                }
            },
            MetaCommand::Load(arg) => {
                let index: usize = arg.parse().map_err(|_| {
                    CommandError::InvalidArgument(format!("usage: `{} load <number>`", self.keyword))
                })?;
                match self.scopes.load(channel, user, index) {
                    Loaded::Entry(text) => text,
                    Loaded::NoStack => format!("{}: you have nothing saved here", messages::NOT_FOUND),
                    Loaded::OutOfRange { len } => {
                        format!("{}: entry {index} (you have {len})", messages::NOT_FOUND)
                    }
                }
            }
            MetaCommand::Status => self.scopes.settings(channel).describe(),
            MetaCommand::Admin { password, rest } => {
                if !self.password.matches(password) {
                    warn!(%channel, %user, "admin command with wrong password");
                    return Err(CommandError::AuthFailure);
                }
                self.admin(admin::parse(rest), channel).await?
            }
        };
        Ok(vec![reply])
    }

    async fn topic_help(&self, topic: &str) -> Result<String, CommandError> {
        if self.rules.contains(topic) {
            return Ok(self.rules.definition(topic).await?.help_text());
        }
        Ok(self
            .client()
            .system_info(topic)
            .await?
            .unwrap_or_else(|| messages::topic_not_found(topic, &self.keyword)))
    }

    async fn admin(&self, cmd: AdminCommand<'_>, channel: &str) -> Result<String, CommandError> {
        let reply = match cmd {
            AdminCommand::Help => messages::admin_help(&self.keyword),
            AdminCommand::SuppressRoll(arg) => {
                let (mode, reply) = match arg {
                    None => (Suppression::DiceOnly, messages::suppress_dice_only()),
                    Some(a) if a.eq_ignore_ascii_case("disable") => {
                        (Suppression::ForwardAll, messages::suppress_disabled())
                    }
                    Some(prefix) => (Suppression::Prefix(prefix.to_string()), messages::suppress_prefix(prefix)),
                };
                info!(%channel, mode = %mode, "suppression changed");
                self.scopes.update(channel, |s| s.suppression = mode);
                reply
            }
            AdminCommand::Server(url) => {
                let client = self.client();
                client.set_endpoint(url)?;
                info!(%url, "dice server switched");
                format!("Now using {url}\n{}", client.endpoint_list().describe())
            }
            AdminCommand::Servers => {
                let client = self.client();
                format!("Backend: {}\n{}", client.kind(), client.endpoint_list().describe())
            }
            AdminCommand::Backend(token) => {
                let fresh = providers::select_client(token, &self.client_options)?;
                let kind = fresh.kind();
                *self.client.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(fresh);
                self.prefix_cache().clear();
                info!(kind, "dice backend replaced");
                format!("Dice backend replaced ({kind})")
            }
            AdminCommand::Register { name, url } => {
                self.rules.register(url, name).await?;
                format!("Registered rule file [{name}]")
            }
            AdminCommand::Unregister(name) => {
                self.rules.unregister(name).await?;
                format!("Unregistered rule file [{name}]")
            }
            AdminCommand::Usage(usage) => {
                return Err(CommandError::InvalidArgument(format!(
                    "usage: `{} admin <password> {usage}`",
                    self.keyword
                )));
            }
        };
        Ok(reply)
    }

    fn render_error(&self, err: &CommandError) -> String {
        match err {
            CommandError::AuthFailure => messages::WRONG_PASSWORD.to_string(),
            other => format!("{} {other}", messages::ERROR_MARK),
        }
    }
}

/// Apply the prefix rule: strip it, or refuse text that lacks it.
fn admit<'a>(text: &'a str, suppression: &Suppression) -> Option<&'a str> {
    match suppression {
        Suppression::Prefix(prefix) => text
            .trim_start()
            .strip_prefix(prefix.as_str())
            .map(str::trim),
        Suppression::DiceOnly | Suppression::ForwardAll => Some(text.trim()),
    }
}

fn table_outcome(book: &RuleBook) -> RollOutcome {
    match book.roll() {
        Some(text) => RollOutcome::rolled(format!(": {text}"), &book.name, false),
        None => RollOutcome::error(
            format!("{} rule file [{}] has no entries", messages::ERROR_MARK, book.name),
            &book.name,
        ),
    }
}
