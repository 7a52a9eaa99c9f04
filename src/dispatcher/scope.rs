//! Per-channel settings and per-user save stacks.
//!
//! Both maps hand out one `Arc<Mutex<_>>` per key, so work on one channel (or
//! one user's stack) is serialised without blocking other keys. Entries are
//! created lazily and live for the whole process.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

// ── Suppression ───────────────────────────────────────────────────────────────

/// Which inbound text counts as a roll request.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Suppression {
    /// Only text that looks like dice (or names a rule file) is rolled.
    #[default]
    DiceOnly,
    /// Everything is forwarded to the backend.
    ForwardAll,
    /// Only text starting with this literal is rolled, with the prefix removed.
    Prefix(String),
}

impl fmt::Display for Suppression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DiceOnly => f.write_str("dice only (only dice-like text is rolled)"),
            Self::ForwardAll => f.write_str("disabled (all text is sent to the dice server)"),
            Self::Prefix(p) => write!(f, "prefix `{p}` (only text starting with it is rolled)"),
        }
    }
}

// ── ScopeSettings ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScopeSettings {
    pub system: String,
    pub suppression: Suppression,
}

impl ScopeSettings {
    pub fn new(default_system: &str) -> Self {
        Self { system: default_system.to_string(), suppression: Suppression::default() }
    }

    /// `status` reply body. Identical for every user of the channel.
    pub fn describe(&self) -> String {
        format!("System: {}\nSuppression: {}", self.system, self.suppression)
    }
}

// ── Save stacks ───────────────────────────────────────────────────────────────

/// Result of a 1-based `load`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Loaded {
    Entry(String),
    /// The user never saved anything in this channel.
    NoStack,
    OutOfRange { len: usize },
}

/// A save was refused because the stack is at capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StackFull {
    pub cap: usize,
}

// ── ScopeStore ────────────────────────────────────────────────────────────────

type Keyed<K, V> = Mutex<HashMap<K, Arc<Mutex<V>>>>;

#[derive(Debug)]
pub struct ScopeStore {
    default_system: String,
    save_cap: usize,
    settings: Keyed<String, ScopeSettings>,
    stacks: Keyed<(String, String), Vec<String>>,
}

impl ScopeStore {
    pub fn new(default_system: &str, save_cap: usize) -> Self {
        Self {
            default_system: default_system.to_string(),
            save_cap,
            settings: Mutex::new(HashMap::new()),
            stacks: Mutex::new(HashMap::new()),
        }
    }

    /// Snapshot of the channel's settings.
    pub fn settings(&self, channel: &str) -> ScopeSettings {
        lock(&self.settings_entry(channel)).clone()
    }

    /// Apply `f` to the channel's settings under its lock.
    pub fn update<R>(&self, channel: &str, f: impl FnOnce(&mut ScopeSettings) -> R) -> R {
        let entry = self.settings_entry(channel);
        let mut guard = lock(&entry);
        f(&mut guard)
    }

    /// Push `text` and return the new stack length (its 1-based index).
    pub fn push_save(&self, channel: &str, user: &str, text: &str) -> Result<usize, StackFull> {
        let entry = Arc::clone(
            lock(&self.stacks)
                .entry((channel.to_string(), user.to_string()))
                .or_default(),
        );
        let mut stack = lock(&entry);
        if stack.len() >= self.save_cap {
            return Err(StackFull { cap: self.save_cap });
        }
        stack.push(text.to_string());
        Ok(stack.len())
    }

    pub fn load(&self, channel: &str, user: &str, index: usize) -> Loaded {
        let key = (channel.to_string(), user.to_string());
        let Some(entry) = lock(&self.stacks).get(&key).cloned() else {
            return Loaded::NoStack;
        };
        let stack = lock(&entry);
        index
            .checked_sub(1)
            .and_then(|i| stack.get(i))
            .map_or(Loaded::OutOfRange { len: stack.len() }, |text| Loaded::Entry(text.clone()))
    }

    fn settings_entry(&self, channel: &str) -> Arc<Mutex<ScopeSettings>> {
        let mut settings = lock(&self.settings);
        let entry = settings
            .entry(channel.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(ScopeSettings::new(&self.default_system))));
        Arc::clone(entry)
    }
}

/// Every critical section here is a single assignment or push, so state
/// behind a poisoned lock is still consistent.
fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
