//! Configuration loading with env-var overrides.
//!
//! Reads `config/default.toml` (or an explicit path), then applies
//! `BCDICE_LOG_LEVEL`, `BCDICE_SERVER` and `BCDICE_RULES_DIR` overrides.
//! A missing default file is not an error: built-in defaults apply.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use crate::error::AppError;

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Dice backend configuration.
#[derive(Debug, Clone)]
pub struct DiceConfig {
    /// Backend tokens in priority order. `"mock"` selects the offline double;
    /// anything else is a base URL.
    pub servers: Vec<String>,
    /// Per-request HTTP timeout in seconds.
    pub timeout_seconds: u64,
    /// Rule system a fresh channel starts with.
    pub default_system: String,
    /// Maximum number of saved snippets per user and channel.
    pub save_cap: usize,
}

/// Custom rule-file storage.
#[derive(Debug, Clone)]
pub struct RulesConfig {
    /// Directory holding one file per registered rule (already expanded).
    pub dir: PathBuf,
}

/// Fully-resolved configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub bot_name: String,
    pub log_level: String,
    /// Leading word that marks a meta command (`bcdice help`, `bcdice set` …).
    pub keyword: String,
    pub dice: DiceConfig,
    pub rules: RulesConfig,
}

/// Values that take precedence over the file. Tests pass these directly
/// instead of mutating the process environment.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub log_level: Option<String>,
    /// Comma-separated backend tokens.
    pub servers: Option<String>,
    pub rules_dir: Option<String>,
}

impl Overrides {
    pub fn from_env() -> Self {
        Self {
            log_level: env::var("BCDICE_LOG_LEVEL").ok(),
            servers: env::var("BCDICE_SERVER").ok(),
            rules_dir: env::var("BCDICE_RULES_DIR").ok(),
        }
    }
}

/// Raw TOML shape, the `serde` target before resolution.
#[derive(Deserialize, Default)]
struct RawConfig {
    #[serde(default)]
    bot: RawBot,
    #[serde(default)]
    dice: RawDice,
    #[serde(default)]
    rules: RawRules,
}

#[derive(Deserialize)]
struct RawBot {
    #[serde(default = "default_bot_name")]
    name: String,
    #[serde(default = "default_log_level")]
    log_level: String,
    #[serde(default = "default_keyword")]
    keyword: String,
}

impl Default for RawBot {
    fn default() -> Self {
        Self {
            name: default_bot_name(),
            log_level: default_log_level(),
            keyword: default_keyword(),
        }
    }
}

#[derive(Deserialize)]
struct RawDice {
    #[serde(default = "default_servers")]
    servers: Vec<String>,
    #[serde(default = "default_timeout_seconds")]
    timeout_seconds: u64,
    #[serde(default = "default_system")]
    default_system: String,
    #[serde(default = "default_save_cap")]
    save_cap: usize,
}

impl Default for RawDice {
    fn default() -> Self {
        Self {
            servers: default_servers(),
            timeout_seconds: default_timeout_seconds(),
            default_system: default_system(),
            save_cap: default_save_cap(),
        }
    }
}

#[derive(Deserialize)]
struct RawRules {
    #[serde(default = "default_rules_dir")]
    dir: String,
}

impl Default for RawRules {
    fn default() -> Self {
        Self { dir: default_rules_dir() }
    }
}

fn default_bot_name() -> String { "bcdice-bot".to_string() }
fn default_log_level() -> String { "info".to_string() }
fn default_keyword() -> String { "bcdice".to_string() }
fn default_servers() -> Vec<String> { vec!["mock".to_string()] }
fn default_timeout_seconds() -> u64 { 10 }
fn default_system() -> String { "DiceBot".to_string() }
fn default_save_cap() -> usize { 100 }
fn default_rules_dir() -> String { "./rule_files".to_string() }

/// Load config from `config_path`, or `config/default.toml`, then apply
/// env-var overrides.
pub fn load(config_path: Option<&str>) -> Result<Config, AppError> {
    let overrides = Overrides::from_env();
    match config_path {
        Some(path) => load_from(Path::new(path), &overrides),
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_from(Path::new(DEFAULT_CONFIG_PATH), &overrides)
        }
        None => resolve(RawConfig::default(), &overrides),
    }
}

/// Internal loader. Accepts an explicit path and overrides.
pub fn load_from(path: &Path, overrides: &Overrides) -> Result<Config, AppError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;

    let parsed: RawConfig = toml::from_str(&raw)
        .map_err(|e| AppError::Config(format!("parse error in {}: {e}", path.display())))?;

    resolve(parsed, overrides)
}

fn resolve(parsed: RawConfig, overrides: &Overrides) -> Result<Config, AppError> {
    let servers = match overrides.servers.as_deref() {
        Some(list) => split_servers(list),
        None => parsed.dice.servers,
    };
    if servers.is_empty() {
        return Err(AppError::Config("[dice].servers must name at least one backend".into()));
    }
    if parsed.dice.timeout_seconds == 0 {
        return Err(AppError::Config("[dice].timeout_seconds must be positive".into()));
    }
    if parsed.bot.keyword.trim().is_empty() || parsed.bot.keyword.contains(char::is_whitespace) {
        return Err(AppError::Config(format!(
            "[bot].keyword must be a single word, got '{}'",
            parsed.bot.keyword
        )));
    }

    let log_level = overrides.log_level.clone().unwrap_or(parsed.bot.log_level);
    crate::logger::parse_filter(&log_level)
        .map_err(|e| AppError::Config(format!("[bot].log_level: {e}")))?;

    let rules_dir = overrides.rules_dir.as_deref().unwrap_or(&parsed.rules.dir);

    Ok(Config {
        bot_name: parsed.bot.name,
        log_level,
        keyword: parsed.bot.keyword,
        dice: DiceConfig {
            servers,
            timeout_seconds: parsed.dice.timeout_seconds,
            default_system: parsed.dice.default_system,
            save_cap: parsed.dice.save_cap,
        },
        rules: RulesConfig { dir: expand_home(rules_dir) },
    })
}

fn split_servers(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Expand a leading `~` to the user's home directory.
/// Absolute or relative paths without `~` are returned unchanged.
pub fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    if path == "~"
        && let Some(home) = dirs::home_dir()
    {
        return home;
    }
    PathBuf::from(path)
}

// ── test helpers ──────────────────────────────────────────────────────────────

impl Config {
    /// Offline config for tests: mock backend, rules under `rules_dir`.
    pub fn test_default(rules_dir: &Path) -> Self {
        Self {
            bot_name: "test".into(),
            log_level: "info".into(),
            keyword: default_keyword(),
            dice: DiceConfig {
                servers: default_servers(),
                timeout_seconds: 1,
                default_system: default_system(),
                save_cap: default_save_cap(),
            },
            rules: RulesConfig { dir: rules_dir.to_path_buf() },
        }
    }
}
