//! Custom rule files — user-registered random tables rolled locally.
//!
//! Storage is a directory with one text file per rule name. The dispatcher
//! only goes through [`RuleFileStore`]; nothing else touches the directory.
//!
//! File format:
//! ```text
//! #version 2
//! #help Which ramen noodle you should eat
//! Shoyu
//! Miso\nwith butter
//! ```
//! `#help` lines are joined into the help text, `#version` sets the version,
//! every other non-empty line is one table entry. A literal `\n` decodes to
//! a newline.

mod store;

use thiserror::Error;

use crate::random;

pub use store::RuleFileStore;

/// Shown by `help <rule>` when the file defines no `#help` lines.
pub const NO_HELP_MESSAGE: &str = "No help is available for this rule file.";

// ── Error ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum RuleFileError {
    #[error("{op} failed: rule file [{name}] is not registered")]
    NotFound { op: &'static str, name: String },
    #[error("{op} failed: [{name}] is not a valid rule file name")]
    InvalidName { op: &'static str, name: String },
    #[error("{op} failed for rule file [{name}]: invalid source URL: {reason}")]
    InvalidSource { op: &'static str, name: String, reason: String },
    #[error("{op} failed for rule file [{name}]: could not fetch source: {reason}")]
    Fetch { op: &'static str, name: String, reason: String },
    #[error("{op} failed for rule file [{name}]: {reason}")]
    Io { op: &'static str, name: String, reason: String },
}

// ── RuleBook ──────────────────────────────────────────────────────────────────

/// Parsed contents of one rule file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleBook {
    pub name: String,
    pub version: u32,
    pub help: Option<String>,
    pub entries: Vec<String>,
}

impl RuleBook {
    pub fn parse(name: &str, source: &str) -> Self {
        let mut version = 1;
        let mut help: Vec<String> = Vec::new();
        let mut entries = Vec::new();

        for line in source.lines().map(decode_line) {
            if let Some(text) = line.strip_prefix("#help") {
                help.push(text.trim().to_string());
            } else if let Some(v) = line.strip_prefix("#version") {
                version = v.trim().parse().unwrap_or(version);
            } else if !line.trim().is_empty() {
                entries.push(line);
            }
        }

        Self {
            name: name.to_string(),
            version,
            help: (!help.is_empty()).then(|| help.join("\n")),
            entries,
        }
    }

    /// Help text, or [`NO_HELP_MESSAGE`].
    pub fn help_text(&self) -> String {
        let body = self.help.as_deref().unwrap_or(NO_HELP_MESSAGE);
        format!("{} (v{})\n{body}", self.name, self.version)
    }

    /// Entry at `index` (0-based) rendered as a roll result.
    pub fn render_entry(&self, index: usize) -> Option<String> {
        self.entries
            .get(index)
            .map(|entry| format!("{}({}) > {entry}", self.name, index + 1))
    }

    /// Pick a uniformly random entry. `None` for an empty table.
    pub fn roll(&self) -> Option<String> {
        let len = u32::try_from(self.entries.len()).ok().filter(|n| *n > 0)?;
        self.render_entry(random::below(len) as usize)
    }
}

fn decode_line(line: &str) -> String {
    line.replace("\\n", "\n")
}

/// Rule names double as file names: no separators, no traversal, no spaces.
pub fn is_valid_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && !name.contains("..")
        && !name.contains(['/', '\\'])
        && !name.contains(char::is_whitespace)
}
