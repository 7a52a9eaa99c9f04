//! [`RollOutcome`] — the immutable result of one roll attempt.

use std::fmt;

use serde::Deserialize;

/// `reason` value the backend uses for an unknown rule-system name.
pub const UNSUPPORTED_DICEBOT: &str = "unsupported dicebot";

const MISSING_RESULT: &str = "[ERROR] The roll succeeded but the backend sent no result text";

/// One roll attempt, successful or explained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollOutcome {
    text: String,
    system: String,
    secret: bool,
    rolled: bool,
    error: bool,
}

impl RollOutcome {
    /// A successful roll.
    pub fn rolled(text: impl Into<String>, system: impl Into<String>, secret: bool) -> Self {
        Self { text: text.into(), system: system.into(), secret, rolled: true, error: false }
    }

    /// Text that was not forwarded anywhere: suppression policy or "not dice".
    pub fn suppressed() -> Self {
        Self { text: String::new(), system: String::new(), secret: false, rolled: false, error: false }
    }

    /// A local failure explained to the user, not a roll.
    pub fn error(text: impl Into<String>, system: impl Into<String>) -> Self {
        Self { text: text.into(), system: system.into(), secret: false, rolled: false, error: true }
    }

    /// The backend asked to roll under a system it does not know.
    pub fn unsupported_system(system: &str, keyword: &str) -> Self {
        Self::error(
            format!(
                "The system `{system}` does not seem to be supported. It may be misspelled \
                 or not installed on the dice server. Choose a supported one with \
                 `{keyword} set <system>`; see `{keyword} list` for the installed systems."
            ),
            system,
        )
    }

    /// Interpret a backend payload for a roll requested under `system`.
    pub(crate) fn from_payload(payload: RollPayload, system: &str, keyword: &str) -> Self {
        if payload.ok {
            return Self::rolled(
                payload.result.unwrap_or_else(|| MISSING_RESULT.to_string()),
                system,
                payload.secret.unwrap_or(false),
            );
        }
        match payload.reason.as_deref() {
            Some(UNSUPPORTED_DICEBOT) => Self::unsupported_system(system, keyword),
            _ => Self::suppressed(),
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn system(&self) -> &str {
        &self.system
    }

    pub fn is_secret(&self) -> bool {
        self.secret
    }

    pub fn is_rolled(&self) -> bool {
        self.rolled
    }

    /// `true` for explained failures (unsupported system, local errors);
    /// `false` for both successes and silently-ignored text.
    pub fn is_error(&self) -> bool {
        self.error
    }
}

impl fmt::Display for RollOutcome {
    /// Public rendering: secret results are masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.secret {
            write!(f, "{}: [Secret Dice]", self.system)
        } else {
            write!(f, "{}{}", self.system, self.text)
        }
    }
}

// ── Wire type ─────────────────────────────────────────────────────────────────

/// `GET v1/diceroll` response body.
#[derive(Debug, Deserialize)]
pub(crate) struct RollPayload {
    pub ok: bool,
    #[serde(default)]
    pub result: Option<String>,
    #[serde(default)]
    pub secret: Option<bool>,
    #[serde(default)]
    pub reason: Option<String>,
}
