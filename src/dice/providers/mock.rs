//! Offline dice backend — echoes the normalised command back as the result.
//! Used for tests and as the default when no server is configured.
//!
//! It never fails, so it never moves its cursor on its own.

use crate::dice::normalize::normalize;
use crate::dice::{EndpointList, RollOutcome, SharedEndpoints};

const SYSTEMS: [&str; 6] = [
    "DiceBot",
    "Cthulhu",
    "Cthulhu7th",
    "SwordWorld2.5",
    "DoubleCross",
    "Insane",
];

/// Command prefixes per system, in the backend's regex-fragment form.
const PREFIXES: [(&str, &[&str]); 5] = [
    ("Cthulhu", &["CC(B)?.*", "RES(B)?.*", "CBR(B)?\\(\\d+,\\d+\\)"]),
    ("Cthulhu7th", &["CC.*", "CBR\\(\\d+,\\d+\\)", "FAR.*"]),
    ("SwordWorld2.5", &["K\\d+.*", "Gr(\\d+)?", "FT", "TT"]),
    ("DoubleCross", &["\\d+DX.*", "ET"]),
    ("Insane", &["ST", "HJST", "TVST"]),
];

#[derive(Debug)]
pub struct MockDiceClient {
    endpoints: SharedEndpoints,
}

impl MockDiceClient {
    pub fn new(list: EndpointList) -> Self {
        Self { endpoints: SharedEndpoints::new(list) }
    }

    pub fn roll(&self, command: &str, system: &str) -> RollOutcome {
        RollOutcome::rolled(normalize(command), system, false)
    }

    pub fn system_names(&self) -> Vec<String> {
        SYSTEMS.iter().map(|s| (*s).to_string()).collect()
    }

    pub fn system_info(&self, system: &str) -> Option<String> {
        SYSTEMS
            .contains(&system)
            .then(|| format!("[{system}] mock dice bot: rolls echo the normalised command."))
    }

    pub fn system_prefixes(&self, system: &str) -> Vec<String> {
        PREFIXES
            .iter()
            .find(|(name, _)| *name == system)
            .map(|(_, patterns)| patterns.iter().map(|p| (*p).to_string()).collect())
            .unwrap_or_default()
    }

    pub(crate) fn endpoints(&self) -> &SharedEndpoints {
        &self.endpoints
    }
}
