//! [`RuleFileStore`] — directory-backed registry of rule files.
//!
//! The name list is cached in memory and refreshed after every register or
//! unregister, so lookups on the hot path (is this text a rule roll?) never
//! touch the disk.

use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use reqwest::{Client, Url};
use tracing::{info, warn};

use super::{RuleBook, RuleFileError, is_valid_name};

#[derive(Debug)]
pub struct RuleFileStore {
    dir: PathBuf,
    names: RwLock<Vec<String>>,
    client: Client,
}

impl RuleFileStore {
    /// Open (creating if needed) the rule directory at `dir`.
    pub async fn open(dir: &Path, fetch_timeout: Duration) -> Result<Self, std::io::Error> {
        tokio::fs::create_dir_all(dir).await?;
        let client = Client::builder()
            .timeout(fetch_timeout)
            .build()
            .map_err(std::io::Error::other)?;
        let names = scan(dir).await?;
        info!(dir = %dir.display(), count = names.len(), "rule files loaded");
        Ok(Self { dir: dir.to_path_buf(), names: RwLock::new(names), client })
    }

    /// Fetch `source_url` and store its text under `name`, replacing any
    /// previous file of that name.
    pub async fn register(&self, source_url: &str, name: &str) -> Result<(), RuleFileError> {
        const OP: &str = "register";
        let path = self.path_for(OP, name)?;
        let source = source_url_for(OP, name, source_url)?;

        let fetch_err = |reason: String| RuleFileError::Fetch { op: OP, name: name.to_string(), reason };
        let response = self
            .client
            .get(source)
            .send()
            .await
            .map_err(|e| fetch_err(e.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(fetch_err(format!("HTTP {status}")));
        }
        let body = response.text().await.map_err(|e| fetch_err(e.to_string()))?;

        tokio::fs::write(&path, body)
            .await
            .map_err(|e| io_err(OP, name, &e))?;
        self.refresh(OP, name).await?;
        info!(rule = %name, "rule file registered");
        Ok(())
    }

    pub async fn unregister(&self, name: &str) -> Result<(), RuleFileError> {
        const OP: &str = "unregister";
        let path = self.path_for(OP, name)?;
        if !self.contains(name) {
            return Err(RuleFileError::NotFound { op: OP, name: name.to_string() });
        }
        tokio::fs::remove_file(&path)
            .await
            .map_err(|e| io_err(OP, name, &e))?;
        self.refresh(OP, name).await?;
        info!(rule = %name, "rule file unregistered");
        Ok(())
    }

    /// Read and parse the rule file `name`.
    pub async fn definition(&self, name: &str) -> Result<RuleBook, RuleFileError> {
        const OP: &str = "lookup";
        let path = self.path_for(OP, name)?;
        if !self.contains(name) {
            return Err(RuleFileError::NotFound { op: OP, name: name.to_string() });
        }
        let source = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| io_err(OP, name, &e))?;
        Ok(RuleBook::parse(name, &source))
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.names.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|n| n == name)
    }

    fn path_for(&self, op: &'static str, name: &str) -> Result<PathBuf, RuleFileError> {
        if !is_valid_name(name) {
            return Err(RuleFileError::InvalidName { op, name: name.to_string() });
        }
        Ok(self.dir.join(name))
    }

    async fn refresh(&self, op: &'static str, name: &str) -> Result<(), RuleFileError> {
        let fresh = scan(&self.dir).await.map_err(|e| {
            warn!(error = %e, "rule directory rescan failed");
            io_err(op, name, &e)
        })?;
        *self.names.write().unwrap_or_else(PoisonError::into_inner) = fresh;
        Ok(())
    }
}

fn io_err(op: &'static str, name: &str, e: &std::io::Error) -> RuleFileError {
    RuleFileError::Io { op, name: name.to_string(), reason: e.to_string() }
}

/// Only `http`/`https` sources are fetched.
fn source_url_for(op: &'static str, name: &str, raw: &str) -> Result<Url, RuleFileError> {
    let invalid = |reason: String| RuleFileError::InvalidSource { op, name: name.to_string(), reason };
    let url = Url::parse(raw.trim()).map_err(|e| invalid(format!("'{raw}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("'{raw}' must use http or https")));
    }
    Ok(url)
}

async fn scan(dir: &Path) -> Result<Vec<String>, std::io::Error> {
    let mut names = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        if !entry.file_type().await?.is_file() {
            continue;
        }
        if let Some(name) = entry.file_name().to_str()
            && is_valid_name(name)
        {
            names.push(name.to_string());
        }
    }
    names.sort();
    Ok(names)
}
