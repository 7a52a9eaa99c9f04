//! BCDice-API client (`v1/diceroll`, `v1/names`, `v1/systeminfo`).
//!
//! Requests go to the trusted endpoint. A transport failure, a 5xx, or a body
//! that does not parse moves the cursor to the next endpoint and retries,
//! at most once per endpoint per call. Success leaves the cursor where it is,
//! so the next call starts from the endpoint that just worked.
//!
//! Wire types are private to this module.

use std::future::Future;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::{debug, error, warn};

use crate::dice::normalize::normalize;
use crate::dice::outcome::RollPayload;
use crate::dice::{DiceError, EndpointList, RollOutcome, SharedEndpoints};

// ── Public client ─────────────────────────────────────────────────────────────

/// Network-backed client. `reqwest::Client` is an `Arc` internally, so the
/// only per-instance state worth guarding is the endpoint cursor.
#[derive(Debug)]
pub struct HttpDiceClient {
    client: Client,
    endpoints: SharedEndpoints,
    keyword: String,
}

impl HttpDiceClient {
    /// `timeout` bounds every request; a timeout counts as a transport failure.
    pub fn new(list: EndpointList, timeout: Duration, keyword: &str) -> Result<Self, DiceError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| DiceError::Client(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints: SharedEndpoints::new(list),
            keyword: keyword.to_string(),
        })
    }

    pub async fn roll(&self, command: &str, system: &str) -> Result<RollOutcome, DiceError> {
        let query = format!("v1/diceroll?system={}&command={}", normalize(system), normalize(command));
        debug!(%system, command_len = command.len(), "sending roll request");
        let payload: RollPayload = self.with_failover(&query).await?;
        Ok(RollOutcome::from_payload(payload, system, &self.keyword))
    }

    pub async fn system_names(&self) -> Result<Vec<String>, DiceError> {
        let payload: NamesPayload = self.with_failover("v1/names").await?;
        Ok(payload.names.into_iter().map(|n| n.system).collect())
    }

    pub async fn system_info(&self, system: &str) -> Result<Option<String>, DiceError> {
        Ok(self.fetch_system_info(system).await?.map(|s| s.info))
    }

    pub async fn system_prefixes(&self, system: &str) -> Result<Vec<String>, DiceError> {
        Ok(self
            .fetch_system_info(system)
            .await?
            .map(|s| s.prefixs)
            .unwrap_or_default())
    }

    async fn fetch_system_info(&self, system: &str) -> Result<Option<SystemInfo>, DiceError> {
        let query = format!("v1/systeminfo?system={}", normalize(system));
        let payload: SystemInfoPayload = self.with_failover(&query).await?;
        Ok(payload.systeminfo.filter(|_| payload.ok))
    }

    pub(crate) fn endpoints(&self) -> &SharedEndpoints {
        &self.endpoints
    }

    /// GET `{base}{path_and_query}` against the rotation.
    async fn with_failover<T: DeserializeOwned>(&self, path_and_query: &str) -> Result<T, DiceError> {
        rotate(&self.endpoints, |base| self.fetch(format!("{base}{path_and_query}"))).await
    }

    async fn fetch<T: DeserializeOwned>(&self, url: String) -> Result<T, DiceError> {
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| DiceError::Transport(e.to_string()))?;

        let status = response.status();
        if status.is_server_error() {
            return Err(DiceError::Rejected(format!("HTTP {status}")));
        }

        let body = response
            .text()
            .await
            .map_err(|e| DiceError::Transport(format!("failed to read body: {e}")))?;

        // 4xx bodies still carry a definitive `{ok: false, reason}` answer.
        serde_json::from_str(&body)
            .map_err(|e| DiceError::Rejected(format!("HTTP {status}: unparseable body: {e}")))
    }
}

/// Run `request` against the trusted endpoint, stepping through the list on
/// failover errors. The attempt budget is the list length at entry, so the
/// loop terminates even if endpoints are added meanwhile.
pub(crate) async fn rotate<T, F, Fut>(endpoints: &SharedEndpoints, request: F) -> Result<T, DiceError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, DiceError>>,
{
    let attempts = endpoints.lock().len();
    for attempt in 1..=attempts {
        let (index, base) = {
            let list = endpoints.lock();
            let (index, base) = list.current();
            (index, base.to_string())
        };

        match request(base.clone()).await {
            Ok(value) => {
                debug!(endpoint = %base, attempt, "dice server answered");
                return Ok(value);
            }
            Err(e) if e.triggers_failover() => {
                warn!(endpoint = %base, attempt, error = %e, "dice server failed, trying next");
                endpoints.lock().advance_from(index);
            }
            Err(e) => return Err(e),
        }
    }

    error!(attempts, "all dice servers failed");
    Err(DiceError::Unavailable { attempts })
}

// ── Private wire types ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct NamesPayload {
    names: Vec<NameEntry>,
}

#[derive(Debug, Deserialize)]
struct NameEntry {
    system: String,
}

#[derive(Debug, Deserialize)]
struct SystemInfoPayload {
    ok: bool,
    #[serde(default)]
    systeminfo: Option<SystemInfo>,
}

#[derive(Debug, Deserialize)]
struct SystemInfo {
    #[serde(default)]
    info: String,
    /// Command prefix regex fragments; the API spells the key this way.
    #[serde(default)]
    prefixs: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const A: &str = "http://a.test/";
    const B: &str = "http://b.test/";
    const C: &str = "http://c.test/";

    fn shared(urls: &[&str]) -> SharedEndpoints {
        SharedEndpoints::new(EndpointList::from_many(urls.iter().copied()).unwrap())
    }

    async fn only_c(base: String) -> Result<&'static str, DiceError> {
        if base == C {
            Ok("rolled")
        } else {
            Err(DiceError::Rejected("HTTP 500".into()))
        }
    }

    #[tokio::test]
    async fn fails_over_to_working_endpoint_and_sticks() {
        let endpoints = shared(&[A, B, C]);
        assert_eq!(rotate(&endpoints, only_c).await.unwrap(), "rolled");
        assert_eq!(endpoints.lock().current().1, C);

        endpoints.lock().set_endpoint(B).unwrap();
        assert_eq!(rotate(&endpoints, only_c).await.unwrap(), "rolled");
        assert_eq!(endpoints.lock().current().1, C);
    }

    #[tokio::test]
    async fn every_endpoint_tried_once_then_unavailable() {
        let endpoints = shared(&[A, B]);
        let calls = AtomicUsize::new(0);
        let result: Result<(), DiceError> = rotate(&endpoints, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DiceError::Transport("connection refused".into())) }
        })
        .await;
        assert!(matches!(result, Err(DiceError::Unavailable { attempts: 2 })));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        // Two advances from A wrap back to A.
        assert_eq!(endpoints.lock().cursor(), 0);
    }

    #[tokio::test]
    async fn non_failover_error_stops_rotation() {
        let endpoints = shared(&[A, B]);
        let calls = AtomicUsize::new(0);
        let result: Result<(), DiceError> = rotate(&endpoints, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err(DiceError::Client("boom".into())) }
        })
        .await;
        assert!(matches!(result, Err(DiceError::Client(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(endpoints.lock().cursor(), 0);
    }

    #[test]
    fn names_payload_parses() {
        let p: NamesPayload = serde_json::from_str(
            r#"{"names":[{"system":"DiceBot","name":"DiceBot"},{"system":"Cthulhu","name":"Call of Cthulhu"}]}"#,
        )
        .unwrap();
        let names: Vec<_> = p.names.into_iter().map(|n| n.system).collect();
        assert_eq!(names, vec!["DiceBot", "Cthulhu"]);
    }

    #[test]
    fn systeminfo_payload_parses() {
        let p: SystemInfoPayload =
            serde_json::from_str(r#"{"ok":true,"systeminfo":{"name":"Cthulhu","info":"CC<=50"}}"#).unwrap();
        assert!(p.ok);
        assert_eq!(p.systeminfo.unwrap().info, "CC<=50");
    }

    #[test]
    fn systeminfo_prefixes_parse_and_default() {
        let p: SystemInfoPayload = serde_json::from_str(
            r#"{"ok":true,"systeminfo":{"name":"SwordWorld2.5","prefixs":["K\\d+.*","Gr(\\d+)?"],"info":""}}"#,
        )
        .unwrap();
        assert_eq!(p.systeminfo.unwrap().prefixs, vec!["K\\d+.*", "Gr(\\d+)?"]);

        let p: SystemInfoPayload = serde_json::from_str(r#"{"ok":true,"systeminfo":{"info":"x"}}"#).unwrap();
        assert!(p.systeminfo.unwrap().prefixs.is_empty());
    }
}
