//! Dice backend implementations and the selector that picks one.
//!
//! `build(config, keyword)` is the factory called at startup;
//! `select_client(token, options)` is used again whenever an admin swaps the
//! primary backend. Adding a new backend = new module + new match arm.

pub mod http;
pub mod mock;

use std::time::Duration;

use tracing::info;

use crate::config::DiceConfig;
use crate::dice::{DiceClient, DiceError, EndpointList};

/// Tokens that select the offline mock instead of a URL.
pub const MOCK_TOKENS: [&str; 2] = ["mock", "test"];

/// Settings shared by every client the selector builds.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub timeout: Duration,
    /// Command keyword quoted in user-facing error text.
    pub keyword: String,
}

/// Which client to construct, decided once from configuration tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    Mock,
    Network(Vec<String>),
}

impl Backend {
    pub fn from_token(token: &str) -> Self {
        Self::from_tokens([token])
    }

    /// The first token decides the kind; mock tokens later in a URL list
    /// are ignored.
    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let tokens: Vec<String> = tokens
            .into_iter()
            .map(|t| t.as_ref().trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        match tokens.first() {
            None => Self::Mock,
            Some(first) if is_mock_token(first) => Self::Mock,
            Some(_) => Self::Network(tokens.into_iter().filter(|t| !is_mock_token(t)).collect()),
        }
    }
}

fn is_mock_token(token: &str) -> bool {
    MOCK_TOKENS.iter().any(|m| m.eq_ignore_ascii_case(token))
}

/// Construct a client for a single configuration token.
pub fn select_client(token: &str, options: &ClientOptions) -> Result<DiceClient, DiceError> {
    construct(Backend::from_token(token), options)
}

/// Construct the startup client from `[dice]` config.
pub fn build(config: &DiceConfig, keyword: &str) -> Result<DiceClient, DiceError> {
    let options = ClientOptions {
        timeout: Duration::from_secs(config.timeout_seconds),
        keyword: keyword.to_string(),
    };
    construct(Backend::from_tokens(&config.servers), &options)
}

pub fn construct(backend: Backend, options: &ClientOptions) -> Result<DiceClient, DiceError> {
    let client = match backend {
        Backend::Mock => DiceClient::Mock(mock::MockDiceClient::new(EndpointList::offline(MOCK_TOKENS[0]))),
        Backend::Network(urls) => {
            let list = EndpointList::from_many(&urls)?;
            DiceClient::Http(http::HttpDiceClient::new(list, options.timeout, &options.keyword)?)
        }
    };
    info!(kind = client.kind(), endpoints = client.endpoint_list().len(), "dice client ready");
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options() -> ClientOptions {
        ClientOptions { timeout: Duration::from_secs(1), keyword: "bcdice".into() }
    }

    #[test]
    fn backend_from_tokens() {
        assert_eq!(Backend::from_token("mock"), Backend::Mock);
        assert_eq!(Backend::from_token("TEST"), Backend::Mock);
        assert_eq!(Backend::from_token(""), Backend::Mock);
        assert_eq!(
            Backend::from_token("https://bcdice.example.org"),
            Backend::Network(vec!["https://bcdice.example.org".into()])
        );
        assert_eq!(
            Backend::from_tokens(["http://a", "mock", "http://b"]),
            Backend::Network(vec!["http://a".into(), "http://b".into()])
        );
    }

    #[test]
    fn select_url_builds_network_client() {
        let client = select_client("https://bcdice.example.org", &options()).unwrap();
        assert_eq!(client.kind(), "bcdice-api");
        assert_eq!(client.endpoint_list().urls(), ["https://bcdice.example.org/"]);
    }

    #[test]
    fn select_rejects_non_url_token() {
        let err = select_client("not-a-url", &options()).unwrap_err();
        assert!(matches!(err, DiceError::InvalidEndpoint(_)));
    }

    #[test]
    fn select_mock_token_builds_mock() {
        let client = select_client("test", &options()).unwrap();
        assert_eq!(client.kind(), "mock");
    }

    #[test]
    fn build_seeds_every_server_with_first_trusted() {
        let config = DiceConfig {
            servers: vec!["http://a.example/".into(), "http://b.example".into()],
            timeout_seconds: 1,
            default_system: "DiceBot".into(),
            save_cap: 10,
        };
        let client = build(&config, "bcdice").unwrap();
        let list = client.endpoint_list();
        assert_eq!(list.len(), 2);
        assert_eq!(list.current().1, "http://a.example/");
    }

    #[tokio::test]
    async fn mock_client_never_moves_cursor() {
        let client = select_client("mock", &options()).unwrap();
        client.set_endpoint("http://other.example").unwrap();
        let before = client.cursor();
        let outcomes = client.roll_many("2d6", "DiceBot", 3).await.unwrap();
        assert_eq!(outcomes.len(), 3);
        assert_eq!(client.cursor(), before);
    }
}
