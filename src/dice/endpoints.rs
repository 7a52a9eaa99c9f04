//! [`EndpointList`] — ordered backend base URLs with a "trusted" cursor.
//!
//! The list is never empty, so the cursor is always a valid index. Entries
//! are only ever appended, which keeps indices stable for callers that
//! observed a cursor value before awaiting a request.

use reqwest::Url;

use super::DiceError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointList {
    urls: Vec<String>,
    cursor: usize,
}

impl EndpointList {
    /// Seed the list with a single endpoint.
    pub fn new(url: &str) -> Result<Self, DiceError> {
        Self::from_many([url])
    }

    /// Seed the list from several endpoints; the first is trusted.
    /// Duplicates (after canonicalisation) are collapsed.
    pub fn from_many<I, S>(urls: I) -> Result<Self, DiceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut canonical: Vec<String> = Vec::new();
        for url in urls {
            let url = canonicalize(url.as_ref())?;
            if !canonical.contains(&url) {
                canonical.push(url);
            }
        }
        if canonical.is_empty() {
            return Err(DiceError::InvalidEndpoint("endpoint list must not be empty".into()));
        }
        Ok(Self { urls: canonical, cursor: 0 })
    }

    /// Single non-network entry for the offline backend. Never validated as
    /// a URL and never requested.
    pub(crate) fn offline(label: &str) -> Self {
        Self { urls: vec![label.to_string()], cursor: 0 }
    }

    /// Trust `url`: move the cursor to it, appending it first if unknown.
    /// Returns the new cursor.
    pub fn set_endpoint(&mut self, url: &str) -> Result<usize, DiceError> {
        let url = canonicalize(url)?;
        self.cursor = match self.urls.iter().position(|u| *u == url) {
            Some(index) => index,
            None => {
                self.urls.push(url);
                self.urls.len() - 1
            }
        };
        Ok(self.cursor)
    }

    /// `(cursor, url)` of the trusted endpoint.
    pub fn current(&self) -> (usize, &str) {
        // The list is never empty and the cursor never leaves bounds.
        let url = self.urls.get(self.cursor).map_or("", String::as_str);
        (self.cursor, url)
    }

    /// Step past a failed endpoint, but only if nobody moved the cursor since
    /// `observed` was read. Returns `true` if this call advanced it.
    pub fn advance_from(&mut self, observed: usize) -> bool {
        if self.cursor != observed {
            return false;
        }
        self.cursor = (observed + 1) % self.urls.len();
        true
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn urls(&self) -> &[String] {
        &self.urls
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    /// One line per endpoint, the trusted one marked with `*`.
    pub fn describe(&self) -> String {
        self.urls
            .iter()
            .enumerate()
            .map(|(i, url)| {
                let mark = if i == self.cursor { '*' } else { ' ' };
                format!("{mark} {url}")
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Parse `url` as an `http`/`https` base URL and force a single trailing
/// slash, so request paths can be appended directly.
pub fn canonicalize(url: &str) -> Result<String, DiceError> {
    let raw = url.trim();
    let parsed = Url::parse(raw)
        .map_err(|e| DiceError::InvalidEndpoint(format!("not a usable base URL: '{raw}': {e}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(DiceError::InvalidEndpoint(format!(
            "'{raw}' must use http or https, not '{}'",
            parsed.scheme()
        )));
    }
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(DiceError::InvalidEndpoint(format!("'{raw}' has no host")));
    }
    if parsed.query().is_some() || parsed.fragment().is_some() {
        return Err(DiceError::InvalidEndpoint(format!(
            "'{raw}' must not carry a query or fragment"
        )));
    }

    let base = parsed.as_str();
    if base.ends_with('/') {
        Ok(base.to_string())
    } else {
        Ok(format!("{base}/"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const A: &str = "http://a.example/api";
    const B: &str = "http://b.example/api";
    const C: &str = "http://c.example/api/";

    #[test]
    fn seed_is_canonical_and_trusted() {
        let list = EndpointList::new(A).unwrap();
        assert_eq!(list.current(), (0, "http://a.example/api/"));
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn new_endpoint_is_appended_and_trusted() {
        let mut list = EndpointList::new(A).unwrap();
        assert_eq!(list.set_endpoint(B).unwrap(), 1);
        assert_eq!(list.len(), 2);
        assert_eq!(list.current().1, "http://b.example/api/");
    }

    #[test]
    fn known_endpoint_moves_cursor_without_duplicating() {
        let mut list = EndpointList::new(A).unwrap();
        list.set_endpoint(B).unwrap();
        assert_eq!(list.set_endpoint(A).unwrap(), 0);
        assert_eq!(list.len(), 2);
        list.set_endpoint(C).unwrap();
        assert_eq!(list.len(), 3);
        assert_eq!(list.current().1, C);
    }

    #[test]
    fn set_endpoint_twice_is_idempotent() {
        let mut list = EndpointList::new(A).unwrap();
        list.set_endpoint(B).unwrap();
        list.set_endpoint(B).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.cursor(), 1);
        // With or without the trailing slash it is the same endpoint.
        list.set_endpoint("http://b.example/api/").unwrap();
        assert_eq!(list.len(), 2);
    }

    #[test]
    fn from_many_trusts_first_and_dedups() {
        let list = EndpointList::from_many([A, B, A]).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn from_many_empty_errors() {
        assert!(EndpointList::from_many(Vec::<String>::new()).is_err());
        assert!(EndpointList::new("  ").is_err());
    }

    #[test]
    fn non_url_tokens_are_rejected() {
        for bad in ["hiyoko", "oops", "ftp://a.example/", "mailto:dice@example.org", "http://", "http://a.example/?x=1"] {
            let err = canonicalize(bad).unwrap_err();
            assert!(matches!(err, DiceError::InvalidEndpoint(_)), "{bad}: {err}");
        }
    }

    #[test]
    fn rejected_endpoint_leaves_list_untouched() {
        let mut list = EndpointList::new(A).unwrap();
        assert!(list.set_endpoint("hiyoko").is_err());
        assert_eq!(list.urls(), ["http://a.example/api/"]);
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn canonical_form_is_parsed_url_with_slash() {
        assert_eq!(canonicalize(" https://Dice.Example ").unwrap(), "https://dice.example/");
        assert_eq!(canonicalize("http://127.0.0.1:8080/bcdice").unwrap(), "http://127.0.0.1:8080/bcdice/");
    }

    #[test]
    fn advance_wraps_around() {
        let mut list = EndpointList::from_many([A, B]).unwrap();
        assert!(list.advance_from(0));
        assert_eq!(list.cursor(), 1);
        assert!(list.advance_from(1));
        assert_eq!(list.cursor(), 0);
    }

    #[test]
    fn stale_advance_is_ignored() {
        let mut list = EndpointList::from_many([A, B, C]).unwrap();
        list.set_endpoint(C).unwrap();
        assert!(!list.advance_from(0));
        assert_eq!(list.cursor(), 2);
    }

    #[test]
    fn describe_marks_cursor() {
        let mut list = EndpointList::from_many([A, B]).unwrap();
        list.set_endpoint(B).unwrap();
        assert_eq!(list.describe(), "  http://a.example/api/\n* http://b.example/api/");
    }
}
