//! System command prefixes from `v1/systeminfo`.
//!
//! BCDice publishes each game system's commands as regex fragments
//! (`"K\\d+.*"`, `"CBR(B)?\\(\\d+,\\d+\\)"`, `"ST"`) and gates input with
//! `^(S)?(prefix|...)` matched case-insensitively. Only the literal head of
//! each fragment is kept here, plus whether a digit must follow it. That is
//! enough to tell `K20` or `RESB(10,5)` apart from ordinary chat.

/// Literal head of one prefix pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Head {
    /// Uppercased literal text.
    text: String,
    /// The pattern continues with `\d`.
    digit_after: bool,
}

/// The command heads of one game system.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandPrefixes {
    heads: Vec<Head>,
}

impl CommandPrefixes {
    /// Build from the backend's `prefixs` list. Fragments with no literal
    /// head (for example `\d+DX.*`) are skipped; leading digits are already
    /// accepted by [`super::looks_like_dice`].
    pub fn from_patterns<S: AsRef<str>>(patterns: &[S]) -> Self {
        let mut heads = Vec::new();
        for pattern in patterns {
            for alternative in split_alternatives(pattern.as_ref()) {
                if let Some(head) = literal_head(alternative)
                    && !heads.contains(&head)
                {
                    heads.push(head);
                }
            }
        }
        Self { heads }
    }

    pub fn is_empty(&self) -> bool {
        self.heads.is_empty()
    }

    /// Does the first token of `text`, after an optional `S` secret marker,
    /// start with one of the heads?
    pub fn matches(&self, text: &str) -> bool {
        let Some(token) = text.split_whitespace().next() else {
            return false;
        };
        let upper = token.to_ascii_uppercase();
        self.matches_token(&upper)
            || upper.strip_prefix('S').is_some_and(|rest| self.matches_token(rest))
    }

    fn matches_token(&self, token: &str) -> bool {
        self.heads.iter().any(|head| {
            token.strip_prefix(head.text.as_str()).is_some_and(|rest| {
                !head.digit_after || rest.starts_with(|c: char| c.is_ascii_digit())
            })
        })
    }
}

/// Split on `|` outside parentheses and brackets.
fn split_alternatives(pattern: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut escaped = false;
    for (i, c) in pattern.char_indices() {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '|' if depth == 0 => {
                parts.push(&pattern[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    parts.push(&pattern[start..]);
    parts
}

fn literal_head(pattern: &str) -> Option<Head> {
    let mut text = String::new();
    let mut digit_after = false;
    let mut chars = pattern.strip_prefix('^').unwrap_or(pattern).chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '\\' => match chars.next() {
                Some('d') => {
                    digit_after = true;
                    break;
                }
                Some(escaped) if escaped.is_ascii_punctuation() => text.push(escaped),
                _ => break,
            },
            // The previous character is optional, so it is not part of the head.
            '?' | '*' | '{' => {
                text.pop();
                break;
            }
            '+' | '.' | '(' | ')' | '[' | ']' | '|' | '^' | '$' => break,
            literal => text.push(literal.to_ascii_uppercase()),
        }
        // `X?` and `X*` make the just-pushed character optional.
        if matches!(chars.peek(), Some('?' | '*' | '{')) {
            text.pop();
            break;
        }
    }

    (!text.is_empty()).then_some(Head { text, digit_after })
}
