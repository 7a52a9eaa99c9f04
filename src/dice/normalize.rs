//! Command-text normalisation for the BCDice-API query string.
//!
//! The backend expects a specific percent encoding, not general form
//! encoding: whitespace touching a comparison operator (`<`, `=`, `>`) is
//! dropped so `2d6 <= 8` becomes `2d6<=8`, then every byte outside the
//! RFC 3986 unreserved set is written as `%XX`. A `%` already followed by
//! two hex digits is kept, so normalising twice is a no-op; any other `%` is
//! encoded as `%25`.

/// Encode a raw roll command (or system name) for the backend URL.
pub fn normalize(command: &str) -> String {
    let compact = drop_operator_whitespace(command);
    let bytes = compact.as_bytes();
    let mut out = String::with_capacity(bytes.len() * 3);
    for (i, &byte) in bytes.iter().enumerate() {
        if is_passthrough(byte) || is_escape_start(&bytes[i..]) {
            out.push(char::from(byte));
        } else {
            out.push('%');
            out.push(hex_digit(byte >> 4));
            out.push(hex_digit(byte & 0x0f));
        }
    }
    out
}

/// Heuristic used by the dice-only suppression mode: does `text` look like a
/// roll expression the backend would accept?
///
/// The first token (after an optional `S` secret marker) must start with a
/// digit, a well-known command head, or a repeat head (`x3`, `rep3`,
/// `repeat3`). System-specific commands are matched separately through
/// [`super::CommandPrefixes`].
pub fn looks_like_dice(text: &str) -> bool {
    let mut tokens = text.split_whitespace();
    let Some(token) = tokens.next() else {
        return false;
    };
    let lower = token.to_lowercase();
    if is_repeat_head(&lower) {
        return tokens.next().is_some();
    }
    if starts_like_dice(&lower) {
        return true;
    }
    lower
        .strip_prefix('s')
        .is_some_and(starts_like_dice)
}

const COMMAND_HEADS: [&str; 5] = ["choice", "c(", "cc", "res(", "d66"];

const REPEAT_HEADS: [&str; 3] = ["repeat", "rep", "x"];

fn starts_like_dice(token: &str) -> bool {
    token.starts_with(|c: char| c.is_ascii_digit())
        || COMMAND_HEADS.iter().any(|head| token.starts_with(head))
}

/// `x3`, `rep3`, `repeat3`: a repeat head followed only by digits.
fn is_repeat_head(token: &str) -> bool {
    REPEAT_HEADS.iter().any(|head| {
        token
            .strip_prefix(head)
            .is_some_and(|n| !n.is_empty() && n.bytes().all(|b| b.is_ascii_digit()))
    })
}

fn is_operator(c: char) -> bool {
    matches!(c, '<' | '=' | '>')
}

fn drop_operator_whitespace(command: &str) -> String {
    let chars: Vec<char> = command.chars().collect();
    let mut out = String::with_capacity(command.len());
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if !c.is_whitespace() {
            out.push(c);
            i += 1;
            continue;
        }
        let run_end = chars[i..]
            .iter()
            .position(|c| !c.is_whitespace())
            .map_or(chars.len(), |offset| i + offset);
        let after_operator = out.chars().last().is_some_and(is_operator);
        let before_operator = chars.get(run_end).copied().is_some_and(is_operator);
        if !after_operator && !before_operator {
            out.extend(&chars[i..run_end]);
        }
        i = run_end;
    }
    out
}

fn is_passthrough(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'.' | b'_' | b'~')
}

/// `%` followed by two hex digits.
fn is_escape_start(bytes: &[u8]) -> bool {
    matches!(bytes, [b'%', hi, lo, ..] if hi.is_ascii_hexdigit() && lo.is_ascii_hexdigit())
}

fn hex_digit(nibble: u8) -> char {
    char::from(b"0123456789ABCDEF"[usize::from(nibble)])
}
