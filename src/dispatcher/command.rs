//! Text → command parsing. Pure functions, no state.

/// A `<keyword> ...` meta command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand<'a> {
    /// `help [topic]`; unknown sub-commands also land here.
    Help(Option<&'a str>),
    List,
    /// `set [system]`: first line of the argument, trimmed.
    Set(Option<&'a str>),
    /// `save [text]`: everything after the separator, verbatim.
    Save(&'a str),
    Load(&'a str),
    Status,
    Admin { password: &'a str, rest: &'a str },
}

/// Parse `text` as a meta command if its first word is `keyword`
/// (case-insensitive).
pub fn parse_meta<'a>(text: &'a str, keyword: &str) -> Option<MetaCommand<'a>> {
    let (head, rest) = split_word(text);
    if !head.eq_ignore_ascii_case(keyword) {
        return None;
    }

    let (sub, arg) = split_word(rest);
    let command = match sub.to_ascii_lowercase().as_str() {
        "help" => MetaCommand::Help(arg.split_whitespace().next()),
        "list" => MetaCommand::List,
        "set" => MetaCommand::Set(
            arg.lines().next().map(str::trim).filter(|s| !s.is_empty()),
        ),
        "save" => MetaCommand::Save(arg),
        "load" => MetaCommand::Load(arg.trim()),
        "status" => MetaCommand::Status,
        "admin" => {
            let (password, rest) = split_word(arg);
            MetaCommand::Admin { password, rest }
        }
        _ => MetaCommand::Help(None),
    };
    Some(command)
}

/// A roll line: `[N ][[a,b,c] ]<expression>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RollRequest<'a> {
    /// Explicit repeat count. Saturates on overflow so it still fails the
    /// upper-bound check.
    pub count: Option<u64>,
    pub labels: Vec<&'a str>,
    pub expression: &'a str,
}

impl<'a> RollRequest<'a> {
    pub fn parse(text: &'a str) -> Self {
        let mut rest = text.trim();

        let mut count = None;
        let (head, tail) = split_word(rest);
        if !head.is_empty() && head.bytes().all(|b| b.is_ascii_digit()) && !tail.trim().is_empty() {
            count = Some(head.parse().unwrap_or(u64::MAX));
            rest = tail.trim();
        }

        let mut labels = Vec::new();
        if let Some(inner) = rest.strip_prefix('[')
            && let Some((list, tail)) = inner.split_once(']')
            && tail.starts_with(char::is_whitespace)
            && !tail.trim().is_empty()
        {
            labels = list.split(',').map(str::trim).filter(|l| !l.is_empty()).collect();
            rest = tail.trim();
        }

        Self { count, labels, expression: rest }
    }

    /// How many rolls this request asks for, before bounds checking.
    pub fn times(&self) -> u64 {
        match (self.count, self.labels.len()) {
            (Some(n), _) => n,
            (None, 0) => 1,
            (None, l) => l as u64,
        }
    }
}

/// Split off the first whitespace-delimited word. The remainder starts right
/// after the single separating character, so multi-line arguments survive.
pub fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim_start();
    match text.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => (&text[..i], &text[i + c.len_utf8()..]),
        None => (text, ""),
    }
}
