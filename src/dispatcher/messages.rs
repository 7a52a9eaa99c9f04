//! Fixed reply texts.

/// Reply to any admin command with the wrong password. Deliberately says
/// nothing about the expected value.
pub const WRONG_PASSWORD: &str = "Wrong admin password.";

/// Leading word of every `load` miss.
pub const NOT_FOUND: &str = "Not found";

pub const ERROR_MARK: &str = "[ERROR]";

pub fn help(keyword: &str) -> String {
    format!(
        "How to use the dice bot
  <dice command>                 roll, e.g. `2d6` or `CC<=50`
  <N> <dice command>             roll N times (N <= 20)
  [a,b,c] <dice command>         roll once per label
  {keyword} help [system]        this help, or help for a system / rule file
  {keyword} list                 installed systems and rule files
  {keyword} set <system>         roll under <system> in this channel
  {keyword} status               current settings of this channel
  {keyword} save [text]          push text onto your saved stack
  {keyword} load <n>             show your n-th saved text
  {keyword} admin <password> help"
    )
}

pub fn admin_help(keyword: &str) -> String {
    format!(
        "Admin commands: {keyword} admin <password> <command>
  help                           this help
  suppressroll                   roll only text that looks like dice
  suppressroll disable           send all text to the dice server
  suppressroll <prefix>          roll only text starting with <prefix>
  server <url>                   add (or switch to) a dice server
  servers                        list dice servers, * marks the current one
  backend <url|mock>             replace the dice client
  register <name> <url>          register a rule file from <url>
  unregister <name>              remove a rule file"
    )
}

pub fn suppress_dice_only() -> String {
    "Dice-only mode: only text that looks like a dice command is sent to the dice server.".to_string()
}

pub fn suppress_disabled() -> String {
    "Suppression disabled: all text is sent to the dice server.".to_string()
}

pub fn suppress_prefix(prefix: &str) -> String {
    format!("Only text starting with `{prefix}` is sent to the dice server.")
}

pub fn topic_not_found(topic: &str, keyword: &str) -> String {
    format!("{topic} is not found. See `{keyword} list` for the installed systems.")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn help_uses_keyword() {
        assert!(help("roll").contains("roll set <system>"));
        assert!(admin_help("roll").starts_with("Admin commands: roll admin"));
    }

    #[test]
    fn prefix_confirmation_names_prefix() {
        assert!(suppress_prefix("/x").contains("`/x`"));
    }
}
