//! Bot command parsing (/link, /start).

use tracing::debug;

/// Commands understood by the bot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Open the link dialog (`/link`).
    Link,
    /// `/start` with its optional argument.
    Start { arg: Option<String> },
}

/// Parse a command from message text.
///
/// Commands addressed to another bot (`/link@other_bot`) and unknown
/// commands return None, so the text is handled as an ordinary message.
pub fn parse_command(content: &str, bot_username: &str) -> Option<Command> {
    let content = content.trim();
    let body = content.strip_prefix('/')?;

    let parts: Vec<&str> = body.splitn(2, char::is_whitespace).collect();
    let (name, mention) = match parts[0].split_once('@') {
        Some((name, mention)) => (name, Some(mention)),
        None => (parts[0], None),
    };
    if let Some(mention) = mention {
        if !mention.eq_ignore_ascii_case(bot_username) {
            return None;
        }
    }

    let args = parts
        .get(1)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string());

    debug!("Processing command: {} with args: {:?}", name, args);

    match name.to_lowercase().as_str() {
        "link" => Some(Command::Link),
        "start" => Some(Command::Start { arg: args }),
        _ => None,
    }
}
