//! Chat-line command grammar.
//!
//! Lines typed into a chat window either drive playback or are shown on the
//! engine's overlay. A line whose first word is a command name (matched
//! exactly, case-sensitive) is a command; anything else is chat text. Lines
//! relayed from a chat network may carry an `alias: ` prefix naming the sender;
//! the part after it is checked for a command too.
//!
//! | Line            | Effect                                   |
//! |-----------------|------------------------------------------|
//! | `pp`            | toggle pause, report status              |
//! | `STATUS`        | report status                            |
//! | `SEEK <t>`      | seek to `t`                              |
//! | `SEEK+ <t>`     | seek forward by `t`                      |
//! | `SEEK- <t>`     | seek back by `t`                         |
//! | `INDEX <n>`     | jump to playlist entry `n` (1-based)     |
//! | `PREV` / `NEXT` | step through the playlist                |
//! | `PAUSE` / `PLAY`| set the pause state                      |
//! | `APPEND <path>` | add media to the playlist                |
//!
//! Times are up to three digit groups read as `[[h:]m:]s`, so `90`, `1:30`
//! and `0:01:30` all mean ninety seconds.

use moov_client::{Client, StatusReply};

/// A parsed chat line.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatLine {
    Command {
        alias: Option<String>,
        command: ChatCommand,
    },
    Message {
        alias: Option<String>,
        text: String,
    },
}

impl ChatLine {
    /// Text to show on the overlay for a chat message, with its sender.
    pub fn overlay_text(&self) -> Option<String> {
        match self {
            ChatLine::Message {
                alias: Some(alias),
                text,
            } => Some(format!("{alias}: {text}")),
            ChatLine::Message { alias: None, text } => Some(text.clone()),
            ChatLine::Command { .. } => None,
        }
    }
}

/// Playback commands available from chat.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatCommand {
    TogglePause,
    Status,
    Seek(f64),
    SeekForward(f64),
    SeekBackward(f64),
    /// 0-based playlist position.
    Index(u64),
    Previous,
    Next,
    Pause,
    Play,
    Append(String),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChatError {
    #[error("{command}: invalid time {input:?}")]
    InvalidTime {
        command: &'static str,
        input: String,
    },

    #[error("INDEX: invalid playlist entry {0:?} (entries start at 1)")]
    InvalidIndex(String),

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
}

/// Parse one chat line.
pub fn parse_line(line: &str) -> Result<ChatLine, ChatError> {
    let line = line.trim();
    if let Some(command) = parse_command(line)? {
        return Ok(ChatLine::Command {
            alias: None,
            command,
        });
    }

    let Some((alias, rest)) = split_alias(line) else {
        return Ok(ChatLine::Message {
            alias: None,
            text: line.to_string(),
        });
    };
    let alias = Some(alias.to_string());
    match parse_command(rest)? {
        Some(command) => Ok(ChatLine::Command { alias, command }),
        None => Ok(ChatLine::Message {
            alias,
            text: rest.to_string(),
        }),
    }
}

/// An alias is one word with no whitespace, followed by `": "`.
fn split_alias(line: &str) -> Option<(&str, &str)> {
    let (alias, rest) = line.split_once(": ")?;
    if alias.is_empty() || alias.contains(char::is_whitespace) {
        return None;
    }
    Some((alias, rest.trim()))
}

fn parse_command(line: &str) -> Result<Option<ChatCommand>, ChatError> {
    let (name, args) = match line.split_once(char::is_whitespace) {
        Some((name, args)) => (name, args.trim()),
        None => (line, ""),
    };

    let command = match name {
        "pp" => ChatCommand::TogglePause,
        "STATUS" => ChatCommand::Status,
        "SEEK" => ChatCommand::Seek(time_arg("SEEK", args)?),
        "SEEK+" => ChatCommand::SeekForward(time_arg("SEEK+", args)?),
        "SEEK-" => ChatCommand::SeekBackward(time_arg("SEEK-", args)?),
        "INDEX" => ChatCommand::Index(index_arg(args)?),
        "PREV" => ChatCommand::Previous,
        "NEXT" => ChatCommand::Next,
        "PAUSE" => ChatCommand::Pause,
        "PLAY" => ChatCommand::Play,
        "APPEND" if args.is_empty() => return Err(ChatError::MissingArgument("APPEND")),
        "APPEND" => ChatCommand::Append(args.to_string()),
        _ => return Ok(None),
    };
    Ok(Some(command))
}

fn time_arg(command: &'static str, args: &str) -> Result<f64, ChatError> {
    if args.is_empty() {
        return Err(ChatError::MissingArgument(command));
    }
    parse_time(args).ok_or_else(|| ChatError::InvalidTime {
        command,
        input: args.to_string(),
    })
}

fn index_arg(args: &str) -> Result<u64, ChatError> {
    if args.is_empty() {
        return Err(ChatError::MissingArgument("INDEX"));
    }
    match args.parse::<u64>() {
        Ok(entry) if entry >= 1 => Ok(entry - 1),
        _ => Err(ChatError::InvalidIndex(args.to_string())),
    }
}

/// Read a time of up to three digit groups as seconds.
///
/// Groups are any runs of ASCII digits; everything between them is a
/// separator. Returns `None` when there are no digits.
pub fn parse_time(input: &str) -> Option<f64> {
    let mut groups = Vec::with_capacity(3);
    for group in input
        .split(|c: char| !c.is_ascii_digit())
        .filter(|group| !group.is_empty())
        .take(3)
    {
        groups.push(group.parse::<u64>().ok()?);
    }
    if groups.is_empty() {
        return None;
    }

    let seconds = groups
        .iter()
        .fold(0.0, |total, &group| total * 60.0 + group as f64);
    Some(seconds)
}

impl ChatCommand {
    /// Run the command against the engine.
    ///
    /// Returns a fresh status snapshot for the commands that report one
    /// (`pp` and `STATUS`).
    pub fn execute(&self, client: &Client) -> moov_client::Result<Option<StatusReply>> {
        match self {
            ChatCommand::TogglePause => {
                client.toggle_paused()?;
                return client.status().map(Some);
            }
            ChatCommand::Status => return client.status().map(Some),
            ChatCommand::Seek(seconds) => client.seek(*seconds)?,
            ChatCommand::SeekForward(delta) => {
                client.relative_seek(*delta)?;
            }
            ChatCommand::SeekBackward(delta) => {
                client.relative_seek(-delta)?;
            }
            ChatCommand::Index(position) => client.index(*position)?,
            ChatCommand::Previous => {
                client.previous()?;
            }
            ChatCommand::Next => {
                client.next()?;
            }
            ChatCommand::Pause => client.set_paused(true)?,
            ChatCommand::Play => client.set_paused(false)?,
            ChatCommand::Append(path) => client.append(path)?,
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(line: &str) -> ChatCommand {
        match parse_line(line).unwrap() {
            ChatLine::Command { command, .. } => command,
            other => panic!("expected a command, got {other:?}"),
        }
    }

    #[test]
    fn parse_time_groups() {
        assert_eq!(parse_time("90"), Some(90.0));
        assert_eq!(parse_time("1:30"), Some(90.0));
        assert_eq!(parse_time("1:39:22"), Some(5962.0));
        assert_eq!(parse_time("  2m 5s"), Some(125.0));
        assert_eq!(parse_time("1:2:3:4"), Some(3723.0));
        assert_eq!(parse_time("soon"), None);
        assert_eq!(parse_time(""), None);
    }

    #[test]
    fn parses_every_command() {
        assert_eq!(command("pp"), ChatCommand::TogglePause);
        assert_eq!(command("STATUS"), ChatCommand::Status);
        assert_eq!(command("SEEK 1:30"), ChatCommand::Seek(90.0));
        assert_eq!(command("SEEK+ 10"), ChatCommand::SeekForward(10.0));
        assert_eq!(command("SEEK- 0:05"), ChatCommand::SeekBackward(5.0));
        assert_eq!(command("INDEX 3"), ChatCommand::Index(2));
        assert_eq!(command("PREV"), ChatCommand::Previous);
        assert_eq!(command("NEXT"), ChatCommand::Next);
        assert_eq!(command("PAUSE"), ChatCommand::Pause);
        assert_eq!(command("PLAY"), ChatCommand::Play);
        assert_eq!(
            command("APPEND /media/some file.mkv"),
            ChatCommand::Append("/media/some file.mkv".to_string())
        );
    }

    #[test]
    fn names_match_exactly() {
        assert!(matches!(
            parse_line("status").unwrap(),
            ChatLine::Message { .. }
        ));
        assert!(matches!(
            parse_line("NEXTS").unwrap(),
            ChatLine::Message { .. }
        ));
        assert!(matches!(
            parse_line("PP").unwrap(),
            ChatLine::Message { .. }
        ));
    }

    #[test]
    fn aliased_command_keeps_sender() {
        assert_eq!(
            parse_line("alice: SEEK+ 1:00").unwrap(),
            ChatLine::Command {
                alias: Some("alice".to_string()),
                command: ChatCommand::SeekForward(60.0),
            }
        );
    }

    #[test]
    fn plain_text_goes_to_overlay() {
        let line = parse_line("bob:  that was great ").unwrap();
        assert_eq!(
            line,
            ChatLine::Message {
                alias: Some("bob".to_string()),
                text: "that was great".to_string(),
            }
        );
        assert_eq!(line.overlay_text().unwrap(), "bob: that was great");

        let bare = parse_line("no sender here").unwrap();
        assert_eq!(bare.overlay_text().unwrap(), "no sender here");
    }

    #[test]
    fn seek_with_colon_is_not_an_alias() {
        assert_eq!(command("SEEK 0:45"), ChatCommand::Seek(45.0));
    }

    #[test]
    fn colons_inside_text_are_not_aliases() {
        let url = parse_line("http://x.org").unwrap();
        assert_eq!(
            url,
            ChatLine::Message {
                alias: None,
                text: "http://x.org".to_string(),
            }
        );
        assert_eq!(url.overlay_text().unwrap(), "http://x.org");

        assert_eq!(
            parse_line("note:SEEK 5").unwrap(),
            ChatLine::Message {
                alias: None,
                text: "note:SEEK 5".to_string(),
            }
        );
        assert_eq!(
            parse_line("two words: NEXT").unwrap(),
            ChatLine::Message {
                alias: None,
                text: "two words: NEXT".to_string(),
            }
        );
        assert!(matches!(
            parse_line(": NEXT").unwrap(),
            ChatLine::Message { alias: None, .. }
        ));
    }

    #[test]
    fn bad_arguments_are_errors() {
        assert_eq!(
            parse_line("SEEK").unwrap_err(),
            ChatError::MissingArgument("SEEK")
        );
        assert!(matches!(
            parse_line("SEEK later").unwrap_err(),
            ChatError::InvalidTime { command: "SEEK", .. }
        ));
        assert_eq!(
            parse_line("INDEX 0").unwrap_err(),
            ChatError::InvalidIndex("0".to_string())
        );
        assert!(matches!(
            parse_line("INDEX two").unwrap_err(),
            ChatError::InvalidIndex(_)
        ));
        assert_eq!(
            parse_line("APPEND").unwrap_err(),
            ChatError::MissingArgument("APPEND")
        );
    }

    #[test]
    fn empty_line_is_empty_message() {
        assert_eq!(
            parse_line("   ").unwrap(),
            ChatLine::Message {
                alias: None,
                text: String::new(),
            }
        );
    }
}
