//! Parsing of client command lines.
//!
//! A line is split on whitespace into a verb and its arguments. Verbs are
//! matched case-insensitively; arguments are kept as given.

use crate::error::UsageError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Nick { nickname: String },
    Join { channel: String },
    Part { channel: String },
    PrivMsg { channel: String, text: String },
    List,
    Names { channel: Option<String> },
    Quit,
    Unknown { verb: String },
}

/// What a line turned into: a command, or a known verb with missing
/// arguments.
pub type Parsed = Result<Command, UsageError>;

impl Command {
    /// Parses one line. Returns `None` for a blank line.
    ///
    /// `PRIVMSG` text is every token after the channel rejoined with single
    /// spaces, so runs of whitespace inside a message collapse to one space.
    pub fn parse(line: &str) -> Option<Parsed> {
        let mut tokens = line.split_whitespace();
        let verb = tokens.next()?;
        let args: Vec<&str> = tokens.collect();

        let parsed = match verb.to_ascii_uppercase().as_str() {
            "NICK" => first(&args)
                .map(|nickname| Command::Nick { nickname })
                .ok_or(UsageError::Nick),
            "JOIN" => first(&args)
                .map(|channel| Command::Join { channel })
                .ok_or(UsageError::Join),
            "PART" => first(&args)
                .map(|channel| Command::Part { channel })
                .ok_or(UsageError::Part),
            "PRIVMSG" => match args.as_slice() {
                [channel, text @ ..] if !text.is_empty() => Ok(Command::PrivMsg {
                    channel: channel.to_string(),
                    text: text.join(" "),
                }),
                _ => Err(UsageError::PrivMsg),
            },
            "LIST" => Ok(Command::List),
            "NAMES" => Ok(Command::Names {
                channel: first(&args),
            }),
            "QUIT" => Ok(Command::Quit),
            _ => Ok(Command::Unknown {
                verb: verb.to_string(),
            }),
        };
        Some(parsed)
    }
}

/// Whether an unregistered session may issue this line.
pub fn allowed_before_registration(parsed: &Parsed) -> bool {
    matches!(
        parsed,
        Ok(Command::Nick { .. }) | Ok(Command::Quit) | Err(UsageError::Nick)
    )
}

fn first(args: &[&str]) -> Option<String> {
    args.first().map(|arg| arg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(line: &str) -> Parsed {
        Command::parse(line).expect("line should not be blank")
    }

    #[test]
    fn blank_lines_parse_to_nothing() {
        assert_eq!(Command::parse(""), None);
        assert_eq!(Command::parse("  \t \r"), None);
    }

    #[test]
    fn verbs_are_case_insensitive() {
        assert_eq!(parse("nick alice"), Ok(Command::Nick { nickname: "alice".into() }));
        assert_eq!(parse("Join #t"), Ok(Command::Join { channel: "#t".into() }));
        assert_eq!(parse("quit"), Ok(Command::Quit));
    }

    #[test]
    fn arguments_keep_their_case() {
        assert_eq!(parse("JOIN #Rust"), Ok(Command::Join { channel: "#Rust".into() }));
    }

    #[test]
    fn trailing_carriage_return_is_whitespace() {
        assert_eq!(parse("NICK bob\r"), Ok(Command::Nick { nickname: "bob".into() }));
        assert_eq!(parse("LIST\r"), Ok(Command::List));
    }

    #[test]
    fn missing_arguments_are_usage_errors() {
        assert_eq!(parse("NICK"), Err(UsageError::Nick));
        assert_eq!(parse("JOIN"), Err(UsageError::Join));
        assert_eq!(parse("PART"), Err(UsageError::Part));
        assert_eq!(parse("PRIVMSG"), Err(UsageError::PrivMsg));
        assert_eq!(parse("PRIVMSG #t"), Err(UsageError::PrivMsg));
    }

    #[test]
    fn usage_errors_render_as_replies() {
        assert_eq!(UsageError::Join.to_string(), "Usage: JOIN <channel>");
        assert_eq!(
            UsageError::PrivMsg.to_string(),
            "Usage: PRIVMSG <channel> <message>"
        );
    }

    #[test]
    fn privmsg_text_collapses_whitespace() {
        assert_eq!(
            parse("PRIVMSG #t hello    wide \t world"),
            Ok(Command::PrivMsg {
                channel: "#t".into(),
                text: "hello wide world".into()
            })
        );
    }

    #[test]
    fn names_channel_is_optional() {
        assert_eq!(parse("NAMES"), Ok(Command::Names { channel: None }));
        assert_eq!(
            parse("NAMES #t"),
            Ok(Command::Names {
                channel: Some("#t".into())
            })
        );
    }

    #[test]
    fn unknown_verbs_are_preserved() {
        assert_eq!(parse("PING x"), Ok(Command::Unknown { verb: "PING".into() }));
    }

    #[test]
    fn only_nick_and_quit_pass_the_registration_gate() {
        assert!(allowed_before_registration(&parse("NICK alice")));
        assert!(allowed_before_registration(&parse("NICK")));
        assert!(allowed_before_registration(&parse("QUIT")));

        assert!(!allowed_before_registration(&parse("JOIN #t")));
        assert!(!allowed_before_registration(&parse("JOIN")));
        assert!(!allowed_before_registration(&parse("LIST")));
        assert!(!allowed_before_registration(&parse("HELLO")));
    }
}
