use thiserror::Error;

/// Failures reported by [`crate::directory::Directory`] operations.
///
/// These are user-facing state errors: the dispatcher turns each one into a
/// text reply and the session keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DirectoryError {
    #[error("nickname '{0}' is already taken")]
    NameTaken(String),

    #[error("channel '{0}' not found")]
    ChannelNotFound(String),

    #[error("not a member of channel '{0}'")]
    NotMember(String),
}

/// A command arrived without the arguments it needs.
///
/// The `Display` output is the usage reply sent back to the client, minus the
/// line terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("Usage: NICK <nickname>")]
    Nick,

    #[error("Usage: JOIN <channel>")]
    Join,

    #[error("Usage: PART <channel>")]
    Part,

    #[error("Usage: PRIVMSG <channel> <message>")]
    PrivMsg,
}

/// Errors that end a single session's read loop.
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("partial line exceeded {limit} bytes without a newline")]
    LineTooLong { limit: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
