//! Maps protocol lines onto directory and broadcaster operations.

use std::sync::Arc;

use tracing::{debug, info};

use crate::{
    broadcast::Broadcaster,
    directory::Directory,
    error::DirectoryError,
    protocol::{Command, allowed_before_registration},
    reply,
    session::Session,
};

/// Whether the session's read loop should keep going after a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

#[derive(Clone)]
pub struct Dispatcher {
    directory: Arc<Directory>,
    broadcaster: Broadcaster,
}

impl Dispatcher {
    pub fn new(directory: Arc<Directory>, broadcaster: Broadcaster) -> Self {
        Self {
            directory,
            broadcaster,
        }
    }

    /// Handles one complete line from `session`'s client.
    ///
    /// Unregistered sessions may only use `NICK` and `QUIT`; anything else
    /// earns the registration prompt and is dropped.
    pub async fn dispatch(&self, session: &mut Session, line: &str) -> Flow {
        let Some(parsed) = Command::parse(line) else {
            return Flow::Continue;
        };

        if !session.is_registered() && !allowed_before_registration(&parsed) {
            session.reply(reply::REGISTER_PROMPT);
            return Flow::Continue;
        }

        let command = match parsed {
            Ok(command) => command,
            Err(usage) => {
                session.reply(reply::usage(usage));
                return Flow::Continue;
            }
        };

        debug!(session = %session.id(), ?command, "dispatching");
        match command {
            Command::Nick { nickname } => self.nick(session, nickname).await,
            Command::Join { channel } => self.join(session, &channel).await,
            Command::Part { channel } => self.part(session, &channel).await,
            Command::PrivMsg { channel, text } => self.privmsg(session, &channel, &text).await,
            Command::List => self.list(session).await,
            Command::Names { channel } => self.names(session, channel.as_deref()).await,
            Command::Quit => {
                session.terminate();
                return Flow::Quit;
            }
            Command::Unknown { verb } => {
                debug!(session = %session.id(), %verb, "ignoring unknown command");
            }
        }
        Flow::Continue
    }

    async fn nick(&self, session: &mut Session, nickname: String) {
        match self.directory.register_nickname(session.id(), &nickname).await {
            Ok(()) => {
                info!(session = %session.id(), %nickname, "nickname registered");
                session.reply(reply::nick_registered(&nickname));
                session.mark_registered(nickname);
            }
            Err(DirectoryError::NameTaken(_)) => session.reply(reply::NICK_TAKEN),
            Err(other) => debug!(?other, "unexpected directory error for NICK"),
        }
    }

    async fn join(&self, session: &Session, channel: &str) {
        let outcome = self.directory.join_channel(session.id(), channel).await;
        if !outcome.notify.is_empty() {
            let notice = reply::joined_notice(self.sender_name(session), channel);
            self.broadcaster.broadcast(&outcome.notify, &notice).await;
        }
        session.reply(reply::joined(channel));
    }

    async fn part(&self, session: &Session, channel: &str) {
        let changed = self.directory.leave_channel(session.id(), channel).await;
        debug!(session = %session.id(), channel, changed, "part");
        session.reply(reply::left(channel));
    }

    async fn privmsg(&self, session: &Session, channel: &str, text: &str) {
        match self.directory.message_targets(session.id(), channel).await {
            Ok(targets) => {
                let message = reply::channel_message(self.sender_name(session), channel, text);
                self.broadcaster.broadcast(&targets, &message).await;
            }
            Err(_) => session.reply(reply::not_a_member(channel)),
        }
    }

    async fn list(&self, session: &Session) {
        let channels = self.directory.list_channels().await;
        session.reply(reply::channel_list(&channels));
    }

    async fn names(&self, session: &Session, channel: Option<&str>) {
        let Some(channel) = channel else {
            let all = self.directory.names_in_all_channels().await;
            session.reply(reply::all_names(&all));
            return;
        };

        match self.directory.names_in_channel(channel).await {
            Ok(nicknames) => session.reply(reply::names(channel, &nicknames)),
            Err(_) => session.reply(reply::channel_not_found(channel)),
        }
    }

    fn sender_name<'a>(&self, session: &'a Session) -> &'a str {
        session.nickname().unwrap_or("unknown")
    }
}
