//! Shared registry of nicknames and channel membership.
//!
//! The [`Directory`] is the only owner of global chat state. Every operation
//! takes the same lock, so each one is atomic with respect to the others and
//! no caller ever observes a half-applied mutation.

use std::collections::{BTreeMap, HashMap};

use tokio::sync::Mutex;

use crate::{error::DirectoryError, session::SessionId};

#[derive(Default)]
pub struct Directory {
    state: Mutex<DirectoryState>,
}

#[derive(Default)]
struct DirectoryState {
    nicknames: HashMap<String, SessionId>,
    bound: HashMap<SessionId, String>,
    // BTreeMap keeps LIST and NAMES output in a stable order.
    channels: BTreeMap<String, Channel>,
}

/// Channels are created on first JOIN and are never destroyed, even once the
/// last member leaves.
#[derive(Default)]
struct Channel {
    // Join order, used for NAMES.
    members: Vec<SessionId>,
}

impl Channel {
    fn contains(&self, session: SessionId) -> bool {
        self.members.contains(&session)
    }
}

/// Result of [`Directory::join_channel`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinOutcome {
    /// Members present before the join, to receive the join notice. Empty when
    /// the session was already a member.
    pub notify: Vec<SessionId>,
    pub already_member: bool,
}

/// One row of [`Directory::list_channels`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSummary {
    pub name: String,
    pub members: usize,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds `name` to `session`.
    ///
    /// Fails if another session holds the name. A session that already had a
    /// different nickname releases it in the same step; re-registering the
    /// current nickname is a no-op success.
    pub async fn register_nickname(
        &self,
        session: SessionId,
        name: &str,
    ) -> Result<(), DirectoryError> {
        let mut state = self.state.lock().await;

        match state.nicknames.get(name) {
            Some(owner) if *owner != session => {
                return Err(DirectoryError::NameTaken(name.to_string()));
            }
            Some(_) => return Ok(()),
            None => {}
        }

        if let Some(previous) = state.bound.insert(session, name.to_string()) {
            state.nicknames.remove(&previous);
        }
        state.nicknames.insert(name.to_string(), session);
        Ok(())
    }

    /// Forgets everything the directory knows about `session`.
    ///
    /// Returns the nickname that was released, if any. Calling it again for
    /// the same session is harmless.
    pub async fn remove_session(&self, session: SessionId) -> Option<String> {
        let mut state = self.state.lock().await;

        let nickname = state.bound.remove(&session);
        if let Some(name) = &nickname {
            state.nicknames.remove(name);
        }
        for channel in state.channels.values_mut() {
            channel.members.retain(|member| *member != session);
        }
        nickname
    }

    /// Adds `session` to channel `name`, creating the channel if needed.
    pub async fn join_channel(&self, session: SessionId, name: &str) -> JoinOutcome {
        let mut state = self.state.lock().await;
        let channel = state.channels.entry(name.to_string()).or_default();

        if channel.contains(session) {
            return JoinOutcome {
                notify: Vec::new(),
                already_member: true,
            };
        }

        let notify = channel.members.clone();
        channel.members.push(session);
        JoinOutcome {
            notify,
            already_member: false,
        }
    }

    /// Removes `session` from channel `name`.
    ///
    /// Returns whether anything changed. A missing channel or a session that
    /// never joined is not an error.
    pub async fn leave_channel(&self, session: SessionId, name: &str) -> bool {
        let mut state = self.state.lock().await;
        let Some(channel) = state.channels.get_mut(name) else {
            return false;
        };

        let before = channel.members.len();
        channel.members.retain(|member| *member != session);
        channel.members.len() != before
    }

    pub async fn list_channels(&self) -> Vec<ChannelSummary> {
        let state = self.state.lock().await;
        state
            .channels
            .iter()
            .map(|(name, channel)| ChannelSummary {
                name: name.clone(),
                members: channel.members.len(),
            })
            .collect()
    }

    /// Nicknames of the members of `name`, in join order.
    pub async fn names_in_channel(&self, name: &str) -> Result<Vec<String>, DirectoryError> {
        let state = self.state.lock().await;
        let channel = state
            .channels
            .get(name)
            .ok_or_else(|| DirectoryError::ChannelNotFound(name.to_string()))?;
        Ok(state.nicknames_of(channel))
    }

    /// Nicknames for every channel, taken as one consistent snapshot.
    pub async fn names_in_all_channels(&self) -> Vec<(String, Vec<String>)> {
        let state = self.state.lock().await;
        state
            .channels
            .iter()
            .map(|(name, channel)| (name.clone(), state.nicknames_of(channel)))
            .collect()
    }

    pub async fn is_member(&self, session: SessionId, name: &str) -> bool {
        let state = self.state.lock().await;
        state.is_member(session, name)
    }

    /// Everyone in `name` except `sender`, provided `sender` is a member.
    ///
    /// The membership check and the recipient snapshot happen under one lock,
    /// so a message can't reach a channel its sender just left.
    pub async fn message_targets(
        &self,
        sender: SessionId,
        name: &str,
    ) -> Result<Vec<SessionId>, DirectoryError> {
        let state = self.state.lock().await;
        if !state.is_member(sender, name) {
            return Err(DirectoryError::NotMember(name.to_string()));
        }

        let targets = state.channels[name]
            .members
            .iter()
            .copied()
            .filter(|member| *member != sender)
            .collect();
        Ok(targets)
    }

    pub async fn nickname_of(&self, session: SessionId) -> Option<String> {
        let state = self.state.lock().await;
        state.bound.get(&session).cloned()
    }
}

impl DirectoryState {
    fn is_member(&self, session: SessionId, name: &str) -> bool {
        self.channels
            .get(name)
            .is_some_and(|channel| channel.contains(session))
    }

    fn nicknames_of(&self, channel: &Channel) -> Vec<String> {
        channel
            .members
            .iter()
            .filter_map(|member| self.bound.get(member).cloned())
            .collect()
    }
}
