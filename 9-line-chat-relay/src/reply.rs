//! Reply texts sent to clients. Every reply ends with a newline.

use crate::{directory::ChannelSummary, error::UsageError};

pub const WELCOME: &str =
    "Welcome to the IRC server!\nPlease register your nickname with NICK <your_nickname>\n";
pub const REGISTER_PROMPT: &str = "Please set a nickname using NICK <your_nickname>.\n";
pub const NICK_TAKEN: &str = "Nickname already taken, try another one.\n";
pub const NO_CHANNELS: &str = "No active channels.\n";
pub const SHUTDOWN_NOTICE: &str = "server is shutting down. You've been disconnected.\n";

pub fn usage(error: UsageError) -> String {
    format!("{error}\n")
}

pub fn nick_registered(nickname: &str) -> String {
    format!("Nickname registered: {nickname}\n")
}

pub fn joined_notice(nickname: &str, channel: &str) -> String {
    format!("{nickname} joined channel {channel}\n")
}

pub fn joined(channel: &str) -> String {
    format!("Joined channel {channel}\n")
}

pub fn left(channel: &str) -> String {
    format!("Left channel {channel}\n")
}

pub fn not_a_member(channel: &str) -> String {
    format!("You are not in channel {channel}. Please JOIN first.\n")
}

pub fn channel_message(sender: &str, channel: &str, text: &str) -> String {
    format!("{sender} in {channel}: {text}\n")
}

/// One line per channel, or [`NO_CHANNELS`].
pub fn channel_list(channels: &[ChannelSummary]) -> String {
    if channels.is_empty() {
        return NO_CHANNELS.to_string();
    }
    channels
        .iter()
        .map(|channel| format!("Channel: {} Users: {}\n", channel.name, channel.members))
        .collect()
}

pub fn names(channel: &str, nicknames: &[String]) -> String {
    format!("Users in {channel}: {}\n", nicknames.join(", "))
}

pub fn channel_not_found(channel: &str) -> String {
    format!("Channel {channel} not found.\n")
}

pub fn all_names(channels: &[(String, Vec<String>)]) -> String {
    let mut reply = String::from("Nicknames in all channels:\n");
    for (channel, nicknames) in channels {
        reply.push_str(&format!("{channel}: {}\n", nicknames.join(", ")));
    }
    reply
}
