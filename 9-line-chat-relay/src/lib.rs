//! Line-oriented chat relay.
//!
//! Clients connect over TCP, claim a nickname with `NICK`, join channels and
//! exchange text with `PRIVMSG`. Every command is one newline-terminated line
//! of UTF-8; every reply is plain text. Each module owns one concern:
//!
//! - [`server`] binds the listener, spawns one worker per connection and runs
//!   the stop-the-world shutdown.
//! - [`connection`] is the per-connection worker: it reassembles lines with
//!   [`framing`], hands them to [`dispatch`] and writes the session's outbox.
//! - [`dispatch`] enforces the registration state machine and turns
//!   [`protocol`] commands into [`directory`] and [`broadcast`] calls, with
//!   reply texts from [`reply`].
//! - [`directory`] is the single lock-protected owner of nicknames and
//!   channel membership; [`registry`] tracks live sessions and their outboxes.
//! - [`client`] is a small terminal client for the same protocol, and [`cli`]
//!   parses the command line for both modes.

pub mod broadcast;
pub mod cli;
pub mod client;
pub mod connection;
pub mod directory;
pub mod dispatch;
pub mod error;
pub mod framing;
pub mod protocol;
pub mod registry;
pub mod reply;
pub mod server;
pub mod session;
pub mod shutdown;
