//! Connection-handle boundary.
//!
//! The session core never speaks the wire protocol itself. Each server
//! connection is an opaque [`ConnectionHandle`] opened through a
//! [`ConnectionFactory`]; the handle pushes [`Notification`]s into the
//! session inbox as they arrive and accepts a small set of imperative
//! operations. Notifications are emitted from whatever task the backend
//! runs on — the session runtime serializes them before they touch state.

mod loopback;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

pub use loopback::LoopbackFactory;

use crate::id::Id;

/// Channel that a connection pushes `(connection id, notification)` pairs
/// into. Cloneable; the receiving end is owned by the session runtime.
pub type NotifySender = mpsc::UnboundedSender<(Id, Notification)>;

/// Receiving side of the notification channel.
pub type NotifyReceiver = mpsc::UnboundedReceiver<(Id, Notification)>;

/// Callback invoked once a disconnect has completed at the protocol level.
pub type CompletionFn = Box<dyn FnOnce() + Send + 'static>;

/// Structured whois response fields.
///
/// Empty strings mean the server omitted the field.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WhoisReply {
    pub nick: String,
    pub user: String,
    pub host: String,
    pub realname: String,
    pub server: String,
    pub server_info: String,
    pub idle: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub channels: Vec<String>,
}

/// Protocol notifications emitted by a connection.
///
/// This is the complete vocabulary the session engine understands; anything
/// else a backend observes must be folded into one of these or dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    /// Registration with the server completed; `nick` is our confirmed nick.
    Registered { server: String, nick: String },

    /// Server-level text (MOTD and friends). May span multiple lines.
    ServerText { text: String },

    /// `nick` joined `channel` (possibly us).
    ChannelJoined { channel: String, nick: String },

    /// `nick` left `channel` (possibly us).
    ChannelLeft {
        channel: String,
        nick: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// Full membership list for a channel.
    MemberList { channel: String, nicks: Vec<String> },

    /// `nick` changed the channel topic.
    TopicChanged {
        channel: String,
        topic: String,
        nick: String,
    },

    /// `nick` quit the server entirely.
    Quit {
        nick: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
        channels: Vec<String>,
    },

    /// `nick` was kicked from `channel` by `by`.
    Kicked {
        channel: String,
        nick: String,
        by: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },

    /// `old` is now known as `new`.
    NickChanged {
        old: String,
        new: String,
        channels: Vec<String>,
    },

    /// Whois lookup result.
    Whois(WhoisReply),

    /// A message from `from` to `target` (a channel, or our nick).
    Message {
        from: String,
        target: String,
        text: String,
    },

    /// Echo of a message we sent to `target`.
    OwnMessage { target: String, text: String },

    /// Catch-all protocol error. Logged by the engine, never fatal.
    Error { message: String },
}

/// Imperative surface of one open server connection.
///
/// Operations are fire-and-forget: failures surface later as
/// [`Notification::Error`], never as return values, so the caller is never
/// blocked on the network.
pub trait ConnectionHandle: Send {
    /// Joins one or more channels; `spec` is passed through verbatim
    /// (comma or space separated names).
    fn join(&mut self, spec: &str);

    /// Leaves `target`, with an optional reason.
    fn part(&mut self, target: &str, reason: Option<&str>);

    /// Sends `text` to `target` (channel name or nick).
    fn say(&mut self, target: &str, text: &str);

    /// Requests whois information for `nick`.
    fn whois(&mut self, nick: &str);

    /// Closes the connection. `on_complete` runs once the protocol-level
    /// goodbye has finished (or immediately if there is nothing to wait for).
    fn disconnect(&mut self, message: Option<&str>, on_complete: CompletionFn);
}

/// Opens connection handles.
///
/// Opening implies connecting: the backend should begin its handshake
/// immediately and report progress through `notify`, starting with
/// [`Notification::Registered`] on success.
pub trait ConnectionFactory: Send {
    fn open(
        &mut self,
        id: Id,
        server: &str,
        nick: &str,
        notify: NotifySender,
    ) -> Result<Box<dyn ConnectionHandle>>;
}
