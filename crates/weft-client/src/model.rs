//! Session model.
//!
//! ## State Hierarchy
//!
//! ```text
//! SessionModel
//! ├── connections: Vec<Connection>
//! │   ├── channels: Vec<Channel>   (joined group conversations)
//! │   ├── queries: Vec<Query>      (private threads, keyed by peer nick)
//! │   └── messages: Vec<Message>   (server-level text)
//! └── active: ActiveView           (the one container being displayed)
//! ```
//!
//! The model is owned exclusively by the session runtime; everything else
//! reads snapshots. All mutation goes through the reducer in [`crate::update`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use weft_core::{Id, IdAlloc};

/// Whether `name` carries the channel-name sigil.
pub fn is_channel_name(name: &str) -> bool {
    name.starts_with('#')
}

/// What a message records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    /// Ordinary text from another user.
    Normal,
    /// Text we sent ourselves.
    #[serde(rename = "self")]
    Own,
    /// Server-level text (MOTD and friends).
    Server,
    Join,
    Part,
    Quit,
    Kick,
    /// A nick change.
    Nick,
    /// A topic change.
    Topic,
    /// A whois result line.
    Whois,
}

/// An immutable, append-only record attached to exactly one container.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: Id,
    pub kind: MessageKind,
    pub text: String,
    pub time: DateTime<Utc>,
    /// Originating user; `None` for system messages.
    pub user: Option<String>,
    /// True iff the containing view was active when this arrived, or an
    /// active-view switch has covered the container since.
    pub read: bool,
}

impl Message {
    pub fn new(
        id: Id,
        kind: MessageKind,
        text: impl Into<String>,
        user: Option<String>,
        read: bool,
    ) -> Self {
        Self {
            id,
            kind,
            text: text.into(),
            time: Utc::now(),
            user,
            read,
        }
    }
}

/// A joined group conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: Id,
    pub name: String,
    pub topic: String,
    /// Member nicks. Set semantics: no duplicates, order insignificant.
    pub members: Vec<String>,
    pub messages: Vec<Message>,
}

impl Channel {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            topic: String::new(),
            members: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn has_member(&self, nick: &str) -> bool {
        self.members.iter().any(|m| m == nick)
    }

    /// Adds `nick` if absent. Returns whether the set changed.
    pub fn add_member(&mut self, nick: &str) -> bool {
        if self.has_member(nick) {
            return false;
        }
        self.members.push(nick.to_string());
        true
    }

    /// Removes `nick` if present. Returns whether the set changed.
    pub fn remove_member(&mut self, nick: &str) -> bool {
        let before = self.members.len();
        self.members.retain(|m| m != nick);
        self.members.len() != before
    }
}

/// A private one-to-one conversation, keyed by peer nick.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    pub id: Id,
    /// Peer nick. At most one query per peer per connection.
    pub name: String,
    pub messages: Vec<Message>,
}

impl Query {
    pub fn new(id: Id, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            messages: Vec::new(),
        }
    }
}

/// One server session and everything it owns.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    pub id: Id,
    /// Display name (the server address).
    pub name: String,
    /// Our current nick on this server.
    pub nick: String,
    /// False until registration is confirmed.
    pub connected: bool,
    pub channels: Vec<Channel>,
    pub queries: Vec<Query>,
    /// Server-level messages (MOTD, whois results, errors).
    pub messages: Vec<Message>,
}

impl Connection {
    pub fn new(id: Id, server: impl Into<String>, nick: impl Into<String>) -> Self {
        Self {
            id,
            name: server.into(),
            nick: nick.into(),
            connected: false,
            channels: Vec::new(),
            queries: Vec::new(),
            messages: Vec::new(),
        }
    }

    pub fn channel_by_name(&self, name: &str) -> Option<&Channel> {
        self.channels.iter().find(|c| c.name == name)
    }

    pub fn channel_by_name_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.iter_mut().find(|c| c.name == name)
    }

    pub fn query_by_name(&self, peer: &str) -> Option<&Query> {
        self.queries.iter().find(|q| q.name == peer)
    }

    pub fn query_by_name_mut(&mut self, peer: &str) -> Option<&mut Query> {
        self.queries.iter_mut().find(|q| q.name == peer)
    }
}

/// The single pointer into the model the presentation layer displays.
///
/// If a variant other than `None` is held, the referenced container exists;
/// the reducer retargets the view whenever its target is destroyed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActiveView {
    None,
    Connection { connection: Id },
    Channel { connection: Id, channel: Id },
    Query { connection: Id, query: Id },
}

impl ActiveView {
    /// The connection this view lives on, if any.
    pub fn connection(&self) -> Option<Id> {
        match *self {
            ActiveView::None => None,
            ActiveView::Connection { connection }
            | ActiveView::Channel { connection, .. }
            | ActiveView::Query { connection, .. } => Some(connection),
        }
    }
}

/// Kind tag of a [`ViewContext`], mirroring [`ActiveView`] without ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    None,
    Connection,
    Channel,
    Query,
}

/// Snapshot projection of the active view for the command interpreter and
/// frontends: which connection it lives on and the name text is sent to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewContext {
    pub connection: Option<Id>,
    pub kind: ViewKind,
    /// Resolved say/part target: server name, channel name, or peer nick.
    pub target: Option<String>,
}

impl ViewContext {
    pub fn empty() -> Self {
        Self {
            connection: None,
            kind: ViewKind::None,
            target: None,
        }
    }
}

/// The whole client session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionModel {
    alloc: IdAlloc,
    pub connections: Vec<Connection>,
    pub active: ActiveView,
}

impl Default for SessionModel {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionModel {
    pub fn new() -> Self {
        Self {
            alloc: IdAlloc::new(),
            connections: Vec::new(),
            active: ActiveView::None,
        }
    }

    /// Issues a fresh id from the session-wide allocator.
    pub fn next_id(&mut self) -> Id {
        self.alloc.next_id()
    }

    pub fn connection(&self, id: Id) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn connection_mut(&mut self, id: Id) -> Option<&mut Connection> {
        self.connections.iter_mut().find(|c| c.id == id)
    }

    pub(crate) fn connection_index(&self, id: Id) -> Option<usize> {
        self.connections.iter().position(|c| c.id == id)
    }

    /// Whether `view` currently points at something that exists.
    pub fn view_exists(&self, view: ActiveView) -> bool {
        match view {
            ActiveView::None => true,
            ActiveView::Connection { connection } => self.connection(connection).is_some(),
            ActiveView::Channel {
                connection,
                channel,
            } => self
                .connection(connection)
                .is_some_and(|c| c.channels.iter().any(|ch| ch.id == channel)),
            ActiveView::Query { connection, query } => self
                .connection(connection)
                .is_some_and(|c| c.queries.iter().any(|q| q.id == query)),
        }
    }

    /// Marks every message in the container `view` points at as read.
    ///
    /// The only caller is the active-view-switch transition; nothing else
    /// flips read flags from false to true.
    pub(crate) fn mark_view_read(&mut self, view: ActiveView) {
        let messages = match view {
            ActiveView::None => return,
            ActiveView::Connection { connection } => {
                self.connection_mut(connection).map(|c| &mut c.messages)
            }
            ActiveView::Channel {
                connection,
                channel,
            } => self
                .connection_mut(connection)
                .and_then(|c| c.channels.iter_mut().find(|ch| ch.id == channel))
                .map(|ch| &mut ch.messages),
            ActiveView::Query { connection, query } => self
                .connection_mut(connection)
                .and_then(|c| c.queries.iter_mut().find(|q| q.id == query))
                .map(|q| &mut q.messages),
        };
        if let Some(messages) = messages {
            for message in messages {
                message.read = true;
            }
        }
    }

    /// Resolves the active view into the projection the interpreter needs.
    pub fn view_context(&self) -> ViewContext {
        match self.active {
            ActiveView::None => ViewContext::empty(),
            ActiveView::Connection { connection } => ViewContext {
                connection: Some(connection),
                kind: ViewKind::Connection,
                target: self.connection(connection).map(|c| c.name.clone()),
            },
            ActiveView::Channel {
                connection,
                channel,
            } => ViewContext {
                connection: Some(connection),
                kind: ViewKind::Channel,
                target: self
                    .connection(connection)
                    .and_then(|c| c.channels.iter().find(|ch| ch.id == channel))
                    .map(|ch| ch.name.clone()),
            },
            ActiveView::Query { connection, query } => ViewContext {
                connection: Some(connection),
                kind: ViewKind::Query,
                target: self
                    .connection(connection)
                    .and_then(|c| c.queries.iter().find(|q| q.id == query))
                    .map(|q| q.name.clone()),
            },
        }
    }
}
