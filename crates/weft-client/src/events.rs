//! Session events.
//!
//! Everything that changes the model flows through exactly one type. User
//! commands that mutate state and protocol notifications from connection
//! tasks are both converted to a `SessionEvent` before the reducer sees
//! them; follow-up events produced by a transition re-enter the same queue.

use weft_core::{Id, Notification};

use crate::model::ActiveView;

/// An input to the session reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// User asked to open a new server connection.
    ConnectRequest { server: String, nick: String },

    /// Open (or focus) the query for `peer` on `connection`.
    OpenQuery { connection: Id, peer: String },

    /// Close the query for `peer` locally. No network traffic.
    CloseQuery { connection: Id, peer: String },

    /// Point the active view somewhere else and mark its messages read.
    SetActiveView { view: ActiveView },

    /// Drop a connection from the model (its disconnect completed, or it
    /// is being force-removed).
    RemoveConnection { connection: Id },

    /// Disconnect every connection.
    QuitRequest,

    /// A protocol notification arrived from a connection task.
    Notified {
        connection: Id,
        notification: Notification,
    },
}
