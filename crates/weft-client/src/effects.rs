//! Effects returned by the reducer for the runtime to execute.
//!
//! Effects are the reducer's only channel to the outside world: opening,
//! invoking, and releasing connection handles. The reducer itself never
//! touches a handle, so transitions stay synchronous and pure; the runtime
//! executes effects only after the transition's model update is published.

use weft_core::Id;

/// An operation on one connection handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandleOp {
    /// Join one or more channels; the spec string is passed through verbatim.
    Join { spec: String },
    /// Leave a channel, with an optional reason.
    Part {
        target: String,
        reason: Option<String>,
    },
    /// Send text to a channel or nick.
    Say { target: String, text: String },
    /// Look someone up.
    Whois { nick: String },
    /// Close the connection. Completion re-enters the queue as a
    /// connection-removal event.
    Disconnect { message: Option<String> },
}

/// Effects executed by the runtime after a transition completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a handle via the factory and register it under `connection`.
    Open {
        connection: Id,
        server: String,
        nick: String,
    },
    /// Invoke an operation on a registered handle.
    Invoke { connection: Id, op: HandleOp },
    /// Drop the handle owned by a removed connection.
    Release { connection: Id },
}
