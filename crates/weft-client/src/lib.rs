//! Session-state core for a multi-connection chat client.
//!
//! The model of every open connection (channels, queries, messages, one
//! active view) lives behind a single-writer reducer; user commands and
//! protocol notifications both become [`SessionEvent`]s and flow through
//! one serialized dispatch queue.

pub mod command;
pub mod effects;
pub mod events;
pub mod model;
pub mod runtime;
pub mod update;

pub use command::{Intent, interpret};
pub use effects::{Effect, HandleOp};
pub use events::SessionEvent;
pub use model::{
    ActiveView, Channel, Connection, Message, MessageKind, Query, SessionModel, ViewContext,
    ViewKind,
};
pub use runtime::{Session, SessionSender};
pub use update::{Transition, update};
