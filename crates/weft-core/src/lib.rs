//! Core weft library (identifiers, configuration, connection boundary).

pub mod config;
pub mod connection;
pub mod id;

pub use connection::{
    ConnectionFactory, ConnectionHandle, LoopbackFactory, Notification, NotifySender, WhoisReply,
};
pub use id::{Id, IdAlloc};
