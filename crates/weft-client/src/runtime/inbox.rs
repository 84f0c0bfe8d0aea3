//! Inbox channel types.
//!
//! Frontends and completion callbacks send [`SessionInput`]s here; the
//! session drains them one at a time on its own task.

use tokio::sync::mpsc;

use crate::events::SessionEvent;

/// One unit of work for the session.
#[derive(Debug)]
pub enum SessionInput {
    /// A raw line from the presentation layer, not yet interpreted.
    Line(String),
    /// A pre-formed session event (disconnect completions and the like).
    Event(SessionEvent),
}

pub type InputSender = mpsc::UnboundedSender<SessionInput>;
pub type InputReceiver = mpsc::UnboundedReceiver<SessionInput>;
