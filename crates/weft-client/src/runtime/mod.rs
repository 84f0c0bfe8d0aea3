//! Session runtime — owns the model, drains the dispatch queue, executes
//! effects.
//!
//! This is the single-writer boundary: notifications arrive concurrently
//! from connection tasks, but every one of them becomes an event in one
//! queue and is applied to the model by this runtime alone. A transition's
//! follow-up events are pushed onto the local queue before anything that
//! arrives later, so the ordering guarantee holds: the model update a
//! transition makes is visible before its follow-ups run, and its follow-ups
//! run before any newer external input.
//!
//! ## Structure
//!
//! - `mod.rs`: the [`Session`] (queue drain, effect execution, handle registry)
//! - `inbox.rs`: inbox channel types

mod inbox;

use std::collections::{HashMap, VecDeque};

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};
use weft_core::connection::NotifyReceiver;
use weft_core::{ConnectionFactory, ConnectionHandle, Id, Notification, NotifySender};

pub use inbox::{InputReceiver, InputSender, SessionInput};

use crate::command::{Intent, interpret};
use crate::effects::{Effect, HandleOp};
use crate::events::SessionEvent;
use crate::model::SessionModel;
use crate::update::update;

/// Cloneable submission side of a session, handed to frontends.
#[derive(Debug, Clone)]
pub struct SessionSender {
    tx: InputSender,
}

impl SessionSender {
    /// Submits one line of user input.
    pub fn submit_text(&self, line: impl Into<String>) {
        let _ = self.tx.send(SessionInput::Line(line.into()));
    }

    /// Submits a pre-formed event.
    pub fn send_event(&self, event: SessionEvent) {
        let _ = self.tx.send(SessionInput::Event(event));
    }
}

/// The session: model, dispatch queue, and connection handles.
pub struct Session {
    model: SessionModel,
    factory: Box<dyn ConnectionFactory>,
    handles: HashMap<Id, Box<dyn ConnectionHandle>>,
    /// Pending events; follow-ups land here ahead of newer external input.
    queue: VecDeque<SessionEvent>,
    input_tx: InputSender,
    input_rx: InputReceiver,
    notify_tx: NotifySender,
    notify_rx: NotifyReceiver,
    cancel: CancellationToken,
    /// Channels to join per connection once its registration confirms.
    pending_autojoin: HashMap<Id, Vec<String>>,
    /// Staging slot pairing a connect call with the open effect it causes.
    autojoin_staging: Option<Vec<String>>,
    /// Set once a quit request goes through; the run loop exits when the
    /// last connection is gone.
    quitting: bool,
}

impl Session {
    pub fn new(factory: Box<dyn ConnectionFactory>) -> Self {
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let (notify_tx, notify_rx) = mpsc::unbounded_channel();
        Self {
            model: SessionModel::new(),
            factory,
            handles: HashMap::new(),
            queue: VecDeque::new(),
            input_tx,
            input_rx,
            notify_tx,
            notify_rx,
            cancel: CancellationToken::new(),
            pending_autojoin: HashMap::new(),
            autojoin_staging: None,
            quitting: false,
        }
    }

    /// Read-only view of the model for rendering.
    pub fn model(&self) -> &SessionModel {
        &self.model
    }

    /// Submission handle for frontends.
    pub fn sender(&self) -> SessionSender {
        SessionSender {
            tx: self.input_tx.clone(),
        }
    }

    /// Token that stops [`Session::run`] when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Interprets one line of input against the current view and acts on it.
    pub fn submit_text(&mut self, line: &str) {
        match interpret(line, &self.model.view_context()) {
            Intent::Event(event) => self.dispatch(event),
            Intent::Invoke { connection, op } => self.invoke(connection, op),
            Intent::Nothing => {}
        }
    }

    /// Issues a connect request, as if the user typed `/connect`.
    pub fn connect(&mut self, server: &str, nick: &str) {
        self.connect_with_autojoin(server, nick, Vec::new());
    }

    /// Connects and joins `channels` once registration confirms.
    pub fn connect_with_autojoin(&mut self, server: &str, nick: &str, channels: Vec<String>) {
        self.autojoin_staging = Some(channels);
        self.dispatch(SessionEvent::ConnectRequest {
            server: server.to_string(),
            nick: nick.to_string(),
        });
        self.autojoin_staging = None;
    }

    /// Applies `event` and everything that follows from it.
    pub fn dispatch(&mut self, event: SessionEvent) {
        if matches!(event, SessionEvent::QuitRequest) {
            self.quitting = true;
        }
        self.queue.push_back(event);
        self.drain_queue();
    }

    fn drain_queue(&mut self) {
        while let Some(event) = self.queue.pop_front() {
            let transition = update(&mut self.model, event);
            // Effects run once the transition's model update is in place;
            // follow-ups queue behind whatever is already pending.
            for effect in transition.effects {
                self.execute_effect(effect);
            }
            self.queue.extend(transition.followups);
        }
        self.flush_autojoin();
    }

    /// Joins staged channels for any connection whose registration has
    /// confirmed since the last drain.
    fn flush_autojoin(&mut self) {
        let ready: Vec<Id> = self
            .pending_autojoin
            .keys()
            .copied()
            .filter(|id| self.model.connection(*id).is_some_and(|c| c.connected))
            .collect();
        for connection in ready {
            if let Some(channels) = self.pending_autojoin.remove(&connection)
                && !channels.is_empty()
            {
                self.invoke(
                    connection,
                    HandleOp::Join {
                        spec: channels.join(","),
                    },
                );
            }
        }
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::Open {
                connection,
                server,
                nick,
            } => match self
                .factory
                .open(connection, &server, &nick, self.notify_tx.clone())
            {
                Ok(handle) => {
                    self.handles.insert(connection, handle);
                    if let Some(channels) = self.autojoin_staging.take()
                        && !channels.is_empty()
                    {
                        self.pending_autojoin.insert(connection, channels);
                    }
                }
                Err(err) => {
                    warn!(%server, error = %err, "failed to open connection");
                    self.queue.push_back(SessionEvent::Notified {
                        connection,
                        notification: Notification::Error {
                            message: format!("connect to {server} failed: {err:#}"),
                        },
                    });
                }
            },
            Effect::Invoke { connection, op } => self.invoke(connection, op),
            Effect::Release { connection } => {
                self.handles.remove(&connection);
                self.pending_autojoin.remove(&connection);
            }
        }
    }

    /// Invokes an operation on the handle for `connection`.
    ///
    /// A missing handle aborts the invocation with a log line; the model is
    /// never touched on this path.
    fn invoke(&mut self, connection: Id, op: HandleOp) {
        let Some(handle) = self.handles.get_mut(&connection) else {
            warn!(%connection, ?op, "no handle for connection, dropping invocation");
            return;
        };
        match op {
            HandleOp::Join { spec } => handle.join(&spec),
            HandleOp::Part { target, reason } => handle.part(&target, reason.as_deref()),
            HandleOp::Say { target, text } => handle.say(&target, &text),
            HandleOp::Whois { nick } => handle.whois(&nick),
            HandleOp::Disconnect { message } => {
                let tx = self.input_tx.clone();
                handle.disconnect(
                    message.as_deref(),
                    Box::new(move || {
                        let _ = tx.send(SessionInput::Event(SessionEvent::RemoveConnection {
                            connection,
                        }));
                    }),
                );
            }
        }
    }

    /// Drains everything currently waiting without blocking.
    ///
    /// Used by tests and by callers that pump the session from their own
    /// loop instead of [`Session::run`].
    pub fn pump(&mut self) {
        loop {
            let input = match self.notify_rx.try_recv() {
                Ok((connection, notification)) => SessionInput::Event(SessionEvent::Notified {
                    connection,
                    notification,
                }),
                Err(_) => match self.input_rx.try_recv() {
                    Ok(input) => input,
                    Err(_) => return,
                },
            };
            self.process(input);
        }
    }

    fn process(&mut self, input: SessionInput) {
        match input {
            SessionInput::Line(line) => self.submit_text(&line),
            SessionInput::Event(event) => self.dispatch(event),
        }
    }

    /// Runs the session until cancelled or until a quit request has drained
    /// every connection. `on_update` runs after each processed input with
    /// the freshly published model.
    pub async fn run<F>(&mut self, mut on_update: F)
    where
        F: FnMut(&SessionModel),
    {
        loop {
            if self.quitting && self.model.connections.is_empty() {
                debug!("all connections drained after quit, stopping");
                break;
            }
            // Biased: anything already queued is processed before a
            // cancellation is honored, so input submitted just before
            // shutdown is not dropped.
            let input = tokio::select! {
                biased;
                notification = self.notify_rx.recv() => match notification {
                    Some((connection, notification)) => SessionInput::Event(SessionEvent::Notified {
                        connection,
                        notification,
                    }),
                    None => break,
                },
                input = self.input_rx.recv() => match input {
                    Some(input) => input,
                    None => break,
                },
                () = self.cancel.cancelled() => break,
            };
            self.process(input);
            on_update(&self.model);
        }
    }
}

#[cfg(test)]
mod tests {
    use weft_core::LoopbackFactory;

    use super::*;
    use crate::model::{ActiveView, MessageKind};

    fn loopback_session() -> Session {
        Session::new(Box::new(LoopbackFactory))
    }

    #[test]
    fn test_connect_registers_through_loopback() {
        let mut session = loopback_session();
        session.submit_text("/connect irc.example.org nickly");
        session.pump();

        let model = session.model();
        assert_eq!(model.connections.len(), 1);
        assert!(model.connections[0].connected);
        assert_eq!(
            model.active,
            ActiveView::Connection {
                connection: model.connections[0].id
            }
        );
        // The loopback banner arrived as server text.
        assert!(
            model.connections[0]
                .messages
                .iter()
                .any(|m| m.kind == MessageKind::Server)
        );
    }

    #[test]
    fn test_join_say_round_trip() {
        let mut session = loopback_session();
        session.submit_text("/connect irc.example.org nickly");
        session.pump();
        session.submit_text("/join #general");
        session.pump();

        {
            let model = session.model();
            let connection = model.connections[0].id;
            let channel = model.connections[0].channels[0].id;
            assert_eq!(
                model.active,
                ActiveView::Channel {
                    connection,
                    channel
                }
            );
        }

        // Bare text goes to the active channel and comes back as our own
        // message through the echo.
        session.submit_text("hello everyone");
        session.pump();
        let chan = &session.model().connections[0].channels[0];
        let last = chan.messages.last().unwrap();
        assert_eq!(last.kind, MessageKind::Own);
        assert_eq!(last.text, "hello everyone");
        assert!(last.read);
    }

    #[test]
    fn test_autojoin_runs_after_registration() {
        let mut session = loopback_session();
        session.connect_with_autojoin(
            "irc.example.org",
            "nickly",
            vec!["#general".to_string(), "#rust".to_string()],
        );
        session.pump();

        let conn = &session.model().connections[0];
        assert!(conn.connected);
        assert!(conn.channel_by_name("#general").is_some());
        assert!(conn.channel_by_name("#rust").is_some());
    }

    #[test]
    fn test_disconnect_completion_removes_connection() {
        let mut session = loopback_session();
        session.submit_text("/connect irc.example.org nickly");
        session.pump();
        session.submit_text("/disconnect good night");
        session.pump();

        assert!(session.model().connections.is_empty());
        assert_eq!(session.model().active, ActiveView::None);
    }

    #[test]
    fn test_quit_drains_every_connection() {
        let mut session = loopback_session();
        session.submit_text("/connect irc.example.org nickly");
        session.submit_text("/connect irc.other.net nickly");
        session.pump();
        assert_eq!(session.model().connections.len(), 2);

        session.submit_text("/quit");
        session.pump();
        assert!(session.model().connections.is_empty());
        assert!(session.quitting);
    }

    #[test]
    fn test_channel_created_before_view_switch_is_applied() {
        // The join transition publishes the channel, then the queued switch
        // marks it active; if the order ever flipped the switch would be a
        // no-op and the view would stay on the connection.
        let mut session = loopback_session();
        session.submit_text("/connect irc.example.org nickly");
        session.pump();
        session.submit_text("/join #ordering");
        session.pump();
        let model = session.model();
        assert!(matches!(model.active, ActiveView::Channel { .. }));
    }

    #[tokio::test]
    async fn test_run_stops_on_cancel() {
        let mut session = loopback_session();
        let cancel = session.cancel_token();
        cancel.cancel();
        session.run(|_| {}).await;
    }

    #[tokio::test]
    async fn test_run_processes_submitted_lines() {
        let mut session = loopback_session();
        let sender = session.sender();
        let cancel = session.cancel_token();

        sender.submit_text("/connect irc.example.org nickly");
        tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(50)).await;
            cancel.cancel();
        });
        session.run(|_| {}).await;

        assert_eq!(session.model().connections.len(), 1);
        assert!(session.model().connections[0].connected);
    }
}
