//! Session reducer.
//!
//! All model mutations happen here. The runtime calls `update(model, event)`
//! and executes the returned effects; follow-up events go back on the queue
//! and are applied only after the current transition has fully completed, so
//! no observer ever sees a half-applied transition.
//!
//! Transitions are total: an event that references a connection, channel, or
//! query that is no longer present is a logged no-op, never an error. A
//! client keeps receiving notifications for containers it already dropped
//! locally, and that must not take the session down.

use tracing::{debug, warn};
use weft_core::{Id, Notification, WhoisReply};

use crate::effects::{Effect, HandleOp};
use crate::events::SessionEvent;
use crate::model::{
    ActiveView, Channel, Connection, Message, MessageKind, Query, SessionModel, is_channel_name,
};

/// The outcome of one transition: events to queue and effects to execute.
#[derive(Debug, Default)]
pub struct Transition {
    pub followups: Vec<SessionEvent>,
    pub effects: Vec<Effect>,
}

impl Transition {
    pub fn none() -> Self {
        Self::default()
    }

    fn followup(event: SessionEvent) -> Self {
        Self {
            followups: vec![event],
            ..Self::default()
        }
    }

    fn effect(effect: Effect) -> Self {
        Self {
            effects: vec![effect],
            ..Self::default()
        }
    }
}

/// Applies one event to the model.
pub fn update(model: &mut SessionModel, event: SessionEvent) -> Transition {
    match event {
        SessionEvent::ConnectRequest { server, nick } => connect_request(model, server, nick),
        SessionEvent::OpenQuery { connection, peer } => open_query(model, connection, &peer),
        SessionEvent::CloseQuery { connection, peer } => close_query(model, connection, &peer),
        SessionEvent::SetActiveView { view } => set_active_view(model, view),
        SessionEvent::RemoveConnection { connection } => remove_connection(model, connection),
        SessionEvent::QuitRequest => quit_request(model),
        SessionEvent::Notified {
            connection,
            notification,
        } => apply_notification(model, connection, notification),
    }
}

fn is_active(model: &SessionModel, view: ActiveView) -> bool {
    model.active == view
}

// ============================================================================
// Command-side transitions
// ============================================================================

fn connect_request(model: &mut SessionModel, server: String, nick: String) -> Transition {
    let id = model.next_id();
    model
        .connections
        .push(Connection::new(id, server.clone(), nick.clone()));
    Transition::effect(Effect::Open {
        connection: id,
        server,
        nick,
    })
}

fn open_query(model: &mut SessionModel, connection: Id, peer: &str) -> Transition {
    let Some(ci) = model.connection_index(connection) else {
        debug!(%connection, "open query for unknown connection, ignoring");
        return Transition::none();
    };
    let query = match model.connections[ci].query_by_name(peer) {
        Some(existing) => existing.id,
        None => {
            let id = model.next_id();
            model.connections[ci].queries.push(Query::new(id, peer));
            id
        }
    };
    Transition::followup(SessionEvent::SetActiveView {
        view: ActiveView::Query { connection, query },
    })
}

fn close_query(model: &mut SessionModel, connection: Id, peer: &str) -> Transition {
    let Some(ci) = model.connection_index(connection) else {
        debug!(%connection, "close query for unknown connection, ignoring");
        return Transition::none();
    };
    let Some(query) = model.connections[ci].query_by_name(peer).map(|q| q.id) else {
        debug!(peer, "close for unknown query, ignoring");
        return Transition::none();
    };
    let was_active = is_active(model, ActiveView::Query { connection, query });
    model.connections[ci].queries.retain(|q| q.id != query);
    if was_active {
        // The removed query was on screen; fall back to its connection.
        Transition::followup(SessionEvent::SetActiveView {
            view: ActiveView::Connection { connection },
        })
    } else {
        Transition::none()
    }
}

fn set_active_view(model: &mut SessionModel, view: ActiveView) -> Transition {
    if !model.view_exists(view) {
        debug!(?view, "view switch to missing target, ignoring");
        return Transition::none();
    }
    model.active = view;
    model.mark_view_read(view);
    Transition::none()
}

fn remove_connection(model: &mut SessionModel, connection: Id) -> Transition {
    let Some(ci) = model.connection_index(connection) else {
        debug!(%connection, "removal of unknown connection, ignoring");
        return Transition::none();
    };
    let was_active = model.active.connection() == Some(connection);
    model.connections.remove(ci);

    let mut transition = Transition::effect(Effect::Release { connection });
    if was_active {
        let view = model.connections.first().map_or(ActiveView::None, |c| {
            ActiveView::Connection { connection: c.id }
        });
        transition
            .followups
            .push(SessionEvent::SetActiveView { view });
    }
    transition
}

fn quit_request(model: &mut SessionModel) -> Transition {
    let mut transition = Transition::none();
    for conn in &model.connections {
        transition.effects.push(Effect::Invoke {
            connection: conn.id,
            op: HandleOp::Disconnect { message: None },
        });
    }
    transition
}

// ============================================================================
// Notification transitions
// ============================================================================

fn apply_notification(
    model: &mut SessionModel,
    connection: Id,
    notification: Notification,
) -> Transition {
    let Some(ci) = model.connection_index(connection) else {
        debug!(%connection, ?notification, "notification for unknown connection, ignoring");
        return Transition::none();
    };
    match notification {
        Notification::Registered { server, nick } => registered(model, ci, server, nick),
        Notification::ServerText { text } => server_text(model, ci, &text),
        Notification::ChannelJoined { channel, nick } => channel_joined(model, ci, &channel, nick),
        Notification::ChannelLeft {
            channel,
            nick,
            reason,
        } => channel_left(model, ci, &channel, &nick, reason),
        Notification::MemberList { channel, nicks } => member_list(model, ci, &channel, nicks),
        Notification::TopicChanged {
            channel,
            topic,
            nick,
        } => topic_changed(model, ci, &channel, topic, &nick),
        Notification::Quit {
            nick,
            reason,
            channels: _,
        } => quit(model, ci, &nick, reason),
        Notification::Kicked {
            channel,
            nick,
            by,
            reason,
        } => kicked(model, ci, &channel, &nick, &by, reason),
        Notification::NickChanged {
            old,
            new,
            channels: _,
        } => nick_changed(model, ci, &old, &new),
        Notification::Whois(reply) => whois_result(model, ci, &reply),
        Notification::Message { from, target, text } => message(model, ci, from, &target, text),
        Notification::OwnMessage { target, text } => own_message(model, ci, &target, text),
        Notification::Error { message } => {
            warn!(%connection, error = %message, "protocol error");
            Transition::none()
        }
    }
}

fn registered(model: &mut SessionModel, ci: usize, server: String, nick: String) -> Transition {
    let connection = model.connections[ci].id;
    let conn = &mut model.connections[ci];
    conn.connected = true;
    conn.name = server;
    conn.nick = nick;
    // A successful handshake always takes over the view. Queued, not applied
    // inline, so read flags flip in exactly one transition.
    Transition::followup(SessionEvent::SetActiveView {
        view: ActiveView::Connection { connection },
    })
}

fn server_text(model: &mut SessionModel, ci: usize, text: &str) -> Transition {
    let connection = model.connections[ci].id;
    let read = is_active(model, ActiveView::Connection { connection });
    for line in text.lines() {
        let id = model.next_id();
        model.connections[ci].messages.push(Message::new(
            id,
            MessageKind::Server,
            line,
            None,
            read,
        ));
    }
    Transition::none()
}

fn channel_joined(model: &mut SessionModel, ci: usize, channel: &str, nick: String) -> Transition {
    let connection = model.connections[ci].id;
    match model.connections[ci].channel_by_name(channel).map(|c| c.id) {
        None => {
            // First join is always ours: create the channel and open it.
            let id = model.next_id();
            let mut chan = Channel::new(id, channel);
            chan.members.push(nick);
            model.connections[ci].channels.push(chan);
            Transition::followup(SessionEvent::SetActiveView {
                view: ActiveView::Channel {
                    connection,
                    channel: id,
                },
            })
        }
        Some(chan_id) => {
            // Someone else joined a channel we are already in.
            let msg_id = model.next_id();
            let read = is_active(
                model,
                ActiveView::Channel {
                    connection,
                    channel: chan_id,
                },
            );
            if let Some(chan) = model.connections[ci].channel_by_name_mut(channel) {
                chan.add_member(&nick);
                let text = format!("{nick} joined {channel}");
                chan.messages
                    .push(Message::new(msg_id, MessageKind::Join, text, Some(nick), read));
            }
            Transition::none()
        }
    }
}

fn channel_left(
    model: &mut SessionModel,
    ci: usize,
    channel: &str,
    nick: &str,
    reason: Option<String>,
) -> Transition {
    let connection = model.connections[ci].id;
    let Some(chan_id) = model.connections[ci].channel_by_name(channel).map(|c| c.id) else {
        debug!(channel, "part for unknown channel, ignoring");
        return Transition::none();
    };

    if model.connections[ci].nick == nick {
        // We left: the channel is gone.
        let was_active = is_active(
            model,
            ActiveView::Channel {
                connection,
                channel: chan_id,
            },
        );
        model.connections[ci].channels.retain(|c| c.id != chan_id);
        if was_active {
            return Transition::followup(SessionEvent::SetActiveView {
                view: ActiveView::Connection { connection },
            });
        }
        return Transition::none();
    }

    // Someone else left: membership change plus a part notice.
    let msg_id = model.next_id();
    let read = is_active(
        model,
        ActiveView::Channel {
            connection,
            channel: chan_id,
        },
    );
    if let Some(chan) = model.connections[ci].channel_by_name_mut(channel) {
        chan.remove_member(nick);
        let text = match &reason {
            Some(reason) => format!("{nick} left ({reason})"),
            None => format!("{nick} left"),
        };
        chan.messages.push(Message::new(
            msg_id,
            MessageKind::Part,
            text,
            Some(nick.to_string()),
            read,
        ));
    }
    Transition::none()
}

fn member_list(model: &mut SessionModel, ci: usize, channel: &str, nicks: Vec<String>) -> Transition {
    let Some(chan) = model.connections[ci].channel_by_name_mut(channel) else {
        debug!(channel, "member list for unknown channel, ignoring");
        return Transition::none();
    };
    for nick in nicks {
        chan.add_member(&nick);
    }
    Transition::none()
}

fn topic_changed(
    model: &mut SessionModel,
    ci: usize,
    channel: &str,
    topic: String,
    nick: &str,
) -> Transition {
    let connection = model.connections[ci].id;
    let Some(chan_id) = model.connections[ci].channel_by_name(channel).map(|c| c.id) else {
        debug!(channel, "topic for unknown channel, ignoring");
        return Transition::none();
    };
    let msg_id = model.next_id();
    let read = is_active(
        model,
        ActiveView::Channel {
            connection,
            channel: chan_id,
        },
    );
    if let Some(chan) = model.connections[ci].channel_by_name_mut(channel) {
        let text = format!("{nick} set the topic to: {topic}");
        chan.topic = topic;
        chan.messages.push(Message::new(
            msg_id,
            MessageKind::Topic,
            text,
            Some(nick.to_string()),
            read,
        ));
    }
    Transition::none()
}

fn quit(model: &mut SessionModel, ci: usize, nick: &str, reason: Option<String>) -> Transition {
    let connection = model.connections[ci].id;
    let affected: Vec<Id> = model.connections[ci]
        .channels
        .iter()
        .filter(|c| c.has_member(nick))
        .map(|c| c.id)
        .collect();
    let text = match &reason {
        Some(reason) => format!("{nick} quit ({reason})"),
        None => format!("{nick} quit"),
    };
    for chan_id in affected {
        let msg_id = model.next_id();
        let read = is_active(
            model,
            ActiveView::Channel {
                connection,
                channel: chan_id,
            },
        );
        if let Some(chan) = model.connections[ci]
            .channels
            .iter_mut()
            .find(|c| c.id == chan_id)
        {
            chan.remove_member(nick);
            chan.messages.push(Message::new(
                msg_id,
                MessageKind::Quit,
                text.clone(),
                Some(nick.to_string()),
                read,
            ));
        }
    }
    Transition::none()
}

fn kicked(
    model: &mut SessionModel,
    ci: usize,
    channel: &str,
    nick: &str,
    by: &str,
    reason: Option<String>,
) -> Transition {
    let connection = model.connections[ci].id;
    let Some(chan_id) = model.connections[ci].channel_by_name(channel).map(|c| c.id) else {
        debug!(channel, "kick for unknown channel, ignoring");
        return Transition::none();
    };

    if model.connections[ci].nick == nick {
        // We were kicked: same flow as our own part.
        let was_active = is_active(
            model,
            ActiveView::Channel {
                connection,
                channel: chan_id,
            },
        );
        model.connections[ci].channels.retain(|c| c.id != chan_id);
        if was_active {
            return Transition::followup(SessionEvent::SetActiveView {
                view: ActiveView::Connection { connection },
            });
        }
        return Transition::none();
    }

    let msg_id = model.next_id();
    let read = is_active(
        model,
        ActiveView::Channel {
            connection,
            channel: chan_id,
        },
    );
    if let Some(chan) = model.connections[ci].channel_by_name_mut(channel) {
        chan.remove_member(nick);
        let text = match &reason {
            Some(reason) => format!("{nick} was kicked by {by} ({reason})"),
            None => format!("{nick} was kicked by {by}"),
        };
        chan.messages.push(Message::new(
            msg_id,
            MessageKind::Kick,
            text,
            Some(by.to_string()),
            read,
        ));
    }
    Transition::none()
}

fn nick_changed(model: &mut SessionModel, ci: usize, old: &str, new: &str) -> Transition {
    let connection = model.connections[ci].id;
    if model.connections[ci].nick == old {
        model.connections[ci].nick = new.to_string();
    }

    let text = format!("{old} is now known as {new}");

    let affected: Vec<Id> = model.connections[ci]
        .channels
        .iter()
        .filter(|c| c.has_member(old))
        .map(|c| c.id)
        .collect();
    for chan_id in affected {
        let msg_id = model.next_id();
        let read = is_active(
            model,
            ActiveView::Channel {
                connection,
                channel: chan_id,
            },
        );
        if let Some(chan) = model.connections[ci]
            .channels
            .iter_mut()
            .find(|c| c.id == chan_id)
        {
            chan.remove_member(old);
            chan.add_member(new);
            chan.messages.push(Message::new(
                msg_id,
                MessageKind::Nick,
                text.clone(),
                Some(new.to_string()),
                read,
            ));
        }
    }

    let renamed: Vec<Id> = model.connections[ci]
        .queries
        .iter()
        .filter(|q| q.name == old)
        .map(|q| q.id)
        .collect();
    for query_id in renamed {
        let msg_id = model.next_id();
        let read = is_active(
            model,
            ActiveView::Query {
                connection,
                query: query_id,
            },
        );
        if let Some(query) = model.connections[ci]
            .queries
            .iter_mut()
            .find(|q| q.id == query_id)
        {
            query.name = new.to_string();
            query.messages.push(Message::new(
                msg_id,
                MessageKind::Nick,
                text.clone(),
                Some(new.to_string()),
                read,
            ));
        }
    }
    Transition::none()
}

fn whois_result(model: &mut SessionModel, ci: usize, reply: &WhoisReply) -> Transition {
    let connection = model.connections[ci].id;
    let read = is_active(model, ActiveView::Connection { connection });

    let mut lines = vec![format!(
        "{} is {}@{} ({})",
        reply.nick, reply.user, reply.host, reply.realname
    )];
    if !reply.server.is_empty() {
        lines.push(format!(
            "{} is on server {} ({})",
            reply.nick, reply.server, reply.server_info
        ));
    }
    if !reply.idle.is_empty() {
        lines.push(format!("{} has been idle {}", reply.nick, reply.idle));
    }
    if !reply.channels.is_empty() {
        lines.push(format!(
            "{} is in: {}",
            reply.nick,
            reply.channels.join(" ")
        ));
    }

    for line in lines {
        let id = model.next_id();
        model.connections[ci].messages.push(Message::new(
            id,
            MessageKind::Whois,
            line,
            Some(reply.nick.clone()),
            read,
        ));
    }
    Transition::none()
}

fn message(
    model: &mut SessionModel,
    ci: usize,
    from: String,
    target: &str,
    text: String,
) -> Transition {
    let connection = model.connections[ci].id;
    if target == model.connections[ci].nick {
        // Private message: find or lazily create the query for the sender.
        return match model.connections[ci].query_by_name(&from).map(|q| q.id) {
            Some(query) => {
                let msg_id = model.next_id();
                let read = is_active(model, ActiveView::Query { connection, query });
                if let Some(q) = model.connections[ci].query_by_name_mut(&from) {
                    q.messages.push(Message::new(
                        msg_id,
                        MessageKind::Normal,
                        text,
                        Some(from),
                        read,
                    ));
                }
                Transition::none()
            }
            None => {
                let query = model.next_id();
                let msg_id = model.next_id();
                let mut q = Query::new(query, &from);
                // Unread at creation; the queued view switch marks it.
                q.messages.push(Message::new(
                    msg_id,
                    MessageKind::Normal,
                    text,
                    Some(from),
                    false,
                ));
                model.connections[ci].queries.push(q);
                Transition::followup(SessionEvent::SetActiveView {
                    view: ActiveView::Query { connection, query },
                })
            }
        };
    }

    let Some(chan_id) = model.connections[ci].channel_by_name(target).map(|c| c.id) else {
        debug!(target, "message for unknown channel, ignoring");
        return Transition::none();
    };
    let msg_id = model.next_id();
    let read = is_active(
        model,
        ActiveView::Channel {
            connection,
            channel: chan_id,
        },
    );
    if let Some(chan) = model.connections[ci].channel_by_name_mut(target) {
        chan.messages.push(Message::new(
            msg_id,
            MessageKind::Normal,
            text,
            Some(from),
            read,
        ));
    }
    Transition::none()
}

fn own_message(model: &mut SessionModel, ci: usize, target: &str, text: String) -> Transition {
    let connection = model.connections[ci].id;
    let nick = model.connections[ci].nick.clone();

    if is_channel_name(target) {
        let Some(chan_id) = model.connections[ci].channel_by_name(target).map(|c| c.id) else {
            debug!(target, "own message for unknown channel, ignoring");
            return Transition::none();
        };
        let msg_id = model.next_id();
        let read = is_active(
            model,
            ActiveView::Channel {
                connection,
                channel: chan_id,
            },
        );
        if let Some(chan) = model.connections[ci].channel_by_name_mut(target) {
            chan.messages
                .push(Message::new(msg_id, MessageKind::Own, text, Some(nick), read));
        }
        return Transition::none();
    }

    // Echo of a private message we sent; the query may not exist yet.
    match model.connections[ci].query_by_name(target).map(|q| q.id) {
        Some(query) => {
            let msg_id = model.next_id();
            let read = is_active(model, ActiveView::Query { connection, query });
            if let Some(q) = model.connections[ci].query_by_name_mut(target) {
                q.messages
                    .push(Message::new(msg_id, MessageKind::Own, text, Some(nick), read));
            }
            Transition::none()
        }
        None => {
            let query = model.next_id();
            let msg_id = model.next_id();
            let mut q = Query::new(query, target);
            q.messages
                .push(Message::new(msg_id, MessageKind::Own, text, Some(nick), false));
            model.connections[ci].queries.push(q);
            Transition::followup(SessionEvent::SetActiveView {
                view: ActiveView::Query { connection, query },
            })
        }
    }
}
