//! In-memory connection backend.
//!
//! The loopback confirms registration immediately and reflects the local
//! user's own actions back as notifications, which is enough to exercise
//! the whole session engine without a network. Used by tests and by the
//! binary when no real backend is wired in.

use anyhow::Result;

use super::{CompletionFn, ConnectionFactory, ConnectionHandle, Notification, NotifySender};
use crate::connection::WhoisReply;
use crate::id::Id;

/// Factory producing [`LoopbackHandle`]s.
#[derive(Debug, Default)]
pub struct LoopbackFactory;

impl ConnectionFactory for LoopbackFactory {
    fn open(
        &mut self,
        id: Id,
        server: &str,
        nick: &str,
        notify: NotifySender,
    ) -> Result<Box<dyn ConnectionHandle>> {
        tracing::debug!(%id, server, nick, "opening loopback connection");
        let _ = notify.send((
            id,
            Notification::Registered {
                server: server.to_string(),
                nick: nick.to_string(),
            },
        ));
        let _ = notify.send((
            id,
            Notification::ServerText {
                text: format!("connected to {server} (loopback)\nthis backend echoes your own actions only"),
            },
        ));
        Ok(Box::new(LoopbackHandle {
            id,
            nick: nick.to_string(),
            notify,
        }))
    }
}

struct LoopbackHandle {
    id: Id,
    nick: String,
    notify: NotifySender,
}

impl LoopbackHandle {
    fn emit(&self, notification: Notification) {
        let _ = self.notify.send((self.id, notification));
    }
}

impl ConnectionHandle for LoopbackHandle {
    fn join(&mut self, spec: &str) {
        for channel in spec.split([',', ' ']).filter(|s| !s.is_empty()) {
            self.emit(Notification::ChannelJoined {
                channel: channel.to_string(),
                nick: self.nick.clone(),
            });
        }
    }

    fn part(&mut self, target: &str, reason: Option<&str>) {
        self.emit(Notification::ChannelLeft {
            channel: target.to_string(),
            nick: self.nick.clone(),
            reason: reason.map(str::to_string),
        });
    }

    fn say(&mut self, target: &str, text: &str) {
        self.emit(Notification::OwnMessage {
            target: target.to_string(),
            text: text.to_string(),
        });
    }

    fn whois(&mut self, nick: &str) {
        self.emit(Notification::Whois(WhoisReply {
            nick: nick.to_string(),
            host: "loopback".to_string(),
            server: "loopback".to_string(),
            ..WhoisReply::default()
        }));
    }

    fn disconnect(&mut self, _message: Option<&str>, on_complete: CompletionFn) {
        on_complete();
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;
    use crate::connection::NotifyReceiver;
    use crate::id::IdAlloc;

    fn open_loopback() -> (Box<dyn ConnectionHandle>, NotifyReceiver, Id) {
        let mut alloc = IdAlloc::new();
        let id = alloc.next_id();
        let (tx, rx) = mpsc::unbounded_channel();
        let handle = LoopbackFactory
            .open(id, "irc.example.org", "nickly", tx)
            .unwrap();
        (handle, rx, id)
    }

    #[test]
    fn test_open_registers_immediately() {
        let (_handle, mut rx, id) = open_loopback();
        let (conn, first) = rx.try_recv().unwrap();
        assert_eq!(conn, id);
        assert_eq!(
            first,
            Notification::Registered {
                server: "irc.example.org".to_string(),
                nick: "nickly".to_string(),
            }
        );
    }

    #[test]
    fn test_join_echoes_each_channel() {
        let (mut handle, mut rx, _id) = open_loopback();
        rx.try_recv().unwrap();
        rx.try_recv().unwrap();

        handle.join("#one,#two");
        let (_, a) = rx.try_recv().unwrap();
        let (_, b) = rx.try_recv().unwrap();
        assert!(matches!(a, Notification::ChannelJoined { channel, .. } if channel == "#one"));
        assert!(matches!(b, Notification::ChannelJoined { channel, .. } if channel == "#two"));
    }

    #[test]
    fn test_disconnect_completes_inline() {
        use std::sync::Arc;
        use std::sync::atomic::{AtomicBool, Ordering};

        let (mut handle, _rx, _id) = open_loopback();
        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        handle.disconnect(None, Box::new(move || flag.store(true, Ordering::SeqCst)));
        assert!(done.load(Ordering::SeqCst));
    }
}
