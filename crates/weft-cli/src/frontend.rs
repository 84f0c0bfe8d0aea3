//! Plain line frontend.
//!
//! Reads commands from stdin, prints new messages to stdout. This is the
//! thin presentation collaborator: it only reads model snapshots and feeds
//! lines to the session; every chat semantic lives in the engine.

use anyhow::Result;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;
use weft_client::{Message, Session, SessionModel};
use weft_core::config::Config;
use weft_core::{Id, LoopbackFactory};

pub async fn run(config: Config, extra_server: Option<String>) -> Result<()> {
    // The loopback backend is the built-in default; real protocol backends
    // plug in through weft_core::ConnectionFactory.
    let mut session = Session::new(Box::new(LoopbackFactory));

    for server in &config.servers {
        session.connect_with_autojoin(
            &server.host,
            config.nick_for(server),
            server.autojoin.clone(),
        );
    }
    if let Some(host) = extra_server {
        session.connect(&host, &config.nick);
    }

    let sender = session.sender();
    let cancel = session.cancel_token();
    let stdin_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            // /help is purely a display concern, answered here.
            if line.trim().eq_ignore_ascii_case("/help") {
                for command in weft_client::command::COMMANDS {
                    println!("/{:<20} {}", command.display_name(), command.description);
                }
                continue;
            }
            sender.submit_text(line);
        }
        // stdin closed; stop the session.
        stdin_cancel.cancel();
    });

    info!("session started");
    let mut printed = Printed::default();
    printed.flush(session.model());
    session.run(|model| printed.flush(model)).await;
    println!("goodbye");
    Ok(())
}

/// Tracks which messages have been printed.
///
/// Ids are globally monotonic, so "everything newer than the last printed
/// id" is exactly the set of messages added since the previous flush.
#[derive(Default)]
struct Printed {
    last: Option<Id>,
}

impl Printed {
    fn flush(&mut self, model: &SessionModel) {
        let mut fresh: Vec<(String, &Message)> = Vec::new();
        for conn in &model.connections {
            for message in &conn.messages {
                if self.is_new(message.id) {
                    fresh.push((conn.name.clone(), message));
                }
            }
            for channel in &conn.channels {
                for message in &channel.messages {
                    if self.is_new(message.id) {
                        fresh.push((channel.name.clone(), message));
                    }
                }
            }
            for query in &conn.queries {
                for message in &query.messages {
                    if self.is_new(message.id) {
                        fresh.push((query.name.clone(), message));
                    }
                }
            }
        }
        fresh.sort_by_key(|(_, message)| message.id);
        for (container, message) in fresh {
            match &message.user {
                Some(user) => println!("[{container}] <{user}> {}", message.text),
                None => println!("[{container}] {}", message.text),
            }
            self.last = Some(self.last.map_or(message.id, |last| last.max(message.id)));
        }
    }

    fn is_new(&self, id: Id) -> bool {
        self.last.is_none_or(|last| id > last)
    }
}
