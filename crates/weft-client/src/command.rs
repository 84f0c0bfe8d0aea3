//! Command interpreter.
//!
//! Turns one raw input line plus the current view into either a state-engine
//! event, a direct connection-handle invocation, or nothing. Unprefixed text
//! is the terminal command: it is said to whatever the active view shows.
//!
//! Resolution failures (no active connection, missing arguments) degrade to
//! [`Intent::Nothing`] with a log line; the interpreter never leaves the
//! caller in an inconsistent state.

use tracing::{debug, warn};
use weft_core::Id;

use crate::effects::HandleOp;
use crate::events::SessionEvent;
use crate::model::{ViewContext, ViewKind, is_channel_name};

/// Prefix that marks a line as a command.
pub const COMMAND_PREFIX: char = '/';

/// Definition of one command.
#[derive(Debug, Clone)]
pub struct Command {
    /// Primary name, without the leading slash.
    pub name: &'static str,
    /// Aliases, without leading slashes.
    pub aliases: &'static [&'static str],
    /// Short description for help listings.
    pub description: &'static str,
}

impl Command {
    /// Returns true if `name` is this command's name or an alias
    /// (case-insensitive).
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
            || self.aliases.iter().any(|a| a.eq_ignore_ascii_case(name))
    }

    /// Returns the display name with aliases, e.g. "part (leave, close)".
    pub fn display_name(&self) -> String {
        if self.aliases.is_empty() {
            self.name.to_string()
        } else {
            format!("{} ({})", self.name, self.aliases.join(", "))
        }
    }
}

/// The command vocabulary.
pub const COMMANDS: &[Command] = &[
    Command {
        name: "connect",
        aliases: &[],
        description: "Connect to a server: /connect <server> <nick>",
    },
    Command {
        name: "disconnect",
        aliases: &[],
        description: "Disconnect the current server, with an optional message",
    },
    Command {
        name: "join",
        aliases: &[],
        description: "Join one or more channels",
    },
    Command {
        name: "part",
        aliases: &["leave", "close"],
        description: "Leave a channel or close the current query",
    },
    Command {
        name: "msg",
        aliases: &["query"],
        description: "Message someone, or open a query with no message",
    },
    Command {
        name: "whois",
        aliases: &[],
        description: "Look up a nick",
    },
    Command {
        name: "quit",
        aliases: &[],
        description: "Disconnect every server",
    },
];

/// What one input line amounts to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Intent {
    /// Feed this event to the state engine.
    Event(SessionEvent),
    /// Invoke an operation on the handle for `connection` directly.
    Invoke { connection: Id, op: HandleOp },
    /// Nothing to do.
    Nothing,
}

/// Interprets one line of input against the active view.
pub fn interpret(text: &str, view: &ViewContext) -> Intent {
    if text.is_empty() {
        return Intent::Nothing;
    }
    if !text.starts_with(COMMAND_PREFIX) {
        return say_to_active_target(text, view);
    }

    // First token selects the command; the rest of the line (leading
    // whitespace trimmed) is preserved verbatim for free-form trailing text.
    let Some(first) = text.split_whitespace().next() else {
        return Intent::Nothing;
    };
    let name = &first[COMMAND_PREFIX.len_utf8()..];
    let message = text[first.len()..].trim_start();
    let args: Vec<&str> = message.split_whitespace().collect();

    let Some(command) = COMMANDS.iter().find(|c| c.matches_name(name)) else {
        debug!(name, "unrecognized command");
        return Intent::Nothing;
    };

    match command.name {
        "connect" => connect(&args),
        "disconnect" => disconnect(message, view),
        "join" => join(message, &args, view),
        "part" => part(&args, view),
        "msg" => msg(message, &args, view),
        "whois" => whois(&args, view),
        "quit" => Intent::Event(SessionEvent::QuitRequest),
        _ => Intent::Nothing,
    }
}

fn say_to_active_target(text: &str, view: &ViewContext) -> Intent {
    let (Some(connection), Some(target)) = (view.connection, view.target.clone()) else {
        warn!("no active target to send to");
        return Intent::Nothing;
    };
    Intent::Invoke {
        connection,
        op: HandleOp::Say {
            target,
            text: text.to_string(),
        },
    }
}

fn connect(args: &[&str]) -> Intent {
    if args.len() < 2 {
        debug!("connect needs a server and a nick");
        return Intent::Nothing;
    }
    Intent::Event(SessionEvent::ConnectRequest {
        server: args[0].to_string(),
        nick: args[1].to_string(),
    })
}

fn disconnect(message: &str, view: &ViewContext) -> Intent {
    let Some(connection) = view.connection else {
        warn!("disconnect with no active connection");
        return Intent::Nothing;
    };
    Intent::Invoke {
        connection,
        op: HandleOp::Disconnect {
            message: (!message.is_empty()).then(|| message.to_string()),
        },
    }
}

fn join(message: &str, args: &[&str], view: &ViewContext) -> Intent {
    if args.is_empty() {
        debug!("join needs at least one channel");
        return Intent::Nothing;
    }
    let Some(connection) = view.connection else {
        warn!("join with no active connection");
        return Intent::Nothing;
    };
    // The whole remainder goes through verbatim so multiple comma or space
    // separated channel names reach the server untouched.
    Intent::Invoke {
        connection,
        op: HandleOp::Join {
            spec: message.to_string(),
        },
    }
}

fn part(args: &[&str], view: &ViewContext) -> Intent {
    let Some(connection) = view.connection else {
        warn!("part with no active connection");
        return Intent::Nothing;
    };

    if let Some(first) = args.first()
        && is_channel_name(first)
    {
        let reason = args[1..].join(" ");
        return Intent::Invoke {
            connection,
            op: HandleOp::Part {
                target: (*first).to_string(),
                reason: (!reason.is_empty()).then_some(reason),
            },
        };
    }

    match view.kind {
        ViewKind::Channel => {
            let Some(target) = view.target.clone() else {
                return Intent::Nothing;
            };
            let reason = args.join(" ");
            Intent::Invoke {
                connection,
                op: HandleOp::Part {
                    target,
                    reason: (!reason.is_empty()).then_some(reason),
                },
            }
        }
        ViewKind::Query => {
            // Closing a query is purely local, no network traffic.
            let Some(peer) = view.target.clone() else {
                return Intent::Nothing;
            };
            Intent::Event(SessionEvent::CloseQuery { connection, peer })
        }
        ViewKind::Connection | ViewKind::None => {
            debug!("nothing to part from here");
            Intent::Nothing
        }
    }
}

fn msg(message: &str, args: &[&str], view: &ViewContext) -> Intent {
    let Some(peer) = args.first() else {
        debug!("msg needs a peer");
        return Intent::Nothing;
    };
    let Some(connection) = view.connection else {
        warn!("msg with no active connection");
        return Intent::Nothing;
    };
    let body = message[peer.len()..].trim_start();
    if body.is_empty() {
        // No body: open (or focus) the query. The engine creates it.
        return Intent::Event(SessionEvent::OpenQuery {
            connection,
            peer: (*peer).to_string(),
        });
    }
    // With a body this is a plain send; the query appears once the
    // protocol echoes it back.
    Intent::Invoke {
        connection,
        op: HandleOp::Say {
            target: (*peer).to_string(),
            text: body.to_string(),
        },
    }
}

fn whois(args: &[&str], view: &ViewContext) -> Intent {
    let Some(nick) = args.first() else {
        debug!("whois needs a nick");
        return Intent::Nothing;
    };
    let Some(connection) = view.connection else {
        warn!("whois with no active connection");
        return Intent::Nothing;
    };
    Intent::Invoke {
        connection,
        op: HandleOp::Whois {
            nick: (*nick).to_string(),
        },
    }
}
