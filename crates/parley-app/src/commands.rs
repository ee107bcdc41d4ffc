//! Slash-command parsing for the composer.
//!
//! A submitted line is either a command (`/msg`, `/pm`, `/close`, `/quit`,
//! `/users`) or a message. Parsing never fails: malformed commands become
//! [`Command::InvalidArgs`] or [`Command::Unknown`] so the app can report them.

use parley_core::Identity;

/// A parsed composer line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// `/msg <user>` or `/pm <user>`: open a private conversation.
    OpenConversation {
        /// Peer to talk to.
        peer: Identity,
    },
    /// `/close`: close the active private conversation.
    CloseConversation,
    /// `/quit`: exit the application.
    Quit,
    /// `/users`: show the online user count.
    Users,
    /// Not a command; send as a message.
    Message {
        /// Message text, untrimmed.
        text: String,
    },
    /// Unrecognized `/command`.
    Unknown {
        /// The full line.
        input: String,
    },
    /// Known command with bad arguments.
    InvalidArgs {
        /// Command name including the slash.
        command: &'static str,
        /// What went wrong.
        error: String,
    },
}

/// Parse a submitted composer line.
pub fn parse(line: &str) -> Command {
    let trimmed = line.trim();
    let Some(rest) = trimmed.strip_prefix('/') else {
        return Command::Message { text: line.to_string() };
    };

    let mut parts = rest.split_whitespace();
    let name = parts.next().unwrap_or_default();
    let args: Vec<&str> = parts.collect();

    match name {
        "msg" | "pm" => parse_open(if name == "msg" { "/msg" } else { "/pm" }, &args),
        "close" => Command::CloseConversation,
        "quit" | "q" => Command::Quit,
        "users" => Command::Users,
        _ => Command::Unknown { input: trimmed.to_string() },
    }
}

fn parse_open(command: &'static str, args: &[&str]) -> Command {
    match args {
        [user] => match Identity::new(*user) {
            Ok(peer) => Command::OpenConversation { peer },
            Err(e) => Command::InvalidArgs { command, error: e.to_string() },
        },
        [] => Command::InvalidArgs { command, error: "missing username".into() },
        _ => Command::InvalidArgs { command, error: "expected a single username".into() },
    }
}
