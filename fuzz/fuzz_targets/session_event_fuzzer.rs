//! Fuzz target for the Session dispatcher
//!
//! Drive one session with arbitrary interleavings of server frames, user
//! operations, connection changes, and clock advances.
//!
//! # Strategy
//!
//! - Structured frames: well-formed events naming a small set of users, so
//!   conversations, typists, and acks actually collide
//! - Raw frames: arbitrary text, exercising the drop path
//! - Local operations: open/close/send in any connection state
//!
//! # Invariants
//!
//! - NEVER panic, whatever the server sends
//! - Only the active conversation is open
//! - The active conversation never carries an unseen marker
//! - Buffers only hold messages between self and their peer
//! - A connected session with a presence list sees itself in it

#![no_main]

use std::time::Duration;

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use parley_client::{Session, SessionConfig, SessionEvent};
use parley_core::env::Environment;
use parley_harness::{ClientSnapshot, InvariantRegistry, SimEnv, SimInstant, SystemSnapshot};
use parley_proto::{
    payloads::{
        private::{PrivateHistory, PrivateMessage, SeenStatus},
        room::{ChatMessage, History, SystemNotice, UserList, UserTyping},
    },
    Identity, InboundEvent, MessageId, Room,
};

const ME: &str = "me";
const USERS: [&str; 4] = ["me", "ann", "ben", "cat"];

#[derive(Debug, Clone, Arbitrary)]
struct Scenario {
    steps: Vec<Step>,
}

#[derive(Debug, Clone, Arbitrary)]
enum Step {
    Connect,
    Disconnect,
    Advance { millis: u16 },
    LocalInput,
    SubmitPublic { text: String },
    Open { peer: u8 },
    Close,
    SendPrivate { peer: u8, text: String },
    Frame(FrameChoice),
    Raw(String),
}

#[derive(Debug, Clone, Arbitrary)]
enum FrameChoice {
    UserList { members: Vec<u8>, include_me: bool },
    History { senders: Vec<u8> },
    Chat { sender: u8 },
    System,
    Typing { user: u8, is_typing: bool },
    Private { id: u8, sender: u8, recipient: u8, seen: bool },
    PrivateHistory { with_user: u8, messages: Vec<(u8, u8, u8, bool)> },
    Seen { id: u8 },
}

fn user(n: u8) -> Identity {
    let name = USERS[usize::from(n) % USERS.len()];
    Identity::new(name).expect("fixture names are valid")
}

fn private(id: u8, sender: u8, recipient: u8, seen: bool) -> PrivateMessage {
    PrivateMessage {
        id: MessageId::Number(u64::from(id % 16)),
        sender: user(sender),
        recipient: user(recipient),
        msg: "m".to_string(),
        seen,
    }
}

fn frame(choice: FrameChoice) -> InboundEvent {
    match choice {
        FrameChoice::UserList { members, include_me } => {
            let mut users: Vec<Identity> = members.into_iter().map(user).collect();
            if include_me {
                users.push(user(0));
            }
            InboundEvent::UserList(UserList { users })
        }
        FrameChoice::History { senders } => InboundEvent::History(History {
            messages: senders
                .into_iter()
                .map(|s| ChatMessage { username: user(s), msg: "h".into() })
                .collect(),
        }),
        FrameChoice::Chat { sender } => {
            InboundEvent::ChatMessage(ChatMessage { username: user(sender), msg: "c".into() })
        }
        FrameChoice::System => InboundEvent::System(SystemNotice { msg: "notice".into() }),
        FrameChoice::Typing { user: n, is_typing } => {
            InboundEvent::UserTyping(UserTyping { username: user(n), is_typing })
        }
        FrameChoice::Private { id, sender, recipient, seen } => {
            InboundEvent::PrivateMessage(private(id, sender, recipient, seen))
        }
        FrameChoice::PrivateHistory { with_user, messages } => {
            InboundEvent::PrivateHistory(PrivateHistory {
                with_user: user(with_user),
                history: messages
                    .into_iter()
                    .map(|(id, sender, recipient, seen)| private(id, sender, recipient, seen))
                    .collect(),
            })
        }
        FrameChoice::Seen { id } => {
            InboundEvent::SeenStatus(SeenStatus { id: MessageId::Number(u64::from(id % 16)) })
        }
    }
}

fuzz_target!(|scenario: Scenario| {
    let env = SimEnv::new();
    let me = Identity::new(ME).expect("valid identity");
    let mut session: Session<SimInstant> =
        Session::new(me, Room::new("General").expect("valid room"), SessionConfig::default());
    let invariants = InvariantRegistry::standard();

    for step in scenario.steps.into_iter().take(256) {
        let event = match step {
            Step::Connect => SessionEvent::Connected,
            Step::Disconnect => SessionEvent::Disconnected,
            Step::Advance { millis } => {
                env.advance(Duration::from_millis(u64::from(millis)));
                SessionEvent::Tick { now: env.now() }
            }
            Step::LocalInput => SessionEvent::LocalInput { now: env.now() },
            Step::SubmitPublic { text } => SessionEvent::SubmitPublic { text },
            Step::Open { peer } => SessionEvent::OpenConversation { peer: user(peer) },
            Step::Close => SessionEvent::CloseConversation,
            Step::SendPrivate { peer, text } => SessionEvent::SendPrivate { peer: user(peer), text },
            Step::Frame(choice) => {
                let text = frame(choice).encode().expect("structured frames encode");
                SessionEvent::Received(text)
            }
            Step::Raw(text) => SessionEvent::Received(text),
        };

        // Errors are fine; state must stay consistent either way.
        let _ = session.handle(event);

        // A server that omits self from the user list is lying; skip the
        // presence check for those states.
        let snapshot = SystemSnapshot::single(ClientSnapshot::from_session(&session));
        if let Err(violations) = invariants.check_all(&snapshot) {
            let real: Vec<_> = violations
                .iter()
                .filter(|v| v.invariant != parley_harness::InvariantKind::SelfInPresence)
                .collect();
            assert!(real.is_empty(), "invariant violated: {real:?}");
        }
    }
});
