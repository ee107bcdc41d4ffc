//! Cluster convergence tests using Deterministic Simulation Testing.
//!
//! Several sessions share one in-memory server and one virtual clock. Every
//! operation runs to quiescence, so the final state of each client can be
//! compared against the server's record and against the other clients.

use std::time::Duration;

use parley_client::{Identity, Room, SessionEvent};
use parley_core::{ConversationPhase, MessageId, env::Environment};
use parley_harness::{InvariantRegistry, TestCluster};
use proptest::prelude::*;

const NAMES: [&str; 3] = ["alice", "bob", "carol"];

fn id(name: &str) -> Identity {
    Identity::new(name).unwrap()
}

fn room() -> Room {
    Room::new("General").unwrap()
}

fn cluster(count: usize) -> TestCluster {
    TestCluster::new(NAMES[..count].iter().map(|&n| id(n)).collect(), &room())
}

fn open(cluster: &mut TestCluster, idx: usize, peer: &str) {
    cluster.apply(idx, SessionEvent::OpenConversation { peer: id(peer) }).unwrap();
}

fn send_private(cluster: &mut TestCluster, idx: usize, peer: &str, text: &str) {
    cluster
        .apply(idx, SessionEvent::SendPrivate { peer: id(peer), text: text.into() })
        .unwrap();
}

#[test]
fn room_messages_reach_every_client() {
    let mut cluster = cluster(3);
    cluster.connect_all();

    cluster.apply(0, SessionEvent::SubmitPublic { text: " hello everyone ".into() }).unwrap();

    for idx in 0..cluster.len() {
        let log = cluster.session(idx).public_log().messages();
        assert_eq!(log.len(), 1, "client {idx}");
        assert_eq!(log[0].sender, id("alice"));
        assert_eq!(log[0].text, "hello everyone");
    }
}

#[test]
fn late_joiner_receives_capped_history() {
    let mut cluster = cluster(2);
    cluster.connect(0);

    for n in 0..105 {
        cluster.apply(0, SessionEvent::SubmitPublic { text: format!("message {n}") }).unwrap();
    }
    cluster.connect(1);

    let log = cluster.session(1).public_log().messages();
    assert_eq!(log.len(), parley_harness::HISTORY_CAP);
    assert_eq!(log[0].text, "message 5");
    assert_eq!(log[log.len() - 1].text, "message 104");
}

#[test]
fn presence_is_sorted_and_tracks_leavers() {
    let mut cluster = cluster(3);
    cluster.connect(2);
    cluster.connect(1);
    cluster.connect(0);

    assert_eq!(cluster.session(2).presence().users(), &[id("alice"), id("bob"), id("carol")]);

    cluster.disconnect(1);

    assert_eq!(cluster.session(0).presence().users(), &[id("alice"), id("carol")]);
    assert_eq!(cluster.network().server().connection_count(), 2);
}

#[test]
fn typing_label_appears_and_expires() {
    let mut cluster = cluster(2);
    cluster.connect_all();

    let now = cluster.env().now();
    cluster.apply(0, SessionEvent::LocalInput { now }).unwrap();

    assert_eq!(cluster.session(1).typing().label().as_deref(), Some("alice is typing..."));
    assert!(cluster.session(0).typing().label().is_none());

    cluster.advance(Duration::from_secs(2));

    assert!(cluster.session(1).typing().label().is_none());
}

#[test]
fn seen_status_converges_for_open_conversations() {
    let mut cluster = cluster(2);
    cluster.connect_all();
    open(&mut cluster, 0, "bob");
    open(&mut cluster, 1, "alice");

    send_private(&mut cluster, 0, "bob", "are you there?");

    let message_id = MessageId::Number(1);
    let alice_view = cluster.session(0).private().conversation(&id("bob")).unwrap();
    assert_eq!(alice_view.messages.len(), 1);
    assert_eq!(alice_view.messages[0].id, message_id);
    assert!(alice_view.messages[0].seen);

    let bob_view = cluster.session(1).private().conversation(&id("alice")).unwrap();
    assert!(bob_view.messages[0].seen);
    assert!(cluster.network().server().private_messages()[0].seen);

    InvariantRegistry::quiescent().assert_all(&cluster.snapshot(), "after private exchange");
}

#[test]
fn unseen_message_is_acknowledged_when_opened() {
    let mut cluster = cluster(2);
    cluster.connect_all();
    open(&mut cluster, 0, "bob");

    send_private(&mut cluster, 0, "bob", "ping");

    assert!(cluster.session(1).private().has_unseen(&id("alice")));
    assert!(!cluster.network().server().private_messages()[0].seen);

    open(&mut cluster, 1, "alice");

    let bob_view = cluster.session(1).private().conversation(&id("alice")).unwrap();
    assert_eq!(bob_view.phase, ConversationPhase::HistoryLoaded);
    assert!(!cluster.session(1).private().has_unseen(&id("alice")));
    assert!(cluster.network().server().private_messages()[0].seen);
    let alice_view = cluster.session(0).private().conversation(&id("bob")).unwrap();
    assert!(alice_view.messages[0].seen);

    InvariantRegistry::quiescent().assert_all(&cluster.snapshot(), "after opening");
}

#[test]
fn reconnect_reloads_active_conversation() {
    let mut cluster = cluster(2);
    cluster.connect_all();
    open(&mut cluster, 0, "bob");
    open(&mut cluster, 1, "alice");

    cluster.disconnect(1);
    send_private(&mut cluster, 0, "bob", "while you were away");
    assert!(cluster.session(1).private().conversation(&id("alice")).unwrap().messages.is_empty());

    cluster.connect(1);

    let bob_view = cluster.session(1).private().conversation(&id("alice")).unwrap();
    assert_eq!(bob_view.messages.len(), 1);
    assert!(bob_view.messages[0].seen);

    InvariantRegistry::quiescent().assert_all(&cluster.snapshot(), "after reconnect");
}

#[derive(Debug, Clone)]
enum Op {
    Connect,
    Disconnect,
    Public,
    Type,
    Open(usize),
    Close,
    Private,
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = (usize, Op)> {
    let op = prop_oneof![
        1 => Just(Op::Connect),
        1 => Just(Op::Disconnect),
        2 => Just(Op::Public),
        2 => Just(Op::Type),
        3 => (0..NAMES.len()).prop_map(Op::Open),
        1 => Just(Op::Close),
        4 => Just(Op::Private),
        1 => (0u64..3000).prop_map(Op::Advance),
    ];
    (0..NAMES.len(), op)
}

fn apply_op(cluster: &mut TestCluster, idx: usize, op: Op) {
    // Rejected operations (not connected, self-conversation) leave state as
    // it was, which is what the invariants check.
    let _ = match op {
        Op::Connect => {
            cluster.connect(idx);
            Ok(())
        },
        Op::Disconnect => {
            cluster.disconnect(idx);
            Ok(())
        },
        Op::Public => cluster.apply(idx, SessionEvent::SubmitPublic { text: "hi".into() }),
        Op::Type => {
            let now = cluster.env().now();
            cluster.apply(idx, SessionEvent::LocalInput { now })
        },
        Op::Open(peer) => {
            cluster.apply(idx, SessionEvent::OpenConversation { peer: id(NAMES[peer]) })
        },
        Op::Close => cluster.apply(idx, SessionEvent::CloseConversation),
        Op::Private => match cluster.session(idx).private().active_peer().cloned() {
            Some(peer) => {
                cluster.apply(idx, SessionEvent::SendPrivate { peer, text: "psst".into() })
            },
            None => Ok(()),
        },
        Op::Advance(ms) => {
            cluster.advance(Duration::from_millis(ms));
            Ok(())
        },
    };
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    #[test]
    fn prop_cluster_invariants_hold(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut cluster = cluster(NAMES.len());
        let standard = InvariantRegistry::standard();

        for (idx, op) in ops {
            apply_op(&mut cluster, idx, op.clone());
            let result = standard.check_all(&cluster.snapshot());
            prop_assert!(result.is_ok(), "client {} {:?}: {:?}", idx, op, result);
        }

        cluster.connect_all();
        let result = InvariantRegistry::quiescent().check_all(&cluster.snapshot());
        prop_assert!(result.is_ok(), "at quiescence: {:?}", result);
    }

    #[test]
    fn prop_connected_presence_matches_server(ops in prop::collection::vec(op_strategy(), 1..60)) {
        let mut cluster = cluster(NAMES.len());

        for (idx, op) in ops {
            apply_op(&mut cluster, idx, op);
        }

        let server_users = cluster.network().server().users(&room());
        for idx in 0..cluster.len() {
            let session = cluster.session(idx);
            if session.is_connected() {
                prop_assert_eq!(session.presence().users(), server_users.as_slice());
            }
        }
    }
}
