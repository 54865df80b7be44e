//! End-to-end scenarios, driven purely through the public API with
//! [`LoopbackTransport`] + [`FakeTimer`] + [`FakeCallbacks`] standing in for
//! the application's real collaborators.

mod common;

use econn::transport::LoopbackTransport;
use econn::{message, Config, Conflict, Connection, EconnError, State};

use common::{Event, FakeCallbacks, FakeTimer};

type TestConn = Connection<FakeTimer, LoopbackTransport, FakeCallbacks>;

fn new_conn(user: &str, client: &str) -> TestConn {
    Connection::new(
        user,
        client,
        Config::default(),
        FakeTimer::new(),
        LoopbackTransport::new(),
        FakeCallbacks::new(),
    )
}

#[test]
fn s1_happy_outgoing_call() {
    let mut a = new_conn("alpha", "c1");

    a.start("sdp-offer-a", None).unwrap();
    assert_eq!(a.state(), State::PendingOutgoing);

    let wire = a.transport_mut().drain_one().expect("SETUP(req) queued");
    let decoded = message::decode(0, 0, wire.as_bytes()).unwrap();
    assert_eq!(decoded.session_id_sender, a.session_id_local());
    assert!(!decoded.is_response);

    // Peer answers.
    let resp_wire = econn::message::encode(&econn::Message::setup("sRemoteB", true, "sdp-answer-b", None)).unwrap();
    a.recv("bravo", "c2", 0, 0, resp_wire.as_bytes()).unwrap();

    assert_eq!(a.state(), State::Answered);
    assert_eq!(a.conflict(), Conflict::None);
    assert_eq!(a.session_id_remote(), Some("sRemoteB"));
    assert!(matches!(
        a.callbacks().events.last(),
        Some(Event::Answer { from_conflict: false, sdp, .. }) if sdp == "sdp-answer-b"
    ));
}

#[test]
fn s2_glare_local_loses() {
    let mut a = new_conn("alpha", "c1"); // loses: "alpha" < "bravo"
    let mut b = new_conn("bravo", "c2");

    a.start("sdp-a", None).unwrap();
    b.start("sdp-b", None).unwrap();

    let a_wire = a.transport_mut().drain_one().unwrap();
    b.recv("alpha", "c1", 0, 0, a_wire.as_bytes()).unwrap();

    let b_wire = b.transport_mut().drain_one().unwrap();
    a.recv("bravo", "c2", 0, 0, b_wire.as_bytes()).unwrap();

    assert_eq!(a.conflict(), Conflict::Loser);
    assert_eq!(a.state(), State::ConflictResolution);
    assert!(matches!(
        a.callbacks().events.last(),
        Some(Event::Answer { from_conflict: true, sdp, .. }) if sdp == "sdp-b"
    ));
}

#[test]
fn s3_glare_local_wins() {
    let mut a = new_conn("alpha", "c1");
    let mut b = new_conn("bravo", "c2"); // wins against alpha

    a.start("sdp-a", None).unwrap();
    b.start("sdp-b", None).unwrap();

    let a_wire = a.transport_mut().drain_one().unwrap();
    b.recv("alpha", "c1", 0, 0, a_wire.as_bytes()).unwrap();

    assert_eq!(b.conflict(), Conflict::Winner);
    assert_eq!(b.state(), State::PendingOutgoing);
    assert!(b.callbacks().events.is_empty(), "winner gets no callback");
}

#[test]
fn s4_setup_timeout() {
    let mut a = new_conn("alpha", "c1");
    a.start("sdp-a", None).unwrap();

    let token = a.timer_mut().last_armed().expect("setup timer armed");
    a.on_timer(token);

    assert_eq!(a.state(), State::Terminating);
    assert!(a.is_closed());
    assert!(matches!(
        a.callbacks().events.last(),
        Some(Event::Close { err: Some(e) }) if e.contains("TimedOut")
    ));

    // A courtesy CANCEL goes out from PENDING_OUTGOING during close().
    let wire = a.transport_mut().drain_one().expect("cancel sent on timeout");
    let decoded = message::decode(0, 0, wire.as_bytes()).unwrap();
    assert_eq!(decoded.message_type(), econn::message::MessageType::Cancel);
}

#[test]
fn s5_remote_hangup_after_datachan_established() {
    let mut a = new_conn("alpha", "c1");
    let mut b = new_conn("bravo", "c2");

    a.start("sdp-a", None).unwrap();
    let setup_req = a.transport_mut().drain_one().unwrap();
    b.recv("alpha", "c1", 0, 0, setup_req.as_bytes()).unwrap();
    assert_eq!(b.state(), State::PendingIncoming);

    b.answer("sdp-b", None).unwrap();
    let setup_resp = b.transport_mut().drain_one().unwrap();
    a.recv("bravo", "c2", 0, 0, setup_resp.as_bytes()).unwrap();
    assert_eq!(a.state(), State::Answered);

    a.set_datachan_established();
    b.set_datachan_established();
    assert_eq!(a.state(), State::DatachanEstablished);
    assert_eq!(b.state(), State::DatachanEstablished);

    // B hangs up.
    b.end();
    assert_eq!(b.state(), State::HangupSent);
    let hangup_req = b.transport_mut().drain_one().unwrap();
    a.recv("bravo", "c2", 0, 0, hangup_req.as_bytes()).unwrap();

    assert!(a.is_closed());
    assert!(matches!(a.callbacks().events.last(), Some(Event::Close { err: None })));

    let hangup_resp = a.transport_mut().drain_one().expect("hangup response sent back");
    b.recv("alpha", "c1", 0, 0, hangup_resp.as_bytes()).unwrap();

    assert!(b.is_closed());
    assert!(matches!(b.callbacks().events.last(), Some(Event::Close { err: None })));
}

#[test]
fn s6_propsync_gated_on_datachan_established() {
    let mut props = econn::Props::new();
    props.insert("codec".into(), serde_json::Value::String("opus".into()));

    let mut a = new_conn("alpha", "c1");
    a.start("sdp-a", None).unwrap();
    let resp_wire = message::encode(&econn::Message::setup("sB", true, "sdp-b", None)).unwrap();
    a.recv("bravo", "c2", 0, 0, resp_wire.as_bytes()).unwrap();
    assert_eq!(a.state(), State::Answered);

    let err = a.send_propsync(props.clone(), false).unwrap_err();
    assert!(matches!(err, EconnError::Protocol(_)));

    a.set_datachan_established();
    a.send_propsync(props, false).unwrap();

    let wire = a.transport_mut().drain_one().expect("propsync queued");
    let decoded = message::decode(0, 0, wire.as_bytes()).unwrap();
    assert_eq!(decoded.message_type(), econn::message::MessageType::Propsync);
}
