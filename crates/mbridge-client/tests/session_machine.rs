//! Session state machine tests over a scripted transport.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::time::Duration;

use mbridge_client::session::{Action, Publisher, Reader, Session, SessionEvent, SessionState};
use mbridge_client::transport::TransportEvent;
use mbridge_core::error::BridgeError;
use mbridge_core::msgs::{Pose2D, Twist2D};
use mbridge_core::protocol::MessageType;

use mock_transport::{MockTransport, Script};

const URI: &str = "ws://localhost:5005";

const POSE_REPLY: &str = r#"{"type": 2, "data": "\"x\": 1.5, \"y\": -2.0, \"theta\": 0.0, \"utime\": 12345", "channel": "", "dtype": ""}"#;
const ERROR_REPLY: &str = r#"{"type": 3, "data": "channel not found", "channel": "", "dtype": ""}"#;

fn odometry_reader() -> Session<Reader<Pose2D>> {
    Session::new(URI, Reader::for_record("MBOT_ODOMETRY"))
}

#[tokio::test]
async fn reader_response_populates_record() {
    let t = MockTransport::new(Script::replies(&[POSE_REPLY]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert!(s.failure().is_none());
    assert_eq!(s.role().response_type(), Some(MessageType::Response));
    assert_eq!(
        *s.role().record(),
        Pose2D {
            x: 1.5,
            y: -2.0,
            theta: 0.0,
            utime: Some(12345),
        }
    );

    assert_eq!(
        t.sent(),
        vec![r#"{"type": 1, "data": "", "channel": "MBOT_ODOMETRY", "dtype": ""}"#.to_string()]
    );
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn reader_error_reply_keeps_text() {
    let t = MockTransport::new(Script::replies(&[ERROR_REPLY]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.role().remote_error(), Some("channel not found"));
    assert_eq!(s.failure().unwrap().code().as_str(), "REMOTE_ERROR");
    assert_eq!(*s.role().record(), Pose2D::default());
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn transport_failure_before_reply_leaves_default_record() {
    let t = MockTransport::new(Script::events(vec![TransportEvent::Failed(
        "connection reset".into(),
    )]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.state(), SessionState::Failed);
    assert_eq!(s.failure().unwrap().code().as_str(), "TRANSPORT_FAILURE");
    assert_eq!(*s.role().record(), Pose2D::default());
}

#[tokio::test]
async fn refused_connection_fails_without_sending() {
    let t = MockTransport::new(Script {
        connect_error: Some("connection refused".into()),
        ..Script::default()
    });
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.state(), SessionState::Failed);
    assert!(t.sent().is_empty());
}

#[tokio::test]
async fn malformed_address_is_fatal_before_connecting() {
    let t = MockTransport::new(Script::default());
    for uri in ["localhost:5005", "ws://localhost", "ws://:5005", "http://h:1", "ws://h:99999"] {
        let mut s: Session<Reader<Pose2D>> = Session::new(uri, Reader::for_record("MBOT_ODOMETRY"));
        let err = s.run(&t).await.expect_err(uri);
        assert_eq!(err.code().as_str(), "BAD_ADDRESS", "uri={uri}");
        assert_eq!(s.state(), SessionState::Idle);
    }
    assert_eq!(t.connects(), 0);
}

#[tokio::test]
async fn publisher_sends_once_then_closes() {
    let t = MockTransport::new(Script::default());
    let cmd = Twist2D {
        vx: 0.1,
        vy: 0.0,
        wz: 0.2,
    };
    let mut s = Session::new(URI, Publisher::new("MBOT_VEL_CMD", "twist2D_t", &cmd));
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(
        t.sent(),
        vec![r#"{"type": 0, "data": "\"vx\":0.1,\"vy\":0,\"wz\":0.2", "channel": "MBOT_VEL_CMD", "dtype": "twist2D_t"}"#.to_string()]
    );
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn publisher_ignores_replies_and_abrupt_close() {
    let t = MockTransport::new(Script::events(vec![
        TransportEvent::Message(ERROR_REPLY.into()),
        TransportEvent::Failed("reset without closing handshake".into()),
    ]));
    let mut s = Session::new(URI, Publisher::new("RESET_ODOMETRY", "pose2D_t", &Pose2D::default()));
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(t.sent().len(), 1);
}

#[tokio::test]
async fn publisher_send_failure_is_unsuccessful() {
    let t = MockTransport::new(Script {
        fail_send: true,
        ..Script::default()
    });
    let mut s = Session::new(URI, Publisher::new("MBOT_VEL_CMD", "twist2D_t", &Twist2D::default()));
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.state(), SessionState::Failed);
    assert_eq!(s.failure().unwrap().code().as_str(), "TRANSPORT_FAILURE");
}

#[tokio::test]
async fn only_first_reply_is_processed() {
    let second = r#"{"type": 2, "data": "\"x\": 9.0", "channel": "", "dtype": ""}"#;
    let t = MockTransport::new(Script::replies(&[POSE_REPLY, second]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.role().record().x, 1.5);
    assert_eq!(t.sent().len(), 1);
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn close_before_reply_is_unsuccessful() {
    let t = MockTransport::new(Script::events(vec![TransportEvent::Closed]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(s.failure().unwrap().code().as_str(), "PROTOCOL_DECODE");
}

#[tokio::test]
async fn unexpected_reply_type_is_unsuccessful() {
    let echo = r#"{"type": 1, "data": "", "channel": "MBOT_ODOMETRY", "dtype": ""}"#;
    let t = MockTransport::new(Script::replies(&[echo]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.role().response_type(), Some(MessageType::Request));
    assert_eq!(s.failure().unwrap().code().as_str(), "PROTOCOL_DECODE");
}

#[tokio::test]
async fn garbage_reply_is_unsuccessful() {
    let t = MockTransport::new(Script::replies(&["hello?"]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.role().response_type(), None);
    assert_eq!(s.failure().unwrap().code().as_str(), "PROTOCOL_DECODE");
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn malformed_number_in_reply_fails_the_read() {
    let bad = r#"{"type": 2, "data": "\"x\": 1.5, \"y\": oops", "channel": "", "dtype": ""}"#;
    let t = MockTransport::new(Script::replies(&[bad]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    assert!(!s.success());
    assert_eq!(s.failure().unwrap().code().as_str(), "MALFORMED_NUMBER");
}

#[tokio::test]
async fn session_is_single_use() {
    let t = MockTransport::new(Script::replies(&[POSE_REPLY]));
    let mut s = odometry_reader();
    s.run(&t).await.unwrap();

    let err = s.run(&t).await.expect_err("second run must fail");
    assert_eq!(err.code().as_str(), "INTERNAL");
    assert_eq!(t.connects(), 1);
}

#[test]
fn handle_drives_reader_transitions() {
    let mut s = odometry_reader();
    assert_eq!(s.state(), SessionState::Idle);
    assert_eq!(s.role().channel(), "MBOT_ODOMETRY");

    // Open before connecting is ignored.
    assert!(s.handle(SessionEvent::Opened).is_empty());
    assert_eq!(s.state(), SessionState::Idle);

    s.begin_connect().unwrap();
    assert_eq!(s.state(), SessionState::Connecting);

    let actions = s.handle(SessionEvent::Opened);
    assert_eq!(s.state(), SessionState::Open);
    assert!(matches!(actions.as_slice(), [Action::Send(_)]));

    assert_eq!(s.handle(SessionEvent::Message(POSE_REPLY.into())), vec![Action::Close]);
    assert!(s.handle(SessionEvent::Message(POSE_REPLY.into())).is_empty());

    s.handle(SessionEvent::Closed);
    assert_eq!(s.state(), SessionState::Closed);
    assert!(s.success());

    // Terminal: nothing moves it anymore.
    s.handle(SessionEvent::Failed("late".into()));
    assert_eq!(s.state(), SessionState::Closed);
    assert!(s.success());
}

#[test]
fn handle_failure_while_connecting() {
    let mut s = odometry_reader();
    s.begin_connect().unwrap();
    s.handle(SessionEvent::Failed("connection refused".into()));

    assert_eq!(s.state(), SessionState::Failed);
    assert!(!s.success());
    assert!(s.handle(SessionEvent::Opened).is_empty());
    assert_eq!(s.state(), SessionState::Failed);
}

#[test]
fn publisher_open_requests_send_then_close() {
    let mut s = Session::new(URI, Publisher::new("MBOT_VEL_CMD", "twist2D_t", &Twist2D::default()));
    assert_eq!(s.role().envelope().msg_type, MessageType::Publish);
    assert_eq!(s.role().envelope().channel, "MBOT_VEL_CMD");
    s.begin_connect().unwrap();
    let actions = s.handle(SessionEvent::Opened);

    assert_eq!(actions.len(), 2);
    assert!(matches!(&actions[0], Action::Send(f) if f.starts_with(r#"{"type": 0,"#)));
    assert_eq!(actions[1], Action::Close);
}

#[tokio::test]
async fn unacknowledged_close_keeps_the_reply() {
    let t = MockTransport::new(Script {
        ignore_close: true,
        ..Script::replies(&[POSE_REPLY])
    });
    let mut s = odometry_reader().with_close_timeout(Duration::from_millis(20));
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(s.role().record().x, 1.5);
    assert_eq!(t.closes(), 1);
}

#[tokio::test]
async fn unacknowledged_close_after_publish_is_successful() {
    let t = MockTransport::new(Script {
        ignore_close: true,
        ..Script::default()
    });
    let mut s = Session::new(URI, Publisher::new("MBOT_VEL_CMD", "twist2D_t", &Twist2D::default()))
        .with_close_timeout(Duration::from_millis(20));
    s.run(&t).await.unwrap();

    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert_eq!(t.sent().len(), 1);
}

#[tokio::test]
async fn abort_during_close_handshake_keeps_outcome() {
    let t = MockTransport::new(Script {
        ignore_close: true,
        ..Script::replies(&[POSE_REPLY])
    });
    let mut s = odometry_reader().with_close_timeout(Duration::from_secs(60));
    let res = tokio::time::timeout(Duration::from_millis(50), s.run(&t)).await;
    assert!(res.is_err(), "run should still wait for the close handshake");

    s.abort(BridgeError::Transport("operation timed out".into()));
    assert!(s.success());
    assert_eq!(s.state(), SessionState::Closed);
    assert!(s.failure().is_none());
    assert_eq!(s.role().record().y, -2.0);
}

#[tokio::test]
async fn abort_before_reply_fails_the_session() {
    let t = MockTransport::new(Script::default());
    let mut s = odometry_reader();
    let res = tokio::time::timeout(Duration::from_millis(20), s.run(&t)).await;
    assert!(res.is_err());

    s.abort(BridgeError::Transport("operation timed out".into()));
    assert!(!s.success());
    assert_eq!(s.state(), SessionState::Failed);
    assert_eq!(s.failure().unwrap().code().as_str(), "TRANSPORT_FAILURE");
}

#[test]
fn abort_before_close_started_fails_even_when_closing() {
    // The publisher's close is queued but nothing has been sent yet.
    let mut s = Session::new(URI, Publisher::new("MBOT_VEL_CMD", "twist2D_t", &Twist2D::default()));
    s.begin_connect().unwrap();
    s.handle(SessionEvent::Opened);

    s.abort(BridgeError::Transport("operation timed out".into()));
    assert_eq!(s.state(), SessionState::Failed);
    assert!(!s.success());
}
