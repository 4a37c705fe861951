//! Broker messages → router → controller, the way the OTA worker runs them.

use mqtt_ota::adapters::log_sink::{
    MailboxPublisher, OUTBOX_DEPTH, OUTCOME_RESERVE, Outbound, TopicLogSink,
};
use mqtt_ota::app::events::OtaEvent;
use mqtt_ota::app::state::OtaState;
use mqtt_ota::config::OtaConfig;
use mqtt_ota::transport::codec::DecodeError;
use mqtt_ota::transport::mailbox::{InboundMessage, Mailbox};
use mqtt_ota::transport::router::{MessageRouter, Route};

use crate::mocks::{RecordingPublisher, RecordingSink, controller};

const CONTROL: &str = "dev/ota/control";
const FIRMWARE: &str = "dev/ota/firmware";

fn router() -> MessageRouter {
    MessageRouter::new(&OtaConfig::for_device("dev"))
}

#[test]
fn json_session_commits_image() {
    let router = router();
    let mut ota = controller(64 * 1024);
    let mut sink = RecordingSink::new();

    assert_eq!(
        router.dispatch(CONTROL, br#"{"type":"start","size":6}"#, &mut ota, &mut sink),
        Route::Control
    );
    assert_eq!(
        router.dispatch(FIRMWARE, b"abc", &mut ota, &mut sink),
        Route::Firmware
    );
    router.dispatch(FIRMWARE, b"def", &mut ota, &mut sink);
    router.dispatch(CONTROL, br#"{"type":"end"}"#, &mut ota, &mut sink);

    assert_eq!(ota.flash().committed(), Some(b"abcdef".to_vec()));
    assert!(ota.restart().requested());
    assert_eq!(sink.last(), Some(&OtaEvent::Completed { total_size: 6 }));
}

#[test]
fn malformed_control_is_reported_without_state_change() {
    let router = router();
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    router.dispatch(CONTROL, br#"{"type":"start","size":8}"#, &mut ota, &mut sink);
    sink.clear();

    router.dispatch(CONTROL, b"{not json", &mut ota, &mut sink);
    router.dispatch(CONTROL, br#"{"type":"reboot"}"#, &mut ota, &mut sink);

    assert_eq!(
        sink.events,
        vec![
            OtaEvent::MalformedCommand(DecodeError::InvalidJson),
            OtaEvent::MalformedCommand(DecodeError::UnknownType),
        ]
    );
    assert_eq!(
        sink.lines()[0],
        "Error: malformed control message (invalid JSON)"
    );
    assert_eq!(ota.state(), OtaState::started(8));
}

#[test]
fn start_without_size_is_rejected() {
    let router = router();
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    router.dispatch(CONTROL, br#"{"type":"start"}"#, &mut ota, &mut sink);
    assert_eq!(sink.lines(), vec!["Error: invalid firmware size (0)"]);
    assert_eq!(ota.state(), OtaState::idle());
}

#[test]
fn oversized_payload_is_dropped_before_the_controller() {
    let mut config = OtaConfig::for_device("dev");
    config.max_chunk_size = 4;
    let router = MessageRouter::new(&config);
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();

    router.dispatch(CONTROL, br#"{"type":"start","size":8}"#, &mut ota, &mut sink);
    router.dispatch(FIRMWARE, b"12345", &mut ota, &mut sink);

    assert_eq!(sink.last(), Some(&OtaEvent::ChunkTooLarge { len: 5, max: 4 }));
    assert_eq!(ota.state(), OtaState::started(8));
    assert_eq!(ota.flash().write_count(), 0);

    // The transfer carries on with conforming chunks.
    router.dispatch(FIRMWARE, b"1234", &mut ota, &mut sink);
    router.dispatch(FIRMWARE, b"5678", &mut ota, &mut sink);
    router.dispatch(CONTROL, br#"{"type":"end"}"#, &mut ota, &mut sink);
    assert_eq!(ota.flash().committed(), Some(b"12345678".to_vec()));
}

#[test]
fn foreign_topics_are_ignored() {
    let router = router();
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    for topic in ["dev/ota/log", "other/ota/control", "dev/ota/control/extra"] {
        assert_eq!(
            router.dispatch(topic, br#"{"type":"start","size":8}"#, &mut ota, &mut sink),
            Route::Ignored
        );
    }
    assert!(sink.events.is_empty());
    assert_eq!(ota.state(), OtaState::idle());
}

#[test]
fn log_topic_carries_the_transfer() {
    let config = OtaConfig::for_device("dev");
    let router = MessageRouter::new(&config);
    let mut ota = controller(4096);
    let mut sink = TopicLogSink::new(RecordingPublisher::default(), config.topics.log.clone());

    router.dispatch(CONTROL, br#"{"type":"start","size":4}"#, &mut ota, &mut sink);
    router.dispatch(FIRMWARE, b"abcd", &mut ota, &mut sink);
    router.dispatch(CONTROL, br#"{"type":"end"}"#, &mut ota, &mut sink);

    let published = &sink.publisher().published;
    assert_eq!(published.len(), 2);
    assert!(published.iter().all(|(topic, _)| topic == "dev/ota/log"));
    assert_eq!(published[0].1, "OTA started, total size = 4");
    assert!(published[1].1.starts_with("OTA Success"));
}

#[test]
fn worker_drains_mailbox_in_order() {
    let inbox: Mailbox<InboundMessage, 4> = Mailbox::new();
    let msg = |topic: &str, payload: &[u8]| InboundMessage {
        topic: topic.into(),
        payload: payload.to_vec(),
    };
    inbox.post(msg(CONTROL, br#"{"type":"start","size":4}"#));
    inbox.post(msg(FIRMWARE, b"ab"));
    inbox.post(msg(FIRMWARE, b"cd"));
    inbox.post(msg(CONTROL, br#"{"type":"end"}"#));

    let router = router();
    let mut ota = controller(4096);
    let mut sink = RecordingSink::new();
    while let Some(m) = inbox.try_next() {
        router.dispatch(&m.topic, &m.payload, &mut ota, &mut sink);
    }
    assert_eq!(ota.flash().committed(), Some(b"abcd".to_vec()));
}

#[test]
fn success_line_survives_a_stalled_publisher() {
    static LINES: Mailbox<Outbound, OUTBOX_DEPTH> = Mailbox::new();
    let mut config = OtaConfig::for_device("dev");
    config.max_chunk_size = 64;
    let router = MessageRouter::new(&config);
    let mut ota = controller(4096);
    let mut sink = TopicLogSink::new(MailboxPublisher::new(&LINES), config.topics.log.clone());

    router.dispatch(CONTROL, br#"{"type":"start","size":640}"#, &mut ota, &mut sink);
    for _ in 0..10 {
        router.dispatch(FIRMWARE, &[0x5A; 64], &mut ota, &mut sink);
        router.dispatch(FIRMWARE, &[0xA5; 65], &mut ota, &mut sink);
    }
    router.dispatch(CONTROL, br#"{"type":"end"}"#, &mut ota, &mut sink);
    assert_eq!(ota.state(), OtaState::idle());
    assert!(ota.restart().requested());

    // Nothing drained the outbox while the transfer ran.
    let lines: Vec<String> = std::iter::from_fn(|| LINES.try_next())
        .filter_map(|item| match item {
            Outbound::Line { message, .. } => Some(message),
            Outbound::Subscribe => None,
        })
        .collect();
    assert_eq!(lines.len(), OUTBOX_DEPTH - OUTCOME_RESERVE + 1);
    assert_eq!(lines[0], "OTA started, total size = 640");
    assert!(lines[1..lines.len() - 1].iter().all(|l| l.starts_with("Error: chunk of 65 bytes")));
    assert!(lines.last().is_some_and(|l| l.starts_with("OTA Success")));
    assert!(lines.iter().all(|l| !l.starts_with("Received chunk")));
}

#[test]
fn failure_line_survives_a_stalled_publisher() {
    static LINES: Mailbox<Outbound, OUTBOX_DEPTH> = Mailbox::new();
    let mut config = OtaConfig::for_device("dev");
    config.max_chunk_size = 8;
    let router = MessageRouter::new(&config);
    let mut ota = controller(4096);
    let mut sink = TopicLogSink::new(MailboxPublisher::new(&LINES), config.topics.log.clone());

    router.dispatch(CONTROL, br#"{"type":"start","size":64}"#, &mut ota, &mut sink);
    for _ in 0..OUTBOX_DEPTH {
        router.dispatch(FIRMWARE, &[0u8; 9], &mut ota, &mut sink);
    }
    router.dispatch(FIRMWARE, b"12345678", &mut ota, &mut sink);
    router.dispatch(CONTROL, br#"{"type":"end"}"#, &mut ota, &mut sink);

    let last = std::iter::from_fn(|| LINES.try_next()).last();
    match last {
        Some(Outbound::Line { message, .. }) => {
            assert!(message.starts_with("Error: verification failed"), "{message}");
        }
        other => panic!("unexpected outbox tail {other:?}"),
    }
}
