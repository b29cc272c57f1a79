//! Location probe scenarios: the echoed probe reply stays hidden.

mod common;

use chatline_core::config::LocationConfig;
use chatline_socket::location::provider_from_config;
use chatline_socket::session::{
    NOTICE_GEO_FAILED, NOTICE_GEO_NOT_SENT, NOTICE_GEO_PENDING, NOTICE_GEO_UNSUPPORTED,
};
use chatline_socket::{
    FixedLocation, LifecycleObserver, LinkDescriptor, LocationError, LocationProvider,
    MessageContent, NoLocation, Origin, Position,
};
use common::Harness;

struct FailingLocation;

impl LocationProvider for FailingLocation {
    fn current_position(&self) -> Result<Position, LocationError> {
        Err(LocationError::Unavailable("timed out".into()))
    }
}

fn remote_texts(h: &Harness) -> Vec<String> {
    h.sink
        .message_texts()
        .into_iter()
        .filter(|(_, origin)| *origin == Origin::Remote)
        .map(|(text, _)| text)
        .collect()
}

#[test]
fn test_probe_reply_is_swallowed_once() {
    let mut h = Harness::new();
    let id = h.connect_and_open();
    h.sink.clear();

    assert!(h.session.send_geo_probe(10.0, 20.0));
    assert_eq!(h.frames(), vec!["geo:10,20"]);

    h.session.on_message(id, "geo:10,20".into());
    h.session.on_message(id, "hello".into());

    let messages = h.sink.messages();
    assert_eq!(messages.len(), 2);
    assert_eq!(
        messages[0],
        (
            MessageContent::Link(LinkDescriptor::for_position(10.0, 20.0)),
            Origin::Local
        )
    );
    assert_eq!(
        messages[1],
        (MessageContent::text("hello"), Origin::Remote)
    );
    assert!(!h.session.is_probe_pending());
}

#[test]
fn test_probe_link_points_at_map() {
    let mut h = Harness::new();
    h.connect_and_open();
    h.sink.clear();

    h.session.send_geo_probe(48.858_37, 2.294_481);

    let (content, _) = h.sink.messages().remove(0);
    let MessageContent::Link(link) = content else {
        panic!("expected a link, got {content:?}");
    };
    assert_eq!(
        link.href,
        "https://www.openstreetmap.org/#map=18/48.85837/2.294481"
    );
    assert_eq!(link.label, "OpenStreetMap (48.85837, 2.29448)");
}

#[test]
fn test_frames_without_probe_are_all_delivered() {
    let mut h = Harness::new();
    let id = h.connect_and_open();
    h.sink.clear();

    for frame in ["one", "two", "geo:1,2"] {
        h.session.on_message(id, frame.into());
    }

    assert_eq!(remote_texts(&h), vec!["one", "two", "geo:1,2"]);
}

#[test]
fn test_second_probe_refused_while_first_pending() {
    let mut h = Harness::new();
    let id = h.connect_and_open();
    h.sink.clear();

    assert!(h.session.send_geo_probe(1.0, 2.0));
    assert!(!h.session.send_geo_probe(3.0, 4.0));
    assert_eq!(h.frames(), vec!["geo:1,2"]);
    assert_eq!(remote_texts(&h), vec![NOTICE_GEO_PENDING]);
    // Only the accepted probe shows a map link.
    let links: Vec<_> = h
        .sink
        .messages()
        .into_iter()
        .filter(|(content, _)| matches!(content, MessageContent::Link(_)))
        .collect();
    assert_eq!(
        links,
        vec![(
            MessageContent::Link(LinkDescriptor::for_position(1.0, 2.0)),
            Origin::Local
        )]
    );

    // Once the reply lands a new probe goes through.
    h.session.on_message(id, "geo:1,2".into());
    assert!(h.session.send_geo_probe(3.0, 4.0));
    assert_eq!(h.frames(), vec!["geo:1,2", "geo:3,4"]);
}

#[test]
fn test_probe_while_disconnected_is_not_sent() {
    let mut h = Harness::new();
    h.session.connect();

    assert!(!h.session.send_geo_probe(5.0, 6.0));

    assert!(h.frames().is_empty());
    assert!(!h.session.is_probe_pending());
    let messages = h.sink.message_texts();
    assert!(messages.contains(&("OpenStreetMap (5.00000, 6.00000)".to_string(), Origin::Local)));
    assert!(messages.contains(&(NOTICE_GEO_NOT_SENT.to_string(), Origin::Remote)));
}

#[test]
fn test_pending_probe_does_not_survive_reconnect() {
    let mut h = Harness::new();
    let first = h.connect_and_open();
    assert!(h.session.send_geo_probe(1.0, 1.0));

    h.session.on_close(first);
    h.fire_pending_timer();
    let second = h.open_current();
    h.sink.clear();

    h.session.on_message(second, "first frame after reconnect".into());
    assert_eq!(remote_texts(&h), vec!["first frame after reconnect"]);
}

#[test]
fn test_share_location_uses_provider() {
    let mut h = Harness::new();
    h.connect_and_open();

    let provider = FixedLocation(Position {
        latitude: 10.0,
        longitude: 20.0,
    });
    assert!(h.session.share_location(&provider));
    assert_eq!(h.frames(), vec!["geo:10,20"]);
}

#[test]
fn test_share_location_reports_each_failure_once() {
    let mut h = Harness::new();
    h.connect_and_open();
    h.sink.clear();

    assert!(!h.session.share_location(&NoLocation));
    assert!(!h.session.share_location(&FailingLocation));

    assert!(h.frames().is_empty());
    assert_eq!(
        remote_texts(&h),
        vec![NOTICE_GEO_UNSUPPORTED, NOTICE_GEO_FAILED]
    );
}

#[test]
fn test_configured_location_is_shared() {
    let mut h = Harness::new();
    h.connect_and_open();

    let configured = provider_from_config(&LocationConfig {
        latitude: Some(-33.5),
        longitude: Some(151.25),
    });
    assert!(h.session.share_location(configured.as_ref()));
    assert_eq!(h.frames(), vec!["geo:-33.5,151.25"]);

    let unset = provider_from_config(&LocationConfig::default());
    assert!(!h.session.share_location(unset.as_ref()));
}
