use super::Broker;
use super::message::Message;
use super::registry::{ClientRegistry, ConnectionKey};
use super::subscriptions::{SubscriptionIndex, Topic, filter_matches};
use crate::config::BrokerSettings;
use crate::utils::error::BrokerError;
use tokio::sync::mpsc;
use tokio::sync::mpsc::UnboundedReceiver;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

fn connect(broker: &mut Broker, id: &str) -> (ConnectionKey, UnboundedReceiver<WsMessage>) {
    let (tx, rx) = mpsc::unbounded_channel::<WsMessage>();
    let key = broker.handle_connect(id, tx).unwrap();
    (key, rx)
}

fn recv_message(rx: &mut UnboundedReceiver<WsMessage>) -> Message {
    match rx.try_recv().unwrap() {
        WsMessage::Text(text) => serde_json::from_str(&text).unwrap(),
        other => panic!("expected a text frame, got {other:?}"),
    }
}

#[test]
fn test_topic_subscribe_and_unsubscribe() {
    let mut topic = Topic::new("room/1");
    let key = Uuid::new_v4();

    topic.subscribe(key);
    topic.subscribe(key);
    assert_eq!(topic.subscribers.len(), 1);

    topic.unsubscribe(&key);
    assert!(topic.is_empty());
    topic.unsubscribe(&key);
    assert!(topic.is_empty());
}

#[test]
fn test_filter_matching_rules() {
    assert!(filter_matches("room/1", "room/1"));
    assert!(!filter_matches("room/1", "room/2"));
    assert!(!filter_matches("room/1", "room/1/light"));

    assert!(filter_matches("room/+", "room/1"));
    assert!(filter_matches("room/+/light", "room/1/light"));
    assert!(!filter_matches("room/+", "room/1/light"));
    assert!(!filter_matches("room/+", "room"));

    assert!(filter_matches("#", "room/1/light"));
    assert!(filter_matches("room/#", "room/1/light"));
    assert!(filter_matches("room/#", "room"));
    assert!(!filter_matches("room/#", "hall"));

    // '#' anywhere but last matches nothing
    assert!(!filter_matches("#/light", "room/light"));
}

#[test]
fn test_index_subscribe_unsubscribe_net_effect() {
    let mut index = SubscriptionIndex::new(false);
    let key = Uuid::new_v4();

    index.subscribe("room/1", key);
    index.subscribe("room/1", key);
    index.unsubscribe("room/1", &key);
    assert!(index.matching_subscribers("room/1").is_empty());

    index.unsubscribe("room/1", &key);
    index.unsubscribe("never-seen", &key);
    assert!(index.is_empty());
}

#[test]
fn test_index_drops_empty_topics() {
    let mut index = SubscriptionIndex::new(false);
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();

    index.subscribe("room/1", a);
    index.subscribe("room/1", b);
    index.unsubscribe("room/1", &a);
    assert!(index.topic("room/1").is_some());

    index.unsubscribe("room/1", &b);
    assert!(index.topic("room/1").is_none());
    assert!(index.is_empty());
}

#[test]
fn test_index_remove_client_purges_every_topic() {
    let mut index = SubscriptionIndex::new(false);
    let key = Uuid::new_v4();
    let other = Uuid::new_v4();

    index.subscribe("room/1", key);
    index.subscribe("room/2", key);
    index.subscribe("room/2", other);

    index.remove_client(&key);
    assert!(index.matching_subscribers("room/1").is_empty());
    assert_eq!(index.matching_subscribers("room/2").len(), 1);
    assert!(index.topic("room/1").is_none());
}

#[test]
fn test_index_wildcard_matching_can_be_disabled() {
    let mut exact = SubscriptionIndex::new(false);
    let key = Uuid::new_v4();
    exact.subscribe("room/+", key);
    assert!(exact.matching_subscribers("room/1").is_empty());
    assert_eq!(exact.matching_subscribers("room/+").len(), 1);

    let mut wild = SubscriptionIndex::new(true);
    wild.subscribe("room/+", key);
    assert_eq!(wild.matching_subscribers("room/1").len(), 1);
}

#[test]
fn test_index_overlapping_filters_yield_each_key_once() {
    let mut index = SubscriptionIndex::new(true);
    let key = Uuid::new_v4();

    index.subscribe("room/1", key);
    index.subscribe("room/+", key);
    index.subscribe("room/#", key);

    assert_eq!(index.matching_subscribers("room/1").len(), 1);
}

#[test]
fn test_registry_connect_allocates_distinct_keys() {
    let mut registry = ClientRegistry::new(100);
    let mut keys = std::collections::HashSet::new();
    for _ in 0..100 {
        let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
        keys.insert(registry.connect("lamp", tx).unwrap());
    }
    assert_eq!(keys.len(), 100);
    assert_eq!(registry.len(), 100);
}

#[test]
fn test_registry_refuses_beyond_connection_limit() {
    let mut registry = ClientRegistry::new(1);
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    let key = registry.connect("first", tx).unwrap();

    let (tx2, _rx2) = mpsc::unbounded_channel::<WsMessage>();
    let err = registry.connect("second", tx2).unwrap_err();
    assert!(matches!(err, BrokerError::ConnectionLimit { limit: 1 }));

    // the refusal frees nothing and corrupts nothing
    assert!(registry.contains(&key));

    // a slot opens up again after a disconnect
    registry.disconnect(&key);
    let (tx3, _rx3) = mpsc::unbounded_channel::<WsMessage>();
    assert!(registry.connect("third", tx3).is_ok());
}

#[test]
fn test_registry_disconnect_is_idempotent() {
    let mut registry = ClientRegistry::new(10);
    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    let key = registry.connect("lamp", tx).unwrap();

    registry.disconnect(&key);
    registry.disconnect(&key);
    registry.disconnect(&Uuid::new_v4());
    assert!(registry.is_empty());
}

#[test]
fn test_publish_with_no_subscribers_delivers_nothing() {
    let mut broker = Broker::default();
    let (_key, mut rx) = connect(&mut broker, "lamp");

    let delivered = broker.handle_publish("room/1", "on".to_string(), 0);
    assert_eq!(delivered, 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_room_scenario_fanout_and_disconnect() {
    let mut broker = Broker::default();
    let (key_a, mut rx_a) = connect(&mut broker, "lamp-a");
    let (key_b, mut rx_b) = connect(&mut broker, "lamp-b");

    broker.handle_subscribe("room/1", key_a);
    broker.handle_subscribe("room/1", key_b);

    // publisher is subscribed, so it hears its own publish
    let delivered = broker.handle_publish("room/1", "on".to_string(), 0);
    assert_eq!(delivered, 2);
    assert_eq!(recv_message(&mut rx_a).payload, "on");
    assert_eq!(recv_message(&mut rx_b).payload, "on");

    broker.handle_disconnect(&key_b);

    let delivered = broker.handle_publish("room/1", "off".to_string(), 0);
    assert_eq!(delivered, 1);
    assert_eq!(recv_message(&mut rx_a).payload, "off");
    assert!(rx_b.try_recv().is_err());
}

#[test]
fn test_subscribe_then_unsubscribe_yields_no_delivery() {
    let mut broker = Broker::default();
    let (key, mut rx) = connect(&mut broker, "lamp");

    broker.handle_subscribe("a/b", key);
    broker.handle_unsubscribe("a/b", &key);

    assert_eq!(broker.handle_publish("a/b", "ping".to_string(), 0), 0);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_resubscribe_does_not_duplicate_delivery() {
    let mut broker = Broker::default();
    let (key, mut rx) = connect(&mut broker, "lamp");

    broker.handle_subscribe("room/1", key);
    broker.handle_subscribe("room/1", key);

    assert_eq!(broker.handle_publish("room/1", "on".to_string(), 0), 1);
    recv_message(&mut rx);
    assert!(rx.try_recv().is_err());
}

#[test]
fn test_disconnect_purges_subscriber_from_every_topic() {
    let mut broker = Broker::default();
    let (key, _rx) = connect(&mut broker, "lamp");

    broker.handle_subscribe("room/1", key);
    broker.handle_subscribe("room/2", key);
    broker.handle_subscribe("hall/#", key);

    broker.handle_disconnect(&key);

    for topic in ["room/1", "room/2", "hall/1"] {
        assert!(!broker.subscriptions.matching_subscribers(topic).contains(&key));
    }
    assert!(broker.subscriptions.is_empty());
    assert!(broker.registry.is_empty());
}

#[test]
fn test_disconnect_is_idempotent_at_the_dispatcher() {
    let mut broker = Broker::default();
    let (key, _rx) = connect(&mut broker, "lamp");
    broker.handle_subscribe("room/1", key);

    broker.handle_disconnect(&key);
    broker.handle_disconnect(&key);
    broker.handle_disconnect(&Uuid::new_v4());
    assert!(broker.registry.is_empty());
}

#[test]
fn test_stale_reference_is_skipped_and_purged() {
    let mut broker = Broker::default();
    let (key, mut rx) = connect(&mut broker, "lamp");
    broker.handle_subscribe("room/1", key);

    // Drop the registry record out from under the index, as a racing
    // transport-level disconnect would.
    broker.registry.disconnect(&key);

    assert_eq!(broker.handle_publish("room/1", "on".to_string(), 0), 0);
    assert!(rx.try_recv().is_err());
    assert!(broker.subscriptions.topic("room/1").is_none());
}

#[test]
fn test_delivery_failure_does_not_abort_fanout() {
    let mut broker = Broker::default();
    let (key_a, rx_a) = connect(&mut broker, "lamp-a");
    let (key_b, mut rx_b) = connect(&mut broker, "lamp-b");

    broker.handle_subscribe("room/1", key_a);
    broker.handle_subscribe("room/1", key_b);

    // Close A's channel; its delivery fails but B still gets the message.
    drop(rx_a);

    assert_eq!(broker.handle_publish("room/1", "on".to_string(), 0), 1);
    assert_eq!(recv_message(&mut rx_b).payload, "on");
}

#[test]
fn test_publish_stamps_timestamp_and_carries_qos() {
    let mut broker = Broker::default();
    let (key, mut rx) = connect(&mut broker, "lamp");
    broker.handle_subscribe("room/1", key);

    broker.handle_publish("room/1", "on".to_string(), 1);
    let msg = recv_message(&mut rx);
    assert_eq!(msg.topic, "room/1");
    assert_eq!(msg.qos, 1);
    assert!(msg.timestamp > 0);
}

#[test]
fn test_broker_connection_limit_from_settings() {
    let settings = BrokerSettings {
        max_connections: 1,
        wildcard_subscriptions: true,
    };
    let mut broker = Broker::new(&settings);

    let (tx, _rx) = mpsc::unbounded_channel::<WsMessage>();
    broker.handle_connect("first", tx).unwrap();

    let (tx2, _rx2) = mpsc::unbounded_channel::<WsMessage>();
    assert!(matches!(
        broker.handle_connect("second", tx2),
        Err(BrokerError::ConnectionLimit { limit: 1 })
    ));
}
