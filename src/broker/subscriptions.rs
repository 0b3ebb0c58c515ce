//! Topic subscription index
//!
//! Maps subscription filters to subscriber sets. Entries are created lazily
//! on first subscribe and dropped when the last subscriber leaves, so an
//! empty topic never takes part in matching.
//!
//! Concurrency note: callers must synchronize access (for example via the
//! broker lock) when modifying subscriptions.

use std::collections::{HashMap, HashSet};

use crate::broker::registry::ConnectionKey;

/// A named channel and the set of connections subscribed to it.
#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashSet<ConnectionKey>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashSet::new(),
        }
    }

    /// Add a subscriber to the topic. Duplicate adds are ignored.
    pub fn subscribe(&mut self, key: ConnectionKey) {
        self.subscribers.insert(key);
    }

    /// Remove a subscriber from the topic.
    pub fn unsubscribe(&mut self, key: &ConnectionKey) {
        self.subscribers.remove(key);
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}

#[derive(Debug)]
pub struct SubscriptionIndex {
    topics: HashMap<String, Topic>,
    wildcard_filters: bool,
}

impl SubscriptionIndex {
    /// `wildcard_filters` enables MQTT filter matching (`+`, `#`); when off,
    /// subscriptions match publish topics by exact name only.
    pub fn new(wildcard_filters: bool) -> Self {
        Self {
            topics: HashMap::new(),
            wildcard_filters,
        }
    }

    /// Adds `key` to the subscriber set of `filter`, creating the entry if
    /// absent. Subscribing twice is a no-op.
    pub fn subscribe(&mut self, filter: &str, key: ConnectionKey) {
        self.topics
            .entry(filter.to_string())
            .or_insert_with(|| Topic::new(filter))
            .subscribe(key);
    }

    /// Removes `key` from `filter`'s subscriber set. Unknown filters and
    /// non-subscribers are a no-op. Drops the entry when it becomes empty.
    pub fn unsubscribe(&mut self, filter: &str, key: &ConnectionKey) {
        if let Some(topic) = self.topics.get_mut(filter) {
            topic.unsubscribe(key);
            if topic.is_empty() {
                self.topics.remove(filter);
            }
        }
    }

    /// Purges `key` from every entry. Called once per disconnecting client,
    /// before its registry record is dropped.
    pub fn remove_client(&mut self, key: &ConnectionKey) {
        self.topics.retain(|_, topic| {
            topic.unsubscribe(key);
            !topic.is_empty()
        });
    }

    /// Point-in-time snapshot of every connection whose filter matches the
    /// published `topic`. Empty set, never an error, when nothing matches.
    /// Each key appears at most once even when several of its filters match.
    pub fn matching_subscribers(&self, topic: &str) -> HashSet<ConnectionKey> {
        let mut matched = HashSet::new();
        for (filter, entry) in &self.topics {
            let hit = if self.wildcard_filters {
                filter_matches(filter, topic)
            } else {
                filter == topic
            };
            if hit {
                matched.extend(entry.subscribers.iter().copied());
            }
        }
        matched
    }

    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.get(name)
    }

    pub fn len(&self) -> usize {
        self.topics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.topics.is_empty()
    }
}

/// MQTT filter matching: `+` matches exactly one segment, `#` matches the
/// parent level and everything below it and is only valid as the last
/// segment. A filter with a misplaced `#` matches nothing.
pub fn filter_matches(filter: &str, topic: &str) -> bool {
    let mut filter_parts = filter.split('/');
    let mut topic_parts = topic.split('/');

    loop {
        match (filter_parts.next(), topic_parts.next()) {
            (Some("#"), _) => return filter_parts.next().is_none(),
            (Some("+"), Some(_)) => {}
            (Some(segment), Some(name)) => {
                if segment != name {
                    return false;
                }
            }
            (Some(_), None) | (None, Some(_)) => return false,
            (None, None) => return true,
        }
    }
}
