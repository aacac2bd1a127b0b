//! Subject permission derivation
//!
//! Turns a [`UserConfig`] into the two subject lists carried by the user
//! claim. Output order is fixed so the same configuration always yields the
//! same claim:
//!
//! ```text
//! publish   = allow_pub ++ for each binding: [ACK, MSG.NEXT]
//! subscribe = allow_sub ++ for each binding: [INFO] ++ inbox (once)
//! ```
//!
//! The inbox pair is appended only when at least one consumer binding exists
//! and inbox escalation is enabled. Nothing is sorted or deduplicated here.
//!
//! The JetStream subject templates below are what the server checks against;
//! they must not change.

use crate::config::{ConsumerBinding, UserConfig};

/// Subscribe subjects granted for request/reply inboxes
pub const INBOX_SUBJECTS: [&str; 2] = ["_INBOX.*", "_INBOX.*.*"];

/// `$JS.ACK.<stream>.<consumer>.>`
pub fn ack_subject(binding: &ConsumerBinding) -> String {
    format!("$JS.ACK.{}.{}.>", binding.stream, binding.name)
}

/// `$JS.API.CONSUMER.MSG.NEXT.<stream>.<consumer>`
pub fn msg_next_subject(binding: &ConsumerBinding) -> String {
    format!("$JS.API.CONSUMER.MSG.NEXT.{}.{}", binding.stream, binding.name)
}

/// `$JS.API.CONSUMER.INFO.<stream>.<consumer>`
pub fn consumer_info_subject(binding: &ConsumerBinding) -> String {
    format!("$JS.API.CONSUMER.INFO.{}.{}", binding.stream, binding.name)
}

/// Which list receives the consumer INFO subject
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConsumerInfoPlacement {
    /// One INFO subject per binding after the explicit subscribe grants
    #[default]
    Subscribe,

    /// INFO follows ACK and MSG.NEXT in each binding's publish block
    Publish,
}

impl ConsumerInfoPlacement {
    /// Lowercase identifier used on the command line
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Subscribe => "subscribe",
            Self::Publish => "publish",
        }
    }
}

impl std::str::FromStr for ConsumerInfoPlacement {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "subscribe" | "sub" => Ok(Self::Subscribe),
            "publish" | "pub" => Ok(Self::Publish),
            other => Err(format!(
                "unknown consumer info placement '{}' (expected 'subscribe' or 'publish')",
                other
            )),
        }
    }
}

impl std::fmt::Display for ConsumerInfoPlacement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Knobs for [`derive_permissions_with`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeriveOptions {
    /// Grant `_INBOX.*` and `_INBOX.*.*` when any consumer is bound
    pub lower_inbox_permissions: bool,

    /// Where the consumer INFO subject goes
    pub consumer_info: ConsumerInfoPlacement,
}

impl DeriveOptions {
    /// Options with the given inbox flag and the default INFO placement
    pub fn new(lower_inbox_permissions: bool) -> Self {
        Self {
            lower_inbox_permissions,
            consumer_info: ConsumerInfoPlacement::default(),
        }
    }

    /// Override the INFO placement
    pub fn with_consumer_info(mut self, placement: ConsumerInfoPlacement) -> Self {
        self.consumer_info = placement;
        self
    }
}

/// Publish and subscribe subjects for one user, in grant order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivedPermissions {
    /// Subjects the user may publish to
    pub publish: Vec<String>,

    /// Subjects the user may subscribe to
    pub subscribe: Vec<String>,
}

/// Derive the subject lists for `config`.
///
/// Uses [`ConsumerInfoPlacement::Subscribe`]; see [`derive_permissions_with`]
/// for the other placement.
pub fn derive_permissions(config: &UserConfig, lower_inbox_permissions: bool) -> DerivedPermissions {
    derive_permissions_with(config, &DeriveOptions::new(lower_inbox_permissions))
}

/// Derive the subject lists for `config` with explicit options.
pub fn derive_permissions_with(config: &UserConfig, options: &DeriveOptions) -> DerivedPermissions {
    let consumers = &config.allow_sub_over_consumer;

    let mut publish = Vec::with_capacity(config.allow_pub.len() + consumers.len() * 3);
    let mut subscribe =
        Vec::with_capacity(config.allow_sub.len() + consumers.len() + INBOX_SUBJECTS.len());

    publish.extend(config.allow_pub.iter().cloned());
    subscribe.extend(config.allow_sub.iter().cloned());

    for binding in consumers {
        publish.push(ack_subject(binding));
        publish.push(msg_next_subject(binding));
        match options.consumer_info {
            ConsumerInfoPlacement::Publish => publish.push(consumer_info_subject(binding)),
            ConsumerInfoPlacement::Subscribe => subscribe.push(consumer_info_subject(binding)),
        }
    }

    if config.has_consumers() && options.lower_inbox_permissions {
        subscribe.extend(INBOX_SUBJECTS.iter().map(|s| s.to_string()));
    }

    DerivedPermissions { publish, subscribe }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn consumers(bindings: &[(&str, &str)]) -> UserConfig {
        UserConfig {
            allow_sub_over_consumer: bindings
                .iter()
                .map(|(name, stream)| ConsumerBinding::new(*name, *stream))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_config() {
        for flag in [true, false] {
            let perms = derive_permissions(&UserConfig::default(), flag);
            assert!(perms.publish.is_empty());
            assert!(perms.subscribe.is_empty());
        }
    }

    #[test]
    fn test_explicit_grants_pass_through() {
        let config = UserConfig {
            allow_pub: vec!["b.>".into(), "a.*".into(), "b.>".into()],
            allow_sub: vec!["z".into(), "y".into()],
            ..Default::default()
        };

        let perms = derive_permissions(&config, true);
        assert_eq!(perms.publish, vec!["b.>", "a.*", "b.>"]);
        assert_eq!(perms.subscribe, vec!["z", "y"]);
    }

    #[test]
    fn test_single_consumer_without_inbox() {
        let perms = derive_permissions(&consumers(&[("c1", "s1")]), false);
        assert_eq!(
            perms.publish,
            vec!["$JS.ACK.s1.c1.>", "$JS.API.CONSUMER.MSG.NEXT.s1.c1"]
        );
        assert_eq!(perms.subscribe, vec!["$JS.API.CONSUMER.INFO.s1.c1"]);
    }

    #[test]
    fn test_single_consumer_with_inbox() {
        let perms = derive_permissions(&consumers(&[("c1", "s1")]), true);
        assert_eq!(
            perms.publish,
            vec!["$JS.ACK.s1.c1.>", "$JS.API.CONSUMER.MSG.NEXT.s1.c1"]
        );
        assert_eq!(
            perms.subscribe,
            vec!["$JS.API.CONSUMER.INFO.s1.c1", "_INBOX.*", "_INBOX.*.*"]
        );
    }

    #[test]
    fn test_no_inbox_without_consumers() {
        let config = UserConfig {
            allow_sub: vec!["events.>".into()],
            ..Default::default()
        };
        let perms = derive_permissions(&config, true);
        assert_eq!(perms.subscribe, vec!["events.>"]);
    }

    #[test]
    fn test_multiple_consumers_single_inbox_block() {
        let perms = derive_permissions(&consumers(&[("c1", "s1"), ("c2", "s2")]), true);

        assert_eq!(
            perms.publish,
            vec![
                "$JS.ACK.s1.c1.>",
                "$JS.API.CONSUMER.MSG.NEXT.s1.c1",
                "$JS.ACK.s2.c2.>",
                "$JS.API.CONSUMER.MSG.NEXT.s2.c2",
            ]
        );
        assert_eq!(
            perms.subscribe,
            vec![
                "$JS.API.CONSUMER.INFO.s1.c1",
                "$JS.API.CONSUMER.INFO.s2.c2",
                "_INBOX.*",
                "_INBOX.*.*",
            ]
        );
    }

    #[test]
    fn test_explicit_grants_precede_derived() {
        let mut config = consumers(&[("worker1", "ORDERS")]);
        config.allow_pub = vec!["orders.>".into()];
        config.allow_sub = vec!["status.*".into()];

        let perms = derive_permissions(&config, true);
        assert_eq!(perms.publish[0], "orders.>");
        assert_eq!(perms.subscribe[0], "status.*");
        assert_eq!(perms.publish.len(), 3);
        assert_eq!(perms.subscribe.len(), 4);
    }

    #[test]
    fn test_duplicates_are_kept() {
        let mut config = consumers(&[("c1", "s1")]);
        config.allow_pub = vec!["$JS.ACK.s1.c1.>".into()];

        let perms = derive_permissions(&config, false);
        assert_eq!(
            perms.publish,
            vec![
                "$JS.ACK.s1.c1.>",
                "$JS.ACK.s1.c1.>",
                "$JS.API.CONSUMER.MSG.NEXT.s1.c1",
            ]
        );
    }

    #[test]
    fn test_empty_binding_fields_pass_through() {
        let perms = derive_permissions(&consumers(&[("consumer", "")]), false);
        assert_eq!(perms.publish[0], "$JS.ACK..consumer.>");
        assert_eq!(perms.subscribe, vec!["$JS.API.CONSUMER.INFO..consumer"]);
    }

    #[test]
    fn test_repeated_derivation_is_stable() {
        let mut config = consumers(&[("c1", "s1"), ("c2", "s2")]);
        config.allow_pub = vec!["x".into()];

        let first = derive_permissions(&config, true);
        for _ in 0..10 {
            assert_eq!(derive_permissions(&config, true), first);
        }
    }

    #[test]
    fn test_info_on_publish_side() {
        let options = DeriveOptions::new(true).with_consumer_info(ConsumerInfoPlacement::Publish);
        let perms = derive_permissions_with(&consumers(&[("c1", "s1"), ("c2", "s2")]), &options);

        assert_eq!(
            perms.publish,
            vec![
                "$JS.ACK.s1.c1.>",
                "$JS.API.CONSUMER.MSG.NEXT.s1.c1",
                "$JS.API.CONSUMER.INFO.s1.c1",
                "$JS.ACK.s2.c2.>",
                "$JS.API.CONSUMER.MSG.NEXT.s2.c2",
                "$JS.API.CONSUMER.INFO.s2.c2",
            ]
        );
        assert_eq!(perms.subscribe, vec!["_INBOX.*", "_INBOX.*.*"]);
    }

    #[test]
    fn test_placement_parse() {
        assert_eq!(
            "publish".parse::<ConsumerInfoPlacement>().unwrap(),
            ConsumerInfoPlacement::Publish
        );
        assert_eq!(
            " Subscribe ".parse::<ConsumerInfoPlacement>().unwrap(),
            ConsumerInfoPlacement::Subscribe
        );
        assert!("both".parse::<ConsumerInfoPlacement>().is_err());
        assert_eq!(ConsumerInfoPlacement::default().to_string(), "subscribe");
    }
}
