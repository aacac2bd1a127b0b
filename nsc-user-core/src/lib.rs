//! nsc-user-core: what a NATS user is allowed to do
//!
//! This crate holds the pure half of the credential creator:
//!
//! - [`config`]: the YAML configuration model describing a user's grants
//! - [`permissions`]: the mapping from that model to the publish/subscribe
//!   subject lists that end up in the signed user claim
//!
//! Nothing here touches keys, files or the network.
//!
//! ```
//! use nsc_user_core::{derive_permissions, UserConfig};
//!
//! let config = UserConfig::from_yaml_str(
//!     "allow_sub_over_consumer:\n  - name: c1\n    stream: s1\n",
//! )
//! .unwrap();
//!
//! let perms = derive_permissions(&config, true);
//! assert_eq!(perms.publish, ["$JS.ACK.s1.c1.>", "$JS.API.CONSUMER.MSG.NEXT.s1.c1"]);
//! assert_eq!(
//!     perms.subscribe,
//!     ["$JS.API.CONSUMER.INFO.s1.c1", "_INBOX.*", "_INBOX.*.*"]
//! );
//! ```

pub mod config;
pub mod permissions;

pub use config::{ConfigDecodeError, ConsumerBinding, UserConfig};
pub use permissions::{
    ack_subject, consumer_info_subject, derive_permissions, derive_permissions_with,
    msg_next_subject, ConsumerInfoPlacement, DeriveOptions, DerivedPermissions, INBOX_SUBJECTS,
};
