//! User configuration model
//!
//! The YAML document an operator writes to describe one NATS user:
//!
//! ```yaml
//! account: ORDERS_ACCOUNT        # informational only
//! name: alice                    # copied into the issued claim
//! allow_pub:
//!   - orders.>
//! allow_sub:
//!   - status.*
//! allow_sub_over_consumer:
//!   - name: worker1
//!     stream: ORDERS
//! ```
//!
//! Every key is optional. Defaults per field:
//!
//! | Key                       | Default |
//! |---------------------------|---------|
//! | `account`                 | `""`    |
//! | `name`                    | `""`    |
//! | `allow_pub`               | `[]`    |
//! | `allow_sub`               | `[]`    |
//! | `allow_sub_over_consumer` | `[]`    |
//! | binding `name`/`stream`   | `""`    |
//!
//! An explicit `null` behaves like an absent key and unknown keys are ignored.
//! Only the shape is checked: subjects are opaque strings, and empty consumer
//! names, duplicates or overlapping grants all pass through untouched.

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

/// Root of the user configuration document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserConfig {
    /// Account label, never used for derivation
    #[serde(default, deserialize_with = "null_as_default")]
    pub account: String,

    /// Display name copied verbatim into the claim
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Explicit publish grants, in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_pub: Vec<String>,

    /// Explicit subscribe grants, in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_sub: Vec<String>,

    /// JetStream consumers the user pulls from
    #[serde(default, deserialize_with = "null_as_default")]
    pub allow_sub_over_consumer: Vec<ConsumerBinding>,
}

/// A JetStream consumer and the stream it belongs to
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConsumerBinding {
    /// Consumer name
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,

    /// Parent stream name
    #[serde(default, deserialize_with = "null_as_default")]
    pub stream: String,
}

impl ConsumerBinding {
    /// Create a binding for `name` on `stream`
    pub fn new(name: impl Into<String>, stream: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stream: stream.into(),
        }
    }
}

impl UserConfig {
    /// Decode a configuration document.
    ///
    /// A blank (or comment-only) document and a bare `null` both decode to
    /// [`UserConfig::default`]. When the text holds several `---` separated
    /// documents only the first is read.
    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigDecodeError> {
        if is_blank_document(text) {
            return Ok(Self::default());
        }

        let Some(document) = serde_yaml::Deserializer::from_str(text).next() else {
            return Ok(Self::default());
        };
        let decoded = Option::<Self>::deserialize(document)?;
        Ok(decoded.unwrap_or_default())
    }

    /// Decode a configuration document from raw bytes.
    pub fn from_yaml_slice(bytes: &[u8]) -> Result<Self, ConfigDecodeError> {
        let text = std::str::from_utf8(bytes).map_err(|err| ConfigDecodeError {
            message: format!("document is not valid UTF-8: {}", err),
            location: None,
        })?;
        Self::from_yaml_str(text)
    }

    /// Whether any consumer binding is configured.
    ///
    /// This is the only trigger for inbox escalation.
    pub fn has_consumers(&self) -> bool {
        !self.allow_sub_over_consumer.is_empty()
    }
}

/// The configuration text is not a well-formed user configuration
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid user configuration: {message}")]
pub struct ConfigDecodeError {
    message: String,
    location: Option<(usize, usize)>,
}

impl ConfigDecodeError {
    /// Decoder message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// 1-based line of the offending value, if the decoder reported one
    pub fn line(&self) -> Option<usize> {
        self.location.map(|(line, _)| line)
    }

    /// 1-based column of the offending value, if the decoder reported one
    pub fn column(&self) -> Option<usize> {
        self.location.map(|(_, column)| column)
    }
}

impl From<serde_yaml::Error> for ConfigDecodeError {
    fn from(err: serde_yaml::Error) -> Self {
        Self {
            location: err.location().map(|loc| (loc.line(), loc.column())),
            message: err.to_string(),
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

fn is_blank_document(text: &str) -> bool {
    text.lines().all(|line| {
        let line = line.trim();
        line.is_empty() || line.starts_with('#') || line == "---"
    })
}
