//! Run settings
//!
//! Every setting has three possible sources, highest priority first:
//!
//! 1. command-line flags ([`FlagValues`])
//! 2. environment variables ([`EnvSource`]), named `NSC_USER_CREATOR_<FLAG>`
//! 3. built-in [`Defaults`]
//!
//! [`Settings::resolve`] merges them once at startup into an immutable
//! [`Settings`]. Nothing else in the crate reads the process environment.
//!
//! | Flag                        | Environment variable                          | Default           |
//! |-----------------------------|-----------------------------------------------|-------------------|
//! | `--config-file`             | `NSC_USER_CREATOR_CONFIG_FILE`                | `nsc_user.yml`    |
//! | `--creds-file-target`       | `NSC_USER_CREATOR_CREDS_FILE_TARGET`          | `nats-user.creds` |
//! | `--account-seed`            | `NSC_USER_CREATOR_ACCOUNT_SEED`               | required          |
//! | `--lower-inbox-permissions` | `NSC_USER_CREATOR_LOWER_INBOX_PERMISSIONS`    | `true`            |
//! | `--consumer-info-permission`| `NSC_USER_CREATOR_CONSUMER_INFO_PERMISSION`   | `subscribe`       |
//! | `--log-format`              | `NSC_USER_CREATOR_LOG_FORMAT`                 | `compact`         |

use std::collections::HashMap;
use std::ffi::OsString;
use std::path::PathBuf;
use std::str::FromStr;

use nsc_user_core::{ConsumerInfoPlacement, DeriveOptions};
use thiserror::Error;

use crate::tracing_support::TracingFormat;

/// Prefix shared by every environment variable the tool reads
pub const ENV_PREFIX: &str = "NSC_USER_CREATOR";

pub const FLAG_CONFIG_FILE: &str = "config_file";
pub const FLAG_CREDS_FILE_TARGET: &str = "creds_file_target";
pub const FLAG_ACCOUNT_SEED: &str = "account_seed";
pub const FLAG_LOWER_INBOX_PERMISSIONS: &str = "lower_inbox_permissions";
pub const FLAG_CONSUMER_INFO_PERMISSION: &str = "consumer_info_permission";
pub const FLAG_LOG_FORMAT: &str = "log_format";

/// Environment variable for a flag identifier, e.g. `config_file` ->
/// `NSC_USER_CREATOR_CONFIG_FILE`
pub fn env_var_name(flag: &str) -> String {
    format!("{}_{}", ENV_PREFIX, flag.to_uppercase())
}

/// Parse a boolean setting.
///
/// Accepts `1 t true yes y on` and `0 f false no n off`, case-insensitive.
pub fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "y" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "n" | "off" => Ok(false),
        other => Err(format!("'{}' is not a boolean", other)),
    }
}

/// Settings could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    /// No account seed in flags or environment
    #[error("Missing account seed: pass --account-seed or set {env_var}")]
    MissingAccountSeed { env_var: String },

    /// An environment variable could not be parsed
    #[error("Invalid value for '{key}' from environment: {reason}")]
    InvalidValue { key: String, reason: String },
}

// ============================================================================
// Sources
// ============================================================================

/// Values given on the command line; `None` means "not given"
#[derive(Debug, Clone, Default)]
pub struct FlagValues {
    pub config_file: Option<PathBuf>,
    pub creds_file_target: Option<PathBuf>,
    pub account_seed: Option<String>,
    pub lower_inbox_permissions: Option<bool>,
    pub consumer_info_permission: Option<ConsumerInfoPlacement>,
    pub log_format: Option<TracingFormat>,
}

/// Snapshot of the prefixed environment variables
///
/// Empty values count as unset.
#[derive(Clone, Default)]
pub struct EnvSource {
    vars: HashMap<String, String>,
}

impl EnvSource {
    /// Capture the current process environment
    pub fn capture() -> Self {
        Self::from_os_pairs(std::env::vars_os())
    }

    /// Like [`EnvSource::from_pairs`], skipping names or values that are not
    /// valid UTF-8
    pub fn from_os_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<OsString>,
        V: Into<OsString>,
    {
        Self::from_pairs(pairs.into_iter().filter_map(|(k, v)| {
            let key = k.into().into_string().ok()?;
            let value = v.into().into_string().ok()?;
            Some((key, value))
        }))
    }

    /// Build a snapshot from explicit pairs, keeping only prefixed names
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let prefix = format!("{}_", ENV_PREFIX);
        let vars = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .filter(|(k, v)| k.starts_with(&prefix) && !v.is_empty())
            .collect();
        Self { vars }
    }

    /// Value for a flag identifier
    pub fn get(&self, flag: &str) -> Option<&str> {
        self.vars.get(&env_var_name(flag)).map(String::as_str)
    }

    fn parse<T>(&self, flag: &str, parser: impl Fn(&str) -> Result<T, String>) -> Result<Option<T>, SettingsError> {
        self.get(flag)
            .map(|raw| {
                parser(raw).map_err(|reason| SettingsError::InvalidValue {
                    key: env_var_name(flag),
                    reason,
                })
            })
            .transpose()
    }
}

impl std::fmt::Debug for EnvSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut keys: Vec<&String> = self.vars.keys().collect();
        keys.sort();
        f.debug_struct("EnvSource").field("keys", &keys).finish()
    }
}

/// Built-in fallbacks
#[derive(Debug, Clone)]
pub struct Defaults {
    pub config_file: PathBuf,
    pub creds_file_target: PathBuf,
    pub lower_inbox_permissions: bool,
    pub consumer_info_permission: ConsumerInfoPlacement,
    pub log_format: TracingFormat,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            config_file: PathBuf::from("nsc_user.yml"),
            creds_file_target: PathBuf::from("nats-user.creds"),
            lower_inbox_permissions: true,
            consumer_info_permission: ConsumerInfoPlacement::Subscribe,
            log_format: TracingFormat::Compact,
        }
    }
}

// ============================================================================
// Resolved settings
// ============================================================================

/// Settings for one run
#[derive(Clone, PartialEq, Eq)]
pub struct Settings {
    /// YAML file describing the user
    pub config_file: PathBuf,

    /// Where the credential bundle is written
    pub creds_file_target: PathBuf,

    /// Account seed used to sign the user claim
    pub account_seed: String,

    /// Grant `_INBOX.*`/`_INBOX.*.*` when consumers are configured
    pub lower_inbox_permissions: bool,

    /// Side that receives the consumer INFO subject
    pub consumer_info_permission: ConsumerInfoPlacement,

    /// Log output format
    pub log_format: TracingFormat,
}

impl Settings {
    /// Merge flags over environment over defaults.
    pub fn resolve(
        flags: &FlagValues,
        env: &EnvSource,
        defaults: &Defaults,
    ) -> Result<Self, SettingsError> {
        let env_path = |flag: &str| env.get(flag).map(PathBuf::from);

        let config_file = flags
            .config_file
            .clone()
            .or_else(|| env_path(FLAG_CONFIG_FILE))
            .unwrap_or_else(|| defaults.config_file.clone());

        let creds_file_target = flags
            .creds_file_target
            .clone()
            .or_else(|| env_path(FLAG_CREDS_FILE_TARGET))
            .unwrap_or_else(|| defaults.creds_file_target.clone());

        let account_seed = flags
            .account_seed
            .clone()
            .or_else(|| env.get(FLAG_ACCOUNT_SEED).map(str::to_string))
            .ok_or_else(|| SettingsError::MissingAccountSeed {
                env_var: env_var_name(FLAG_ACCOUNT_SEED),
            })?;

        let lower_inbox_permissions = match flags.lower_inbox_permissions {
            Some(value) => value,
            None => env
                .parse(FLAG_LOWER_INBOX_PERMISSIONS, parse_bool)?
                .unwrap_or(defaults.lower_inbox_permissions),
        };

        let consumer_info_permission = match flags.consumer_info_permission {
            Some(value) => value,
            None => env
                .parse(FLAG_CONSUMER_INFO_PERMISSION, ConsumerInfoPlacement::from_str)?
                .unwrap_or(defaults.consumer_info_permission),
        };

        let log_format = match flags.log_format {
            Some(value) => value,
            None => env
                .parse(FLAG_LOG_FORMAT, TracingFormat::from_str)?
                .unwrap_or(defaults.log_format),
        };

        Ok(Self {
            config_file,
            creds_file_target,
            account_seed,
            lower_inbox_permissions,
            consumer_info_permission,
            log_format,
        })
    }

    /// Options handed to the permission deriver
    pub fn derive_options(&self) -> DeriveOptions {
        DeriveOptions::new(self.lower_inbox_permissions)
            .with_consumer_info(self.consumer_info_permission)
    }
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("config_file", &self.config_file)
            .field("creds_file_target", &self.creds_file_target)
            .field("account_seed", &"<redacted>")
            .field("lower_inbox_permissions", &self.lower_inbox_permissions)
            .field("consumer_info_permission", &self.consumer_info_permission)
            .field("log_format", &self.log_format)
            .finish()
    }
}
