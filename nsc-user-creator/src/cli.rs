//! Command-line flags
//!
//! Flags only record what was typed. Environment and default values are
//! merged later by [`Settings::resolve`](crate::settings::Settings::resolve).

use std::path::PathBuf;

use clap::Parser;
use nsc_user_core::ConsumerInfoPlacement;

use crate::build_info;
use crate::settings::{parse_bool, FlagValues};
use crate::tracing_support::TracingFormat;

/// Create a NATS user credential file from a permission config
#[derive(Parser, Debug)]
#[command(name = "nsc_user_creator", version = build_info::version_short())]
pub struct Cli {
    /// Config file where user permissions are set [default: nsc_user.yml]
    #[arg(long = "config-file", alias = "config_file", value_name = "FILE")]
    pub config_file: Option<PathBuf>,

    /// Target to save the creds file [default: nats-user.creds]
    #[arg(long = "creds-file-target", alias = "creds_file_target", value_name = "FILE")]
    pub creds_file_target: Option<PathBuf>,

    /// Seed of the account the user is added to (prefer NSC_USER_CREATOR_ACCOUNT_SEED)
    #[arg(long = "account-seed", alias = "account_seed", value_name = "SEED")]
    pub account_seed: Option<String>,

    /// Add subscribe permissions _INBOX.* and _INBOX.*.* if at least one consumer is configured [default: true]
    #[arg(
        long = "lower-inbox-permissions",
        alias = "lower_inbox_permissions",
        value_name = "BOOL",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = parse_bool
    )]
    pub lower_inbox_permissions: Option<bool>,

    /// Grant consumer INFO as a subscribe or publish permission [default: subscribe]
    #[arg(
        long = "consumer-info-permission",
        alias = "consumer_info_permission",
        value_name = "SIDE",
        value_parser = parse_placement
    )]
    pub consumer_info_permission: Option<ConsumerInfoPlacement>,

    /// Log format: pretty, compact or json [default: compact]
    #[arg(long = "log-format", alias = "log_format", value_name = "FORMAT", value_parser = parse_log_format)]
    pub log_format: Option<TracingFormat>,
}

fn parse_placement(value: &str) -> Result<ConsumerInfoPlacement, String> {
    value.parse()
}

fn parse_log_format(value: &str) -> Result<TracingFormat, String> {
    value.parse()
}

impl Cli {
    /// Flag values for settings resolution
    pub fn into_flags(self) -> FlagValues {
        FlagValues {
            config_file: self.config_file,
            creds_file_target: self.creds_file_target,
            account_seed: self.account_seed,
            lower_inbox_permissions: self.lower_inbox_permissions,
            consumer_info_permission: self.consumer_info_permission,
            log_format: self.log_format,
        }
    }
}
