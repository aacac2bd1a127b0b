//! Top-level error type for a credential run
//!
//! One variant per failure stage. Every variant is terminal: the run stops,
//! the error is logged once and the process exits with [`CreatorError::exit_code`].

use std::path::PathBuf;
use thiserror::Error;

use nsc_user_core::ConfigDecodeError;

use crate::claims::ClaimEncodingError;
use crate::creds::CredentialFormatError;
use crate::keys::{KeyGenerationError, KeyMaterialError};
use crate::settings::SettingsError;
use crate::store::PersistenceError;

/// Result alias for credential runs
pub type CreatorResult<T> = Result<T, CreatorError>;

/// Errors that abort a credential run
#[derive(Debug, Error)]
pub enum CreatorError {
    /// Flags, environment and defaults did not produce usable settings
    #[error(transparent)]
    Settings(#[from] SettingsError),

    /// The configuration file could not be read
    #[error("Failed to read config file '{path}': {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file is not a valid user configuration
    #[error("Failed to decode config file '{path}': {source}")]
    ConfigDecode {
        path: PathBuf,
        #[source]
        source: ConfigDecodeError,
    },

    /// The account seed is not a usable signing key
    #[error(transparent)]
    KeyMaterial(#[from] KeyMaterialError),

    /// The user key pair could not be created
    #[error(transparent)]
    KeyGeneration(#[from] KeyGenerationError),

    /// The user claim could not be signed
    #[error(transparent)]
    ClaimEncoding(#[from] ClaimEncodingError),

    /// The credential bundle could not be assembled
    #[error(transparent)]
    CredentialFormat(#[from] CredentialFormatError),

    /// The credential bundle could not be written
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl CreatorError {
    /// Create a config read error
    pub fn config_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ConfigRead {
            path: path.into(),
            source,
        }
    }

    /// Create a config decode error
    pub fn config_decode(path: impl Into<PathBuf>, source: ConfigDecodeError) -> Self {
        Self::ConfigDecode {
            path: path.into(),
            source,
        }
    }

    /// Whether the operator can fix this by changing input.
    ///
    /// Settings, configuration and key material problems are user errors;
    /// everything after the inputs are accepted is a system failure.
    pub fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::Settings(_)
                | Self::ConfigRead { .. }
                | Self::ConfigDecode { .. }
                | Self::KeyMaterial(_)
        )
    }

    /// Process exit code (1 = user error, 101 = system error)
    pub fn exit_code(&self) -> u8 {
        if self.is_user_error() {
            1
        } else {
            101
        }
    }
}
