//! # nsc-user-creator
//!
//! Issues a NATS user credential file from a small YAML permission config.
//!
//! ```text
//! nsc_user.yml ──▶ UserConfig ──▶ derive_permissions ──▶ UserClaims
//!                                                          │ signed by account seed
//!                                                          ▼
//!                        nats-user.creds ◀── format_user_creds ◀── JWT + new user seed
//! ```
//!
//! The binary resolves [`Settings`] from flags, `NSC_USER_CREATOR_*`
//! environment variables and defaults, then hands them to a
//! [`CredentialOrchestrator`]. Library users can drive the orchestrator
//! directly with their own [`KeyProvider`] or [`CredentialStore`].
//!
//! ```rust,ignore
//! use nsc_user_creator::{CredentialOrchestrator, FileCredentialStore, NkeyProvider};
//! use nsc_user_core::{DeriveOptions, UserConfig};
//!
//! let config = UserConfig::from_yaml_str("name: alice\nallow_pub: [orders.>]\n")?;
//! let store = FileCredentialStore::new("alice.creds");
//! let issued = CredentialOrchestrator::new(NkeyProvider, store)
//!     .issue(&config, &account_seed, &DeriveOptions::new(true))?;
//! println!("created {}", issued.user_public_key);
//! ```

pub mod build_info;
pub mod claims;
pub mod cli;
pub mod creds;
pub mod error;
pub mod keys;
pub mod orchestrator;
pub mod settings;
pub mod store;
pub mod tracing_support;

pub use claims::{decode_user_claims, verify_user_jwt, ClaimDecodeError, ClaimEncodingError, UserClaims};
pub use cli::Cli;
pub use creds::{extract_jwt, extract_seed, format_user_creds, CredentialFormatError};
pub use error::{CreatorError, CreatorResult};
pub use keys::{
    parse_account_key, GeneratedUser, KeyGenerationError, KeyMaterialError, KeyProvider,
    NkeyProvider,
};
pub use orchestrator::{load_config, CredentialOrchestrator, IssuedCredential};
pub use settings::{Defaults, EnvSource, FlagValues, Settings, SettingsError};
pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore, PersistenceError};
pub use tracing_support::{init_subscriber_with_config, TracingConfig, TracingFormat};
