//! Credential orchestration
//!
//! One run, strictly in order:
//!
//! 1. read and decode the user configuration
//! 2. parse the account signing key
//! 3. generate the user key pair
//! 4. derive permissions and build the user claim
//! 5. sign the claim
//! 6. assemble the credential bundle
//! 7. persist the bundle
//!
//! The first failing step ends the run. The store is only touched in step 7,
//! so a failed run writes nothing.

use std::path::{Path, PathBuf};

use nsc_user_core::{derive_permissions_with, DeriveOptions, DerivedPermissions, UserConfig};
use tracing::{debug, info, instrument};

use crate::claims::UserClaims;
use crate::creds::format_user_creds;
use crate::error::{CreatorError, CreatorResult};
use crate::keys::{parse_account_key, KeyProvider};
use crate::settings::Settings;
use crate::store::CredentialStore;

/// Outcome of a successful run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCredential {
    /// Public key of the new user
    pub user_public_key: String,

    /// Public key of the signing account
    pub account_public_key: String,

    /// Subjects granted, as derived
    pub permissions: DerivedPermissions,

    /// Where the bundle was stored
    pub destination: PathBuf,
}

/// Read a user configuration file.
pub fn load_config(path: &Path) -> CreatorResult<UserConfig> {
    let bytes = std::fs::read(path).map_err(|err| CreatorError::config_read(path, err))?;
    UserConfig::from_yaml_slice(&bytes).map_err(|err| CreatorError::config_decode(path, err))
}

/// Runs the credential pipeline against a key provider and a store
#[derive(Debug)]
pub struct CredentialOrchestrator<K, S> {
    keys: K,
    store: S,
}

impl<K: KeyProvider, S: CredentialStore> CredentialOrchestrator<K, S> {
    pub fn new(keys: K, store: S) -> Self {
        Self { keys, store }
    }

    /// Store the bundle goes to
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Full run from resolved settings.
    #[instrument(skip_all, fields(config_file = %settings.config_file.display()))]
    pub fn run(&self, settings: &Settings) -> CreatorResult<IssuedCredential> {
        let config = load_config(&settings.config_file)?;
        self.issue(&config, &settings.account_seed, &settings.derive_options())
    }

    /// Steps 2 to 7 for an already loaded configuration.
    pub fn issue(
        &self,
        config: &UserConfig,
        account_seed: &str,
        options: &DeriveOptions,
    ) -> CreatorResult<IssuedCredential> {
        if !config.account.is_empty() {
            debug!(account = %config.account, "Issuing user for account");
        }

        let account = parse_account_key(account_seed)?;
        let user = self.keys.generate_user()?;

        let permissions = derive_permissions_with(config, options);
        debug!(
            user = %user.public_key(),
            publish = permissions.publish.len(),
            subscribe = permissions.subscribe.len(),
            consumers = config.allow_sub_over_consumer.len(),
            "Derived permissions"
        );

        let mut claims = UserClaims::new(user.public_key()).with_name(config.name.as_str());
        claims.allow_pub(permissions.publish.iter().map(String::as_str));
        claims.allow_sub(permissions.subscribe.iter().map(String::as_str));

        let token = claims.encode(&account)?;
        let bundle = format_user_creds(&token, user.seed())?;
        let destination = self.store.persist(bundle.as_bytes())?;

        info!(
            user = %user.public_key(),
            destination = %destination.display(),
            "Wrote user credentials"
        );

        Ok(IssuedCredential {
            user_public_key: user.public_key().to_string(),
            account_public_key: account.public_key(),
            permissions,
            destination,
        })
    }
}
