//! Account and user keys
//!
//! The account key signs the user claim; the user key is freshly generated
//! for every run. Both are Ed25519 nkeys.

use nkeys::{KeyPair, KeyPairType};
use thiserror::Error;

/// The account seed is not a usable signing key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KeyMaterialError {
    #[error("Account seed is empty")]
    Empty,

    #[error("No nkey seed found in decorated account key")]
    NoSeedInBlock,

    #[error("Account seed could not be decoded: {reason}")]
    InvalidSeed { reason: String },

    #[error("Expected an account seed, got a {found} seed")]
    NotAccountSeed { found: String },
}

/// The key provider could not produce a user key
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Failed to generate user key pair: {reason}")]
pub struct KeyGenerationError {
    pub reason: String,
}

impl KeyGenerationError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

/// Parse the account signing key.
///
/// `input` is either a bare seed (`SA...`) or a decorated block as found in
/// `.nk` and `.creds` files:
///
/// ```text
/// -----BEGIN ACCOUNT NKEY SEED-----
/// SA...
/// ------END ACCOUNT NKEY SEED------
/// ```
///
/// Only account seeds are accepted since only accounts issue user claims.
pub fn parse_account_key(input: &str) -> Result<KeyPair, KeyMaterialError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(KeyMaterialError::Empty);
    }

    let seed = if is_decorated(trimmed) {
        find_decorated_seed(trimmed).ok_or(KeyMaterialError::NoSeedInBlock)?
    } else {
        trimmed
    };

    let pair = KeyPair::from_seed(seed).map_err(|err| KeyMaterialError::InvalidSeed {
        reason: err.to_string(),
    })?;

    match pair.key_pair_type() {
        KeyPairType::Account => Ok(pair),
        other => Err(KeyMaterialError::NotAccountSeed {
            found: format!("{:?}", other).to_lowercase(),
        }),
    }
}

fn is_decorated(input: &str) -> bool {
    input.lines().any(is_marker_line)
}

fn is_marker_line(line: &str) -> bool {
    let line = line.trim();
    line.len() > 6 && line.starts_with("---") && line.ends_with("---")
}

/// First operator/account/user seed enclosed by marker lines
fn find_decorated_seed(input: &str) -> Option<&str> {
    let lines: Vec<&str> = input.lines().map(str::trim).collect();
    lines.windows(3).find_map(|window| {
        let (open, body, close) = (window[0], window[1], window[2]);
        let is_seed = ["SO", "SA", "SU"].iter().any(|prefix| body.starts_with(prefix));
        (is_marker_line(open) && is_marker_line(close) && is_seed).then_some(body)
    })
}

// ============================================================================
// User key generation
// ============================================================================

/// Freshly generated user identity
#[derive(Clone)]
pub struct GeneratedUser {
    public_key: String,
    seed: String,
}

impl GeneratedUser {
    /// Extract the public key and seed from a user key pair
    pub fn from_key_pair(pair: &KeyPair) -> Result<Self, KeyGenerationError> {
        if pair.key_pair_type() != KeyPairType::User {
            return Err(KeyGenerationError::new(format!(
                "provider returned a {:?} key instead of a user key",
                pair.key_pair_type()
            )));
        }
        let seed = pair
            .seed()
            .map_err(|err| KeyGenerationError::new(err.to_string()))?;

        Ok(Self {
            public_key: pair.public_key(),
            seed,
        })
    }

    /// User public key (`U...`), the claim subject
    pub fn public_key(&self) -> &str {
        &self.public_key
    }

    /// User seed (`SU...`), written into the credential bundle
    pub fn seed(&self) -> &str {
        &self.seed
    }
}

impl std::fmt::Debug for GeneratedUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeneratedUser")
            .field("public_key", &self.public_key)
            .finish_non_exhaustive()
    }
}

/// Source of user key pairs
pub trait KeyProvider {
    /// Generate a new user identity
    fn generate_user(&self) -> Result<GeneratedUser, KeyGenerationError>;
}

/// Random user keys from the system RNG
#[derive(Debug, Clone, Copy, Default)]
pub struct NkeyProvider;

impl KeyProvider for NkeyProvider {
    fn generate_user(&self) -> Result<GeneratedUser, KeyGenerationError> {
        GeneratedUser::from_key_pair(&KeyPair::new_user())
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for &P {
    fn generate_user(&self) -> Result<GeneratedUser, KeyGenerationError> {
        (**self).generate_user()
    }
}
