//! Credential bundle (`.creds`) layout
//!
//! The file NATS clients load with `--creds`: the signed user JWT followed by
//! the user's nkey seed, each between marker lines.

use nkeys::KeyPair;
use thiserror::Error;

use crate::claims::{decode_user_claims, ClaimDecodeError};

const JWT_BEGIN: &str = "-----BEGIN NATS USER JWT-----";
const JWT_END: &str = "------END NATS USER JWT------";
const SEED_BEGIN: &str = "-----BEGIN USER NKEY SEED-----";
const SEED_END: &str = "------END USER NKEY SEED------";

const SEED_BANNER: &str = "************************* IMPORTANT *************************
NKEY Seed printed below can be used to sign and prove identity.
NKEYs are sensitive and should be treated as secrets.";

const FOOTER: &str = "*************************************************************";

/// The JWT and seed cannot be combined into a bundle
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CredentialFormatError {
    #[error("Credential JWT is not a user token: {0}")]
    InvalidJwt(#[from] ClaimDecodeError),

    #[error("Credential seed is not a user seed")]
    NotUserSeed,

    #[error("Credential seed does not belong to the token subject '{subject}'")]
    SeedMismatch { subject: String },
}

/// Lay out `jwt` and `seed` as a user credential file.
///
/// The token must decode as user claims and the seed must be the user seed
/// whose public key is the token subject.
pub fn format_user_creds(jwt: &str, seed: &str) -> Result<String, CredentialFormatError> {
    let jwt = jwt.trim();
    let seed = seed.trim();

    let claims = decode_user_claims(jwt)?;
    if !seed.starts_with("SU") {
        return Err(CredentialFormatError::NotUserSeed);
    }
    let pair = KeyPair::from_seed(seed).map_err(|_| CredentialFormatError::NotUserSeed)?;
    if pair.public_key() != claims.sub {
        return Err(CredentialFormatError::SeedMismatch {
            subject: claims.sub,
        });
    }

    Ok(format!(
        "{JWT_BEGIN}\n{jwt}\n{JWT_END}\n\n{SEED_BANNER}\n\n{SEED_BEGIN}\n{seed}\n{SEED_END}\n\n{FOOTER}\n"
    ))
}

fn block<'a>(creds: &'a str, begin: &str, end: &str) -> Option<&'a str> {
    let mut lines = creds.lines().map(str::trim);
    lines.find(|line| *line == begin)?;
    let body = lines.next()?;
    (lines.next()? == end && !body.is_empty()).then_some(body)
}

/// The JWT stored in a credential file
pub fn extract_jwt(creds: &str) -> Option<&str> {
    block(creds, JWT_BEGIN, JWT_END)
}

/// The user seed stored in a credential file
pub fn extract_seed(creds: &str) -> Option<&str> {
    block(creds, SEED_BEGIN, SEED_END)
}
