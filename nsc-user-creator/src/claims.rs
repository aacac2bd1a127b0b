//! NATS user claims
//!
//! A user JWT as the NATS server expects it (claims version 2):
//!
//! ```text
//! base64url({"typ":"JWT","alg":"ed25519-nkey"})
//!   . base64url({"jti":..,"iat":..,"iss":"A..","name":..,"sub":"U..","nats":{..}})
//!   . base64url(ed25519 signature of the first two segments by the account key)
//! ```
//!
//! All segments use unpadded base64url. `jti` is the unpadded base32 SHA-512/256
//! of the claims serialised with an empty `jti`.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use nkeys::{KeyPair, KeyPairType};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha512_256};
use thiserror::Error;

/// `typ` header value
pub const TOKEN_TYPE: &str = "JWT";

/// `alg` header value for nkey-signed tokens
pub const ALGORITHM: &str = "ed25519-nkey";

/// `alg` used by version 1 tokens, still accepted when decoding
pub const LEGACY_ALGORITHM: &str = "ed25519";

/// `nats.type` for user claims
pub const USER_CLAIM_TYPE: &str = "user";

/// Claims format version written by this crate
pub const CLAIMS_VERSION: u32 = 2;

/// Limit value meaning "unlimited"
pub const NO_LIMIT: i64 = -1;

/// The claim could not be signed
#[derive(Debug, Error)]
pub enum ClaimEncodingError {
    #[error("Invalid claim subject '{subject}': {reason}")]
    InvalidSubject { subject: String, reason: String },

    #[error("User claims must be issued by an account key, got a {found:?} key")]
    IssuerNotAccount { found: KeyPairType },

    #[error("Failed to serialize claims: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to sign claims: {reason}")]
    Signing { reason: String },
}

/// A token could not be read back
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClaimDecodeError {
    #[error("Token must have 3 segments, found {0}")]
    Malformed(usize),

    #[error("Token {segment} is not valid base64url: {reason}")]
    Base64 { segment: &'static str, reason: String },

    #[error("Token {segment} is not valid JSON: {reason}")]
    Json { segment: &'static str, reason: String },

    #[error("Unsupported token algorithm '{0}'")]
    UnsupportedAlgorithm(String),

    #[error("Expected user claims, found '{0}'")]
    NotUserClaim(String),

    #[error("Token signature does not match issuer '{issuer}': {reason}")]
    BadSignature { issuer: String, reason: String },
}

// ============================================================================
// Claim model
// ============================================================================

/// Ordered list of subjects; adding an existing subject is a no-op
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StringList(Vec<String>);

impl StringList {
    /// Append each item not already present, keeping first-seen order
    pub fn add<I, S>(&mut self, items: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for item in items {
            let item = item.into();
            if !self.contains(&item) {
                self.0.push(item);
            }
        }
    }

    pub fn contains(&self, item: &str) -> bool {
        self.0.iter().any(|existing| existing == item)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Allow list for one direction
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "StringList::is_empty")]
    pub allow: StringList,
}

/// The `nats` section of a user claim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NatsUser {
    #[serde(rename = "pub", default)]
    pub publish: Permission,

    #[serde(rename = "sub", default)]
    pub subscribe: Permission,

    /// Max subscriptions
    #[serde(default = "no_limit")]
    pub subs: i64,

    /// Max bytes
    #[serde(default = "no_limit")]
    pub data: i64,

    /// Max message payload
    #[serde(default = "no_limit")]
    pub payload: i64,

    #[serde(rename = "type", default)]
    pub claim_type: String,

    #[serde(default)]
    pub version: u32,
}

impl Default for NatsUser {
    fn default() -> Self {
        Self {
            publish: Permission::default(),
            subscribe: Permission::default(),
            subs: NO_LIMIT,
            data: NO_LIMIT,
            payload: NO_LIMIT,
            claim_type: USER_CLAIM_TYPE.to_string(),
            version: CLAIMS_VERSION,
        }
    }
}

fn no_limit() -> i64 {
    NO_LIMIT
}

/// Claims of a NATS user JWT
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    #[serde(default)]
    pub jti: String,

    /// Issued at (Unix seconds)
    #[serde(default)]
    pub iat: i64,

    /// Issuing account public key
    #[serde(default)]
    pub iss: String,

    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub name: String,

    /// User public key
    pub sub: String,

    #[serde(default)]
    pub nats: NatsUser,
}

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    typ: String,
    alg: String,
}

impl UserClaims {
    /// Unsigned claims for the user with public key `subject`
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            jti: String::new(),
            iat: 0,
            iss: String::new(),
            name: String::new(),
            sub: subject.into(),
            nats: NatsUser::default(),
        }
    }

    /// Set the display name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add publish subjects
    pub fn allow_pub<I, S>(&mut self, subjects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nats.publish.allow.add(subjects);
    }

    /// Add subscribe subjects
    pub fn allow_sub<I, S>(&mut self, subjects: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.nats.subscribe.allow.add(subjects);
    }

    /// Publish allow list
    pub fn publish_allow(&self) -> &[String] {
        self.nats.publish.allow.as_slice()
    }

    /// Subscribe allow list
    pub fn subscribe_allow(&self) -> &[String] {
        self.nats.subscribe.allow.as_slice()
    }

    /// Sign with `account`, stamping the current time.
    pub fn encode(&self, account: &KeyPair) -> Result<String, ClaimEncodingError> {
        self.encode_at(account, chrono::Utc::now().timestamp())
    }

    /// Sign with `account` using an explicit issue time.
    pub fn encode_at(&self, account: &KeyPair, issued_at: i64) -> Result<String, ClaimEncodingError> {
        let issuer_type = account.key_pair_type();
        if issuer_type != KeyPairType::Account {
            return Err(ClaimEncodingError::IssuerNotAccount { found: issuer_type });
        }
        self.check_subject()?;

        let mut claims = self.clone();
        claims.iss = account.public_key();
        claims.iat = issued_at;
        claims.jti = String::new();
        claims.jti = claims.hash()?;

        let header = Header {
            typ: TOKEN_TYPE.to_string(),
            alg: ALGORITHM.to_string(),
        };
        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?),
            URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims)?)
        );
        let signature = account
            .sign(signing_input.as_bytes())
            .map_err(|err| ClaimEncodingError::Signing {
                reason: err.to_string(),
            })?;

        Ok(format!("{}.{}", signing_input, URL_SAFE_NO_PAD.encode(signature)))
    }

    fn check_subject(&self) -> Result<(), ClaimEncodingError> {
        let invalid = |reason: String| ClaimEncodingError::InvalidSubject {
            subject: self.sub.clone(),
            reason,
        };
        let subject = KeyPair::from_public_key(&self.sub).map_err(|err| invalid(err.to_string()))?;
        if subject.key_pair_type() != KeyPairType::User {
            return Err(invalid(format!(
                "expected a user public key, got {:?}",
                subject.key_pair_type()
            )));
        }
        Ok(())
    }

    fn hash(&self) -> Result<String, ClaimEncodingError> {
        let digest = Sha512_256::digest(serde_json::to_vec(self)?);
        Ok(data_encoding::BASE32_NOPAD.encode(&digest))
    }
}

// ============================================================================
// Decoding
// ============================================================================

struct Segments<'a> {
    header: &'a str,
    payload: &'a str,
    signature: &'a str,
}

fn split_token(token: &str) -> Result<Segments<'_>, ClaimDecodeError> {
    let parts: Vec<&str> = token.trim().split('.').collect();
    match parts.as_slice() {
        [header, payload, signature] => Ok(Segments {
            header: *header,
            payload: *payload,
            signature: *signature,
        }),
        _ => Err(ClaimDecodeError::Malformed(parts.len())),
    }
}

fn decode_segment(segment: &'static str, value: &str) -> Result<Vec<u8>, ClaimDecodeError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|err| ClaimDecodeError::Base64 {
            segment,
            reason: err.to_string(),
        })
}

fn decode_json<T: serde::de::DeserializeOwned>(
    segment: &'static str,
    value: &str,
) -> Result<T, ClaimDecodeError> {
    serde_json::from_slice(&decode_segment(segment, value)?).map_err(|err| ClaimDecodeError::Json {
        segment,
        reason: err.to_string(),
    })
}

/// Read the claims out of a user JWT without checking the signature.
pub fn decode_user_claims(token: &str) -> Result<UserClaims, ClaimDecodeError> {
    let segments = split_token(token)?;

    let header: Header = decode_json("header", segments.header)?;
    if header.alg != ALGORITHM && header.alg != LEGACY_ALGORITHM {
        return Err(ClaimDecodeError::UnsupportedAlgorithm(header.alg));
    }

    let claims: UserClaims = decode_json("payload", segments.payload)?;
    if claims.nats.claim_type != USER_CLAIM_TYPE {
        return Err(ClaimDecodeError::NotUserClaim(claims.nats.claim_type));
    }
    Ok(claims)
}

/// Read the claims out of a user JWT and verify the issuer's signature.
pub fn verify_user_jwt(token: &str) -> Result<UserClaims, ClaimDecodeError> {
    let claims = decode_user_claims(token)?;
    let segments = split_token(token)?;
    let signature = decode_segment("signature", segments.signature)?;

    let bad_signature = |reason: String| ClaimDecodeError::BadSignature {
        issuer: claims.iss.clone(),
        reason,
    };
    let issuer = KeyPair::from_public_key(&claims.iss).map_err(|err| bad_signature(err.to_string()))?;
    let signing_input = format!("{}.{}", segments.header, segments.payload);
    issuer
        .verify(signing_input.as_bytes(), &signature)
        .map_err(|err| bad_signature(err.to_string()))?;

    Ok(claims)
}
