//! PKCE (Proof Key for Code Exchange) helpers for the example OAuth2 client.
//!
//! This crate provides the RFC 7636 S256 code challenge derivation together with
//! the random values a client generates when it starts an authorization request.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use sha2::{Digest, Sha256};

/// Value of the `code_challenge_method` parameter sent to the authorization endpoint.
pub const CODE_CHALLENGE_METHOD: &str = "S256";

/// Number of random bytes behind a verifier. 32 bytes encode to 43 characters,
/// the minimum verifier length RFC 7636 allows.
const VERIFIER_BYTES: usize = 32;

/// Number of random bytes behind a `state` value.
const STATE_BYTES: usize = 16;

/// Derive the S256 code challenge for a verifier.
///
/// `challenge = BASE64URL-NOPAD(SHA256(ASCII(verifier)))`, exactly as described in
/// RFC 7636 §4.2: standard base64 with `+` replaced by `-`, `/` by `_` and the
/// trailing `=` padding stripped.
///
/// # Arguments
///
/// * `verifier` - The code verifier held by the client
///
/// # Returns
///
/// The URL-safe, unpadded challenge string
pub fn challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

/// Generate an opaque `state` value binding a callback to the request that started it.
pub fn generate_state() -> String {
    random_token(STATE_BYTES)
}

fn random_token(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::thread_rng().fill(bytes.as_mut_slice());
    URL_SAFE_NO_PAD.encode(bytes)
}

/// A PKCE code verifier together with the moment it was created.
///
/// The verifier lives in the user's session between the redirect to the
/// authorization endpoint and the token exchange, where it is consumed.
#[derive(Clone, PartialEq, Eq)]
pub struct PkceVerifier {
    value: String,
    created_at: DateTime<Utc>,
}

impl PkceVerifier {
    /// Generate a fresh verifier from 32 bytes of OS-seeded randomness.
    pub fn generate() -> Self {
        Self::new(random_token(VERIFIER_BYTES))
    }

    /// Wrap an existing verifier value, stamping it with the current time.
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            created_at: Utc::now(),
        }
    }

    /// The raw verifier, as sent in the `code_verifier` form parameter.
    pub fn secret(&self) -> &str {
        &self.value
    }

    /// When the verifier was generated, the start of its authorization attempt.
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Recompute the challenge for this verifier.
    pub fn challenge(&self) -> String {
        challenge(&self.value)
    }

    /// Whether the verifier is older than `max_age`.
    ///
    /// # Arguments
    ///
    /// * `max_age` - Lifetime of an authorization attempt
    /// * `now` - The instant to compare against
    pub fn is_expired(&self, max_age: Duration, now: DateTime<Utc>) -> bool {
        now - self.created_at > max_age
    }
}

// Keep the secret out of logs.
impl std::fmt::Debug for PkceVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PkceVerifier")
            .field("value", &"[redacted]")
            .field("created_at", &self.created_at)
            .finish()
    }
}
