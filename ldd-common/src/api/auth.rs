//! Credential checking for ingest and admin operations
//!
//! Sensor nodes and administrators present a shared token as
//! `Authorization: Bearer <token>`. The services only need to know whether a
//! presented token is acceptable, so the capability is a small trait that the
//! core receives by injection.
//!
//! # Pure Functions
//!
//! No HTTP framework dependencies here; header extraction lives in the
//! service crates and hands the raw header value to [`bearer_token`].

use rand::distributions::Alphanumeric;
use rand::Rng;
use sha2::{Digest, Sha256};

/// Length of tokens produced by [`generate_token`]
pub const GENERATED_TOKEN_LEN: usize = 32;

/// Accepts or rejects a presented credential
pub trait CredentialCheck: Send + Sync {
    /// `presented` is `None` when the caller sent no credential at all
    fn verify(&self, presented: Option<&str>) -> bool;
}

/// Single shared token, compared by SHA-256 digest
///
/// Only the digest is retained, and comparison touches every byte so the
/// timing does not depend on the position of the first mismatch.
#[derive(Clone)]
pub struct StaticToken {
    digest: [u8; 32],
}

impl StaticToken {
    pub fn new(token: &str) -> Self {
        Self {
            digest: digest(token),
        }
    }
}

impl std::fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticToken").finish_non_exhaustive()
    }
}

impl CredentialCheck for StaticToken {
    fn verify(&self, presented: Option<&str>) -> bool {
        match presented {
            Some(token) if !token.is_empty() => {
                let candidate = digest(token);
                candidate
                    .iter()
                    .zip(self.digest.iter())
                    .fold(0u8, |acc, (a, b)| acc | (a ^ b))
                    == 0
            }
            _ => false,
        }
    }
}

fn digest(token: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hasher.finalize().into()
}

/// Extract the token from an `Authorization` header value
///
/// The scheme is matched case-insensitively. Returns `None` for a missing
/// header, a different scheme, or an empty token.
///
/// # Examples
///
/// ```
/// use ldd_common::api::auth::bearer_token;
///
/// assert_eq!(bearer_token(Some("Bearer abc123")), Some("abc123"));
/// assert_eq!(bearer_token(Some("Basic abc123")), None);
/// assert_eq!(bearer_token(None), None);
/// ```
pub fn bearer_token(header: Option<&str>) -> Option<&str> {
    let header = header?.trim();
    let (scheme, token) = header.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

/// Generate a random alphanumeric token
///
/// Used when no key is configured so the service never runs with a
/// guessable default.
pub fn generate_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_TOKEN_LEN)
        .map(char::from)
        .collect()
}
