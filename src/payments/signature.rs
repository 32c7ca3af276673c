//! Webhook signature verification
//!
//! The provider sends its shared webhook secret (or a digest of it) in the
//! `verif-hash` header. Two signing conventions exist across integrations, so
//! the comparison mode is explicit configuration rather than a guess.

use sha2::{Digest, Sha256};

/// How the presented `verif-hash` value relates to the configured secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureMode {
    /// Presented value must equal the secret verbatim
    Direct,
    /// Presented value must equal the hex-encoded SHA-256 of the secret
    Digest,
}

impl SignatureMode {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "direct" => Some(SignatureMode::Direct),
            "digest" => Some(SignatureMode::Digest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureMode::Direct => "direct",
            SignatureMode::Digest => "digest",
        }
    }
}

/// Check an inbound webhook signature against the shared secret.
///
/// A missing header or empty secret is a rejection, not an error. Comparison
/// is constant-time.
pub fn verify_webhook_signature(
    presented: Option<&str>,
    secret: &str,
    mode: SignatureMode,
) -> bool {
    let presented = match presented {
        Some(value) => value.trim(),
        None => return false,
    };

    if presented.is_empty() || secret.is_empty() {
        return false;
    }

    let expected = match mode {
        SignatureMode::Direct => secret.to_string(),
        SignatureMode::Digest => hex::encode(Sha256::digest(secret.as_bytes())),
    };

    constant_time_eq(presented.as_bytes(), expected.as_bytes())
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
