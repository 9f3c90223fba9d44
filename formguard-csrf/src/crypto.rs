//! Randomness and signing primitives.
//!
//! Signing is expressed as a [`TokenSigner`] strategy. [`SigningStrategy`]
//! pairs a preferred signer (HMAC-SHA256) with a fallback (keyed SHA-256
//! digest) and records which one produced each signature, so verification
//! always recomputes with the same backend.

use crate::error::{CsrfError, Result};
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use hmac::{Hmac, Mac};
use rand::{RngCore, rngs::OsRng};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use subtle::ConstantTimeEq;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Fill a fresh buffer from the operating system CSPRNG.
pub fn random_bytes(len: usize) -> Vec<u8> {
    let mut bytes = vec![0u8; len];
    OsRng.fill_bytes(&mut bytes);
    bytes
}

/// `len` random bytes as URL-safe base64 without padding.
///
/// The alphabet never contains `.`, which the token format relies on.
pub fn random_string(len: usize) -> String {
    URL_SAFE_NO_PAD.encode(random_bytes(len))
}

/// `len` random bytes as lowercase hex.
pub fn random_hex(len: usize) -> String {
    hex::encode(random_bytes(len))
}

/// Constant-time string comparison.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

/// Signing backend identifier, stored alongside each token record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignatureAlgorithm {
    HmacSha256,
    Sha256Digest,
}

impl SignatureAlgorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureAlgorithm::HmacSha256 => "hmac-sha256",
            SignatureAlgorithm::Sha256Digest => "sha256-digest",
        }
    }
}

impl fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A keyed signing backend.
pub trait TokenSigner: Send + Sync + fmt::Debug {
    /// Backend identifier
    fn algorithm(&self) -> SignatureAlgorithm;

    /// Sign `message` with `key`, returning URL-safe base64 without padding
    fn sign(&self, key: &[u8], message: &str) -> Result<String>;
}

/// HMAC-SHA256 signer (preferred)
#[derive(Debug, Clone, Copy, Default)]
pub struct HmacSha256Signer;

impl TokenSigner for HmacSha256Signer {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::HmacSha256
    }

    fn sign(&self, key: &[u8], message: &str) -> Result<String> {
        let mut mac =
            HmacSha256::new_from_slice(key).map_err(|e| CsrfError::signing(e.to_string()))?;
        mac.update(message.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes()))
    }
}

/// Keyed SHA-256 digest of `key:message` (fallback)
#[derive(Debug, Clone, Copy, Default)]
pub struct Sha256DigestSigner;

impl TokenSigner for Sha256DigestSigner {
    fn algorithm(&self) -> SignatureAlgorithm {
        SignatureAlgorithm::Sha256Digest
    }

    fn sign(&self, key: &[u8], message: &str) -> Result<String> {
        let mut hasher = Sha256::new();
        hasher.update(key);
        hasher.update(b":");
        hasher.update(message.as_bytes());
        Ok(URL_SAFE_NO_PAD.encode(hasher.finalize()))
    }
}

/// A signature together with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub algorithm: SignatureAlgorithm,
    pub value: String,
}

/// Preferred signer with a fallback used when the preferred one fails.
#[derive(Debug, Clone)]
pub struct SigningStrategy {
    preferred: Arc<dyn TokenSigner>,
    fallback: Arc<dyn TokenSigner>,
}

impl SigningStrategy {
    /// HMAC-SHA256 preferred, keyed SHA-256 digest as fallback.
    pub fn new() -> Self {
        Self::with_signers(Arc::new(HmacSha256Signer), Arc::new(Sha256DigestSigner))
    }

    pub fn with_signers(preferred: Arc<dyn TokenSigner>, fallback: Arc<dyn TokenSigner>) -> Self {
        Self {
            preferred,
            fallback,
        }
    }

    /// Sign with the preferred backend, falling back on failure.
    pub fn sign(&self, key: &[u8], message: &str) -> Result<Signature> {
        match self.preferred.sign(key, message) {
            Ok(value) => Ok(Signature {
                algorithm: self.preferred.algorithm(),
                value,
            }),
            Err(e) => {
                warn!(
                    preferred = %self.preferred.algorithm(),
                    fallback = %self.fallback.algorithm(),
                    error = %e,
                    "Preferred signer failed, using fallback"
                );
                let value = self.fallback.sign(key, message)?;
                Ok(Signature {
                    algorithm: self.fallback.algorithm(),
                    value,
                })
            }
        }
    }

    /// Recompute the signature with `algorithm` and compare in constant time.
    ///
    /// Returns `false` when no configured backend matches `algorithm` or the
    /// backend fails.
    pub fn verify(
        &self,
        algorithm: SignatureAlgorithm,
        key: &[u8],
        message: &str,
        candidate: &str,
    ) -> bool {
        let Some(signer) = self.signer_for(algorithm) else {
            warn!(algorithm = %algorithm, "No signer available for token algorithm");
            return false;
        };

        match signer.sign(key, message) {
            Ok(expected) => constant_time_eq(candidate, &expected),
            Err(e) => {
                warn!(algorithm = %algorithm, error = %e, "Signature recomputation failed");
                false
            }
        }
    }

    fn signer_for(&self, algorithm: SignatureAlgorithm) -> Option<&dyn TokenSigner> {
        if self.preferred.algorithm() == algorithm {
            Some(self.preferred.as_ref())
        } else if self.fallback.algorithm() == algorithm {
            Some(self.fallback.as_ref())
        } else {
            None
        }
    }
}

impl Default for SigningStrategy {
    fn default() -> Self {
        Self::new()
    }
}
