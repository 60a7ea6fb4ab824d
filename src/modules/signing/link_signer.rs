//! Download link signatures
//!
//! A signature binds `(order_id, attachment_id, issued_at)` to the server
//! secret. Links carry the signature and the issue time in the query string,
//! so verification needs no server-side state.

use std::fmt;
use std::str::FromStr;

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::core::config::SignedLinkConfig;

type HmacSha256 = Hmac<Sha256>;

/// Shortest signature accepted; anything shorter makes forgery cheap.
pub const MIN_SIGNATURE_LENGTH: usize = 8;
/// Hex length of a full SHA-256 digest.
pub const MAX_SIGNATURE_LENGTH: usize = 64;

/// Digest used to sign links
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureAlgorithm {
    /// HMAC-SHA256 keyed with the secret
    #[default]
    HmacSha256,
    /// Plain SHA-256 over a length-prefixed secret followed by the payload
    Sha256,
}

impl FromStr for SignatureAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "hmac-sha256" | "hmac_sha256" => Ok(Self::HmacSha256),
            "sha256" => Ok(Self::Sha256),
            other => Err(format!(
                "Unsupported download link algorithm '{}' (expected hmac-sha256 or sha256)",
                other
            )),
        }
    }
}

/// Why a presented link was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkRejection {
    /// Issue time missing or older than the expiry window
    Expired,
    /// Signature does not match the recomputed one
    Forged,
}

impl fmt::Display for LinkRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LinkRejection::Expired => write!(f, "expired"),
            LinkRejection::Forged => write!(f, "signature mismatch"),
        }
    }
}

/// Computes and checks download link signatures
#[derive(Clone)]
pub struct LinkSigner {
    secret: Vec<u8>,
    hmac: HmacSha256,
    algorithm: SignatureAlgorithm,
    signature_length: usize,
    expiry_secs: i64,
}

impl fmt::Debug for LinkSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LinkSigner")
            .field("algorithm", &self.algorithm)
            .field("signature_length", &self.signature_length)
            .field("expiry_secs", &self.expiry_secs)
            .finish_non_exhaustive()
    }
}

impl LinkSigner {
    /// Fails on an empty secret.
    pub fn new(
        secret: impl Into<Vec<u8>>,
        algorithm: SignatureAlgorithm,
        signature_length: usize,
        expiry_secs: u64,
    ) -> Result<Self, String> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err("Download link secret must not be empty".to_string());
        }

        let hmac = HmacSha256::new_from_slice(&secret)
            .map_err(|e| format!("Invalid download link secret: {}", e))?;

        Ok(Self {
            secret,
            hmac,
            algorithm,
            signature_length: signature_length.clamp(MIN_SIGNATURE_LENGTH, MAX_SIGNATURE_LENGTH),
            expiry_secs: i64::try_from(expiry_secs).unwrap_or(i64::MAX),
        })
    }

    pub fn from_config(config: &SignedLinkConfig) -> Result<Self, String> {
        Self::new(
            config.secret.as_bytes(),
            config.algorithm,
            config.signature_length,
            config.expiry_secs,
        )
    }

    pub fn expiry_secs(&self) -> i64 {
        self.expiry_secs
    }

    /// Signature for a link issued at `issued_at` (unix seconds)
    pub fn sign(&self, order_id: i64, attachment_id: &str, issued_at: i64) -> String {
        let payload = signing_payload(order_id, attachment_id, issued_at);

        let digest: Vec<u8> = match self.algorithm {
            SignatureAlgorithm::HmacSha256 => {
                let mut mac = self.hmac.clone();
                mac.update(payload.as_bytes());
                mac.finalize().into_bytes().to_vec()
            }
            SignatureAlgorithm::Sha256 => {
                let mut hasher = Sha256::new();
                hasher.update(self.secret.len().to_string().as_bytes());
                hasher.update(b":");
                hasher.update(&self.secret);
                hasher.update(b":");
                hasher.update(payload.as_bytes());
                hasher.finalize().to_vec()
            }
        };

        let mut encoded = hex::encode(digest);
        encoded.truncate(self.signature_length);
        encoded
    }

    /// Checks expiry, then the signature.
    ///
    /// `issued_at == 0` is treated as absent. A link is still valid when
    /// `now - issued_at` equals the expiry window exactly.
    pub fn verify(
        &self,
        order_id: i64,
        attachment_id: &str,
        signature: &str,
        issued_at: i64,
        now: i64,
    ) -> Result<(), LinkRejection> {
        if issued_at <= 0 || now.saturating_sub(issued_at) > self.expiry_secs {
            return Err(LinkRejection::Expired);
        }

        let expected = self.sign(order_id, attachment_id, issued_at);
        let matches: bool = expected.as_bytes().ct_eq(signature.as_bytes()).into();
        if !matches {
            return Err(LinkRejection::Forged);
        }

        Ok(())
    }
}

/// Length-delimited payload: the attachment id is prefixed with its byte
/// length so no choice of ids can collide with another field split.
fn signing_payload(order_id: i64, attachment_id: &str, issued_at: i64) -> String {
    format!(
        "order-attachment:{}:{}:{}:{}",
        order_id,
        attachment_id.len(),
        attachment_id,
        issued_at
    )
}
