//! Stripe webhook signature verification (scheme `v1`).
//!
//! Header format: `Stripe-Signature: t=1700000000,v1=<hex>,v1=<hex>,v0=<ignored>`
//!
//! The signed payload is `"{t}." ++ raw_body` and each `v1` entry is the
//! lowercase hex HMAC-SHA256 of it under the endpoint's signing secret.
//! Verification must run on the raw bytes: re-serialized JSON never matches.

use std::fmt;
use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::debug;

use super::error::WebhookError;
use super::event::StripeEvent;
use crate::config::ConfigError;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the provider signature (lowercase for `HeaderMap` lookups)
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Stripe's default freshness window
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

const SCHEME_V1: &str = "v1";

/// Why a signature was rejected. Logged at debug, never returned.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Rejection {
    MissingHeader,
    MalformedHeader,
    NoSignatures,
    Stale { age_secs: u64 },
    Mismatch,
    UnreadableBody(String),
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::MissingHeader => write!(f, "missing signature header"),
            Rejection::MalformedHeader => write!(f, "malformed signature header"),
            Rejection::NoSignatures => write!(f, "no v1 signatures in header"),
            Rejection::Stale { age_secs } => write!(f, "timestamp outside tolerance ({}s)", age_secs),
            Rejection::Mismatch => write!(f, "no signature matches payload"),
            Rejection::UnreadableBody(e) => write!(f, "unreadable body: {}", e),
        }
    }
}

/// Parsed `Stripe-Signature` header
#[derive(Debug)]
struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self, Rejection> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for item in header.split(',') {
            // Items without `=` (trailing commas, stray tokens) are skipped
            let Some((key, value)) = item.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => {
                    if timestamp.is_some() {
                        return Err(Rejection::MalformedHeader);
                    }
                    timestamp = Some(value.parse::<i64>().map_err(|_| Rejection::MalformedHeader)?);
                }
                SCHEME_V1 => {
                    // Undecodable entries simply never match
                    if let Ok(sig) = hex::decode(value) {
                        signatures.push(sig);
                    }
                }
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(Rejection::MalformedHeader)?;
        if signatures.is_empty() {
            return Err(Rejection::NoSignatures);
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

/// Verifies inbound notifications against the endpoint signing secret
pub struct SignatureVerifier {
    secret: Vec<u8>,
    tolerance: Duration,
}

impl fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("tolerance", &self.tolerance)
            .finish()
    }
}

impl SignatureVerifier {
    /// A zero `tolerance` disables the freshness check.
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Result<Self, ConfigError> {
        let secret: String = secret.into();
        if secret.is_empty() {
            return Err(ConfigError::EmptySigningSecret);
        }
        Ok(Self {
            secret: secret.into_bytes(),
            tolerance,
        })
    }

    pub fn tolerance(&self) -> Duration {
        self.tolerance
    }

    /// Verify against the current wall clock and parse the event
    pub fn verify(&self, payload: &[u8], header: Option<&str>) -> Result<StripeEvent, WebhookError> {
        self.verify_at(payload, header, chrono::Utc::now().timestamp())
    }

    /// Verify as of `now` (unix seconds) and parse the event
    pub fn verify_at(
        &self,
        payload: &[u8],
        header: Option<&str>,
        now: i64,
    ) -> Result<StripeEvent, WebhookError> {
        self.check(payload, header, now)
            .and_then(|()| {
                serde_json::from_slice::<StripeEvent>(payload)
                    .map_err(|e| Rejection::UnreadableBody(e.to_string()))
            })
            .map_err(|reason| {
                debug!(reason = %reason, "Webhook signature rejected");
                WebhookError::InvalidSignature
            })
    }

    fn check(&self, payload: &[u8], header: Option<&str>, now: i64) -> Result<(), Rejection> {
        let header = header.ok_or(Rejection::MissingHeader)?;
        let parsed = SignatureHeader::parse(header)?;

        let tolerance_secs = self.tolerance.as_secs();
        if tolerance_secs > 0 {
            let age_secs = now.abs_diff(parsed.timestamp);
            if age_secs > tolerance_secs {
                return Err(Rejection::Stale { age_secs });
            }
        }

        let matched = parsed.signatures.iter().any(|sig| {
            signer(&self.secret, parsed.timestamp, payload)
                .map(|mac| mac.verify_slice(sig).is_ok())
                .unwrap_or(false)
        });

        if matched { Ok(()) } else { Err(Rejection::Mismatch) }
    }
}

fn signer(secret: &[u8], timestamp: i64, payload: &[u8]) -> Option<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret).ok()?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Some(mac)
}

/// Lowercase hex `v1` signature of `payload` at `timestamp`.
///
/// Returns an empty string only if the key is rejected by HMAC, which
/// cannot happen for SHA-256.
pub fn compute_signature(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    signer(secret.as_bytes(), timestamp, payload)
        .map(|mac| hex::encode(mac.finalize().into_bytes()))
        .unwrap_or_default()
}

/// Full `Stripe-Signature` header value for `payload`
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> String {
    format!(
        "t={},{}={}",
        timestamp,
        SCHEME_V1,
        compute_signature(secret, timestamp, payload)
    )
}
