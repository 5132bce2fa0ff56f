//! Webhook Signature Verification
//!
//! Stripe signs `"<timestamp>.<raw body>"` with HMAC-SHA256 and sends
//! `Stripe-Signature: t=<timestamp>,v1=<hex>[,v1=<hex>...]`. The body must be
//! the exact bytes received; re-serialized JSON will not match.

use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use sha2::Sha256;

use super::WebhookEvent;
use crate::error::{PaymentError, Result};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "stripe-signature";

/// Authenticates webhook bodies against the shared signing secret
pub struct WebhookVerifier {
    secret: String,
    tolerance: Duration,
}

impl WebhookVerifier {
    pub fn new(secret: impl Into<String>, tolerance: Duration) -> Self {
        Self {
            secret: secret.into(),
            tolerance,
        }
    }

    /// Verify against the current clock and parse the event
    pub fn verify_and_parse(&self, raw: &[u8], header: &str) -> Result<WebhookEvent> {
        self.verify_at(raw, header, Utc::now().timestamp())
    }

    /// Verify against an explicit clock and parse the event
    pub fn verify_at(&self, raw: &[u8], header: &str, now: i64) -> Result<WebhookEvent> {
        let header = SignatureHeader::parse(header)?;

        if now.abs_diff(header.timestamp) > self.tolerance.as_secs() {
            return Err(PaymentError::SignatureInvalid(
                "Timestamp outside the tolerance zone".into(),
            ));
        }

        let matched = header
            .signatures
            .iter()
            .any(|sig| self.matches(header.timestamp, raw, sig));
        if !matched {
            return Err(PaymentError::SignatureInvalid(
                "No signatures found matching the expected signature for payload".into(),
            ));
        }

        WebhookEvent::parse(raw)
    }

    /// Constant-time check of one candidate signature
    fn matches(&self, timestamp: i64, raw: &[u8], candidate: &str) -> bool {
        let Ok(expected) = hex::decode(candidate) else {
            return false;
        };
        let Ok(mac) = signed_mac(&self.secret, timestamp, raw) else {
            return false;
        };
        mac.verify_slice(&expected).is_ok()
    }
}

/// Build a `Stripe-Signature` header for a payload, as the processor would
pub fn sign_payload(raw: &[u8], secret: &str, timestamp: i64) -> Result<String> {
    let mac = signed_mac(secret, timestamp, raw)?;
    Ok(format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

fn signed_mac(secret: &str, timestamp: i64, raw: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| PaymentError::Config("Invalid webhook secret".into()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(raw);
    Ok(mac)
}

struct SignatureHeader {
    timestamp: i64,
    signatures: Vec<String>,
}

impl SignatureHeader {
    fn parse(header: &str) -> Result<Self> {
        let mut timestamp = None;
        let mut signatures = Vec::new();

        for part in header.split(',') {
            let Some((key, value)) = part.trim().split_once('=') else {
                continue;
            };
            match key {
                "t" => timestamp = value.parse::<i64>().ok(),
                "v1" => signatures.push(value.to_string()),
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or_else(|| {
            PaymentError::SignatureInvalid("Unable to extract timestamp from header".into())
        })?;
        if signatures.is_empty() {
            return Err(PaymentError::SignatureInvalid(
                "No signatures found with expected scheme".into(),
            ));
        }

        Ok(Self {
            timestamp,
            signatures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const NOW: i64 = 1_700_000_000;

    fn payload() -> Vec<u8> {
        br#"{"id":"evt_1","type":"payment_intent.succeeded","created":1700000000,"data":{"object":{"id":"pi_1","object":"payment_intent","amount":2000,"currency":"usd","status":"succeeded","created":1700000000}}}"#.to_vec()
    }

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET, Duration::from_secs(300))
    }

    #[test]
    fn test_valid_signature() {
        let raw = payload();
        let header = sign_payload(&raw, SECRET, NOW).unwrap();
        let event = verifier().verify_at(&raw, &header, NOW + 10).unwrap();
        assert_eq!(event.id, "evt_1");
    }

    #[test]
    fn test_any_single_byte_mutation_is_rejected() {
        let raw = payload();
        let header = sign_payload(&raw, SECRET, NOW).unwrap();

        for i in 0..raw.len() {
            let mut tampered = raw.clone();
            tampered[i] ^= 0x01;
            let result = verifier().verify_at(&tampered, &header, NOW);
            assert!(
                matches!(result, Err(PaymentError::SignatureInvalid(_))),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_reserialized_json_does_not_verify() {
        let raw = payload();
        let header = sign_payload(&raw, SECRET, NOW).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        let pretty = serde_json::to_vec_pretty(&value).unwrap();
        assert!(verifier().verify_at(&pretty, &header, NOW).is_err());
    }

    #[test]
    fn test_wrong_secret_and_stale_timestamp() {
        let raw = payload();

        let header = sign_payload(&raw, "whsec_other", NOW).unwrap();
        assert!(verifier().verify_at(&raw, &header, NOW).is_err());

        let header = sign_payload(&raw, SECRET, NOW).unwrap();
        assert!(verifier().verify_at(&raw, &header, NOW + 301).is_err());
        assert!(verifier().verify_at(&raw, &header, NOW - 301).is_err());
    }

    #[test]
    fn test_malformed_headers() {
        let raw = payload();
        for header in ["", "garbage", "v1=abcd", "t=1700000000", "t=abc,v1=00"] {
            assert!(
                matches!(
                    verifier().verify_at(&raw, header, NOW),
                    Err(PaymentError::SignatureInvalid(_))
                ),
                "header {header:?} was accepted"
            );
        }
    }

    #[test]
    fn test_rotated_secret_second_signature_matches() {
        let raw = payload();
        let good = sign_payload(&raw, SECRET, NOW).unwrap();
        let good_sig = good.split("v1=").nth(1).unwrap();
        let header = format!("t={NOW},v1={},v1={good_sig},v0=legacy", "ab".repeat(32));
        assert!(verifier().verify_at(&raw, &header, NOW).is_ok());
    }
}
