//! Verification of signed payment gateway webhooks.
//!
//! The gateway signs every delivery with a header of the form
//!
//! ```text
//! X-Payment-Signature: t=1717243200,v1=3q2+7w==,v1=...
//! ```
//!
//! where each `v1` is `base64(HMAC-SHA256(secret, "<t>." ++ body))`. More than one `v1` entry is sent while the
//! gateway rotates secrets, and a match against any one of them is sufficient.
//!
//! The signature is always checked against the raw request bytes. The body is only parsed once the check passes.
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use log::*;
use sha2::Sha256;
use store_common::Secret;
use thiserror::Error;

use crate::payment_events::PaymentEvent;

type HmacSha256 = Hmac<Sha256>;

const SCHEME_V1: &str = "v1";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("The request carries no signature header")]
    MissingHeader,
    #[error("The signature header is malformed. {0}")]
    MalformedHeader(String),
    #[error("The signature header contains no v1 signatures")]
    NoSignatures,
    #[error("No signature matches the request body")]
    Mismatch,
    #[error("The signature timestamp {timestamp} is outside the tolerance window (now: {now})")]
    TimestampOutOfTolerance { timestamp: i64, now: i64 },
    #[error("The signed body is not a valid event. {0}")]
    MalformedEnvelope(String),
}

/// The parsed contents of a signature header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| SignatureError::MalformedHeader(format!("'{part}' is not a key=value pair")))?;
            match key {
                "t" => {
                    let t = value
                        .parse::<i64>()
                        .map_err(|e| SignatureError::MalformedHeader(format!("Invalid timestamp '{value}'. {e}")))?;
                    timestamp = Some(t);
                },
                SCHEME_V1 => match base64::decode(value) {
                    Ok(sig) => signatures.push(sig),
                    Err(e) => debug!("🔐️ Skipping undecodable signature entry. {e}"),
                },
                // Unknown schemes are ignored so that the gateway can introduce new ones
                _ => {},
            }
        }
        let timestamp = timestamp.ok_or_else(|| SignatureError::MalformedHeader("No timestamp".to_string()))?;
        if signatures.is_empty() {
            return Err(SignatureError::NoSignatures);
        }
        Ok(Self { timestamp, signatures })
    }
}

fn new_mac(secret: &[u8], timestamp: i64, body: &[u8]) -> HmacSha256 {
    let mut mac = <HmacSha256 as Mac>::new_from_slice(secret).expect("HMAC can take a key of any size");
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(body);
    mac
}

/// Computes the base64-encoded `v1` signature for `body` at `timestamp`.
pub fn compute_signature(secret: &str, timestamp: i64, body: &[u8]) -> String {
    base64::encode(new_mac(secret.as_bytes(), timestamp, body).finalize().into_bytes())
}

/// Produces a complete signature header value, as the gateway would send it.
pub fn sign_payload(secret: &str, timestamp: i64, body: &[u8]) -> String {
    format!("t={timestamp},{SCHEME_V1}={}", compute_signature(secret, timestamp, body))
}

/// Verifies `raw_body` against `header` with no timestamp tolerance, and parses the event envelope if the signature
/// is valid.
pub fn verify(raw_body: &[u8], header: Option<&str>, secret: &Secret<String>) -> Result<PaymentEvent, SignatureError> {
    SignatureVerifier::new(secret.clone(), Duration::ZERO).verify(raw_body, header)
}

#[derive(Debug, Clone)]
pub struct SignatureVerifier {
    secret: Secret<String>,
    tolerance: Option<Duration>,
}

impl SignatureVerifier {
    /// A zero `tolerance` disables the timestamp check.
    pub fn new(secret: Secret<String>, tolerance: Duration) -> Self {
        let tolerance = if tolerance.is_zero() { None } else { Some(tolerance) };
        Self { secret, tolerance }
    }

    pub fn verify(&self, raw_body: &[u8], header: Option<&str>) -> Result<PaymentEvent, SignatureError> {
        self.verify_at(raw_body, header, Utc::now().timestamp())
    }

    pub fn verify_at(&self, raw_body: &[u8], header: Option<&str>, now: i64) -> Result<PaymentEvent, SignatureError> {
        let header = header.map(str::trim).filter(|h| !h.is_empty()).ok_or(SignatureError::MissingHeader)?;
        let parsed = SignatureHeader::parse(header)?;
        if let Some(tolerance) = self.tolerance {
            let age = now.abs_diff(parsed.timestamp);
            if age > tolerance.as_secs() {
                warn!("🔐️ Signature timestamp is {age}s away from the current time. Rejecting.");
                return Err(SignatureError::TimestampOutOfTolerance { timestamp: parsed.timestamp, now });
            }
        }
        let mac = new_mac(self.secret.reveal().as_bytes(), parsed.timestamp, raw_body);
        let matched = parsed.signatures.iter().any(|sig| mac.clone().verify_slice(sig).is_ok());
        if !matched {
            warn!("🔐️ Invalid webhook signature. Denying request.");
            return Err(SignatureError::Mismatch);
        }
        trace!("🔐️ Webhook signature check ✅️");
        serde_json::from_slice::<PaymentEvent>(raw_body).map_err(|e| SignatureError::MalformedEnvelope(e.to_string()))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    const SECRET: &str = "whsec_test_secret";
    const BODY: &[u8] = br#"{"id":"evt_1","type":"payment.succeeded","data":{}}"#;
    const NOW: i64 = 1_717_243_200;

    fn verifier() -> SignatureVerifier {
        SignatureVerifier::new(Secret::new(SECRET.to_string()), Duration::from_secs(300))
    }

    #[test]
    fn valid_signature() {
        let header = sign_payload(SECRET, NOW, BODY);
        let event = verifier().verify_at(BODY, Some(&header), NOW + 10).unwrap();
        assert_eq!(event.id.as_str(), "evt_1");
    }

    #[test]
    fn any_of_several_signatures_is_enough() {
        let header =
            format!("t={NOW},v1={},v0=legacy,v1={}", compute_signature("old", NOW, BODY), compute_signature(SECRET, NOW, BODY));
        assert!(verifier().verify_at(BODY, Some(&header), NOW).is_ok());
    }

    #[test]
    fn tampered_body() {
        let header = sign_payload(SECRET, NOW, BODY);
        let tampered = br#"{"id":"evt_1","type":"payment.succeeded","data":{"x":1}}"#;
        assert_eq!(verifier().verify_at(tampered, Some(&header), NOW), Err(SignatureError::Mismatch));
    }

    #[test]
    fn wrong_secret() {
        let header = sign_payload("another secret", NOW, BODY);
        assert_eq!(verifier().verify_at(BODY, Some(&header), NOW), Err(SignatureError::Mismatch));
    }

    #[test]
    fn header_problems() {
        let v = verifier();
        assert_eq!(v.verify_at(BODY, None, NOW), Err(SignatureError::MissingHeader));
        assert_eq!(v.verify_at(BODY, Some("  "), NOW), Err(SignatureError::MissingHeader));
        assert!(matches!(v.verify_at(BODY, Some("garbage"), NOW), Err(SignatureError::MalformedHeader(_))));
        assert!(matches!(v.verify_at(BODY, Some("v1=abc"), NOW), Err(SignatureError::MalformedHeader(_))));
        assert_eq!(v.verify_at(BODY, Some(&format!("t={NOW}")), NOW), Err(SignatureError::NoSignatures));
    }

    #[test]
    fn replay_window() {
        let header = sign_payload(SECRET, NOW, BODY);
        let err = verifier().verify_at(BODY, Some(&header), NOW + 301).unwrap_err();
        assert_eq!(err, SignatureError::TimestampOutOfTolerance { timestamp: NOW, now: NOW + 301 });
        let lenient = SignatureVerifier::new(Secret::new(SECRET.to_string()), Duration::ZERO);
        assert!(lenient.verify_at(BODY, Some(&header), NOW + 86_400).is_ok());
    }

    #[test]
    fn signed_garbage_is_not_an_event() {
        let body = b"not json";
        let header = sign_payload(SECRET, NOW, body);
        assert!(matches!(verifier().verify_at(body, Some(&header), NOW), Err(SignatureError::MalformedEnvelope(_))));
    }

    #[test]
    fn free_function_ignores_timestamps() {
        let header = sign_payload(SECRET, 1, BODY);
        assert!(verify(BODY, Some(&header), &Secret::new(SECRET.to_string())).is_ok());
    }
}
