//! Shopify webhook signature verification.
//!
//! Shopify signs every webhook body with HMAC-SHA256 under the app's shared
//! secret and sends the base64 digest in `X-Shopify-Hmac-Sha256`.
//! Reference: https://shopify.dev/docs/apps/build/webhooks/subscribe/https#step-5-verify-the-webhook

use base64::{engine::general_purpose::STANDARD, Engine as _};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the base64 HMAC-SHA256 of the raw body.
pub const HEADER_HMAC: &str = "X-Shopify-Hmac-Sha256";

/// Header carrying the webhook topic, e.g. `orders/cancelled`.
pub const HEADER_TOPIC: &str = "X-Shopify-Topic";

/// Header carrying the shop's myshopify.com domain.
pub const HEADER_SHOP_DOMAIN: &str = "X-Shopify-Shop-Domain";

/// Header carrying the unique delivery id.
pub const HEADER_WEBHOOK_ID: &str = "X-Shopify-Webhook-Id";

/// Why a webhook failed verification.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectReason {
    #[error("Missing HMAC header")]
    MissingSignature,

    #[error("Invalid HMAC signature")]
    Mismatch,

    #[error("{0}")]
    Internal(String),
}

/// Compute the base64 HMAC-SHA256 of `body` under `secret`.
pub fn compute_signature(secret: &str, body: &[u8]) -> Result<String, RejectReason> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| RejectReason::Internal(e.to_string()))?;
    mac.update(body);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Verify a Shopify webhook signature.
///
/// `raw_body` must be the exact bytes received; hashing a re-serialized
/// payload produces a different digest. `signature` is the raw header
/// value, `None` when the header was not sent.
pub fn verify_shopify_webhook(
    raw_body: &[u8],
    signature: Option<&[u8]>,
    secret: &str,
) -> Result<(), RejectReason> {
    let provided = match signature {
        Some(sig) if !sig.is_empty() => sig,
        _ => {
            warn!(body_length = raw_body.len(), "shopify_signature_missing");
            return Err(RejectReason::MissingSignature);
        }
    };

    let expected = compute_signature(secret, raw_body)?;

    // Unequal lengths compare false.
    if bool::from(expected.as_bytes().ct_eq(provided)) {
        Ok(())
    } else {
        warn!(
            expected_length = expected.len(),
            actual_length = provided.len(),
            "shopify_signature_mismatch"
        );
        Err(RejectReason::Mismatch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "shpss_test_secret";

    fn sign(body: &[u8]) -> String {
        compute_signature(SECRET, body).unwrap()
    }

    #[test]
    fn test_known_digest() {
        assert_eq!(
            compute_signature("key", br#"{"id":1}"#).unwrap(),
            "yVxqfCx8dh6YTGjPZLS8qT8HJCkAqv27Mo07t1qw3LA="
        );
    }

    #[test]
    fn test_verify_valid() {
        let body = br#"{"id": 1, "email": "jon@example.com"}"#;
        let sig = sign(body);
        assert_eq!(verify_shopify_webhook(body, Some(sig.as_bytes()), SECRET), Ok(()));
    }

    #[test]
    fn test_verify_missing_signature() {
        let body = br#"{"id": 1}"#;
        assert_eq!(
            verify_shopify_webhook(body, None, SECRET),
            Err(RejectReason::MissingSignature)
        );
        assert_eq!(
            verify_shopify_webhook(body, Some(&b""[..]), SECRET),
            Err(RejectReason::MissingSignature)
        );
    }

    #[test]
    fn test_verify_wrong_secret() {
        let body = br#"{"id": 1}"#;
        let sig = compute_signature("other-secret", body).unwrap();
        assert_eq!(
            verify_shopify_webhook(body, Some(sig.as_bytes()), SECRET),
            Err(RejectReason::Mismatch)
        );
    }

    #[test]
    fn test_any_body_byte_mutation_rejects() {
        let body = br#"{"id": 1, "line_items": []}"#.to_vec();
        let sig = sign(&body);

        for i in 0..body.len() {
            let mut mutated = body.clone();
            mutated[i] ^= 0x01;
            assert_eq!(
                verify_shopify_webhook(&mutated, Some(sig.as_bytes()), SECRET),
                Err(RejectReason::Mismatch),
                "mutation at byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_any_digest_byte_mutation_rejects() {
        let body = br#"{"id": 1}"#;
        let sig = sign(body).into_bytes();

        for i in 0..sig.len() {
            let mut mutated = sig.clone();
            mutated[i] ^= 0x01;
            assert_eq!(
                verify_shopify_webhook(body, Some(mutated.as_slice()), SECRET),
                Err(RejectReason::Mismatch),
                "mutation at digest byte {i} was accepted"
            );
        }
    }

    #[test]
    fn test_truncated_digest_rejects() {
        let body = br#"{"id": 1}"#;
        let sig = sign(body);
        assert_eq!(
            verify_shopify_webhook(body, Some(&sig.as_bytes()[..sig.len() - 1]), SECRET),
            Err(RejectReason::Mismatch)
        );
    }

    #[test]
    fn test_reserialized_json_does_not_verify() {
        let raw = b"{ \"id\" : 1,\n  \"email\": \"jon@example.com\" }";
        let sig = sign(raw);

        let value: serde_json::Value = serde_json::from_slice(raw).unwrap();
        let reserialized = serde_json::to_vec(&value).unwrap();

        assert_ne!(reserialized, raw.to_vec());
        assert_ne!(sign(&reserialized), sig);
        assert_eq!(verify_shopify_webhook(raw, Some(sig.as_bytes()), SECRET), Ok(()));
        assert_eq!(
            verify_shopify_webhook(&reserialized, Some(sig.as_bytes()), SECRET),
            Err(RejectReason::Mismatch)
        );
    }

    #[test]
    fn test_reject_reason_messages() {
        assert_eq!(RejectReason::MissingSignature.to_string(), "Missing HMAC header");
        assert_eq!(RejectReason::Mismatch.to_string(), "Invalid HMAC signature");
        assert_eq!(
            RejectReason::Internal("body read failed".to_string()).to_string(),
            "body read failed"
        );
    }
}
