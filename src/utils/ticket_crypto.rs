use crate::error::{AppError, AppResult};
use constant_time_eq::constant_time_eq;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use uuid::Uuid;

type HmacSha256 = Hmac<Sha256>;

/// Hex length of an HMAC-SHA256 signature.
const SIGNATURE_HEX_LEN: usize = 64;

/// Keyed signing of tickets: binds `uuid|owner_id|generated_at_millis`
/// to a process-wide secret injected at construction.
#[derive(Clone)]
pub struct TicketCrypto {
    key: Vec<u8>,
}

impl TicketCrypto {
    /// Fails on an empty secret: there is no insecure fallback key.
    pub fn new(secret: &str) -> AppResult<Self> {
        if secret.trim().is_empty() {
            return Err(AppError::ConfigError(
                "Ticket signing secret must not be empty".to_string(),
            ));
        }
        Ok(Self {
            key: secret.as_bytes().to_vec(),
        })
    }

    /// HMAC-SHA256 over `uuid|owner_id|generated_at_millis`, hex-encoded.
    pub fn sign(&self, ticket_uuid: &Uuid, owner_id: i64, generated_at_millis: i64) -> String {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(format!("{ticket_uuid}|{owner_id}|{generated_at_millis}").as_bytes());
        mac.finalize()
            .into_bytes()
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }

    /// Constant-time verification. Returns false (never panics) on malformed,
    /// truncated or mismatched signatures. Length is checked up front so that
    /// garbage input is rejected before any byte comparison happens.
    pub fn verify(
        &self,
        ticket_uuid: &Uuid,
        owner_id: i64,
        generated_at_millis: i64,
        signature: &str,
    ) -> bool {
        if signature.len() != SIGNATURE_HEX_LEN {
            return false;
        }
        let expected = self.sign(ticket_uuid, owner_id, generated_at_millis);
        constant_time_eq(signature.as_bytes(), expected.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn crypto() -> TicketCrypto {
        TicketCrypto::new("test-secret-key").unwrap()
    }

    #[test]
    fn test_sign_verify_roundtrip() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        let sig = c.sign(&uuid, 42, 1_700_000_000_000);
        assert_eq!(sig.len(), SIGNATURE_HEX_LEN);
        assert!(c.verify(&uuid, 42, 1_700_000_000_000, &sig));
    }

    #[test]
    fn test_signing_is_deterministic() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        assert_eq!(c.sign(&uuid, 1, 1000), c.sign(&uuid, 1, 1000));
    }

    #[test]
    fn test_tampered_signature_rejected() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        let sig = c.sign(&uuid, 42, 1000);

        // Flip every hex digit once; all variants must fail.
        for i in 0..sig.len() {
            let mut bytes = sig.clone().into_bytes();
            bytes[i] = if bytes[i] == b'0' { b'1' } else { b'0' };
            let tampered = String::from_utf8(bytes).unwrap();
            if tampered != sig {
                assert!(!c.verify(&uuid, 42, 1000, &tampered), "flip at {i} passed");
            }
        }
    }

    #[test]
    fn test_wrong_owner_rejected() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        let sig = c.sign(&uuid, 42, 1000);
        assert!(!c.verify(&uuid, 43, 1000, &sig));
    }

    #[test]
    fn test_wrong_timestamp_rejected() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        let sig = c.sign(&uuid, 42, 1000);
        assert!(!c.verify(&uuid, 42, 1001, &sig));
    }

    #[test]
    fn test_malformed_lengths_rejected() {
        let c = crypto();
        let uuid = Uuid::new_v4();
        let sig = c.sign(&uuid, 42, 1000);
        assert!(!c.verify(&uuid, 42, 1000, ""));
        assert!(!c.verify(&uuid, 42, 1000, &sig[..10]));
        assert!(!c.verify(&uuid, 42, 1000, &format!("{sig}00")));
        assert!(!c.verify(&uuid, 42, 1000, "not-a-signature"));
    }

    #[test]
    fn test_different_keys_do_not_cross_verify() {
        let a = TicketCrypto::new("key-a").unwrap();
        let b = TicketCrypto::new("key-b").unwrap();
        let uuid = Uuid::new_v4();
        let sig = a.sign(&uuid, 1, 1000);
        assert!(!b.verify(&uuid, 1, 1000, &sig));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert!(TicketCrypto::new("").is_err());
        assert!(TicketCrypto::new("   ").is_err());
    }
}
