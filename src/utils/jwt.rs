use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id
    pub role: String, // "admin" or "user"
    pub exp: i64,
    pub iat: i64,
}

impl Claims {
    /// Caller capability is a two-value flag: only "admin" is privileged.
    pub fn is_privileged(&self) -> bool {
        self.role == "admin"
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, access_expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            access_token_expires_in: access_expires_in,
        }
    }

    pub fn generate_access_token(&self, user_id: i64, role: &str) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.access_token_expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            role: role.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_access_token(&self, token: &str) -> AppResult<Claims> {
        let validation = Validation::new(Algorithm::HS256);
        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_roundtrip() {
        let svc = JwtService::new("unit-test-secret", 3600);
        let token = svc.generate_access_token(7, "user").unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert_eq!(claims.sub, "7");
        assert_eq!(claims.role, "user");
        assert!(!claims.is_privileged());
    }

    #[test]
    fn test_admin_role_is_privileged() {
        let svc = JwtService::new("unit-test-secret", 3600);
        let token = svc.generate_access_token(1, "admin").unwrap();
        let claims = svc.verify_access_token(&token).unwrap();
        assert!(claims.is_privileged());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let a = JwtService::new("secret-a", 3600);
        let b = JwtService::new("secret-b", 3600);
        let token = a.generate_access_token(1, "user").unwrap();
        assert!(b.verify_access_token(&token).is_err());
    }
}
