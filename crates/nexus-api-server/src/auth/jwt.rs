use anyhow::{bail, Result};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::config::JwtConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String, // User ID (Subject)
    pub exp: usize,  // Expiration
    pub token_type: TokenType,
    pub user_id: i64, // Integer User ID for DB mapping
}

pub struct JwtManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_expiry_seconds: u64,
    refresh_expiry_seconds: u64,
}

impl JwtManager {
    pub fn new(config: &JwtConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.secret.as_bytes()),
            access_expiry_seconds: config.access_token_expire_minutes * 60,
            refresh_expiry_seconds: config.refresh_token_expire_days * 24 * 60 * 60,
        }
    }

    pub fn generate_access_token(&self, user_id: i64) -> Result<String> {
        self.generate(user_id, TokenType::Access, self.access_expiry_seconds)
    }

    pub fn generate_refresh_token(&self, user_id: i64) -> Result<String> {
        self.generate(user_id, TokenType::Refresh, self.refresh_expiry_seconds)
    }

    fn generate(&self, user_id: i64, token_type: TokenType, expiry_seconds: u64) -> Result<String> {
        let now = SystemTime::now().duration_since(UNIX_EPOCH)?.as_secs() as usize;

        let claims = Claims {
            sub: user_id.to_string(),
            exp: now + expiry_seconds as usize,
            token_type,
            user_id,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    pub fn validate_token(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())?;

        if token_data.claims.token_type != expected {
            bail!("Wrong token type: expected {:?}", expected);
        }

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> JwtManager {
        JwtManager::new(&JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        })
    }

    #[test]
    fn test_access_token_round_trip() {
        let jwt = manager();
        let token = jwt.generate_access_token(42).unwrap();
        let claims = jwt.validate_token(&token, TokenType::Access).unwrap();

        assert_eq!(claims.user_id, 42);
        assert_eq!(claims.sub, "42");
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn test_refresh_token_not_valid_as_access() {
        let jwt = manager();
        let token = jwt.generate_refresh_token(42).unwrap();

        assert!(jwt.validate_token(&token, TokenType::Access).is_err());
        assert!(jwt.validate_token(&token, TokenType::Refresh).is_ok());
    }

    #[test]
    fn test_garbage_token_rejected() {
        let jwt = manager();
        assert!(jwt
            .validate_token("not.a.token", TokenType::Access)
            .is_err());
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = manager();
        let other = JwtManager::new(&JwtConfig {
            secret: "other-secret".to_string(),
            access_token_expire_minutes: 30,
            refresh_token_expire_days: 7,
        });

        let token = jwt.generate_access_token(7).unwrap();
        assert!(other.validate_token(&token, TokenType::Access).is_err());
    }
}
