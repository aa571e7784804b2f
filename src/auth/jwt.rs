use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

/// Claims minted by the external auth provider. This server never issues
/// tokens; it only verifies them and reads the identity they carry.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,
    pub exp: i64,
    pub iat: i64,
    pub name: String,
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aud: Option<String>,
}

#[derive(Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: Option<String>,
    pub audience: Option<String>,
}

impl JwtConfig {
    pub fn from_env(secret: String) -> Self {
        let issuer = std::env::var("JWT_ISSUER")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        let audience = std::env::var("JWT_AUDIENCE")
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty());
        Self {
            secret,
            issuer,
            audience,
        }
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
        let mut validation = Validation::new(Algorithm::HS256);
        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }
        if let Some(audience) = &self.audience {
            validation.set_audience(&[audience]);
        }
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &validation,
        )?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use jsonwebtoken::{EncodingKey, Header, encode};
    use uuid::Uuid;

    fn mint(config: &JwtConfig, role: &str, exp_offset_hours: i64) -> String {
        let now = Utc::now();
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            exp: (now + Duration::hours(exp_offset_hours)).timestamp(),
            iat: now.timestamp(),
            name: "Ada Lovelace".to_string(),
            role: role.to_string(),
            iss: config.issuer.clone(),
            aud: config.audience.clone(),
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(config.secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn verifies_provider_token() {
        let config = JwtConfig {
            secret: "secret".to_string(),
            issuer: None,
            audience: None,
        };
        let token = mint(&config, "instructor", 1);
        let claims = config.verify_token(&token).unwrap();
        assert_eq!(claims.name, "Ada Lovelace");
        assert_eq!(claims.role, "instructor");
    }

    #[test]
    fn rejects_expired_token() {
        let config = JwtConfig {
            secret: "secret".to_string(),
            issuer: None,
            audience: None,
        };
        let token = mint(&config, "student", -2);
        assert!(config.verify_token(&token).is_err());
    }

    #[test]
    fn rejects_issuer_mismatch() {
        let minting = JwtConfig {
            secret: "secret".to_string(),
            issuer: Some("other-idp".to_string()),
            audience: None,
        };
        let verifying = JwtConfig {
            secret: "secret".to_string(),
            issuer: Some("campus-idp".to_string()),
            audience: None,
        };
        let token = mint(&minting, "student", 1);
        assert!(verifying.verify_token(&token).is_err());
    }
}
