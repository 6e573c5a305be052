// Bearer token verification
// Access tokens are issued by the hosted auth provider and signed with HS256

use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;
use uuid::Uuid;

use crate::models::auth::AccessTokenClaims;

#[derive(Error, Debug)]
pub enum JwtError {
    #[error("JWT encoding error: {0}")]
    EncodingError(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token subject is not a user id")]
    InvalidSubject,

    #[error("Clock error: {0}")]
    Clock(String),
}

impl From<jsonwebtoken::errors::Error> for JwtError {
    fn from(err: jsonwebtoken::errors::Error) -> Self {
        use jsonwebtoken::errors::ErrorKind;
        match err.kind() {
            ErrorKind::ExpiredSignature => JwtError::TokenExpired,
            ErrorKind::InvalidToken
            | ErrorKind::InvalidSignature
            | ErrorKind::InvalidAudience
            | ErrorKind::InvalidIssuer
            | ErrorKind::InvalidAlgorithm
            | ErrorKind::MissingRequiredClaim(_)
            | ErrorKind::Base64(_)
            | ErrorKind::Json(_)
            | ErrorKind::Utf8(_) => JwtError::InvalidToken,
            _ => JwtError::EncodingError(err.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct JwtConfig {
    pub algorithm: Algorithm,
    pub audience: String,
    pub issuer: Option<String>,
    pub encoding_key: EncodingKey,
    pub decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("algorithm", &self.algorithm)
            .field("audience", &self.audience)
            .field("issuer", &self.issuer)
            .field("encoding_key", &"<redacted>")
            .field("decoding_key", &"<redacted>")
            .finish()
    }
}

impl JwtConfig {
    fn build_from_params(secret: &str, audience: String, issuer: Option<String>) -> Self {
        JwtConfig {
            algorithm: Algorithm::HS256,
            audience,
            issuer,
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
        }
    }

    pub fn from_app_config(config: &crate::app_config::JwtConfig) -> Self {
        Self::build_from_params(&config.secret, config.audience.clone(), config.issuer.clone())
    }

    /// Deterministic config for tests
    pub fn for_test() -> Self {
        Self::build_from_params(
            "test-secret-that-is-at-least-32-characters-long",
            "authenticated".to_string(),
            None,
        )
    }
}

pub struct JwtService {
    config: JwtConfig,
}

impl JwtService {
    pub fn new(config: JwtConfig) -> Self {
        Self { config }
    }

    /// Validate a bearer token and return its claims
    pub fn validate_access_token(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        let mut validation = Validation::new(self.config.algorithm);
        validation.set_audience(&[self.config.audience.clone()]);
        if let Some(issuer) = &self.config.issuer {
            validation.set_issuer(&[issuer.clone()]);
        }
        validation.validate_exp = true;
        validation.validate_nbf = false;
        validation.leeway = 0;

        let token_data = decode::<AccessTokenClaims>(token, &self.config.decoding_key, &validation)?;
        Ok(token_data.claims)
    }

    /// Validate a bearer token and return the user it identifies
    pub fn authenticate(&self, token: &str) -> Result<(Uuid, AccessTokenClaims), JwtError> {
        let claims = self.validate_access_token(token)?;
        let user_id = Uuid::parse_str(&claims.sub).map_err(|_| JwtError::InvalidSubject)?;
        Ok((user_id, claims))
    }

    /// Sign an access token with the configured secret.
    ///
    /// Production tokens come from the auth provider; this exists for local
    /// tooling and tests.
    pub fn generate_access_token(
        &self,
        user_id: Uuid,
        email: Option<&str>,
        ttl_seconds: u64,
    ) -> Result<String, JwtError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| JwtError::Clock(e.to_string()))?
            .as_secs();

        let claims = AccessTokenClaims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            role: Some("authenticated".to_string()),
            aud: self.config.audience.clone(),
            iss: self.config.issuer.clone(),
            iat: now,
            exp: now + ttl_seconds,
        };

        encode(&Header::new(self.config.algorithm), &claims, &self.config.encoding_key)
            .map_err(Into::into)
    }
}
