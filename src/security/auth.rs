//! Authentication Module
//!
//! Verifies inbound credentials and yields the authenticated account:
//! - API Key authentication (key -> account id)
//! - JWT (JSON Web Token) authentication (subject = account id)

use async_trait::async_trait;
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

use crate::config::config::SecurityConfig;
use crate::error::{AppError, Result};

/// Credentials for authentication
#[derive(Clone, Default)]
pub struct Credentials {
    /// API key (if provided)
    pub api_key: Option<String>,
    /// JWT token (if provided)
    pub jwt_token: Option<String>,
}

impl Credentials {
    /// Create new credentials
    pub fn new(api_key: Option<String>, jwt_token: Option<String>) -> Self {
        Self { api_key, jwt_token }
    }

    /// Try to extract credentials from Authorization header
    pub fn from_authorization_header(auth_header: Option<&str>) -> Self {
        match auth_header {
            Some(header) => {
                if let Some(key) = header.strip_prefix("ApiKey ") {
                    Self::new(Some(key.trim().to_string()), None)
                } else if let Some(token) = header.strip_prefix("Bearer ") {
                    Self::new(None, Some(token.trim().to_string()))
                } else {
                    Self::default()
                }
            }
            None => Self::default(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.is_none() && self.jwt_token.is_none()
    }
}

// Never print the raw secret.
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("jwt_token", &self.jwt_token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Token type enumeration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TokenType {
    /// API Key token
    ApiKey,
    /// Bearer token (JWT)
    Bearer,
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenType::ApiKey => write!(f, "ApiKey"),
            TokenType::Bearer => write!(f, "Bearer"),
        }
    }
}

/// Verified caller identity, stored in request extensions
#[derive(Debug, Clone, PartialEq)]
pub struct AuthenticatedAccount {
    /// Account identifier
    pub account_id: String,
    /// How the caller authenticated
    pub method: TokenType,
}

impl AuthenticatedAccount {
    pub fn new(account_id: impl Into<String>, method: TokenType) -> Self {
        Self {
            account_id: account_id.into(),
            method,
        }
    }
}

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (account ID)
    pub sub: String,
    /// Token expiration timestamp
    pub exp: usize,
    /// Token not before timestamp
    pub nbf: usize,
    /// Issued at timestamp
    pub iat: usize,
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Unique token ID
    pub jti: String,
}

impl Claims {
    /// Create new claims
    pub fn new(sub: String, expiry_seconds: u64, issuer: String, audience: String) -> Self {
        let now = Utc::now().timestamp() as usize;

        Self {
            sub,
            exp: now + expiry_seconds as usize,
            nbf: now,
            iat: now,
            iss: issuer,
            aud: audience,
            jti: Uuid::new_v4().to_string(),
        }
    }
}

/// Identity verification for mutating operations
#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Verify credentials and return the authenticated account
    async fn verify(&self, credentials: &Credentials) -> Result<AuthenticatedAccount>;
    /// Get the verifier type
    fn verifier_type(&self) -> &'static str;
}

/// API Key based verification
#[derive(Clone)]
pub struct ApiKeyVerifier {
    /// Valid API keys map (key -> account_id)
    valid_keys: HashMap<String, String>,
}

impl ApiKeyVerifier {
    /// Create new API key verifier
    pub fn new(valid_keys: HashMap<String, String>) -> Self {
        Self { valid_keys }
    }
}

#[async_trait]
impl IdentityVerifier for ApiKeyVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<AuthenticatedAccount> {
        let api_key = credentials
            .api_key
            .as_ref()
            .ok_or_else(|| AppError::Authentication("No API key provided".to_string()))?;

        let account_id = self
            .valid_keys
            .get(api_key)
            .ok_or_else(|| AppError::Authentication("Invalid API key".to_string()))?;

        Ok(AuthenticatedAccount::new(account_id.clone(), TokenType::ApiKey))
    }

    fn verifier_type(&self) -> &'static str {
        "ApiKey"
    }
}

/// JWT based verification
#[derive(Clone)]
pub struct JwtVerifier {
    /// Secret key for decoding
    decoding_key: DecodingKey,
    /// JWT issuer
    issuer: String,
    /// JWT audience
    audience: String,
}

impl JwtVerifier {
    /// Create new JWT verifier
    pub fn new(secret: &str, issuer: String, audience: String) -> Self {
        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
        }
    }

    /// Validate a token and return claims
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[self.issuer.clone()]);
        validation.set_audience(&[self.audience.clone()]);
        validation.validate_nbf = true;

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|token_data| token_data.claims)
            .map_err(|e| AppError::Authentication(format!("Invalid JWT token: {}", e)))
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<AuthenticatedAccount> {
        let jwt_token = credentials
            .jwt_token
            .as_ref()
            .ok_or_else(|| AppError::Authentication("No JWT token provided".to_string()))?;

        let claims = self.validate_token(jwt_token)?;
        if claims.sub.is_empty() {
            return Err(AppError::Authentication(
                "JWT token has no subject".to_string(),
            ));
        }

        Ok(AuthenticatedAccount::new(claims.sub, TokenType::Bearer))
    }

    fn verifier_type(&self) -> &'static str {
        "JWT"
    }
}

/// Combined verifier that dispatches on the credential kind
#[derive(Clone, Default)]
pub struct CombinedVerifier {
    /// API key verifier
    api_key: Option<ApiKeyVerifier>,
    /// JWT verifier
    jwt: Option<JwtVerifier>,
}

impl CombinedVerifier {
    /// Create new combined verifier
    pub fn new(api_key: Option<ApiKeyVerifier>, jwt: Option<JwtVerifier>) -> Self {
        Self { api_key, jwt }
    }

    /// Create from security settings
    pub fn from_settings(settings: &SecurityConfig) -> Self {
        let api_key = settings
            .api_key_auth_enabled
            .then(|| ApiKeyVerifier::new(settings.api_keys.clone()));

        let jwt = settings.jwt_auth_enabled.then(|| {
            JwtVerifier::new(
                &settings.jwt_secret,
                settings.jwt_issuer.clone(),
                settings.jwt_audience.clone(),
            )
        });

        Self::new(api_key, jwt)
    }
}

#[async_trait]
impl IdentityVerifier for CombinedVerifier {
    async fn verify(&self, credentials: &Credentials) -> Result<AuthenticatedAccount> {
        if credentials.api_key.is_some() {
            if let Some(api_key) = &self.api_key {
                return api_key.verify(credentials).await;
            }
        }

        if credentials.jwt_token.is_some() {
            if let Some(jwt) = &self.jwt {
                return jwt.verify(credentials).await;
            }
        }

        Err(AppError::Authentication(
            "No valid authentication method provided".to_string(),
        ))
    }

    fn verifier_type(&self) -> &'static str {
        "Combined"
    }
}

/// JWT token generation helper
pub struct JwtTokenGenerator {
    encoding_key: EncodingKey,
    issuer: String,
    audience: String,
    expiry_seconds: u64,
}

impl JwtTokenGenerator {
    /// Create new token generator
    pub fn new(secret: &str, issuer: String, audience: String, expiry_seconds: u64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
            audience,
            expiry_seconds,
        }
    }

    /// Create from security settings
    pub fn from_settings(settings: &SecurityConfig, expiry_seconds: u64) -> Self {
        Self::new(
            &settings.jwt_secret,
            settings.jwt_issuer.clone(),
            settings.jwt_audience.clone(),
            expiry_seconds,
        )
    }

    /// Generate a new JWT token for an account
    pub fn generate_token(&self, account_id: &str) -> Result<String> {
        let claims = Claims::new(
            account_id.to_string(),
            self.expiry_seconds,
            self.issuer.clone(),
            self.audience.clone(),
        );

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Authentication(format!("Failed to generate token: {}", e)))
    }
}
