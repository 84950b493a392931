//! Security Module
//!
//! Provides the security features for the GitConnect API:
//! - Identity verification (API Key + JWT)
//! - Authentication middleware
//! - CORS and security headers

pub mod auth;
pub mod middleware;

pub use auth::{
    ApiKeyVerifier, AuthenticatedAccount, CombinedVerifier, Credentials, IdentityVerifier,
    JwtTokenGenerator, JwtVerifier, TokenType,
};
