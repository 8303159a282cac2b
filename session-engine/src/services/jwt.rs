//! Local JWT inspection.
//!
//! Tokens are decoded without signature verification; the backend is the
//! only party that can vouch for them. Decoded claims are used for expiry
//! scheduling and display hints, never for authorization.

use chrono::Utc;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};

use crate::models::AccessClaims;
use crate::services::EngineError;

pub struct TokenInspector;

impl TokenInspector {
    /// Decode the token payload without checking the signature.
    pub fn decode_claims(token: &str) -> Result<AccessClaims, EngineError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<AccessClaims>(token, &DecodingKey::from_secret(&[]), &validation)?;
        Ok(data.claims)
    }

    /// True when the token is past its `exp` deadline or cannot be decoded.
    /// Never panics, never propagates the decode error.
    pub fn is_expired(token: &str) -> bool {
        match Self::decode_claims(token) {
            Ok(claims) => claims.expiry_millis() <= Utc::now().timestamp_millis(),
            Err(_) => true,
        }
    }

    /// Milliseconds until expiry; non-positive when already expired.
    pub fn expires_in_millis(token: &str) -> Result<i64, EngineError> {
        let claims = Self::decode_claims(token)?;
        Ok(claims.expiry_millis() - Utc::now().timestamp_millis())
    }

    /// Guard for callers that need a hard error instead of a bool.
    pub fn ensure_fresh(token: &str) -> Result<(), EngineError> {
        let claims = Self::decode_claims(token)?;
        if claims.expiry_millis() <= Utc::now().timestamp_millis() {
            return Err(EngineError::TokenExpired);
        }
        Ok(())
    }
}
