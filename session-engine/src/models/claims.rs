//! Access token claims - decoded locally, never signature-verified.

use serde::{Deserialize, Serialize};

/// Claims carried by the access token.
///
/// Decoding is local and unauthenticated, so every field here is advisory.
/// Authorization decisions must go through the permission cache, never
/// through the `role` claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    /// Expiration time (Unix timestamp, seconds)
    pub exp: i64,
    /// Owning user ID
    #[serde(default)]
    pub user_id: Option<String>,
    /// Advisory role label
    #[serde(default)]
    pub role: Option<String>,
}

impl AccessClaims {
    /// Expiry deadline in milliseconds since epoch.
    pub fn expiry_millis(&self) -> i64 {
        self.exp * 1000
    }
}
