// Authentication models
// Claims issued by the hosted auth provider (HS256 access tokens)

use serde::{Deserialize, Serialize};

/// Access token claims as issued by the auth provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenClaims {
    /// User ID (subject)
    pub sub: String,

    /// User email address
    #[serde(default)]
    pub email: Option<String>,

    /// Provider role ("authenticated" for signed-in users)
    #[serde(default)]
    pub role: Option<String>,

    /// Audience (aud)
    pub aud: String,

    /// Issuer (iss)
    #[serde(default)]
    pub iss: Option<String>,

    /// Issued at timestamp (Unix epoch seconds)
    pub iat: u64,

    /// Expires at timestamp (Unix epoch seconds)
    pub exp: u64,
}
