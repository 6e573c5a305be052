// Identity of the caller, as verified from the bearer token

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Authenticated user information extracted from JWT
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub exp: u64,
}
