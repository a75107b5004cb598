use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Access token claims. The role travels in the token so route guards need no
/// database lookup.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Claims {
    /// User ID (subject claim)
    pub sub: String,
    /// Institutional SAP ID of the user
    pub sap_id: String,
    /// One of `admin`, `teacher`, `student`
    pub role: String,
    /// Expiration timestamp (Unix seconds)
    pub exp: usize,
    /// Issued-at timestamp (Unix seconds)
    pub iat: usize,
}
