//! # Rollcall Auth
//!
//! Access-token claims and JWT creation/verification.
//!
//! ```ignore
//! use rollcall_auth::{create_access_token, verify_token};
//!
//! let token = create_access_token(user_id, "60004220001", "student", &jwt_config)?;
//! let claims = verify_token(&token, &jwt_config)?;
//! assert_eq!(claims.role, "student");
//! ```

pub mod claims;
pub mod jwt;

pub use claims::Claims;
pub use jwt::{create_access_token, verify_token};
