//! Authentication DTOs, shared with the CLI through `rollcall-models`.

pub use rollcall_models::auth::*;
pub use rollcall_models::users::{UserProfile, UserRecord, UserRole};
