//! Authentication and authorization.
//!
//! - [`auth`]: the [`auth::AuthUser`] extractor (bearer token to claims)
//! - [`role`]: route-group guards and role-specific extractors
//!
//! # Example
//!
//! ```ignore
//! use crate::middleware::role::RequireTeacher;
//!
//! async fn today(RequireTeacher(teacher): RequireTeacher) -> Result<Json<Vec<TodayClass>>, AppError> {
//!     let teacher_id = teacher.user_id()?;
//!     // ...
//! }
//! ```

pub mod auth;
pub mod role;
