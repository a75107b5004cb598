//! # Rollcall Core
//!
//! Core types, errors, and utilities for the Rollcall API.
//!
//! - [`errors`]: Application error type with HTTP response conversion
//! - [`pagination`]: Pagination utilities for list endpoints
//! - [`password`]: Password hashing and verification
//! - [`dates`]: `dd-mm-yyyy` query date parsing and date ranges
//! - [`file_storage`]: Storage abstraction for ticket attachments
//!
//! # Example
//!
//! ```ignore
//! use rollcall_core::errors::AppError;
//! use rollcall_core::dates::parse_query_date;
//! use rollcall_core::password::{hash_password, verify_password};
//!
//! let date = parse_query_date("13-05-2024")?;
//! let hash = hash_password("secure_password")?;
//! let error = AppError::not_found(anyhow::anyhow!("Student not found"));
//! ```

pub mod dates;
pub mod errors;
pub mod file_storage;
pub mod pagination;
pub mod password;

pub use errors::AppError;
pub use pagination::{PaginationMeta, PaginationParams};
pub use password::{hash_password, verify_password};
