//! Shared utilities.
//!
//! - [`email`]: SMTP notifications sent to teachers when a ticket is raised

pub mod email;
