//! # Rollcall Models
//!
//! Domain types and DTOs shared by the API and the CLI, plus the two pieces of
//! pure domain logic:
//!
//! - [`schedule`]: weekday/time parsing and subject timing conflict checks
//! - [`attendance`]: the teacher assignment check and the 12-hour edit window
//!
//! The remaining modules hold database rows and request/response shapes:
//! [`users`], [`auth`], [`classes`], [`subjects`], [`teachers`], [`students`],
//! [`tickets`].

pub mod attendance;
pub mod auth;
pub mod classes;
pub mod schedule;
pub mod students;
pub mod subjects;
pub mod teachers;
pub mod tickets;
pub mod users;

pub use classes::{Batch, ClassSection, class_key};
pub use schedule::{ScheduleError, TimeOfDay, Timing, TimingDto, Weekday};
pub use users::{UserProfile, UserRecord, UserRole};
