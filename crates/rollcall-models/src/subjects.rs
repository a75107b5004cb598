use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::schedule::{ScheduleError, Timing, TimingDto, Weekday};

#[derive(Debug, Clone, FromRow)]
pub struct SubjectRow {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One `subject_timings` row joined with its subject name.
#[derive(Debug, Clone, FromRow)]
pub struct TimingRow {
    pub subject_id: Uuid,
    pub subject_name: String,
    pub days: Vec<String>,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

impl TimingRow {
    pub fn to_timing(&self) -> Result<Timing, ScheduleError> {
        let days = self
            .days
            .iter()
            .map(|d| d.parse::<Weekday>())
            .collect::<Result<Vec<_>, _>>()?;
        Timing::new(days, self.start_time.into(), self.end_time.into())
    }
}

/// Day labels as stored in `subject_timings.days`.
pub fn day_labels(timing: &Timing) -> Vec<String> {
    timing.days().iter().map(|d| d.label().to_string()).collect()
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Subject {
    pub id: Uuid,
    #[schema(example = "Data Structures")]
    pub name: String,
    /// Keys of the classes this subject is taught in
    pub classes: Vec<String>,
    pub timings: Vec<TimingDto>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateSubjectDto {
    #[validate(length(min = 1, max = 100, message = "Subject name is required"))]
    pub name: String,
    #[validate(length(min = 1, message = "At least one class is required"))]
    pub classes: Vec<String>,
    #[validate(length(min = 1, message = "At least one timing is required"))]
    pub timings: Vec<TimingDto>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateSubjectDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1, message = "At least one class is required"))]
    pub classes: Option<Vec<String>>,
    #[validate(length(min = 1, message = "At least one timing is required"))]
    pub timings: Option<Vec<TimingDto>>,
}
