//! Attendance sessions and the rules for writing them.
//!
//! A session is unique per (class, subject, date). A teacher may write one
//! when assigned to the pair ([`Assignment::is_authorized`]). Creating a new
//! session is always allowed; changing an existing one is allowed only until
//! [`EDIT_WINDOW_HOURS`] after the class end time stored on the session.

use std::collections::HashSet;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

pub const EDIT_WINDOW_HOURS: i64 = 12;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttendanceError {
    #[error("You are not assigned to {subject} for {class_key}")]
    NotAssigned { subject: String, class_key: String },

    #[error("Attendance can only be modified within {EDIT_WINDOW_HOURS} hours after class end")]
    WindowClosed,

    #[error("Student {0} appears more than once")]
    DuplicateStudent(String),

    #[error("Students not enrolled in this class: {0}")]
    UnknownStudents(String),
}

/// What the database says about a teacher and a (class, subject) pair.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow)]
pub struct Assignment {
    pub teaches_class: bool,
    pub teaches_subject: bool,
    pub subject_in_class: bool,
}

impl Assignment {
    pub fn is_authorized(&self) -> bool {
        self.teaches_class && self.teaches_subject && self.subject_in_class
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    Create,
    Update,
}

pub fn edit_deadline(class_end_time: DateTime<Utc>) -> DateTime<Utc> {
    class_end_time + Duration::hours(EDIT_WINDOW_HOURS)
}

/// Inclusive: an edit exactly at the deadline is still accepted.
pub fn within_edit_window(class_end_time: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    now <= edit_deadline(class_end_time)
}

/// Decides whether a write may proceed. `existing_class_end` is the end time
/// stored on the session, or `None` when no session exists yet.
pub fn authorize_write(
    assignment: Assignment,
    subject: &str,
    class_key: &str,
    existing_class_end: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<WriteMode, AttendanceError> {
    if !assignment.is_authorized() {
        return Err(AttendanceError::NotAssigned {
            subject: subject.to_string(),
            class_key: class_key.to_string(),
        });
    }

    match existing_class_end {
        None => Ok(WriteMode::Create),
        Some(end) if within_edit_window(end, now) => Ok(WriteMode::Update),
        Some(_) => Err(AttendanceError::WindowClosed),
    }
}

/// Every SAP ID must be unique within the payload and belong to the class roster.
pub fn validate_entries(
    entries: &[AttendanceEntryDto],
    roster: &HashSet<String>,
) -> Result<(), AttendanceError> {
    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        if !seen.insert(entry.sap_id.as_str()) {
            return Err(AttendanceError::DuplicateStudent(entry.sap_id.clone()));
        }
    }

    let unknown: Vec<&str> = entries
        .iter()
        .map(|e| e.sap_id.as_str())
        .filter(|id| !roster.contains(*id))
        .collect();
    if !unknown.is_empty() {
        return Err(AttendanceError::UnknownStudents(unknown.join(", ")));
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceEntryDto {
    pub sap_id: String,
    pub present: bool,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct MarkAttendanceDto {
    #[validate(length(min = 1, message = "Class is required"))]
    #[schema(example = "2023-SE-IT-A-morning")]
    pub class_key: String,
    #[validate(length(min = 1, message = "Subject is required"))]
    pub subject: String,
    /// Session date (`yyyy-mm-dd`)
    pub date: NaiveDate,
    /// When the class ended; only used when the session is first created
    pub class_end_time: DateTime<Utc>,
    #[validate(length(min = 1, message = "At least one student entry is required"))]
    pub students: Vec<AttendanceEntryDto>,
}

#[derive(Debug, Clone, FromRow)]
pub struct SessionRow {
    pub id: Uuid,
    pub class_key: String,
    pub subject: String,
    pub session_date: NaiveDate,
    pub class_end_time: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct AttendanceEntryView {
    pub sap_id: String,
    pub name: Option<String>,
    pub roll_no: Option<String>,
    pub present: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSession {
    pub id: Uuid,
    pub class_key: String,
    pub subject: String,
    pub date: NaiveDate,
    pub class_end_time: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// Last moment the session can still be changed
    pub editable_until: DateTime<Utc>,
    pub students: Vec<AttendanceEntryView>,
}

impl AttendanceSession {
    pub fn from_parts(row: SessionRow, students: Vec<AttendanceEntryView>) -> Self {
        Self {
            id: row.id,
            editable_until: edit_deadline(row.class_end_time),
            class_key: row.class_key,
            subject: row.subject,
            date: row.session_date,
            class_end_time: row.class_end_time,
            last_modified: row.last_modified,
            students,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MarkAttendanceResponse {
    pub message: String,
    pub created: bool,
    pub session: AttendanceSession,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct SessionQuery {
    pub class_key: String,
    pub subject: String,
    /// Session date as `dd-mm-yyyy`
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HistoryQuery {
    pub class_key: Option<String>,
    pub subject: Option<String>,
    /// Inclusive start as `dd-mm-yyyy`
    pub start_date: Option<String>,
    /// Inclusive end as `dd-mm-yyyy`
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct SessionSummary {
    pub id: Uuid,
    pub class_key: String,
    pub subject: String,
    pub session_date: NaiveDate,
    pub class_end_time: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    pub present: i64,
    pub total: i64,
}

#[derive(Debug, Clone, FromRow)]
pub struct ExportRow {
    pub session_date: NaiveDate,
    pub class_key: String,
    pub subject: String,
    pub sap_id: String,
    pub name: Option<String>,
    pub roll_no: Option<String>,
    pub present: bool,
}

const CSV_HEADER: &str = "Date,Class,Subject,SAP ID,Roll No,Name,Status";

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// Renders export rows as CSV (CRLF line endings, header first).
pub fn export_csv(rows: &[ExportRow]) -> String {
    let mut out = String::with_capacity(64 * (rows.len() + 1));
    out.push_str(CSV_HEADER);
    out.push_str("\r\n");

    for row in rows {
        let fields = [
            row.session_date.format("%d-%m-%Y").to_string(),
            csv_field(&row.class_key),
            csv_field(&row.subject),
            csv_field(&row.sap_id),
            csv_field(row.roll_no.as_deref().unwrap_or("")),
            csv_field(row.name.as_deref().unwrap_or("")),
            if row.present { "Present" } else { "Absent" }.to_string(),
        ];
        out.push_str(&fields.join(","));
        out.push_str("\r\n");
    }

    out
}
