use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::PaginationMeta;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Student {
    pub id: Uuid,
    pub name: String,
    pub sap_id: String,
    pub email: Option<String>,
    pub roll_no: Option<String>,
    #[schema(example = "2023-SE-IT-A-morning")]
    pub class_key: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Students start with their SAP ID as password unless one is given.
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateStudentDto {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 32, message = "SAP ID is required"))]
    pub sap_id: String,
    #[validate(length(min = 1, message = "Class is required"))]
    pub class_key: String,
    pub roll_no: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate, ToSchema)]
pub struct UpdateStudentDto {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(min = 1))]
    pub class_key: Option<String>,
    pub roll_no: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct StudentFilter {
    /// Only students of this class
    pub class_key: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PaginatedStudentsResponse {
    pub data: Vec<Student>,
    pub meta: PaginationMeta,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub enum AttendanceStatus {
    Present,
    Absent,
}

impl From<bool> for AttendanceStatus {
    fn from(present: bool) -> Self {
        if present {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Absent
        }
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct StudentAttendanceRow {
    pub session_date: NaiveDate,
    pub subject: String,
    pub present: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StudentAttendanceRecord {
    pub date: NaiveDate,
    pub subject: String,
    pub status: AttendanceStatus,
}

impl From<StudentAttendanceRow> for StudentAttendanceRecord {
    fn from(row: StudentAttendanceRow) -> Self {
        Self {
            date: row.session_date,
            subject: row.subject,
            status: row.present.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AttendanceSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    /// Share of sessions attended, 0-100 rounded to two decimals
    pub percentage: f64,
}

impl AttendanceSummary {
    pub fn from_statuses<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = AttendanceStatus>,
    {
        let (mut present, mut absent) = (0usize, 0usize);
        for status in statuses {
            match status {
                AttendanceStatus::Present => present += 1,
                AttendanceStatus::Absent => absent += 1,
            }
        }
        let total = present + absent;
        let percentage = if total == 0 {
            0.0
        } else {
            (present as f64 * 10_000.0 / total as f64).round() / 100.0
        };

        Self {
            total,
            present,
            absent,
            percentage,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AttendanceReport {
    pub records: Vec<StudentAttendanceRecord>,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DatedStatus {
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SubjectAttendanceReport {
    pub subject: String,
    pub data: Vec<DatedStatus>,
    pub summary: AttendanceSummary,
}

#[derive(Debug, Clone, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateQuery {
    /// Date as `dd-mm-yyyy`
    pub date: String,
}

#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DateRangeQuery {
    /// Inclusive start as `dd-mm-yyyy`
    pub start_date: Option<String>,
    /// Inclusive end as `dd-mm-yyyy`
    pub end_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct StudentSubject {
    pub name: String,
    pub timings: Vec<crate::schedule::TimingDto>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_counts_and_percentage() {
        use AttendanceStatus::*;
        let summary = AttendanceSummary::from_statuses([Present, Absent, Present]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.absent, 1);
        assert_eq!(summary.percentage, 66.67);
    }

    #[test]
    fn test_empty_summary() {
        let summary = AttendanceSummary::from_statuses([]);
        assert_eq!(summary.total, 0);
        assert_eq!(summary.percentage, 0.0);
    }

    #[test]
    fn test_status_serializes_capitalized() {
        let record = StudentAttendanceRecord::from(StudentAttendanceRow {
            session_date: NaiveDate::from_ymd_opt(2024, 5, 13).unwrap(),
            subject: "Maths".to_string(),
            present: false,
        });
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["status"], "Absent");
        assert_eq!(json["date"], "2024-05-13");
    }
}
