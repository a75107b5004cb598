use anyhow::Context;
use rollcall_core::dates::{DateRange, parse_query_date};
use rollcall_core::{AppError, PaginationMeta, PaginationParams, hash_password};
use rollcall_db::is_unique_violation;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use super::model::{
    AttendanceReport, AttendanceSummary, CreateStudentDto, DatedStatus, PaginatedStudentsResponse,
    Student, StudentAttendanceRecord, StudentAttendanceRow, StudentFilter, StudentSubject,
    SubjectAttendanceReport, UpdateStudentDto,
};
use crate::metrics::track_user_created;
use crate::modules::classes::service::ClassService;
use crate::modules::subjects::service::SubjectService;

const STUDENT_COLUMNS: &str = r#"
    SELECT u.id, u.name, u.sap_id, u.email, u.roll_no, c.full_name AS class_key,
           u.created_at, u.updated_at
    FROM users u
    JOIN class_sections c ON c.id = u.class_id
"#;

pub struct StudentService;

impl StudentService {
    #[instrument(skip(db, dto), fields(sap_id = %dto.sap_id))]
    pub async fn create_student(db: &PgPool, dto: CreateStudentDto) -> Result<Student, AppError> {
        let sap_id = dto.sap_id.trim().to_string();
        let password = dto.password.as_deref().unwrap_or(&sap_id);
        let hashed_password = hash_password(password)?;

        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let (class_id, _) = ClassService::resolve_keys(&mut tx, std::slice::from_ref(&dto.class_key))
            .await?
            .pop()
            .ok_or_else(|| AppError::bad_request(anyhow::anyhow!("Class is required")))?;

        sqlx::query(
            r#"
            INSERT INTO users (name, sap_id, password, role, email, class_id, roll_no)
            VALUES ($1, $2, $3, 'student', $4, $5, $6)
            "#,
        )
        .bind(dto.name.trim())
        .bind(&sap_id)
        .bind(hashed_password)
        .bind(dto.email.as_deref().map(str::trim))
        .bind(class_id)
        .bind(dto.roll_no.as_deref().map(str::trim))
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                return AppError::bad_request(anyhow::anyhow!(
                    "User with SAP ID {} already exists",
                    sap_id
                ));
            }
            AppError::database(anyhow::Error::from(e).context("Failed to create student"))
        })?;

        tx.commit()
            .await
            .context("Failed to commit student")
            .map_err(AppError::database)?;

        track_user_created("student");
        tracing::info!(sap_id = %sap_id, "Student created");
        Self::get_student(db, &sap_id).await
    }

    #[instrument(skip(db))]
    pub async fn list_students(
        db: &PgPool,
        filter: StudentFilter,
        pagination: PaginationParams,
    ) -> Result<PaginatedStudentsResponse, AppError> {
        let class_key = filter.class_key.as_deref().map(str::trim);

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM users u
            JOIN class_sections c ON c.id = u.class_id
            WHERE u.role = 'student' AND ($1::text IS NULL OR c.full_name = $1)
            "#,
        )
        .bind(class_key)
        .fetch_one(db)
        .await
        .context("Failed to count students")
        .map_err(AppError::database)?;

        let query = format!(
            "{STUDENT_COLUMNS}
            WHERE u.role = 'student' AND ($1::text IS NULL OR c.full_name = $1)
            ORDER BY c.full_name, u.roll_no NULLS LAST, u.name
            LIMIT $2 OFFSET $3"
        );
        let data = sqlx::query_as::<_, Student>(&query)
            .bind(class_key)
            .bind(pagination.limit())
            .bind(pagination.offset())
            .fetch_all(db)
            .await
            .context("Failed to fetch students")
            .map_err(AppError::database)?;

        Ok(PaginatedStudentsResponse {
            data,
            meta: PaginationMeta::new(total, &pagination),
        })
    }

    #[instrument(skip(db))]
    pub async fn get_student(db: &PgPool, sap_id: &str) -> Result<Student, AppError> {
        let query = format!("{STUDENT_COLUMNS} WHERE u.sap_id = $1 AND u.role = 'student'");
        sqlx::query_as::<_, Student>(&query)
            .bind(sap_id)
            .fetch_optional(db)
            .await
            .context("Failed to fetch student")
            .map_err(AppError::database)?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))
    }

    #[instrument(skip(db, dto))]
    pub async fn update_student(
        db: &PgPool,
        sap_id: &str,
        dto: UpdateStudentDto,
    ) -> Result<Student, AppError> {
        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let class_id = match dto.class_key.as_ref() {
            Some(key) => ClassService::resolve_keys(&mut tx, std::slice::from_ref(key))
                .await?
                .pop()
                .map(|(id, _)| id),
            None => None,
        };
        let hashed_password = dto.password.as_deref().map(hash_password).transpose()?;

        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                class_id = COALESCE($3, class_id),
                roll_no = COALESCE($4, roll_no),
                password = COALESCE($5, password),
                updated_at = NOW()
            WHERE sap_id = $6 AND role = 'student'
            "#,
        )
        .bind(dto.name.as_deref().map(str::trim))
        .bind(dto.email.as_deref().map(str::trim))
        .bind(class_id)
        .bind(dto.roll_no.as_deref().map(str::trim))
        .bind(hashed_password)
        .bind(sap_id)
        .execute(&mut *tx)
        .await
        .context("Failed to update student")
        .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        tx.commit()
            .await
            .context("Failed to commit student")
            .map_err(AppError::database)?;

        Self::get_student(db, sap_id).await
    }

    #[instrument(skip(db))]
    pub async fn delete_student(db: &PgPool, sap_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM users WHERE sap_id = $1 AND role = 'student'")
            .bind(sap_id)
            .execute(db)
            .await
            .context("Failed to delete student")
            .map_err(AppError::database)?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(anyhow::anyhow!("Student not found")));
        }

        Ok(())
    }

    /// The student's records on a single `dd-mm-yyyy` date.
    #[instrument(skip(db))]
    pub async fn attendance_on(
        db: &PgPool,
        sap_id: &str,
        date: &str,
    ) -> Result<Vec<StudentAttendanceRecord>, AppError> {
        let date = parse_query_date(date).map_err(AppError::bad_request)?;

        let rows = sqlx::query_as::<_, StudentAttendanceRow>(
            r#"
            SELECT s.session_date, sub.name AS subject, e.present
            FROM attendance_entries e
            JOIN attendance_sessions s ON s.id = e.session_id
            JOIN subjects sub ON sub.id = s.subject_id
            WHERE e.sap_id = $1 AND s.session_date = $2
            ORDER BY s.class_end_time, sub.name
            "#,
        )
        .bind(sap_id)
        .bind(date)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance")
        .map_err(AppError::database)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    #[instrument(skip(db))]
    pub async fn attendance_report(
        db: &PgPool,
        sap_id: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<AttendanceReport, AppError> {
        let range = DateRange::parse(start_date, end_date).map_err(AppError::bad_request)?;

        let records: Vec<StudentAttendanceRecord> = Self::records(db, sap_id, None, range)
            .await?
            .into_iter()
            .map(Into::into)
            .collect();
        let summary = AttendanceSummary::from_statuses(records.iter().map(|r| r.status));

        Ok(AttendanceReport { records, summary })
    }

    #[instrument(skip(db))]
    pub async fn subject_report(
        db: &PgPool,
        sap_id: &str,
        subject: &str,
        start_date: Option<&str>,
        end_date: Option<&str>,
    ) -> Result<SubjectAttendanceReport, AppError> {
        let range = DateRange::parse(start_date, end_date).map_err(AppError::bad_request)?;

        let data: Vec<DatedStatus> = Self::records(db, sap_id, Some(subject), range)
            .await?
            .into_iter()
            .map(|row| DatedStatus {
                date: row.session_date,
                status: row.present.into(),
            })
            .collect();
        let summary = AttendanceSummary::from_statuses(data.iter().map(|d| d.status));

        Ok(SubjectAttendanceReport {
            subject: subject.to_string(),
            data,
            summary,
        })
    }

    /// Subjects taught in the student's own class, with their timings.
    #[instrument(skip(db))]
    pub async fn my_subjects(db: &PgPool, user_id: Uuid) -> Result<Vec<StudentSubject>, AppError> {
        let class_id: Option<Uuid> =
            sqlx::query_scalar("SELECT class_id FROM users WHERE id = $1 AND role = 'student'")
                .bind(user_id)
                .fetch_optional(db)
                .await
                .context("Failed to fetch student class")
                .map_err(AppError::database)?
                .flatten();

        let class_id =
            class_id.ok_or_else(|| AppError::not_found(anyhow::anyhow!("Student not found")))?;

        Ok(SubjectService::subjects_for_class(db, class_id)
            .await?
            .into_iter()
            .map(|subject| StudentSubject {
                name: subject.name,
                timings: subject.timings,
            })
            .collect())
    }

    async fn records(
        db: &PgPool,
        sap_id: &str,
        subject: Option<&str>,
        range: DateRange,
    ) -> Result<Vec<StudentAttendanceRow>, AppError> {
        sqlx::query_as::<_, StudentAttendanceRow>(
            r#"
            SELECT s.session_date, sub.name AS subject, e.present
            FROM attendance_entries e
            JOIN attendance_sessions s ON s.id = e.session_id
            JOIN subjects sub ON sub.id = s.subject_id
            WHERE e.sap_id = $1
              AND ($2::text IS NULL OR sub.name = $2)
              AND ($3::date IS NULL OR s.session_date >= $3)
              AND ($4::date IS NULL OR s.session_date <= $4)
            ORDER BY s.session_date, s.class_end_time, sub.name
            "#,
        )
        .bind(sap_id)
        .bind(subject)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance records")
        .map_err(AppError::database)
    }
}
