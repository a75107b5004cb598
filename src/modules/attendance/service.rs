use std::collections::HashSet;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, Utc};
use rollcall_core::AppError;
use rollcall_core::dates::{DateRange, parse_query_date};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::instrument;
use uuid::Uuid;

use super::model::{
    Assignment, AttendanceEntryView, AttendanceError, AttendanceSession, ExportRow, HistoryQuery,
    MarkAttendanceDto, MarkAttendanceResponse, SessionRow, SessionSummary, WriteMode,
    authorize_write, validate_entries, within_edit_window,
};
use crate::metrics::track_attendance;

#[derive(Debug, FromRow)]
struct PairIds {
    class_id: Uuid,
    subject_id: Uuid,
}

#[derive(Debug, FromRow)]
struct ExistingSession {
    id: Uuid,
    class_end_time: DateTime<Utc>,
}

fn attendance_error(err: AttendanceError) -> AppError {
    match err {
        AttendanceError::NotAssigned { .. } | AttendanceError::WindowClosed => {
            track_attendance("rejected");
            AppError::forbidden(err.to_string())
        }
        AttendanceError::DuplicateStudent(_) | AttendanceError::UnknownStudents(_) => {
            AppError::bad_request(err)
        }
    }
}

pub struct AttendanceService;

impl AttendanceService {
    /// Creates the session for (class, subject, date) or replaces its entries.
    ///
    /// Creating is always allowed for an assigned teacher. Replacing is only
    /// allowed within the edit window of the stored class end time; the
    /// `class_end_time` in the payload is ignored for existing sessions.
    #[instrument(skip(db, dto), fields(class_key = %dto.class_key, subject = %dto.subject, date = %dto.date))]
    pub async fn mark_attendance(
        db: &PgPool,
        teacher_id: Uuid,
        dto: MarkAttendanceDto,
    ) -> Result<MarkAttendanceResponse, AppError> {
        let now = Utc::now();
        let mut tx = db
            .begin()
            .await
            .context("Failed to begin transaction")
            .map_err(AppError::database)?;

        let assignment =
            Self::assignment(&mut tx, teacher_id, &dto.class_key, &dto.subject).await?;
        let ids = Self::pair_ids(&mut tx, &dto.class_key, &dto.subject).await?;
        let existing = match &ids {
            Some(ids) => Self::lock_session(&mut tx, ids, dto.date).await?,
            None => None,
        };

        let mut mode = authorize_write(
            assignment,
            &dto.subject,
            &dto.class_key,
            existing.as_ref().map(|s| s.class_end_time),
            now,
        )
        .map_err(attendance_error)?;
        let ids = ids.ok_or_else(|| {
            AppError::internal_error("Assigned class or subject is missing".to_string())
        })?;

        let roster: HashSet<String> = sqlx::query_scalar(
            "SELECT sap_id FROM users WHERE role = 'student' AND class_id = $1",
        )
        .bind(ids.class_id)
        .fetch_all(&mut *tx)
        .await
        .context("Failed to fetch class roster")
        .map_err(AppError::database)?
        .into_iter()
        .collect();
        validate_entries(&dto.students, &roster).map_err(attendance_error)?;

        let session_id = match (mode, existing) {
            (WriteMode::Update, Some(session)) => session.id,
            _ => {
                let inserted: Option<Uuid> = sqlx::query_scalar(
                    r#"
                    INSERT INTO attendance_sessions
                        (class_id, subject_id, session_date, class_end_time, marked_by)
                    VALUES ($1, $2, $3, $4, $5)
                    ON CONFLICT (class_id, subject_id, session_date) DO NOTHING
                    RETURNING id
                    "#,
                )
                .bind(ids.class_id)
                .bind(ids.subject_id)
                .bind(dto.date)
                .bind(dto.class_end_time)
                .bind(teacher_id)
                .fetch_optional(&mut *tx)
                .await
                .context("Failed to create attendance session")
                .map_err(AppError::database)?;

                match inserted {
                    Some(id) => id,
                    None => {
                        // Lost the race to a concurrent create; the window now applies.
                        let session = Self::lock_session(&mut tx, &ids, dto.date)
                            .await?
                            .ok_or_else(|| {
                                AppError::internal_error(
                                    "Attendance session vanished after conflict".to_string(),
                                )
                            })?;
                        if !within_edit_window(session.class_end_time, now) {
                            return Err(attendance_error(AttendanceError::WindowClosed));
                        }
                        mode = WriteMode::Update;
                        session.id
                    }
                }
            }
        };

        if mode == WriteMode::Update {
            sqlx::query(
                "UPDATE attendance_sessions SET last_modified = NOW(), marked_by = $2 WHERE id = $1",
            )
            .bind(session_id)
            .bind(teacher_id)
            .execute(&mut *tx)
            .await
            .context("Failed to update attendance session")
            .map_err(AppError::database)?;
        }

        Self::replace_entries(&mut tx, session_id, &dto).await?;

        tx.commit()
            .await
            .context("Failed to commit attendance")
            .map_err(AppError::database)?;

        let created = mode == WriteMode::Create;
        track_attendance(if created { "created" } else { "updated" });
        tracing::info!(session_id = %session_id, created, "Attendance saved");

        let session = Self::session_by_id(db, session_id).await?;
        let message = if created {
            "Attendance saved successfully!"
        } else {
            "Attendance updated successfully!"
        };

        Ok(MarkAttendanceResponse {
            message: message.to_string(),
            created,
            session,
        })
    }

    /// One session, for a teacher assigned to its class and subject.
    #[instrument(skip(db))]
    pub async fn get_session(
        db: &PgPool,
        teacher_id: Uuid,
        class_key: &str,
        subject: &str,
        date: &str,
    ) -> Result<AttendanceSession, AppError> {
        let date = parse_query_date(date).map_err(AppError::bad_request)?;

        let mut conn = db
            .acquire()
            .await
            .context("Failed to acquire connection")
            .map_err(AppError::database)?;
        let ids = Self::authorized_pair(&mut conn, teacher_id, class_key, subject).await?;

        let session_id: Uuid = sqlx::query_scalar(
            r#"
            SELECT id FROM attendance_sessions
            WHERE class_id = $1 AND subject_id = $2 AND session_date = $3
            "#,
        )
        .bind(ids.class_id)
        .bind(ids.subject_id)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch attendance session")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Attendance record not found")))?;

        drop(conn);
        Self::session_by_id(db, session_id).await
    }

    /// Sessions of the teacher's classes and subjects in a range, newest first.
    #[instrument(skip(db))]
    pub async fn history(
        db: &PgPool,
        teacher_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<Vec<SessionSummary>, AppError> {
        let range = DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref())
            .map_err(AppError::bad_request)?;

        sqlx::query_as::<_, SessionSummary>(
            r#"
            SELECT s.id, c.full_name AS class_key, sub.name AS subject, s.session_date,
                   s.class_end_time, s.last_modified,
                   COUNT(e.sap_id) FILTER (WHERE e.present) AS present,
                   COUNT(e.sap_id) AS total
            FROM attendance_sessions s
            JOIN class_sections c ON c.id = s.class_id
            JOIN subjects sub ON sub.id = s.subject_id
            JOIN teacher_classes tc ON tc.class_id = s.class_id AND tc.teacher_id = $1
            JOIN teacher_subjects ts ON ts.subject_id = s.subject_id AND ts.teacher_id = $1
            LEFT JOIN attendance_entries e ON e.session_id = s.id
            WHERE ($2::text IS NULL OR c.full_name = $2)
              AND ($3::text IS NULL OR sub.name = $3)
              AND ($4::date IS NULL OR s.session_date >= $4)
              AND ($5::date IS NULL OR s.session_date <= $5)
            GROUP BY s.id, c.full_name, sub.name
            ORDER BY s.session_date DESC, s.class_end_time DESC
            "#,
        )
        .bind(teacher_id)
        .bind(query.class_key.as_deref())
        .bind(query.subject.as_deref())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance history")
        .map_err(AppError::database)
    }

    /// Per-student rows for the same filter as [`Self::history`], oldest first.
    #[instrument(skip(db))]
    pub async fn export_rows(
        db: &PgPool,
        teacher_id: Uuid,
        query: &HistoryQuery,
    ) -> Result<Vec<ExportRow>, AppError> {
        let range = DateRange::parse(query.start_date.as_deref(), query.end_date.as_deref())
            .map_err(AppError::bad_request)?;

        sqlx::query_as::<_, ExportRow>(
            r#"
            SELECT s.session_date, c.full_name AS class_key, sub.name AS subject,
                   e.sap_id, u.name, u.roll_no, e.present
            FROM attendance_sessions s
            JOIN class_sections c ON c.id = s.class_id
            JOIN subjects sub ON sub.id = s.subject_id
            JOIN teacher_classes tc ON tc.class_id = s.class_id AND tc.teacher_id = $1
            JOIN teacher_subjects ts ON ts.subject_id = s.subject_id AND ts.teacher_id = $1
            JOIN attendance_entries e ON e.session_id = s.id
            LEFT JOIN users u ON u.sap_id = e.sap_id
            WHERE ($2::text IS NULL OR c.full_name = $2)
              AND ($3::text IS NULL OR sub.name = $3)
              AND ($4::date IS NULL OR s.session_date >= $4)
              AND ($5::date IS NULL OR s.session_date <= $5)
            ORDER BY s.session_date, c.full_name, sub.name, u.roll_no NULLS LAST, e.sap_id
            "#,
        )
        .bind(teacher_id)
        .bind(query.class_key.as_deref())
        .bind(query.subject.as_deref())
        .bind(range.start)
        .bind(range.end)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance export")
        .map_err(AppError::database)
    }

    async fn assignment(
        conn: &mut PgConnection,
        teacher_id: Uuid,
        class_key: &str,
        subject: &str,
    ) -> Result<Assignment, AppError> {
        sqlx::query_as::<_, Assignment>(
            r#"
            SELECT
                EXISTS (
                    SELECT 1 FROM teacher_classes tc
                    JOIN class_sections c ON c.id = tc.class_id
                    WHERE tc.teacher_id = $1 AND c.full_name = $2
                ) AS teaches_class,
                EXISTS (
                    SELECT 1 FROM teacher_subjects ts
                    JOIN subjects s ON s.id = ts.subject_id
                    WHERE ts.teacher_id = $1 AND s.name = $3
                ) AS teaches_subject,
                EXISTS (
                    SELECT 1 FROM subject_classes sc
                    JOIN class_sections c ON c.id = sc.class_id
                    JOIN subjects s ON s.id = sc.subject_id
                    WHERE c.full_name = $2 AND s.name = $3
                ) AS subject_in_class
            "#,
        )
        .bind(teacher_id)
        .bind(class_key)
        .bind(subject)
        .fetch_one(&mut *conn)
        .await
        .context("Failed to check teacher assignment")
        .map_err(AppError::database)
    }

    async fn pair_ids(
        conn: &mut PgConnection,
        class_key: &str,
        subject: &str,
    ) -> Result<Option<PairIds>, AppError> {
        sqlx::query_as::<_, PairIds>(
            r#"
            SELECT c.id AS class_id, s.id AS subject_id
            FROM class_sections c, subjects s
            WHERE c.full_name = $1 AND s.name = $2
            "#,
        )
        .bind(class_key)
        .bind(subject)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to resolve class and subject")
        .map_err(AppError::database)
    }

    /// Resolves the pair's ids for a teacher assigned to it.
    async fn authorized_pair(
        conn: &mut PgConnection,
        teacher_id: Uuid,
        class_key: &str,
        subject: &str,
    ) -> Result<PairIds, AppError> {
        let assignment = Self::assignment(&mut *conn, teacher_id, class_key, subject).await?;
        if !assignment.is_authorized() {
            return Err(attendance_error(AttendanceError::NotAssigned {
                subject: subject.to_string(),
                class_key: class_key.to_string(),
            }));
        }

        Self::pair_ids(&mut *conn, class_key, subject)
            .await?
            .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Class or subject not found")))
    }

    async fn lock_session(
        conn: &mut PgConnection,
        ids: &PairIds,
        date: NaiveDate,
    ) -> Result<Option<ExistingSession>, AppError> {
        sqlx::query_as::<_, ExistingSession>(
            r#"
            SELECT id, class_end_time FROM attendance_sessions
            WHERE class_id = $1 AND subject_id = $2 AND session_date = $3
            FOR UPDATE
            "#,
        )
        .bind(ids.class_id)
        .bind(ids.subject_id)
        .bind(date)
        .fetch_optional(&mut *conn)
        .await
        .context("Failed to fetch attendance session")
        .map_err(AppError::database)
    }

    async fn replace_entries(
        conn: &mut PgConnection,
        session_id: Uuid,
        dto: &MarkAttendanceDto,
    ) -> Result<(), AppError> {
        sqlx::query("DELETE FROM attendance_entries WHERE session_id = $1")
            .bind(session_id)
            .execute(&mut *conn)
            .await
            .context("Failed to clear attendance entries")
            .map_err(AppError::database)?;

        let sap_ids: Vec<&str> = dto.students.iter().map(|s| s.sap_id.as_str()).collect();
        let present: Vec<bool> = dto.students.iter().map(|s| s.present).collect();

        sqlx::query(
            r#"
            INSERT INTO attendance_entries (session_id, sap_id, present)
            SELECT $1, * FROM UNNEST($2::text[], $3::bool[])
            "#,
        )
        .bind(session_id)
        .bind(&sap_ids)
        .bind(&present)
        .execute(&mut *conn)
        .await
        .context("Failed to save attendance entries")
        .map_err(AppError::database)?;

        Ok(())
    }

    async fn session_by_id(db: &PgPool, session_id: Uuid) -> Result<AttendanceSession, AppError> {
        let row = sqlx::query_as::<_, SessionRow>(
            r#"
            SELECT s.id, c.full_name AS class_key, sub.name AS subject, s.session_date,
                   s.class_end_time, s.last_modified
            FROM attendance_sessions s
            JOIN class_sections c ON c.id = s.class_id
            JOIN subjects sub ON sub.id = s.subject_id
            WHERE s.id = $1
            "#,
        )
        .bind(session_id)
        .fetch_optional(db)
        .await
        .context("Failed to fetch attendance session")
        .map_err(AppError::database)?
        .ok_or_else(|| AppError::not_found(anyhow::anyhow!("Attendance record not found")))?;

        let students = sqlx::query_as::<_, AttendanceEntryView>(
            r#"
            SELECT e.sap_id, u.name, u.roll_no, e.present
            FROM attendance_entries e
            LEFT JOIN users u ON u.sap_id = e.sap_id
            WHERE e.session_id = $1
            ORDER BY u.roll_no NULLS LAST, e.sap_id
            "#,
        )
        .bind(session_id)
        .fetch_all(db)
        .await
        .context("Failed to fetch attendance entries")
        .map_err(AppError::database)?;

        Ok(AttendanceSession::from_parts(row, students))
    }
}
