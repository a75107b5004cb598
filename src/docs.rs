use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::modules::attendance::model::{
    AttendanceEntryDto, AttendanceEntryView, AttendanceSession, MarkAttendanceDto,
    MarkAttendanceResponse, SessionSummary,
};
use crate::modules::auth::controller::ErrorResponse;
use crate::modules::auth::model::{
    ChangePasswordRequest, LoginRequest, LoginResponse, MessageResponse, UserProfile, UserRole,
};
use crate::modules::classes::model::{Batch, ClassSection, CreateClassDto, UpdateClassDto};
use crate::modules::students::model::{
    AttendanceReport, AttendanceStatus, AttendanceSummary, CreateStudentDto, DatedStatus,
    PaginatedStudentsResponse, Student, StudentAttendanceRecord, StudentSubject,
    SubjectAttendanceReport, UpdateStudentDto,
};
use crate::modules::subjects::model::{CreateSubjectDto, Subject, TimingDto, UpdateSubjectDto};
use crate::modules::teachers::model::{
    CreateTeacherDto, RosterStudent, Teacher, TodayClass, UpdateTeacherDto,
};
use crate::modules::tickets::model::{
    CreateTicketForm, Ticket, TicketCreatedResponse, TicketStatus, UpdateTicketStatusDto,
};
use rollcall_core::{PaginationMeta, PaginationParams};
use rollcall_models::schedule::TimeRangeDto;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::router::health,
        crate::modules::auth::controller::login_user,
        crate::modules::auth::controller::get_me,
        crate::modules::auth::controller::change_password,
        crate::modules::classes::controller::create_class,
        crate::modules::classes::controller::list_classes,
        crate::modules::classes::controller::get_class,
        crate::modules::classes::controller::update_class,
        crate::modules::classes::controller::delete_class,
        crate::modules::subjects::controller::create_subject,
        crate::modules::subjects::controller::list_subjects,
        crate::modules::subjects::controller::get_subject,
        crate::modules::subjects::controller::update_subject,
        crate::modules::subjects::controller::delete_subject,
        crate::modules::teachers::controller::create_teacher,
        crate::modules::teachers::controller::list_teachers,
        crate::modules::teachers::controller::get_teacher,
        crate::modules::teachers::controller::update_teacher,
        crate::modules::teachers::controller::delete_teacher,
        crate::modules::teachers::controller::today_classes,
        crate::modules::students::controller::create_student,
        crate::modules::students::controller::list_students,
        crate::modules::students::controller::get_student,
        crate::modules::students::controller::update_student,
        crate::modules::students::controller::delete_student,
        crate::modules::students::controller::my_attendance,
        crate::modules::students::controller::my_attendance_report,
        crate::modules::students::controller::my_subject_report,
        crate::modules::students::controller::my_subjects,
        crate::modules::attendance::controller::mark_attendance,
        crate::modules::attendance::controller::get_attendance,
        crate::modules::attendance::controller::attendance_history,
        crate::modules::attendance::controller::export_attendance,
        crate::modules::tickets::controller::create_ticket,
        crate::modules::tickets::controller::my_tickets,
        crate::modules::tickets::controller::teacher_tickets,
        crate::modules::tickets::controller::update_ticket_status,
    ),
    components(
        schemas(
            ErrorResponse,
            MessageResponse,
            LoginRequest,
            LoginResponse,
            ChangePasswordRequest,
            UserProfile,
            UserRole,
            Batch,
            ClassSection,
            CreateClassDto,
            UpdateClassDto,
            TimingDto,
            TimeRangeDto,
            Subject,
            CreateSubjectDto,
            UpdateSubjectDto,
            Teacher,
            CreateTeacherDto,
            UpdateTeacherDto,
            RosterStudent,
            TodayClass,
            Student,
            CreateStudentDto,
            UpdateStudentDto,
            PaginatedStudentsResponse,
            PaginationMeta,
            PaginationParams,
            AttendanceStatus,
            AttendanceSummary,
            StudentAttendanceRecord,
            AttendanceReport,
            DatedStatus,
            SubjectAttendanceReport,
            StudentSubject,
            AttendanceEntryDto,
            MarkAttendanceDto,
            AttendanceEntryView,
            AttendanceSession,
            MarkAttendanceResponse,
            SessionSummary,
            Ticket,
            TicketStatus,
            CreateTicketForm,
            TicketCreatedResponse,
            UpdateTicketStatusDto,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Authentication", description = "Login and account endpoints"),
        (name = "Classes", description = "Class section management"),
        (name = "Subjects", description = "Subjects and their conflict-checked timings"),
        (name = "Teachers", description = "Teacher management and timetables"),
        (name = "Students", description = "Student management and attendance reports"),
        (name = "Attendance", description = "Attendance marking within the edit window"),
        (name = "Tickets", description = "Attendance correction requests"),
        (name = "Health", description = "Service health")
    ),
    info(
        title = "Rollcall API",
        version = "0.1.0",
        description = "School attendance REST API built with Rust, Axum, and PostgreSQL.",
        license(
            name = "MIT"
        )
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .build(),
                ),
            )
        }
    }
}
