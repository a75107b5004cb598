use axum::{
    Json,
    extract::{Multipart, Path, Query, State, multipart::MultipartError},
    http::StatusCode,
};
use rollcall_core::AppError;
use tracing::instrument;
use uuid::Uuid;

use super::model::{
    CreateTicketForm, Ticket, TicketCreatedResponse, TicketFilter, TicketForm,
    UpdateTicketStatusDto,
};
use super::service::{LetterUpload, TicketService};
use crate::middleware::role::{RequireStudent, RequireTeacher};
use crate::modules::auth::controller::ErrorResponse;
use crate::state::AppState;
use crate::validator::ValidatedJson;

fn multipart_error(err: MultipartError) -> AppError {
    AppError::new(err.status(), anyhow::anyhow!(err.body_text()))
}

/// Reads the ticket form. Unknown fields are ignored; an empty `letter` part
/// counts as no attachment.
async fn read_ticket_form(
    mut multipart: Multipart,
) -> Result<(TicketForm, Option<LetterUpload>), AppError> {
    let mut form = TicketForm::default();
    let mut letter = None;

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "subject" => form.subject = Some(field.text().await.map_err(multipart_error)?),
            "reason" => form.reason = Some(field.text().await.map_err(multipart_error)?),
            "date" => form.date = Some(field.text().await.map_err(multipart_error)?),
            "letter" => {
                let file_name = field.file_name().unwrap_or("letter").to_string();
                let content_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_string();
                let content = field.bytes().await.map_err(multipart_error)?;
                if !content.is_empty() {
                    letter = Some(LetterUpload {
                        file_name,
                        content_type,
                        content: content.to_vec(),
                    });
                }
            }
            _ => {}
        }
    }

    Ok((form, letter))
}

/// Raise an attendance correction ticket
///
/// The ticket goes to the teacher assigned to the student's class and the
/// named subject. The optional letter must be a PDF or Word document.
#[utoipa::path(
    post,
    path = "/api/student/tickets",
    request_body(content = CreateTicketForm, content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Ticket raised", body = TicketCreatedResponse),
        (status = 400, description = "Missing field, bad date, no attendance that day, or invalid file", body = ErrorResponse),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse),
        (status = 404, description = "No teacher assigned", body = ErrorResponse),
        (status = 413, description = "Upload too large", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
#[instrument(skip(state, auth_user, multipart))]
pub async fn create_ticket(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
    multipart: Multipart,
) -> Result<(StatusCode, Json<TicketCreatedResponse>), AppError> {
    let (form, letter) = read_ticket_form(multipart).await?;

    let response = TicketService::create_ticket(
        &state.db,
        state.storage.as_ref(),
        &state.email_config,
        auth_user.user_id()?,
        form,
        letter,
    )
    .await?;

    Ok((StatusCode::CREATED, Json(response)))
}

#[utoipa::path(
    get,
    path = "/api/student/tickets",
    responses(
        (status = 200, description = "Own tickets, newest first", body = Vec<Ticket>),
        (status = 403, description = "Forbidden - student only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
#[instrument(skip(state, auth_user))]
pub async fn my_tickets(
    State(state): State<AppState>,
    RequireStudent(auth_user): RequireStudent,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = TicketService::student_tickets(&state.db, auth_user.user_id()?).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    get,
    path = "/api/teacher/tickets",
    params(TicketFilter),
    responses(
        (status = 200, description = "Tickets addressed to the teacher", body = Vec<Ticket>),
        (status = 403, description = "Forbidden - teacher only", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
#[instrument(skip(state, auth_user))]
pub async fn teacher_tickets(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Query(filter): Query<TicketFilter>,
) -> Result<Json<Vec<Ticket>>, AppError> {
    let tickets = TicketService::teacher_tickets(&state.db, auth_user.user_id()?, filter).await?;
    Ok(Json(tickets))
}

#[utoipa::path(
    patch,
    path = "/api/teacher/tickets/{id}",
    params(("id" = Uuid, Path, description = "Ticket ID")),
    request_body = UpdateTicketStatusDto,
    responses(
        (status = 200, description = "Ticket updated", body = Ticket),
        (status = 400, description = "Status must be approved or rejected", body = ErrorResponse),
        (status = 404, description = "Ticket not found", body = ErrorResponse)
    ),
    security(("bearer_auth" = [])),
    tag = "Tickets"
)]
#[instrument(skip(state, auth_user, dto))]
pub async fn update_ticket_status(
    State(state): State<AppState>,
    RequireTeacher(auth_user): RequireTeacher,
    Path(id): Path<Uuid>,
    ValidatedJson(dto): ValidatedJson<UpdateTicketStatusDto>,
) -> Result<Json<Ticket>, AppError> {
    let ticket =
        TicketService::update_status(&state.db, auth_user.user_id()?, id, dto.status).await?;
    Ok(Json(ticket))
}
