//! Role-based authorization for Axum.
//!
//! Route groups are guarded with [`require_admin`], [`require_teacher`] or
//! [`require_student`] as a `route_layer`. The authenticated user is stored in
//! the request extensions so handlers extracting [`AuthUser`] reuse it.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use rollcall_core::AppError;
use rollcall_models::UserRole;

use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Checks that the authenticated user has one of `allowed_roles`.
///
/// ```rust,ignore
/// let routes = Router::new()
///     .route("/reports", get(handler))
///     .route_layer(middleware::from_fn_with_state(
///         state.clone(),
///         |state, req, next| require_roles(state, req, next, vec![UserRole::Admin]),
///     ));
/// ```
pub async fn require_roles(
    State(state): State<AppState>,
    req: Request,
    next: Next,
    allowed_roles: Vec<UserRole>,
) -> Result<Response, AppError> {
    let (mut parts, body) = req.into_parts();

    let auth_user = AuthUser::from_request_parts(&mut parts, &state).await?;
    check_any_role(&auth_user, &allowed_roles)?;

    parts.extensions.insert(auth_user);
    let req = Request::from_parts(parts, body);
    Ok(next.run(req).await)
}

pub async fn require_admin(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, vec![UserRole::Admin]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub async fn require_teacher(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, vec![UserRole::Teacher]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

pub async fn require_student(State(state): State<AppState>, req: Request, next: Next) -> Response {
    match require_roles(State(state), req, next, vec![UserRole::Student]).await {
        Ok(response) => response,
        Err(err) => err.into_response(),
    }
}

/// Extractor for handlers that need the teacher's identity.
#[derive(Debug, Clone)]
pub struct RequireTeacher(pub AuthUser);

impl FromRequestParts<AppState> for RequireTeacher {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_role(&auth_user, UserRole::Teacher)?;
        Ok(RequireTeacher(auth_user))
    }
}

/// Extractor for handlers that need the student's identity.
#[derive(Debug, Clone)]
pub struct RequireStudent(pub AuthUser);

impl FromRequestParts<AppState> for RequireStudent {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth_user = AuthUser::from_request_parts(parts, state).await?;
        check_role(&auth_user, UserRole::Student)?;
        Ok(RequireStudent(auth_user))
    }
}

pub fn check_role(auth_user: &AuthUser, required_role: UserRole) -> Result<(), AppError> {
    check_any_role(auth_user, &[required_role])
}

pub fn check_any_role(auth_user: &AuthUser, allowed_roles: &[UserRole]) -> Result<(), AppError> {
    let user_role = parse_role_from_string(&auth_user.0.role)?;

    if !allowed_roles.contains(&user_role) {
        return Err(AppError::forbidden(format!(
            "Access denied. Required roles: {}, but user has role: {}",
            allowed_roles
                .iter()
                .map(|r| r.as_str())
                .collect::<Vec<_>>()
                .join(", "),
            user_role
        )));
    }

    Ok(())
}

pub fn parse_role_from_string(role_str: &str) -> Result<UserRole, AppError> {
    role_str
        .parse()
        .map_err(|_| AppError::forbidden(format!("Invalid role: {}", role_str)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_auth::Claims;

    fn user_with_role(role: &str) -> AuthUser {
        AuthUser(Claims {
            sub: uuid::Uuid::new_v4().to_string(),
            sap_id: "T100".to_string(),
            role: role.to_string(),
            exp: 9999999999,
            iat: 1234567890,
        })
    }

    #[test]
    fn test_parse_role_from_string() {
        assert!(matches!(parse_role_from_string("admin"), Ok(UserRole::Admin)));
        assert!(matches!(
            parse_role_from_string("teacher"),
            Ok(UserRole::Teacher)
        ));
        assert!(matches!(
            parse_role_from_string("student"),
            Ok(UserRole::Student)
        ));
        assert!(parse_role_from_string("principal").is_err());
    }

    #[test]
    fn test_check_role() {
        assert!(check_role(&user_with_role("teacher"), UserRole::Teacher).is_ok());

        let err = check_role(&user_with_role("student"), UserRole::Teacher).unwrap_err();
        assert_eq!(err.status.as_u16(), 403);
        assert_eq!(
            err.error.to_string(),
            "Access denied. Required roles: teacher, but user has role: student"
        );
    }

    #[test]
    fn test_check_any_role() {
        let admin = user_with_role("admin");
        assert!(check_any_role(&admin, &[UserRole::Teacher, UserRole::Admin]).is_ok());
        assert!(check_any_role(&admin, &[UserRole::Student]).is_err());
    }
}
