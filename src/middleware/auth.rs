use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use rollcall_auth::{Claims, verify_token};
use rollcall_core::AppError;
use rollcall_models::UserRole;
use uuid::Uuid;

use crate::state::AppState;

/// Extractor that validates the bearer token and provides its claims.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl AuthUser {
    pub fn user_id(&self) -> Result<Uuid, AppError> {
        Uuid::parse_str(&self.0.sub)
            .map_err(|_| AppError::unauthorized("Invalid user ID in token".to_string()))
    }

    pub fn sap_id(&self) -> &str {
        &self.0.sap_id
    }

    pub fn role(&self) -> Result<UserRole, AppError> {
        self.0
            .role
            .parse()
            .map_err(|_| AppError::unauthorized("Invalid role in token".to_string()))
    }
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Some(user) = parts.extensions.get::<AuthUser>() {
            return Ok(user.clone());
        }

        let auth_header = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| AppError::unauthorized("Missing authorization header".to_string()))?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            AppError::unauthorized("Invalid authorization header format".to_string())
        })?;

        let claims = verify_token(token, &state.jwt_config)?;

        Ok(AuthUser(claims))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn claims(sub: &str, role: &str) -> Claims {
        Claims {
            sub: sub.to_string(),
            sap_id: "500012345".to_string(),
            role: role.to_string(),
            exp: 9999999999,
            iat: 1234567890,
        }
    }

    #[test]
    fn test_user_id() {
        let id = Uuid::new_v4();
        let user = AuthUser(claims(&id.to_string(), "teacher"));
        assert_eq!(user.user_id().unwrap(), id);
        assert_eq!(user.sap_id(), "500012345");
    }

    #[test]
    fn test_invalid_user_id_is_unauthorized() {
        let user = AuthUser(claims("not-a-uuid", "teacher"));
        assert_eq!(user.user_id().unwrap_err().status.as_u16(), 401);
    }

    #[test]
    fn test_role() {
        assert_eq!(
            AuthUser(claims("x", "student")).role().unwrap(),
            UserRole::Student
        );
        assert!(AuthUser(claims("x", "system_admin")).role().is_err());
    }
}
