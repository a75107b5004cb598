use chrono::Utc;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use rollcall_config::JwtConfig;
use rollcall_core::AppError;

use crate::claims::Claims;

pub fn create_access_token(
    user_id: Uuid,
    sap_id: &str,
    role: &str,
    jwt_config: &JwtConfig,
) -> Result<String, AppError> {
    let now = Utc::now().timestamp() as usize;
    let exp = now + jwt_config.access_token_expiry.max(0) as usize;

    let claims = Claims {
        sub: user_id.to_string(),
        sap_id: sap_id.to_string(),
        role: role.to_string(),
        exp,
        iat: now,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(jwt_config.secret.as_bytes()),
    )
    .map_err(|e| AppError::internal_error(format!("Failed to create token: {}", e)))
}

pub fn verify_token(token: &str, jwt_config: &JwtConfig) -> Result<Claims, AppError> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(jwt_config.secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|_| AppError::unauthorized("Invalid or expired token".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(expiry: i64) -> JwtConfig {
        JwtConfig {
            secret: "test-secret".to_string(),
            access_token_expiry: expiry,
        }
    }

    #[test]
    fn test_round_trip_keeps_identity_and_role() {
        let user_id = Uuid::new_v4();
        let token = create_access_token(user_id, "T1001", "teacher", &config(3600)).unwrap();
        let claims = verify_token(&token, &config(3600)).unwrap();

        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.sap_id, "T1001");
        assert_eq!(claims.role, "teacher");
        assert_eq!(claims.exp - claims.iat, 3600);
    }

    #[test]
    fn test_wrong_secret_is_unauthorized() {
        let token = create_access_token(Uuid::new_v4(), "admin", "admin", &config(3600)).unwrap();
        let other = JwtConfig {
            secret: "another-secret".to_string(),
            access_token_expiry: 3600,
        };

        let err = verify_token(&token, &other).unwrap_err();
        assert_eq!(err.status.as_u16(), 401);
    }

    #[test]
    fn test_expired_token_is_rejected() {
        let now = Utc::now().timestamp() as usize;
        let claims = Claims {
            sub: Uuid::new_v4().to_string(),
            sap_id: "S1".to_string(),
            role: "student".to_string(),
            exp: now - 7200,
            iat: now - 10_800,
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"test-secret"),
        )
        .unwrap();

        assert!(verify_token(&token, &config(3600)).is_err());
    }

    #[test]
    fn test_garbage_token_is_rejected() {
        assert!(verify_token("not.a.jwt", &config(3600)).is_err());
    }
}
