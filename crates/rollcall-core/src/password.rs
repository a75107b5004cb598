use bcrypt::{DEFAULT_COST, hash, verify};

use crate::errors::AppError;

pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST)
        .map_err(|e| AppError::internal_error(format!("Failed to hash password: {}", e)))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::internal_error(format!("Failed to verify password: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("60004220001").unwrap();
        assert_ne!(hash, "60004220001");
        assert!(verify_password("60004220001", &hash).unwrap());
        assert!(!verify_password("60004220002", &hash).unwrap());
    }

    #[test]
    fn test_hashes_are_salted() {
        let first = hash_password("admin").unwrap();
        let second = hash_password("admin").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn test_verify_against_garbage_hash_errors() {
        assert!(verify_password("admin", "not-a-bcrypt-hash").is_err());
    }
}
