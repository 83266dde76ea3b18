use crate::error::{ApiError, ApiResult};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static UPPERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Z]").unwrap());
static LOWERCASE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[a-z]").unwrap());
static DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9]").unwrap());
static SPECIAL: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"[!@#$%^&*()_+\-=\[\]{};':"\\|,.<>/?]"#).unwrap());

/// Checks registration password rules in order, returning the first violation.
pub fn validate_password(password: &str) -> ApiResult<()> {
    if password.chars().count() < 8 {
        return Err(ApiError::bad_request("Password must be at least 8 characters"));
    }
    if !UPPERCASE.is_match(password) {
        return Err(ApiError::bad_request(
            "Password must contain at least one uppercase letter",
        ));
    }
    if !LOWERCASE.is_match(password) {
        return Err(ApiError::bad_request(
            "Password must contain at least one lowercase letter",
        ));
    }
    if !DIGIT.is_match(password) {
        return Err(ApiError::bad_request("Password must contain at least one number"));
    }
    if !SPECIAL.is_match(password) {
        return Err(ApiError::bad_request(
            "Password must contain at least one special character (ex. !,@,#,$,%^,&,*, etc.)",
        ));
    }
    Ok(())
}

/// bcrypt hashing on the blocking thread pool.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, password: &str) -> ApiResult<String> {
        let password = password.to_string();
        let cost = self.cost;
        tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
            .await
            .map_err(|e| ApiError::internal(format!("password hashing task failed: {e}")))?
            .map_err(|e| ApiError::internal(format!("password hashing failed: {e}")))
    }

    /// A malformed stored hash verifies as false.
    pub async fn verify(&self, password: &str, hash: &str) -> ApiResult<bool> {
        let password = password.to_string();
        let hash = hash.to_string();
        let outcome = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
            .await
            .map_err(|e| ApiError::internal(format!("password verification task failed: {e}")))?;

        match outcome {
            Ok(matches) => Ok(matches),
            Err(e) => {
                warn!("Stored password hash could not be verified: {}", e);
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(password: &str) -> String {
        validate_password(password).unwrap_err().to_string()
    }

    #[test]
    fn test_password_rules_report_first_violation() {
        assert_eq!(message("Ab1!"), "Password must be at least 8 characters");
        assert_eq!(
            message("abcdefg1!"),
            "Password must contain at least one uppercase letter"
        );
        assert_eq!(
            message("ABCDEFG1!"),
            "Password must contain at least one lowercase letter"
        );
        assert_eq!(message("Abcdefgh!"), "Password must contain at least one number");
        assert!(message("Abcdefgh1").starts_with("Password must contain at least one special"));
        assert!(validate_password("Abcdefg1!").is_ok());
        assert!(validate_password("Abcdefg1\\").is_ok());
    }

    #[tokio::test]
    async fn test_hash_and_verify() {
        let hasher = PasswordHasher::new(4);
        let hash = hasher.hash("Sup3r$ecret").await.unwrap();

        assert!(hash.starts_with("$2"));
        assert!(hasher.verify("Sup3r$ecret", &hash).await.unwrap());
        assert!(!hasher.verify("wrong", &hash).await.unwrap());
        assert!(!hasher.verify("Sup3r$ecret", "not-a-hash").await.unwrap());
    }
}
