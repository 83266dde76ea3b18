pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenError, TokenKind, TokenService};
pub use password::{validate_password, PasswordHasher};

use sha2::{Digest, Sha256};

/// Hex SHA-256 digest under which refresh tokens are stored.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
