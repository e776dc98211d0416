/// Entraide credential service.
///
/// Passwords are hashed with Argon2id (salted, PHC string format) and
/// sessions are HS256 JSON Web Tokens signed with a server-held secret.
/// The secret is always supplied through [`AuthConfig`]; there is no
/// fallback key.
pub mod password;
pub mod token;

pub use password::{hash_password, verify_password};
pub use token::{AuthConfig, TokenIssuer};

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid auth configuration: {0}")]
    InvalidConfig(String),
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("token expiry is out of range")]
    Expiry,
    #[error("token encoding failed: {0}")]
    Encode(#[from] jsonwebtoken::errors::Error),
}
