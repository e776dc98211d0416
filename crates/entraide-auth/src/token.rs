use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use entraide_types::api::Claims;
use entraide_types::models::UserType;

use crate::AuthError;

/// Secrets that must never sign production tokens.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "your-secret-key-change-this",
    "change-me",
    "dev-secret-change-me",
];

const MIN_SECRET_LEN: usize = 32;

pub const DEFAULT_TOKEN_TTL_HOURS: i64 = 24 * 7;
pub const MAX_TOKEN_TTL_HOURS: i64 = 24 * 365;

#[derive(Clone)]
pub struct AuthConfig {
    jwt_secret: String,
    token_ttl: Duration,
}

impl AuthConfig {
    /// Validate the signing secret and token lifetime.
    pub fn new(jwt_secret: impl Into<String>, token_ttl: Duration) -> Result<Self, AuthError> {
        let jwt_secret = jwt_secret.into();

        if jwt_secret.trim().is_empty() {
            return Err(AuthError::InvalidConfig("JWT secret is empty".into()));
        }
        if PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            return Err(AuthError::InvalidConfig(
                "JWT secret is still a placeholder value".into(),
            ));
        }
        if jwt_secret.len() < MIN_SECRET_LEN {
            return Err(AuthError::InvalidConfig(format!(
                "JWT secret must be at least {} bytes",
                MIN_SECRET_LEN
            )));
        }
        if token_ttl <= Duration::zero() {
            return Err(AuthError::InvalidConfig("token TTL must be positive".into()));
        }
        if token_ttl > Duration::hours(MAX_TOKEN_TTL_HOURS) {
            return Err(AuthError::InvalidConfig(format!(
                "token TTL must not exceed {} hours",
                MAX_TOKEN_TTL_HOURS
            )));
        }

        Ok(Self {
            jwt_secret,
            token_ttl,
        })
    }

    pub fn token_ttl(&self) -> Duration {
        self.token_ttl
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Issues and verifies signed session tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl TokenIssuer {
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
            ttl: config.token_ttl,
        }
    }

    pub fn issue(&self, user_id: Uuid, email: &str, user_type: UserType) -> Result<String, AuthError> {
        self.issue_at(user_id, email, user_type, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    pub fn issue_at(
        &self,
        user_id: Uuid,
        email: &str,
        user_type: UserType,
        now: DateTime<Utc>,
    ) -> Result<String, AuthError> {
        let expires = now
            .checked_add_signed(self.ttl)
            .ok_or(AuthError::Expiry)?;
        let claims = Claims {
            sub: user_id,
            email: email.to_string(),
            user_type,
            iat: now.timestamp().max(0) as usize,
            exp: expires.timestamp().max(0) as usize,
        };

        Ok(encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.encoding_key,
        )?)
    }

    /// Decode a token. Returns `None` for a bad signature, a malformed
    /// token, or an expired one.
    pub fn verify(&self, token: &str) -> Option<Claims> {
        match decode::<Claims>(token, &self.decoding_key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!("Token rejected: {}", e);
                None
            }
        }
    }
}
