use std::sync::Arc;

use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;

use entraide_auth::{TokenIssuer, hash_password, verify_password};
use entraide_db::models::{NewUser, UserRow};
use entraide_db::{Database, DbError, format_timestamp};
use entraide_types::api::{AuthResponse, MeResponse, SigninRequest, SignupRequest, UserProfile};
use entraide_types::models::UserType;

use crate::blocking;
use crate::error::{ApiJson, AppError};
use crate::middleware::Claims;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub tokens: TokenIssuer,
}

const MIN_PASSWORD_LEN: usize = 8;

/// Trimmed value of a required text field, or `None` if missing or blank.
pub(crate) fn required(field: &Option<String>) -> Option<String> {
    field
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(name), Some(email), Some(phone), Some(city), Some(user_type)) = (
        required(&req.name),
        required(&req.email),
        required(&req.phone),
        required(&req.city),
        required(&req.user_type),
    ) else {
        return Err(AppError::validation("Tous les champs sont requis"));
    };
    let password = req.password.unwrap_or_default();
    if password.is_empty() {
        return Err(AppError::validation("Tous les champs sont requis"));
    }

    let user_type: UserType = user_type
        .parse()
        .map_err(|_| AppError::validation("Type utilisateur invalide"))?;
    if !email.contains('@') {
        return Err(AppError::validation("Email invalide"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "Le mot de passe doit contenir au moins {} caractères",
            MIN_PASSWORD_LEN
        )));
    }

    let user_id = Uuid::new_v4();
    let profile = UserProfile {
        id: user_id,
        name,
        email,
        phone,
        city,
        user_type,
    };

    // Argon2 and the insert both block; keep them off the async runtime.
    let db = state.clone();
    let row = profile.clone();
    blocking(move || {
        if db.db.get_user_by_email(&row.email)?.is_some() {
            return Err(AppError::Conflict("Cet email est déjà utilisé"));
        }

        let password_hash = hash_password(&password).map_err(anyhow::Error::from)?;
        let id = row.id.to_string();
        let created_at = format_timestamp(Utc::now());

        db.db
            .create_user(&NewUser {
                id: &id,
                name: &row.name,
                email: &row.email,
                password_hash: &password_hash,
                phone: &row.phone,
                city: &row.city,
                user_type: row.user_type.as_str(),
                created_at: &created_at,
            })
            .map_err(|e| match e.downcast_ref::<DbError>() {
                Some(DbError::EmailTaken) => AppError::Conflict("Cet email est déjà utilisé"),
                _ => AppError::Internal(e),
            })
    })
    .await?;

    let token = state
        .tokens
        .issue(user_id, &profile.email, user_type)
        .map_err(anyhow::Error::from)?;

    info!("User {} signed up as {}", user_id, user_type);

    Ok(Json(AuthResponse {
        message: "Compte créé avec succès".into(),
        token,
        user: profile,
    }))
}

pub async fn signin(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SigninRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(email), Some(password)) = (required(&req.email), req.password.filter(|p| !p.is_empty()))
    else {
        return Err(AppError::validation("Email et mot de passe requis"));
    };

    let db = state.clone();
    let user = blocking(move || {
        let Some(user) = db.db.get_user_by_email(&email)? else {
            return Ok(None);
        };
        Ok(verify_password(&password, &user.password).then_some(user))
    })
    .await?;

    let Some(user) = user else {
        warn!("Failed sign-in attempt");
        return Err(AppError::Unauthenticated("Email ou mot de passe incorrect"));
    };

    let profile = user_profile(&user)?;
    let token = state
        .tokens
        .issue(profile.id, &profile.email, profile.user_type)
        .map_err(anyhow::Error::from)?;

    Ok(Json(AuthResponse {
        message: "Connexion réussie".into(),
        token,
        user: profile,
    }))
}

pub async fn me(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let user = blocking(move || Ok(db.db.get_user_by_id(&claims.sub.to_string())?))
        .await?
        .ok_or(AppError::NotFound("Utilisateur non trouvé"))?;

    Ok(Json(MeResponse {
        user: user_profile(&user)?,
    }))
}

fn user_profile(row: &UserRow) -> Result<UserProfile, AppError> {
    Ok(UserProfile {
        id: row.uuid()?,
        name: row.name.clone(),
        email: row.email.clone(),
        phone: row.phone.clone(),
        city: row.city.clone(),
        user_type: row.user_type()?,
    })
}
