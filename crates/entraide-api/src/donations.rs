use axum::{Extension, Json, extract::State, response::IntoResponse};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use entraide_db::format_timestamp;
use entraide_db::models::NewDonation;
use entraide_types::api::{CreateDonationRequest, CreateDonationResponse, DonationsResponse};
use entraide_types::models::UserType;

use crate::auth::{AppState, required};
use crate::blocking;
use crate::error::{ApiJson, AppError};
use crate::middleware::Claims;

pub async fn list_donations(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let rows = blocking(move || Ok(db.db.list_donations_with_owner()?)).await?;

    let donations = rows
        .into_iter()
        .map(|row| row.into_donation())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(DonationsResponse { donations }))
}

/// POST /donations — only `donnateur` users publish donations.
pub async fn create_donation(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateDonationRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_type != UserType::Donnateur {
        return Err(AppError::Forbidden("Accès refusé"));
    }

    let (Some(title), Some(description)) = (required(&req.title), required(&req.description))
    else {
        return Err(AppError::validation("Titre et description requis"));
    };
    let image_url = required(&req.image_url);

    let donation_id = Uuid::new_v4();
    let db = state.clone();
    let owner_id = claims.sub;
    blocking(move || {
        let id = donation_id.to_string();
        let user_id = owner_id.to_string();
        let created_at = format_timestamp(Utc::now());
        Ok(db.db.insert_donation(&NewDonation {
            id: &id,
            user_id: &user_id,
            title: &title,
            description: &description,
            image_url: image_url.as_deref(),
            created_at: &created_at,
        })?)
    })
    .await?;

    info!("Donation {} created by {}", donation_id, claims.sub);

    Ok(Json(CreateDonationResponse {
        message: "Donation publiée avec succès".into(),
        donation_id,
    }))
}
