use axum::{
    Extension, Json,
    extract::{Path, State},
    response::IntoResponse,
};
use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use entraide_db::format_timestamp;
use entraide_db::models::NewNeed;
use entraide_types::api::{
    CityCount, CreateNeedRequest, CreateNeedResponse, NeedStats, NeedsResponse, StatusMessage,
    UpdateNeedStatusRequest,
};
use entraide_types::models::{NeedStatus, NeedType, UserType};

use crate::auth::{AppState, required};
use crate::blocking;
use crate::error::{ApiJson, AppError};
use crate::middleware::Claims;

/// GET /needs — every need with its owner's contact details, newest first.
pub async fn list_needs(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let rows = blocking(move || Ok(db.db.list_needs_with_owner()?)).await?;

    let needs = rows
        .into_iter()
        .map(|row| row.into_need())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(NeedsResponse { needs }))
}

/// POST /needs — only `necessiteux` users publish needs.
pub async fn create_need(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<CreateNeedRequest>,
) -> Result<impl IntoResponse, AppError> {
    if claims.user_type != UserType::Necessiteux {
        return Err(AppError::Forbidden("Accès refusé"));
    }

    let (Some(title), Some(description)) = (required(&req.title), required(&req.description))
    else {
        return Err(AppError::validation("Titre et description requis"));
    };
    let need_type = match required(&req.need_type) {
        Some(value) => value
            .parse::<NeedType>()
            .map_err(|_| AppError::validation("Type de besoin invalide"))?,
        None => NeedType::default(),
    };
    let image_url = required(&req.image_url);

    let need_id = Uuid::new_v4();
    let db = state.clone();
    let owner_id = claims.sub;
    blocking(move || {
        let id = need_id.to_string();
        let user_id = owner_id.to_string();
        let created_at = format_timestamp(Utc::now());
        Ok(db.db.insert_need(&NewNeed {
            id: &id,
            user_id: &user_id,
            title: &title,
            description: &description,
            image_url: image_url.as_deref(),
            need_type: need_type.as_str(),
            created_at: &created_at,
        })?)
    })
    .await?;

    info!("Need {} created by {}", need_id, claims.sub);

    Ok(Json(CreateNeedResponse {
        message: "Besoin publié avec succès".into(),
        need_id,
    }))
}

/// PATCH /needs/{id}/status — the update is conditioned on ownership, so a
/// need owned by someone else is reported exactly like a missing one.
pub async fn update_status(
    State(state): State<AppState>,
    Path(need_id): Path<String>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<UpdateNeedStatusRequest>,
) -> Result<impl IntoResponse, AppError> {
    let status: NeedStatus = req
        .status
        .as_deref()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| AppError::validation("Statut invalide"))?;

    let Ok(need_id) = need_id.parse::<Uuid>() else {
        return Err(AppError::NotFound("Besoin non trouvé"));
    };

    let db = state.clone();
    let owner_id = claims.sub;
    let updated = blocking(move || {
        Ok(db.db.update_need_status(
            &need_id.to_string(),
            &owner_id.to_string(),
            status.as_str(),
            &format_timestamp(Utc::now()),
        )?)
    })
    .await?;

    if !updated {
        return Err(AppError::NotFound("Besoin non trouvé"));
    }

    info!("Need {} moved to {}", need_id, status);
    Ok(Json(StatusMessage {
        message: "Statut mis à jour".into(),
    }))
}

/// GET /needs/my-needs
pub async fn my_needs(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let rows = blocking(move || Ok(db.db.list_needs_by_owner(&claims.sub.to_string())?)).await?;

    let needs = rows
        .into_iter()
        .map(|row| row.into_need(None))
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(NeedsResponse { needs }))
}

/// GET /needs/stats — platform-wide counts and the five busiest cities.
pub async fn need_stats(
    State(state): State<AppState>,
    Extension(_claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let stats = blocking(move || Ok(db.db.need_stats()?)).await?;

    Ok(Json(NeedStats {
        total: stats.total,
        active: stats.active,
        in_progress: stats.in_progress,
        completed: stats.completed,
        top_cities: stats
            .top_cities
            .into_iter()
            .map(|(city, count)| CityCount { city, count })
            .collect(),
    }))
}
