use axum::{
    Extension, Json,
    extract::State,
    response::IntoResponse,
};
use chrono::Utc;
use serde::Deserialize;
use tracing::{error, info};
use uuid::Uuid;

use entraide_db::format_timestamp;
use entraide_db::models::NewMessage;
use entraide_types::api::{
    ConversationSummary, ConversationsResponse, MessagesResponse, SendMessageRequest,
    SendMessageResponse,
};
use entraide_types::conversation::group_conversations;

use crate::auth::{AppState, required};
use crate::blocking;
use crate::error::{ApiJson, ApiQuery, AppError};
use crate::middleware::Claims;

const SELF_RECIPIENT: &str = "Impossible de converser avec soi-même";
const UNKNOWN_RECIPIENT: &str = "Destinataire inconnu";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreadQuery {
    pub recipient_id: Option<String>,
    /// An empty value means "no need", same as leaving it out.
    pub need_id: Option<String>,
}

/// Parse an optional need id; blank counts as absent.
fn optional_need_id(raw: Option<&str>) -> Result<Option<Uuid>, AppError> {
    match raw.map(str::trim).filter(|v| !v.is_empty()) {
        Some(value) => value
            .parse()
            .map(Some)
            .map_err(|_| AppError::validation("Besoin invalide")),
        None => Ok(None),
    }
}

/// POST /messages — append to the caller's thread with the recipient.
///
/// The recipient must be an existing user other than the caller, and a
/// referenced need must exist.
pub async fn send_message(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
    ApiJson(req): ApiJson<SendMessageRequest>,
) -> Result<impl IntoResponse, AppError> {
    let (Some(recipient), Some(_)) = (required(&req.recipient_id), required(&req.content)) else {
        return Err(AppError::validation("Destinataire et contenu requis"));
    };
    let recipient_id: Uuid = recipient
        .parse()
        .map_err(|_| AppError::validation("Destinataire invalide"))?;
    if recipient_id == claims.sub {
        return Err(AppError::validation(SELF_RECIPIENT));
    }
    let need_id = optional_need_id(req.need_id.as_deref())?;
    let content = req.content.unwrap_or_default();

    let message_id = Uuid::new_v4();
    let db = state.clone();
    let sender_id = claims.sub;
    blocking(move || {
        let recipient = recipient_id.to_string();
        if db.db.get_user_by_id(&recipient)?.is_none() {
            return Err(AppError::validation(UNKNOWN_RECIPIENT));
        }

        let need = need_id.map(|n| n.to_string());
        if let Some(need) = need.as_deref() {
            if !db.db.need_exists(need)? {
                return Err(AppError::validation("Besoin inconnu"));
            }
        }

        let id = message_id.to_string();
        let sender = sender_id.to_string();
        let created_at = format_timestamp(Utc::now());
        Ok(db.db.insert_message(&NewMessage {
            id: &id,
            sender_id: &sender,
            recipient_id: &recipient,
            need_id: need.as_deref(),
            content: &content,
            created_at: &created_at,
        })?)
    })
    .await?;

    info!("Message {} sent from {} to {}", message_id, sender_id, recipient_id);

    Ok(Json(SendMessageResponse {
        message: "Message envoyé".into(),
        message_id,
    }))
}

/// GET /messages?recipientId=..&needId=.. — full history of one thread,
/// oldest first. The other party is checked like a message recipient.
pub async fn get_thread(
    State(state): State<AppState>,
    ApiQuery(query): ApiQuery<ThreadQuery>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let other_id: Uuid = required(&query.recipient_id)
        .ok_or_else(|| AppError::validation("Destinataire requis"))?
        .parse()
        .map_err(|_| AppError::validation("Destinataire invalide"))?;
    if other_id == claims.sub {
        return Err(AppError::validation(SELF_RECIPIENT));
    }
    let need_id = optional_need_id(query.need_id.as_deref())?;

    let db = state.clone();
    let rows = blocking(move || {
        if db.db.get_user_by_id(&other_id.to_string())?.is_none() {
            return Err(AppError::validation(UNKNOWN_RECIPIENT));
        }
        Ok(db.db.list_thread(
            &claims.sub.to_string(),
            &other_id.to_string(),
            need_id.map(|n| n.to_string()).as_deref(),
        )?)
    })
    .await?;

    let messages = rows
        .into_iter()
        .map(|row| row.into_message())
        .collect::<anyhow::Result<Vec<_>>>()?;

    Ok(Json(MessagesResponse { messages }))
}

/// GET /messages/conversations — one entry per (other party, need),
/// most recently active first.
pub async fn get_conversations(
    State(state): State<AppState>,
    Extension(claims): Extension<Claims>,
) -> Result<impl IntoResponse, AppError> {
    let db = state.clone();
    let user_id = claims.sub;

    let conversations = blocking(move || {
        let messages = db
            .db
            .list_messages_for_user(&user_id.to_string())?
            .into_iter()
            .map(|row| row.into_message())
            .collect::<anyhow::Result<Vec<_>>>()?;

        let threads = group_conversations(user_id, &messages);

        let mut other_ids: Vec<String> = threads
            .iter()
            .map(|t| t.key.other_user_id.to_string())
            .collect();
        other_ids.sort();
        other_ids.dedup();
        let names = db.db.get_user_names(&other_ids)?;

        threads
            .into_iter()
            .map(|thread| {
                let other = thread.key.other_user_id;
                let Some(name) = names.get(&other.to_string()) else {
                    error!("Conversation partner {} of user {} no longer exists", other, user_id);
                    return Err(AppError::Internal(anyhow::anyhow!(
                        "conversation partner {} not found",
                        other
                    )));
                };
                Ok(ConversationSummary {
                    other_user_id: other,
                    other_user_name: name.clone(),
                    need_id: thread.key.need_id,
                    last_message_content: thread.last_message.content.clone(),
                    last_message_created_at: thread.last_message.created_at,
                })
            })
            .collect::<Result<Vec<_>, AppError>>()
    })
    .await?;

    Ok(Json(ConversationsResponse { conversations }))
}
