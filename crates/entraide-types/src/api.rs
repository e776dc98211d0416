use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{DonationStatus, Message, NeedStatus, NeedType, UserType};

// -- Token claims --

/// Claims carried by a bearer token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    /// User id.
    pub sub: Uuid,
    pub email: String,
    pub user_type: UserType,
    pub iat: usize,
    pub exp: usize,
}

// -- Auth --

/// Fields are optional at the wire level so that a missing field yields a
/// readable validation error instead of a deserialization failure.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SignupRequest {
    pub name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub user_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SigninRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
    pub user_type: UserType,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub message: String,
    pub token: String,
    pub user: UserProfile,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: UserProfile,
}

// -- Needs --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateNeedRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub need_type: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpdateNeedStatusRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNeedResponse {
    pub message: String,
    pub need_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub need_type: NeedType,
    pub status: NeedStatus,
    pub created_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Owner contact details, present on the public listing only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<NeedOwner>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NeedOwner {
    pub name: String,
    pub email: String,
    pub phone: String,
    pub city: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct NeedsResponse {
    pub needs: Vec<NeedResponse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CityCount {
    pub city: String,
    pub count: u64,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NeedStats {
    pub total: u64,
    pub active: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub top_cities: Vec<CityCount>,
}

// -- Donations --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct CreateDonationRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDonationResponse {
    pub message: String,
    pub donation_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DonationOwner {
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub status: DonationStatus,
    pub created_at: DateTime<Utc>,
    pub user: DonationOwner,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DonationsResponse {
    pub donations: Vec<DonationResponse>,
}

// -- Messages --

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub recipient_id: Option<String>,
    pub need_id: Option<String>,
    pub content: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageResponse {
    pub message: String,
    pub message_id: Uuid,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub other_user_id: Uuid,
    pub other_user_name: String,
    pub need_id: Option<Uuid>,
    pub last_message_content: String,
    pub last_message_created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConversationsResponse {
    pub conversations: Vec<ConversationSummary>,
}

// -- Generic --

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusMessage {
    pub message: String,
}
