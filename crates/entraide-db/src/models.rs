/// Database row types. These map directly to SQLite rows; ids and
/// timestamps stay as text until converted into `entraide-types` values.
use std::str::FromStr;

use anyhow::Result;
use uuid::Uuid;

use entraide_types::api::{DonationOwner, DonationResponse, NeedOwner, NeedResponse};
use entraide_types::models::{Message, UserType};

use crate::{DbError, parse_timestamp};

pub struct UserRow {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    pub city: String,
    pub user_type: String,
    pub created_at: String,
}

impl UserRow {
    pub fn uuid(&self) -> Result<Uuid> {
        parse_uuid("id", &self.id, &self.id)
    }

    pub fn user_type(&self) -> Result<UserType> {
        parse_enum("user_type", &self.user_type, &self.id)
    }
}

pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub phone: &'a str,
    pub city: &'a str,
    pub user_type: &'a str,
    pub created_at: &'a str,
}

pub struct NeedRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub need_type: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: Option<String>,
}

impl NeedRow {
    pub fn into_need(self, owner: Option<NeedOwner>) -> Result<NeedResponse> {
        Ok(NeedResponse {
            id: parse_uuid("id", &self.id, &self.id)?,
            user_id: parse_uuid("user_id", &self.user_id, &self.id)?,
            need_type: parse_enum("need_type", &self.need_type, &self.id)?,
            status: parse_enum("status", &self.status, &self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            updated_at: self
                .updated_at
                .as_deref()
                .map(|ts| parse_timestamp(ts, &self.id))
                .transpose()?,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            user: owner,
        })
    }
}

/// A need joined with its owner's public contact fields.
pub struct NeedWithOwnerRow {
    pub need: NeedRow,
    pub owner_name: String,
    pub owner_email: String,
    pub owner_phone: String,
    pub owner_city: String,
}

impl NeedWithOwnerRow {
    pub fn into_need(self) -> Result<NeedResponse> {
        let owner = NeedOwner {
            name: self.owner_name,
            email: self.owner_email,
            phone: self.owner_phone,
            city: self.owner_city,
        };
        self.need.into_need(Some(owner))
    }
}

pub struct NewNeed<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub image_url: Option<&'a str>,
    pub need_type: &'a str,
    pub created_at: &'a str,
}

pub struct NeedStatsRow {
    pub total: u64,
    pub active: u64,
    pub in_progress: u64,
    pub completed: u64,
    /// (city, count), at most five.
    pub top_cities: Vec<(String, u64)>,
}

pub struct DonationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
    pub status: String,
    pub created_at: String,
    pub owner_name: String,
    pub owner_email: String,
}

impl DonationRow {
    pub fn into_donation(self) -> Result<DonationResponse> {
        Ok(DonationResponse {
            id: parse_uuid("id", &self.id, &self.id)?,
            user_id: parse_uuid("user_id", &self.user_id, &self.id)?,
            status: parse_enum("status", &self.status, &self.id)?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            title: self.title,
            description: self.description,
            image_url: self.image_url,
            user: DonationOwner {
                name: self.owner_name,
                email: self.owner_email,
            },
        })
    }
}

pub struct NewDonation<'a> {
    pub id: &'a str,
    pub user_id: &'a str,
    pub title: &'a str,
    pub description: &'a str,
    pub image_url: Option<&'a str>,
    pub created_at: &'a str,
}

pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub recipient_id: String,
    pub need_id: Option<String>,
    pub content: String,
    pub read: bool,
    pub created_at: String,
}

impl MessageRow {
    pub fn into_message(self) -> Result<Message> {
        Ok(Message {
            id: parse_uuid("id", &self.id, &self.id)?,
            sender_id: parse_uuid("sender_id", &self.sender_id, &self.id)?,
            recipient_id: parse_uuid("recipient_id", &self.recipient_id, &self.id)?,
            need_id: self
                .need_id
                .as_deref()
                .map(|n| parse_uuid("need_id", n, &self.id))
                .transpose()?,
            created_at: parse_timestamp(&self.created_at, &self.id)?,
            content: self.content,
            read: self.read,
        })
    }
}

pub struct NewMessage<'a> {
    pub id: &'a str,
    pub sender_id: &'a str,
    pub recipient_id: &'a str,
    pub need_id: Option<&'a str>,
    pub content: &'a str,
    pub created_at: &'a str,
}

pub(crate) fn parse_uuid(column: &'static str, value: &str, row_id: &str) -> Result<Uuid> {
    value.parse().map_err(|_| {
        DbError::Corrupt {
            column,
            value: value.to_string(),
            row_id: row_id.to_string(),
        }
        .into()
    })
}

fn parse_enum<T: FromStr>(column: &'static str, value: &str, row_id: &str) -> Result<T> {
    value.parse().map_err(|_| {
        DbError::Corrupt {
            column,
            value: value.to_string(),
            row_id: row_id.to_string(),
        }
        .into()
    })
}
