use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Returned when a stored or submitted string is not a known enum value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid {kind}: '{value}'")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

macro_rules! string_enum {
    ($name:ident, $kind:literal, { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = ParseEnumError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(ParseEnumError {
                        kind: $kind,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserType {
    /// Donor: publishes donations.
    Donnateur,
    /// Person in need: publishes needs.
    Necessiteux,
}

string_enum!(UserType, "user type", {
    Donnateur => "donnateur",
    Necessiteux => "necessiteux",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeedType {
    Nourriture,
    Vetements,
    Soins,
    Logement,
    Scolarite,
    Medicaments,
    Financier,
    #[default]
    Autre,
}

string_enum!(NeedType, "need type", {
    Nourriture => "nourriture",
    Vetements => "vetements",
    Soins => "soins",
    Logement => "logement",
    Scolarite => "scolarite",
    Medicaments => "medicaments",
    Financier => "financier",
    Autre => "autre",
});

/// Lifecycle of a need: active -> in-progress -> completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NeedStatus {
    #[default]
    Active,
    InProgress,
    Completed,
}

string_enum!(NeedStatus, "need status", {
    Active => "active",
    InProgress => "in-progress",
    Completed => "completed",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DonationStatus {
    #[default]
    Available,
    Unavailable,
}

string_enum!(DonationStatus, "donation status", {
    Available => "available",
    Unavailable => "unavailable",
});

/// One entry of the append-only message log.
///
/// `read` is persisted as `false` and nothing currently sets it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: Uuid,
    pub sender_id: Uuid,
    pub recipient_id: Uuid,
    pub need_id: Option<Uuid>,
    pub content: String,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

impl Message {
    /// The party on the other end of this message, seen from `user_id`.
    pub fn other_party(&self, user_id: Uuid) -> Uuid {
        if self.sender_id == user_id {
            self.recipient_id
        } else {
            self.sender_id
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id || self.recipient_id == user_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn need_status_uses_kebab_case() {
        assert_eq!(NeedStatus::InProgress.as_str(), "in-progress");
        assert_eq!("in-progress".parse::<NeedStatus>().unwrap(), NeedStatus::InProgress);
        assert_eq!(
            serde_json::to_string(&NeedStatus::InProgress).unwrap(),
            "\"in-progress\""
        );
    }

    #[test]
    fn unknown_values_are_rejected() {
        let err = "admin".parse::<UserType>().unwrap_err();
        assert_eq!(err.kind, "user type");
        assert!("urgent".parse::<NeedType>().is_err());
        assert!("Active".parse::<NeedStatus>().is_err());
    }

    #[test]
    fn defaults_match_new_records() {
        assert_eq!(NeedType::default(), NeedType::Autre);
        assert_eq!(NeedStatus::default(), NeedStatus::Active);
        assert_eq!(DonationStatus::default(), DonationStatus::Available);
    }

    #[test]
    fn other_party_is_relative_to_caller() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let msg = Message {
            id: Uuid::new_v4(),
            sender_id: x,
            recipient_id: y,
            need_id: None,
            content: "bonjour".into(),
            read: false,
            created_at: Utc::now(),
        };
        assert_eq!(msg.other_party(x), y);
        assert_eq!(msg.other_party(y), x);
        assert!(msg.involves(x));
        assert!(!msg.involves(Uuid::new_v4()));
    }
}
