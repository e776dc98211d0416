use std::collections::HashMap;

use crate::models::{
    DonationRow, MessageRow, NeedRow, NeedStatsRow, NeedWithOwnerRow, NewDonation, NewMessage,
    NewNeed, NewUser, UserRow,
};
use crate::{Database, DbError};
use anyhow::Result;
use rusqlite::{Connection, Row};

const USER_COLUMNS: &str = "id, name, email, password, phone, city, user_type, created_at";
const NEED_COLUMNS: &str =
    "n.id, n.user_id, n.title, n.description, n.image_url, n.need_type, n.status, n.created_at, n.updated_at";
const MESSAGE_COLUMNS: &str = "id, sender_id, recipient_id, need_id, content, read, created_at";

impl Database {
    // -- Users --

    pub fn create_user(&self, user: &NewUser<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (id, name, email, password, phone, city, user_type, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                rusqlite::params![
                    user.id,
                    user.name,
                    user.email,
                    user.password_hash,
                    user.phone,
                    user.city,
                    user.user_type,
                    user.created_at,
                ],
            )
            .map_err(|e| match e {
                rusqlite::Error::SqliteFailure(ref err, _)
                    if err.extended_code == rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE =>
                {
                    anyhow::Error::from(DbError::EmailTaken)
                }
                other => other.into(),
            })?;
            Ok(())
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "email", email))
    }

    pub fn get_user_by_id(&self, id: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| query_user(conn, "id", id))
    }

    /// Batch-fetch display names for a set of user ids. Unknown ids are
    /// absent from the result.
    pub fn get_user_names(&self, ids: &[String]) -> Result<HashMap<String, String>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        self.with_conn(|conn| {
            let placeholders: Vec<String> = (1..=ids.len()).map(|i| format!("?{}", i)).collect();
            let sql = format!(
                "SELECT id, name FROM users WHERE id IN ({})",
                placeholders.join(", ")
            );

            let mut stmt = conn.prepare(&sql)?;
            let names = stmt
                .query_map(rusqlite::params_from_iter(ids.iter()), |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?
                .collect::<std::result::Result<HashMap<_, _>, _>>()?;

            Ok(names)
        })
    }

    // -- Needs --

    pub fn insert_need(&self, need: &NewNeed<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO needs (id, user_id, title, description, image_url, need_type, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, 'active', ?7)",
                rusqlite::params![
                    need.id,
                    need.user_id,
                    need.title,
                    need.description,
                    need.image_url,
                    need.need_type,
                    need.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// All needs with their owner's contact fields, newest first.
    pub fn list_needs_with_owner(&self) -> Result<Vec<NeedWithOwnerRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NEED_COLUMNS}, u.name, u.email, u.phone, u.city
                 FROM needs n
                 JOIN users u ON n.user_id = u.id
                 ORDER BY n.created_at DESC, n.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(NeedWithOwnerRow {
                        need: need_from_row(row)?,
                        owner_name: row.get(9)?,
                        owner_email: row.get(10)?,
                        owner_phone: row.get(11)?,
                        owner_city: row.get(12)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn list_needs_by_owner(&self, user_id: &str) -> Result<Vec<NeedRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {NEED_COLUMNS} FROM needs n
                 WHERE n.user_id = ?1
                 ORDER BY n.created_at DESC, n.rowid DESC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], need_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    pub fn need_exists(&self, id: &str) -> Result<bool> {
        self.with_conn(|conn| {
            let found: i64 = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM needs WHERE id = ?1)",
                [id],
                |row| row.get(0),
            )?;
            Ok(found != 0)
        })
    }

    /// Set the status of a need owned by `owner_id`. Returns false when no
    /// need matches both the id and the owner.
    pub fn update_need_status(
        &self,
        id: &str,
        owner_id: &str,
        status: &str,
        updated_at: &str,
    ) -> Result<bool> {
        self.with_conn(|conn| {
            let changed = conn.execute(
                "UPDATE needs SET status = ?1, updated_at = ?2 WHERE id = ?3 AND user_id = ?4",
                rusqlite::params![status, updated_at, id, owner_id],
            )?;
            Ok(changed > 0)
        })
    }

    pub fn need_stats(&self) -> Result<NeedStatsRow> {
        self.with_conn(|conn| {
            let (total, active, in_progress, completed) = conn.query_row(
                "SELECT COUNT(*),
                        COALESCE(SUM(status = 'active'), 0),
                        COALESCE(SUM(status = 'in-progress'), 0),
                        COALESCE(SUM(status = 'completed'), 0)
                 FROM needs",
                [],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, i64>(3)?,
                    ))
                },
            )?;

            let mut stmt = conn.prepare(
                "SELECT u.city, COUNT(*) AS cnt
                 FROM needs n
                 JOIN users u ON n.user_id = u.id
                 GROUP BY u.city
                 ORDER BY cnt DESC, u.city ASC
                 LIMIT 5",
            )?;
            let top_cities = stmt
                .query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            Ok(NeedStatsRow {
                total: total as u64,
                active: active as u64,
                in_progress: in_progress as u64,
                completed: completed as u64,
                top_cities,
            })
        })
    }

    // -- Donations --

    pub fn insert_donation(&self, donation: &NewDonation<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO donations (id, user_id, title, description, image_url, status, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 'available', ?6)",
                rusqlite::params![
                    donation.id,
                    donation.user_id,
                    donation.title,
                    donation.description,
                    donation.image_url,
                    donation.created_at,
                ],
            )?;
            Ok(())
        })
    }

    pub fn list_donations_with_owner(&self) -> Result<Vec<DonationRow>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT d.id, d.user_id, d.title, d.description, d.image_url, d.status, d.created_at,
                        u.name, u.email
                 FROM donations d
                 JOIN users u ON d.user_id = u.id
                 ORDER BY d.created_at DESC, d.rowid DESC",
            )?;
            let rows = stmt
                .query_map([], |row| {
                    Ok(DonationRow {
                        id: row.get(0)?,
                        user_id: row.get(1)?,
                        title: row.get(2)?,
                        description: row.get(3)?,
                        image_url: row.get(4)?,
                        status: row.get(5)?,
                        created_at: row.get(6)?,
                        owner_name: row.get(7)?,
                        owner_email: row.get(8)?,
                    })
                })?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    // -- Messages --

    pub fn insert_message(&self, message: &NewMessage<'_>) -> Result<()> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO messages (id, sender_id, recipient_id, need_id, content, read, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)",
                rusqlite::params![
                    message.id,
                    message.sender_id,
                    message.recipient_id,
                    message.need_id,
                    message.content,
                    message.created_at,
                ],
            )?;
            Ok(())
        })
    }

    /// Messages exchanged between two users, oldest first.
    ///
    /// `need_id` is matched exactly: `None` selects only messages without a
    /// need.
    pub fn list_thread(
        &self,
        user_id: &str,
        other_user_id: &str,
        need_id: Option<&str>,
    ) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE ((sender_id = ?1 AND recipient_id = ?2)
                     OR (sender_id = ?2 AND recipient_id = ?1))
                   AND need_id IS ?3
                 ORDER BY created_at ASC, rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![user_id, other_user_id, need_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Every message the user sent or received, in insertion order.
    pub fn list_messages_for_user(&self, user_id: &str) -> Result<Vec<MessageRow>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {MESSAGE_COLUMNS} FROM messages
                 WHERE sender_id = ?1 OR recipient_id = ?1
                 ORDER BY rowid ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([user_id], message_from_row)?
                .collect::<std::result::Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}

fn query_user(conn: &Connection, column: &str, value: &str) -> Result<Option<UserRow>> {
    let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let row = stmt
        .query_row([value], |row| {
            Ok(UserRow {
                id: row.get(0)?,
                name: row.get(1)?,
                email: row.get(2)?,
                password: row.get(3)?,
                phone: row.get(4)?,
                city: row.get(5)?,
                user_type: row.get(6)?,
                created_at: row.get(7)?,
            })
        })
        .optional()?;

    Ok(row)
}

fn need_from_row(row: &Row<'_>) -> rusqlite::Result<NeedRow> {
    Ok(NeedRow {
        id: row.get(0)?,
        user_id: row.get(1)?,
        title: row.get(2)?,
        description: row.get(3)?,
        image_url: row.get(4)?,
        need_type: row.get(5)?,
        status: row.get(6)?,
        created_at: row.get(7)?,
        updated_at: row.get(8)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        sender_id: row.get(1)?,
        recipient_id: row.get(2)?,
        need_id: row.get(3)?,
        content: row.get(4)?,
        read: row.get(5)?,
        created_at: row.get(6)?,
    })
}

/// Extension trait for optional query results
trait OptionalExt<T> {
    fn optional(self) -> Result<Option<T>>;
}

impl<T> OptionalExt<T> for std::result::Result<T, rusqlite::Error> {
    fn optional(self) -> Result<Option<T>> {
        match self {
            Ok(val) => Ok(Some(val)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}
