use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sortbin_core::UserId;

use crate::database::Database;
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub name: String,
    pub created_at: String,
}

fn row_to_user(row: &rusqlite::Row) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: UserId::new(row.get(0)?),
        username: row.get(1)?,
        name: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub struct UserRepo {
    db: Database,
}

impl UserRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Create a user. Usernames are unique.
    #[instrument(skip(self))]
    pub fn create(&self, username: &str, name: &str) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            let inserted = conn.execute(
                "INSERT INTO users (username, name, created_at) VALUES (?1, ?2, ?3)",
                rusqlite::params![username, name, now],
            );
            match inserted {
                Ok(_) => Ok(UserRow {
                    id: UserId::new(conn.last_insert_rowid()),
                    username: username.to_string(),
                    name: name.to_string(),
                    created_at: now,
                }),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Err(StoreError::Conflict(format!(
                        "username {username} already exists"
                    )))
                }
                Err(e) => Err(e.into()),
            }
        })
    }

    #[instrument(skip(self), fields(user_id = %id))]
    pub fn get(&self, id: UserId) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, name, created_at FROM users WHERE id = ?1",
                [id.as_i64()],
                row_to_user,
            )
            .map_err(|_| StoreError::NotFound(format!("user {id}")))
        })
    }

    #[instrument(skip(self))]
    pub fn get_by_username(&self, username: &str) -> Result<UserRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, username, name, created_at FROM users WHERE username = ?1",
                [username],
                row_to_user,
            )
            .map_err(|_| StoreError::NotFound(format!("user {username}")))
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<UserRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, username, name, created_at FROM users ORDER BY id")?;
            let rows = stmt
                .query_map([], row_to_user)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }
}
