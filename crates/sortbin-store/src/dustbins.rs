use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sortbin_core::DustbinId;

use crate::database::Database;
use crate::error::StoreError;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DustbinRow {
    pub id: DustbinId,
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    pub full: bool,
    pub created_at: String,
}

fn row_to_dustbin(row: &rusqlite::Row) -> rusqlite::Result<DustbinRow> {
    Ok(DustbinRow {
        id: DustbinId::new(row.get(0)?),
        name: row.get(1)?,
        latitude: row.get(2)?,
        longitude: row.get(3)?,
        full: row.get(4)?,
        created_at: row.get(5)?,
    })
}

pub struct DustbinRepo {
    db: Database,
}

impl DustbinRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    #[instrument(skip(self))]
    pub fn create(&self, name: &str, latitude: f64, longitude: f64) -> Result<DustbinRow, StoreError> {
        self.db.with_conn(|conn| {
            let now = Utc::now().to_rfc3339();
            conn.execute(
                "INSERT INTO dustbins (name, latitude, longitude, full, created_at)
                 VALUES (?1, ?2, ?3, 0, ?4)",
                rusqlite::params![name, latitude, longitude, now],
            )?;
            Ok(DustbinRow {
                id: DustbinId::new(conn.last_insert_rowid()),
                name: name.to_string(),
                latitude,
                longitude,
                full: false,
                created_at: now,
            })
        })
    }

    #[instrument(skip(self), fields(dustbin_id = %id))]
    pub fn get(&self, id: DustbinId) -> Result<DustbinRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                "SELECT id, name, latitude, longitude, full, created_at
                 FROM dustbins WHERE id = ?1",
                [id.as_i64()],
                row_to_dustbin,
            )
            .map_err(|_| StoreError::NotFound(format!("dustbin {id}")))
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<DustbinRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT id, name, latitude, longitude, full, created_at
                 FROM dustbins ORDER BY id",
            )?;
            let rows = stmt
                .query_map([], row_to_dustbin)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flag a dustbin as full (or no longer full).
    #[instrument(skip(self), fields(dustbin_id = %id))]
    pub fn set_full(&self, id: DustbinId, full: bool) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE dustbins SET full = ?1 WHERE id = ?2",
                rusqlite::params![full, id.as_i64()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("dustbin {id}")));
            }
            Ok(())
        })
    }
}
