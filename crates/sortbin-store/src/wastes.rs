use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use sortbin_core::{DustbinId, UserId, WasteId};

use crate::database::Database;
use crate::error::StoreError;

/// Categories a waste entry can be sorted into.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WasteCategory {
    Recyclable,
    Hazardous,
    Kitchen,
    Other,
}

impl WasteCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Recyclable => "recyclable",
            Self::Hazardous => "hazardous",
            Self::Kitchen => "kitchen",
            Self::Other => "other",
        }
    }

    fn from_db(raw: &str) -> Result<Self, StoreError> {
        match raw {
            "recyclable" => Ok(Self::Recyclable),
            "hazardous" => Ok(Self::Hazardous),
            "kitchen" => Ok(Self::Kitchen),
            "other" => Ok(Self::Other),
            unknown => Err(StoreError::Serialization(format!(
                "unknown waste category: {unknown}"
            ))),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WasteRow {
    pub id: WasteId,
    pub user_id: UserId,
    pub dustbin_id: DustbinId,
    pub category: WasteCategory,
    pub weight: f64,
    pub time: String,
    pub correctly_categorized: bool,
}

fn row_to_waste(row: &rusqlite::Row) -> rusqlite::Result<WasteRow> {
    let raw_category: String = row.get(3)?;
    let category = WasteCategory::from_db(&raw_category).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
    })?;
    Ok(WasteRow {
        id: WasteId::new(row.get(0)?),
        user_id: UserId::new(row.get(1)?),
        dustbin_id: DustbinId::new(row.get(2)?),
        category,
        weight: row.get(4)?,
        time: row.get(5)?,
        correctly_categorized: row.get(6)?,
    })
}

const SELECT_COLUMNS: &str =
    "SELECT id, user_id, dustbin_id, category, weight, time, correctly_categorized FROM wastes";

pub struct WasteRepo {
    db: Database,
}

impl WasteRepo {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Record a waste submission. `time` defaults to now when not given.
    #[instrument(skip(self), fields(user_id = %user_id, dustbin_id = %dustbin_id))]
    pub fn add(
        &self,
        user_id: UserId,
        dustbin_id: DustbinId,
        category: WasteCategory,
        weight: f64,
        time: Option<String>,
    ) -> Result<WasteRow, StoreError> {
        let time = time.unwrap_or_else(|| Utc::now().to_rfc3339());
        self.db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO wastes (user_id, dustbin_id, category, weight, time, correctly_categorized)
                 VALUES (?1, ?2, ?3, ?4, ?5, 1)",
                rusqlite::params![
                    user_id.as_i64(),
                    dustbin_id.as_i64(),
                    category.as_str(),
                    weight,
                    time
                ],
            )?;
            Ok(WasteRow {
                id: WasteId::new(conn.last_insert_rowid()),
                user_id,
                dustbin_id,
                category,
                weight,
                time: time.clone(),
                correctly_categorized: true,
            })
        })
    }

    #[instrument(skip(self), fields(waste_id = %id))]
    pub fn get(&self, id: WasteId) -> Result<WasteRow, StoreError> {
        self.db.with_conn(|conn| {
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                [id.as_i64()],
                row_to_waste,
            )
            .map_err(|_| StoreError::NotFound(format!("waste {id}")))
        })
    }

    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<WasteRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
            let rows = stmt
                .query_map([], row_to_waste)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// The most recently submitted wastes in a dustbin, newest first.
    #[instrument(skip(self), fields(dustbin_id = %dustbin_id))]
    pub fn recent_by_dustbin(
        &self,
        dustbin_id: DustbinId,
        limit: u32,
    ) -> Result<Vec<WasteRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE dustbin_id = ?1 ORDER BY id DESC LIMIT ?2"
            ))?;
            let rows = stmt
                .query_map(rusqlite::params![dustbin_id.as_i64(), limit], row_to_waste)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    #[instrument(skip(self), fields(user_id = %user_id))]
    pub fn list_by_user(&self, user_id: UserId) -> Result<Vec<WasteRow>, StoreError> {
        self.db.with_conn(|conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY time DESC"
            ))?;
            let rows = stmt
                .query_map([user_id.as_i64()], row_to_waste)?
                .collect::<Result<Vec<_>, _>>()?;
            Ok(rows)
        })
    }

    /// Flag a waste entry as incorrectly categorized.
    #[instrument(skip(self), fields(waste_id = %id))]
    pub fn mark_incorrectly_categorized(&self, id: WasteId) -> Result<(), StoreError> {
        self.db.with_conn(|conn| {
            let updated = conn.execute(
                "UPDATE wastes SET correctly_categorized = 0 WHERE id = ?1",
                [id.as_i64()],
            )?;
            if updated == 0 {
                return Err(StoreError::NotFound(format!("waste {id}")));
            }
            Ok(())
        })
    }
}
