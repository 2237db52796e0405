// Beneficiary Entity - transfer recipient registered by a User

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS beneficiaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    name TEXT NOT NULL,
    iban TEXT NOT NULL,
    created_at TEXT NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Beneficiary {
    pub id: Option<i64>,
    pub user_id: Option<i64>,
    pub name: String,
    /// Formatted like an IBAN, never checksum-validated
    pub iban: String,
    pub created_at: DateTime<Utc>,
}

impl Beneficiary {
    pub fn new(user_id: Option<i64>, name: impl Into<String>, iban: impl Into<String>) -> Self {
        Beneficiary {
            id: None,
            user_id,
            name: name.into(),
            iban: iban.into(),
            created_at: Utc::now(),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(self.id));
        map.insert("user_id".to_string(), json!(self.user_id));
        map.insert("name".to_string(), json!(self.name));
        map.insert("iban".to_string(), json!(self.iban));
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Beneficiary {
            id: Some(row.get(0)?),
            user_id: Some(row.get(1)?),
            name: row.get(2)?,
            iban: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

pub(crate) fn insert(conn: &Connection, beneficiary: &mut Beneficiary) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO beneficiaries (user_id, name, iban, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            beneficiary.user_id,
            beneficiary.name,
            beneficiary.iban,
            beneficiary.created_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    beneficiary.id = Some(id);
    Ok(id)
}

pub(crate) fn for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Beneficiary>> {
    let mut stmt = conn.prepare(
        "SELECT id, user_id, name, iban, created_at FROM beneficiaries WHERE user_id = ?1 ORDER BY id",
    )?;
    let beneficiaries = stmt
        .query_map([user_id], Beneficiary::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(beneficiaries)
}
