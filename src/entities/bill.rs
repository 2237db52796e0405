// 🧾 Bill Entity - standalone, not owned by any user

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS bills (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    provider TEXT NOT NULL,
    reference TEXT NOT NULL UNIQUE,
    amount REAL NOT NULL,
    due_date TEXT,
    paid INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
)";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    pub id: Option<i64>,

    /// "EDF", "Orange", ...
    pub provider: String,

    /// Unique, e.g. "EDF-2025-001234"
    pub reference: String,

    pub amount: f64,

    pub due_date: Option<DateTime<Utc>>,

    pub paid: bool,

    pub created_at: DateTime<Utc>,
}

impl Bill {
    pub fn new(provider: impl Into<String>, reference: impl Into<String>, amount: f64) -> Self {
        Bill {
            id: None,
            provider: provider.into(),
            reference: reference.into(),
            amount,
            due_date: None,
            paid: false,
            created_at: Utc::now(),
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(self.id));
        map.insert("provider".to_string(), json!(self.provider));
        map.insert("reference".to_string(), json!(self.reference));
        map.insert("amount".to_string(), json!(self.amount));
        map.insert(
            "due_date".to_string(),
            json!(self.due_date.map(|d| d.to_rfc3339())),
        );
        map.insert("paid".to_string(), json!(self.paid));
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Bill {
            id: Some(row.get(0)?),
            provider: row.get(1)?,
            reference: row.get(2)?,
            amount: row.get(3)?,
            due_date: row.get(4)?,
            paid: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

pub(crate) fn insert(conn: &Connection, bill: &mut Bill) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO bills (provider, reference, amount, due_date, paid, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            bill.provider,
            bill.reference,
            bill.amount,
            bill.due_date,
            bill.paid,
            bill.created_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    bill.id = Some(id);
    Ok(id)
}

pub(crate) fn all(conn: &Connection) -> rusqlite::Result<Vec<Bill>> {
    let mut stmt = conn.prepare(
        "SELECT id, provider, reference, amount, due_date, paid, created_at FROM bills ORDER BY id",
    )?;
    let bills = stmt
        .query_map([], Bill::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(bills)
}
