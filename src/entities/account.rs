// 💳 Account Entity - belongs to exactly one User
//
// `number` is an IBAN-formatted string, unique across the table.
// `account_type` is a free-form label ("Compte Courant", "Livret A", ...).

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
    type TEXT NOT NULL,
    number TEXT NOT NULL UNIQUE,
    balance REAL NOT NULL DEFAULT 0.0,
    created_at TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "id, user_id, type, number, balance, created_at";

// ============================================================================
// ACCOUNT ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub id: Option<i64>,

    /// Owner (foreign key to users.id); None only while the owner is unknown
    pub user_id: Option<i64>,

    #[serde(rename = "type")]
    pub account_type: String,

    /// IBAN, e.g. "FR76 0000 1111 2222 3333 4444 555"
    pub number: String,

    pub balance: f64,

    pub created_at: DateTime<Utc>,
}

impl Account {
    pub fn new(user_id: Option<i64>, account_type: impl Into<String>, number: impl Into<String>) -> Self {
        Account {
            id: None,
            user_id,
            account_type: account_type.into(),
            number: number.into(),
            balance: 0.0,
            created_at: Utc::now(),
        }
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = balance;
        self
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(self.id));
        map.insert("user_id".to_string(), json!(self.user_id));
        map.insert("type".to_string(), json!(self.account_type));
        map.insert("number".to_string(), json!(self.number));
        map.insert("balance".to_string(), json!(self.balance));
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Account {
            id: Some(row.get(0)?),
            user_id: Some(row.get(1)?),
            account_type: row.get(2)?,
            number: row.get(3)?,
            balance: row.get(4)?,
            created_at: row.get(5)?,
        })
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

/// Insert and assign the generated id.
/// A missing or unknown `user_id` is rejected by the NOT NULL / FOREIGN KEY constraints.
pub(crate) fn insert(conn: &Connection, account: &mut Account) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO accounts (user_id, type, number, balance, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            account.user_id,
            account.account_type,
            account.number,
            account.balance,
            account.created_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    account.id = Some(id);
    Ok(id)
}

pub(crate) fn for_user(conn: &Connection, user_id: i64) -> rusqlite::Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM accounts WHERE user_id = ?1 ORDER BY id",
        SELECT_COLUMNS
    ))?;
    let accounts = stmt
        .query_map([user_id], Account::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}

pub(crate) fn all(conn: &Connection) -> rusqlite::Result<Vec<Account>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM accounts ORDER BY id", SELECT_COLUMNS))?;
    let accounts = stmt
        .query_map([], Account::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(accounts)
}
