// 💸 Transaction Entity - a credit or debit on one Account

use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;
use std::str::FromStr;

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS transactions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    account_id INTEGER NOT NULL REFERENCES accounts(id) ON DELETE CASCADE,
    type TEXT NOT NULL CHECK (type IN ('credit', 'debit')),
    amount REAL NOT NULL CHECK (amount > 0),
    description TEXT,
    date TEXT NOT NULL,
    reference TEXT
)";

const SELECT_COLUMNS: &str = "id, account_id, type, amount, description, date, reference";

// ============================================================================
// TRANSACTION TYPE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    Credit,
    Debit,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Credit => "credit",
            TransactionType::Debit => "debit",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credit" => Ok(TransactionType::Credit),
            "debit" => Ok(TransactionType::Debit),
            other => Err(format!("unknown transaction type: {}", other)),
        }
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

// ============================================================================
// TRANSACTION ENTITY
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Option<i64>,

    pub account_id: Option<i64>,

    #[serde(rename = "type")]
    pub transaction_type: TransactionType,

    /// Always positive; the direction is carried by `transaction_type`
    pub amount: f64,

    pub description: Option<String>,

    pub date: DateTime<Utc>,

    /// e.g. "TRX-1A2B3C4D"
    pub reference: Option<String>,
}

impl Transaction {
    pub fn new(account_id: Option<i64>, transaction_type: TransactionType, amount: f64) -> Self {
        Transaction {
            id: None,
            account_id,
            transaction_type,
            amount,
            description: None,
            date: Utc::now(),
            reference: None,
        }
    }

    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(self.id));
        map.insert("account_id".to_string(), json!(self.account_id));
        map.insert("type".to_string(), json!(self.transaction_type.as_str()));
        map.insert("amount".to_string(), json!(self.amount));
        map.insert("description".to_string(), json!(self.description));
        map.insert("date".to_string(), json!(self.date.to_rfc3339()));
        map.insert("reference".to_string(), json!(self.reference));
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Transaction {
            id: Some(row.get(0)?),
            account_id: Some(row.get(1)?),
            transaction_type: row.get(2)?,
            amount: row.get(3)?,
            description: row.get(4)?,
            date: row.get(5)?,
            reference: row.get(6)?,
        })
    }
}

// ============================================================================
// PERSISTENCE
// ============================================================================

pub(crate) fn insert(conn: &Connection, tx: &mut Transaction) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO transactions (account_id, type, amount, description, date, reference)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            tx.account_id,
            tx.transaction_type,
            tx.amount,
            tx.description,
            tx.date,
            tx.reference,
        ],
    )?;

    let id = conn.last_insert_rowid();
    tx.id = Some(id);
    Ok(id)
}

pub(crate) fn for_account(conn: &Connection, account_id: i64) -> rusqlite::Result<Vec<Transaction>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM transactions WHERE account_id = ?1 ORDER BY date DESC, id DESC",
        SELECT_COLUMNS
    ))?;
    let transactions = stmt
        .query_map([account_id], Transaction::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(transactions)
}
