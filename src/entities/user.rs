// 👤 User Entity - owns accounts and beneficiaries
//
// Deleting a user cascades to its accounts (and their transactions)
// and to its beneficiaries.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub(crate) const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    email TEXT NOT NULL UNIQUE,
    password TEXT NOT NULL,
    name TEXT NOT NULL,
    has_2fa INTEGER NOT NULL DEFAULT 0,
    totp_code TEXT CHECK (totp_code IS NULL OR length(totp_code) <= 6),
    created_at TEXT NOT NULL
)";

const SELECT_COLUMNS: &str = "id, email, password, name, has_2fa, totp_code, created_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    /// None until persisted
    pub id: Option<i64>,

    pub email: String,

    /// Plaintext: these are fixture credentials for a test bank
    pub password: String,

    pub name: String,

    pub has_2fa: bool,

    /// Fixed one-time code accepted by the test backend
    pub totp_code: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(email: impl Into<String>, password: impl Into<String>, name: impl Into<String>) -> Self {
        User {
            id: None,
            email: email.into(),
            password: password.into(),
            name: name.into(),
            has_2fa: false,
            totp_code: None,
            created_at: Utc::now(),
        }
    }

    /// Enable two-factor authentication with a fixed code
    pub fn with_2fa(mut self, totp_code: impl Into<String>) -> Self {
        self.has_2fa = true;
        self.totp_code = Some(totp_code.into());
        self
    }

    pub fn is_persisted(&self) -> bool {
        self.id.is_some()
    }

    /// Plain mapping, same keys as the JSON fixtures
    pub fn to_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert("id".to_string(), json!(self.id));
        map.insert("email".to_string(), json!(self.email));
        map.insert("password".to_string(), json!(self.password));
        map.insert("name".to_string(), json!(self.name));
        map.insert("has_2fa".to_string(), json!(self.has_2fa));
        map.insert("totp_code".to_string(), json!(self.totp_code));
        map
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: Some(row.get(0)?),
            email: row.get(1)?,
            password: row.get(2)?,
            name: row.get(3)?,
            has_2fa: row.get(4)?,
            totp_code: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}

/// Insert and assign the generated id
pub(crate) fn insert(conn: &Connection, user: &mut User) -> rusqlite::Result<i64> {
    conn.execute(
        "INSERT INTO users (email, password, name, has_2fa, totp_code, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            user.email,
            user.password,
            user.name,
            user.has_2fa,
            user.totp_code,
            user.created_at,
        ],
    )?;

    let id = conn.last_insert_rowid();
    user.id = Some(id);
    Ok(id)
}

pub(crate) fn find_by_email(conn: &Connection, email: &str) -> rusqlite::Result<Option<User>> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE email = ?1", SELECT_COLUMNS),
        [email],
        User::from_row,
    )
    .optional()
}

pub(crate) fn all(conn: &Connection) -> rusqlite::Result<Vec<User>> {
    let mut stmt = conn.prepare(&format!("SELECT {} FROM users ORDER BY id", SELECT_COLUMNS))?;
    let users = stmt
        .query_map([], User::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(users)
}

pub(crate) fn delete(conn: &Connection, id: i64) -> rusqlite::Result<usize> {
    conn.execute("DELETE FROM users WHERE id = ?1", [id])
}
