//! SQLite storage for DigitalBank test data
//!
//! One database file per [`Environment`], one [`DatabaseManager`] per
//! environment per registry. The connection is opened lazily on first use
//! and every read or write goes through [`DatabaseManager::scoped_session`].

use crate::config::{DataSettings, Environment};
use crate::entities::{
    account, beneficiary, bill, transaction, user, Account, Beneficiary, Bill, Table, Transaction,
    User,
};
use crate::error::{Error, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use rusqlite::Connection;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

// ============================================================================
// DATABASE MANAGER
// ============================================================================

/// Connection lifecycle: constructed inactive, activated on first use,
/// closed only by [`DatabaseRegistry::close_all`]
enum Lifecycle {
    Inactive,
    Active(Connection),
    Closed,
}

pub struct DatabaseManager {
    environment: Environment,
    db_path: PathBuf,
    state: Mutex<Lifecycle>,
}

impl std::fmt::Debug for DatabaseManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseManager")
            .field("environment", &self.environment)
            .field("db_path", &self.db_path)
            .field("active", &self.is_active())
            .finish()
    }
}

impl DatabaseManager {
    fn new(environment: Environment, db_dir: &Path) -> Self {
        DatabaseManager {
            environment,
            db_path: db_dir.join(environment.db_file_name()),
            state: Mutex::new(Lifecycle::Inactive),
        }
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn is_active(&self) -> bool {
        matches!(*self.state.lock(), Lifecycle::Active(_))
    }

    pub fn is_closed(&self) -> bool {
        matches!(*self.state.lock(), Lifecycle::Closed)
    }

    fn open(&self) -> Result<Connection> {
        if let Some(dir) = self.db_path.parent() {
            std::fs::create_dir_all(dir)?;
        }

        let conn = Connection::open(&self.db_path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;

        info!(
            environment = %self.environment,
            "Opened test database at {:?}",
            self.db_path
        );
        Ok(conn)
    }

    /// Run `f` against the connection, activating it if needed
    fn with_connection<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut state = self.state.lock();

        if matches!(*state, Lifecycle::Inactive) {
            *state = Lifecycle::Active(self.open()?);
        }

        match &mut *state {
            Lifecycle::Active(conn) => f(conn),
            _ => Err(Error::SessionClosed(self.environment.to_string())),
        }
    }

    /// Create all five tables; no-op for tables that already exist
    pub fn create_tables(&self) -> Result<()> {
        self.with_connection(|conn| {
            for table in Table::ALL {
                conn.execute(table.create_sql(), [])?;
            }
            debug!(environment = %self.environment, "Tables created");
            Ok(())
        })
    }

    /// Drop all five tables, dependents first; no-op for missing tables
    pub fn drop_tables(&self) -> Result<()> {
        self.with_connection(|conn| {
            for table in Table::ALL.iter().rev() {
                conn.execute(&format!("DROP TABLE IF EXISTS {}", table.name()), [])?;
            }
            debug!(environment = %self.environment, "Tables dropped");
            Ok(())
        })
    }

    /// Drop then create
    pub fn reset_database(&self) -> Result<()> {
        self.drop_tables()?;
        self.create_tables()
    }

    pub fn table_exists(&self, table: Table) -> Result<bool> {
        self.with_connection(|conn| Ok(table_exists(conn, table)?))
    }

    /// Run `f` inside one transaction.
    ///
    /// `Ok` commits, `Err` rolls back and is returned unchanged. A panic
    /// inside `f` rolls back when the transaction is dropped. The lock on
    /// the connection is released on every path; it is not re-entrant, so
    /// `f` must not call back into this manager.
    pub fn scoped_session<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Session<'_>) -> Result<T>,
    {
        self.with_connection(|conn| {
            let session = Session {
                tx: conn.transaction()?,
            };

            match f(&session) {
                Ok(value) => {
                    session.tx.commit()?;
                    Ok(value)
                }
                Err(e) => {
                    if let Err(rollback_err) = session.tx.rollback() {
                        warn!("Rollback failed after {}: {}", e, rollback_err);
                    }
                    debug!(environment = %self.environment, "Session rolled back: {}", e);
                    Err(e)
                }
            }
        })
    }

    fn close(&self) {
        let previous = std::mem::replace(&mut *self.state.lock(), Lifecycle::Closed);

        if let Lifecycle::Active(conn) = previous {
            if let Err((_, e)) = conn.close() {
                warn!(environment = %self.environment, "Error closing database: {}", e);
            }
        }
    }
}

fn table_exists(conn: &Connection, table: Table) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
        [table.name()],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

// ============================================================================
// SESSION
// ============================================================================

/// Transactional handle, valid only inside [`DatabaseManager::scoped_session`]
pub struct Session<'conn> {
    tx: rusqlite::Transaction<'conn>,
}

impl Session<'_> {
    /// Raw access for queries the session does not wrap
    pub fn connection(&self) -> &Connection {
        &self.tx
    }

    /// Insert and assign `user.id` (visible to later statements in this session)
    pub fn add_user(&self, user: &mut User) -> Result<i64> {
        Ok(user::insert(&self.tx, user)?)
    }

    pub fn add_account(&self, account: &mut Account) -> Result<i64> {
        Ok(account::insert(&self.tx, account)?)
    }

    pub fn add_transaction(&self, tx: &mut Transaction) -> Result<i64> {
        Ok(transaction::insert(&self.tx, tx)?)
    }

    pub fn add_beneficiary(&self, beneficiary: &mut Beneficiary) -> Result<i64> {
        Ok(beneficiary::insert(&self.tx, beneficiary)?)
    }

    pub fn add_bill(&self, bill: &mut Bill) -> Result<i64> {
        Ok(bill::insert(&self.tx, bill)?)
    }

    pub fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        Ok(user::find_by_email(&self.tx, email)?)
    }

    pub fn all_users(&self) -> Result<Vec<User>> {
        Ok(user::all(&self.tx)?)
    }

    pub fn accounts_for_user(&self, user_id: i64) -> Result<Vec<Account>> {
        Ok(account::for_user(&self.tx, user_id)?)
    }

    pub fn all_accounts(&self) -> Result<Vec<Account>> {
        Ok(account::all(&self.tx)?)
    }

    pub fn beneficiaries_for_user(&self, user_id: i64) -> Result<Vec<Beneficiary>> {
        Ok(beneficiary::for_user(&self.tx, user_id)?)
    }

    pub fn transactions_for_account(&self, account_id: i64) -> Result<Vec<Transaction>> {
        Ok(transaction::for_account(&self.tx, account_id)?)
    }

    pub fn all_bills(&self) -> Result<Vec<Bill>> {
        Ok(bill::all(&self.tx)?)
    }

    /// Delete a user with its accounts, transactions and beneficiaries
    pub fn delete_user(&self, user_id: i64) -> Result<bool> {
        Ok(user::delete(&self.tx, user_id)? > 0)
    }

    /// Row count; a table that does not exist counts as empty
    pub fn count(&self, table: Table) -> Result<i64> {
        if !table_exists(&self.tx, table)? {
            return Ok(0);
        }

        let count = self.tx.query_row(
            &format!("SELECT COUNT(*) FROM {}", table.name()),
            [],
            |row| row.get(0),
        )?;
        Ok(count)
    }
}

// ============================================================================
// REGISTRY
// ============================================================================

static GLOBAL_REGISTRY: Lazy<Mutex<DatabaseRegistry>> =
    Lazy::new(|| Mutex::new(DatabaseRegistry::new(DataSettings::from_env().db_dir)));

/// Environment → manager map. The first `get_or_create` for an environment wins.
pub struct DatabaseRegistry {
    db_dir: PathBuf,
    managers: HashMap<Environment, Arc<DatabaseManager>>,
}

impl DatabaseRegistry {
    pub fn new(db_dir: impl Into<PathBuf>) -> Self {
        DatabaseRegistry {
            db_dir: db_dir.into(),
            managers: HashMap::new(),
        }
    }

    /// Process-wide registry used by the CLI and the test-run hooks
    pub fn global() -> &'static Mutex<DatabaseRegistry> {
        &GLOBAL_REGISTRY
    }

    pub fn db_dir(&self) -> &Path {
        &self.db_dir
    }

    /// Only affects managers created after the call
    pub fn set_db_dir(&mut self, db_dir: impl Into<PathBuf>) {
        self.db_dir = db_dir.into();
    }

    pub fn get_or_create(&mut self, environment: Environment) -> Arc<DatabaseManager> {
        let db_dir = &self.db_dir;
        self.managers
            .entry(environment)
            .or_insert_with(|| {
                debug!(%environment, "Registering database manager");
                Arc::new(DatabaseManager::new(environment, db_dir))
            })
            .clone()
    }

    pub fn get(&self, environment: Environment) -> Option<Arc<DatabaseManager>> {
        self.managers.get(&environment).cloned()
    }

    pub fn len(&self) -> usize {
        self.managers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.managers.is_empty()
    }

    /// Close every connection and forget every manager.
    /// Managers still held elsewhere refuse new sessions afterwards.
    pub fn close_all(&mut self) -> usize {
        let closed = self.managers.len();
        for (_, manager) in self.managers.drain() {
            manager.close();
        }
        info!("Closed {} test database(s)", closed);
        closed
    }

    /// Forget every manager without closing connections still held by callers
    pub fn reset_registry(&mut self) {
        self.managers.clear();
    }
}

/// Manager for `environment` from the process-wide registry
pub fn get_db(environment: &str) -> Result<Arc<DatabaseManager>> {
    let environment: Environment = environment.parse()?;
    Ok(DatabaseRegistry::global().lock().get_or_create(environment))
}

/// Close every database in the process-wide registry
pub fn close_all() -> usize {
    DatabaseRegistry::global().lock().close_all()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::TransactionType;

    fn registry() -> (tempfile::TempDir, DatabaseRegistry) {
        let dir = tempfile::tempdir().unwrap();
        let registry = DatabaseRegistry::new(dir.path().join("db"));
        (dir, registry)
    }

    fn insert_owner(db: &DatabaseManager) -> i64 {
        db.scoped_session(|s| {
            let mut user = User::new("owner@digitalbank.fr", "Test1234!", "Owner");
            s.add_user(&mut user)
        })
        .unwrap()
    }

    #[test]
    fn test_registry_returns_same_manager() {
        let (_dir, mut registry) = registry();

        let first = registry.get_or_create(Environment::Dev);
        let second = registry.get_or_create(Environment::Dev);
        let other = registry.get_or_create(Environment::Uat);

        assert!(Arc::ptr_eq(&first, &second));
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_first_call_wins_on_db_dir() {
        let (dir, mut registry) = registry();
        let first = registry.get_or_create(Environment::Int);

        registry.set_db_dir(dir.path().join("elsewhere"));
        let again = registry.get_or_create(Environment::Int);

        assert!(Arc::ptr_eq(&first, &again));
        assert_eq!(again.db_path(), dir.path().join("db").join("test_data_int.db"));
    }

    #[test]
    fn test_lazy_activation() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);

        assert!(!db.is_active());
        assert!(!db.db_path().exists());

        db.create_tables().unwrap();

        assert!(db.is_active());
        assert!(db.db_path().exists());
    }

    #[test]
    fn test_schema_operations_are_idempotent() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);

        db.create_tables().unwrap();
        db.create_tables().unwrap();
        for table in Table::ALL {
            assert!(db.table_exists(table).unwrap());
        }

        db.drop_tables().unwrap();
        db.drop_tables().unwrap();
        for table in Table::ALL {
            assert!(!db.table_exists(table).unwrap());
        }

        db.reset_database().unwrap();
        assert!(db.table_exists(Table::Users).unwrap());
    }

    #[test]
    fn test_session_commits_on_success() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();

        let user_id = insert_owner(&db);
        assert!(user_id > 0);

        let found = db
            .scoped_session(|s| s.find_user_by_email("owner@digitalbank.fr"))
            .unwrap()
            .unwrap();
        assert_eq!(found.id, Some(user_id));
        assert_eq!(found.name, "Owner");
    }

    #[test]
    fn test_session_rolls_back_on_error() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();

        let result: Result<()> = db.scoped_session(|s| {
            s.add_user(&mut User::new("a@digitalbank.fr", "Test1234!", "A"))?;
            s.add_user(&mut User::new("a@digitalbank.fr", "Test1234!", "A again"))?;
            Ok(())
        });

        let err = result.unwrap_err();
        assert!(err.is_constraint_violation());

        let count = db.scoped_session(|s| s.count(Table::Users)).unwrap();
        assert_eq!(count, 0, "first insert must be rolled back too");
    }

    #[test]
    fn test_session_rolls_back_on_panic() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();

        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _: Result<()> = db.scoped_session(|s| {
                s.add_user(&mut User::new("p@digitalbank.fr", "Test1234!", "P"))?;
                panic!("boom");
            });
        }));
        assert!(outcome.is_err());

        // Lock released and nothing committed
        let count = db.scoped_session(|s| s.count(Table::Users)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_foreign_keys_enforced() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();

        let result = db.scoped_session(|s| {
            s.add_account(&mut Account::new(Some(999), "Livret A", "FR76 9"))
        });
        assert!(result.unwrap_err().is_constraint_violation());

        let result = db.scoped_session(|s| {
            s.add_beneficiary(&mut Beneficiary::new(None, "Nobody", "FR76 0"))
        });
        assert!(result.unwrap_err().is_constraint_violation());
    }

    #[test]
    fn test_transaction_constraints() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();
        let user_id = insert_owner(&db);

        let result = db.scoped_session(|s| {
            let mut account = Account::new(Some(user_id), "Compte Courant", "FR76 1");
            let account_id = s.add_account(&mut account)?;
            s.add_transaction(&mut Transaction::new(
                Some(account_id),
                TransactionType::Debit,
                -5.0,
            ))
        });

        assert!(result.unwrap_err().is_constraint_violation());
    }

    #[test]
    fn test_delete_user_cascades() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();
        let user_id = insert_owner(&db);

        db.scoped_session(|s| {
            let mut account = Account::new(Some(user_id), "Compte Courant", "FR76 1");
            let account_id = s.add_account(&mut account)?;
            s.add_transaction(&mut Transaction::new(
                Some(account_id),
                TransactionType::Credit,
                100.0,
            ))?;
            s.add_beneficiary(&mut Beneficiary::new(Some(user_id), "Marc Bernard", "FR76 7"))?;
            s.add_bill(&mut Bill::new("EDF", "EDF-1", 10.0))?;
            Ok(())
        })
        .unwrap();

        let deleted = db.scoped_session(|s| s.delete_user(user_id)).unwrap();
        assert!(deleted);

        db.scoped_session(|s| {
            assert_eq!(s.count(Table::Users)?, 0);
            assert_eq!(s.count(Table::Accounts)?, 0);
            assert_eq!(s.count(Table::Transactions)?, 0);
            assert_eq!(s.count(Table::Beneficiaries)?, 0);
            assert_eq!(s.count(Table::Bills)?, 1, "bills are not user-owned");
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_rows_round_trip_through_storage() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Dev);
        db.create_tables().unwrap();
        let user_id = insert_owner(&db);

        let mut original = Transaction::new(None, TransactionType::Credit, 1250.0);
        original.description = Some("Salaire".to_string());
        original.reference = Some("TRX-0000ABCD".to_string());

        let stored = db
            .scoped_session(|s| {
                let account_id =
                    s.add_account(&mut Account::new(Some(user_id), "Compte Courant", "FR76 1"))?;
                original.account_id = Some(account_id);
                s.add_transaction(&mut original)?;
                s.transactions_for_account(account_id)
            })
            .unwrap();

        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].transaction_type, TransactionType::Credit);
        assert_eq!(stored[0].description.as_deref(), Some("Salaire"));
        assert_eq!(stored[0].date.timestamp(), original.date.timestamp());
    }

    #[test]
    fn test_count_missing_table_is_zero() {
        let (_dir, mut registry) = registry();
        let db = registry.get_or_create(Environment::Preprod);

        let count = db.scoped_session(|s| s.count(Table::Bills)).unwrap();
        assert_eq!(count, 0);
    }

    #[test]
    fn test_close_all() {
        let (_dir, mut registry) = registry();
        let dev = registry.get_or_create(Environment::Dev);
        let uat = registry.get_or_create(Environment::Uat);
        dev.create_tables().unwrap();

        assert_eq!(registry.close_all(), 2);
        assert!(registry.is_empty());
        assert!(dev.is_closed());
        assert!(uat.is_closed());

        let err = dev.scoped_session(|s| s.count(Table::Users)).unwrap_err();
        assert!(matches!(err, Error::SessionClosed(_)));

        // Re-initializing yields a fresh, usable manager
        let fresh = registry.get_or_create(Environment::Dev);
        assert!(!Arc::ptr_eq(&dev, &fresh));
        fresh.create_tables().unwrap();
    }

    #[test]
    fn test_reset_registry_keeps_connections_open() {
        let (_dir, mut registry) = registry();
        let dev = registry.get_or_create(Environment::Dev);
        dev.create_tables().unwrap();

        registry.reset_registry();

        assert!(registry.get(Environment::Dev).is_none());
        assert!(dev.is_active());
    }

    #[test]
    fn test_get_db_rejects_unknown_environment() {
        let err = get_db("staging").unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(_)));
    }
}
