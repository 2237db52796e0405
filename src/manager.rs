// 🗂️ Test Data Manager - static fixtures + factories + database
//
// Seeding contract:
// - seed_standard_data() inserts the canonical fixtures in ONE session.
//   Seeding twice without reset fails on the UNIQUE constraints and leaves
//   the first seed untouched.
// - reset() = drop + create + seed, and yields the same canonical rows
//   every time.

use crate::config::Environment;
use crate::db::{DatabaseManager, DatabaseRegistry};
use crate::entities::{Account, Beneficiary, Bill, Table, Transaction, User};
use crate::error::Result;
use crate::factories::{
    AccountFactory, AccountOverrides, BeneficiaryFactory, BeneficiaryOverrides, BillFactory,
    BillOverrides, Factory, TransactionFactory, TransactionOverrides, UserFactory, UserOverrides,
};
use crate::static_data::{
    AccountFixture, BeneficiaryFixture, BillFixture, InvalidCredentials, PasswordRequirements,
    StaticData, StaticDataCache, UserFixture, STANDARD_USER_KEY,
};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Accounts created per random user
const RANDOM_ACCOUNTS_PER_USER: usize = 2;
/// Transactions created per account (first `count` accounts only)
const RANDOM_TRANSACTIONS_PER_ACCOUNT: usize = 5;
/// Beneficiaries created per user (first `count / 2` users only)
const RANDOM_BENEFICIARIES_PER_USER: usize = 3;

/// Row counts per table
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub accounts: usize,
    pub transactions: usize,
    pub beneficiaries: usize,
    pub bills: usize,
}

impl SeedSummary {
    pub fn total(&self) -> usize {
        self.users + self.accounts + self.transactions + self.beneficiaries + self.bills
    }

    fn set(&mut self, table: Table, count: usize) {
        match table {
            Table::Users => self.users = count,
            Table::Accounts => self.accounts = count,
            Table::Transactions => self.transactions = count,
            Table::Beneficiaries => self.beneficiaries = count,
            Table::Bills => self.bills = count,
        }
    }
}

impl fmt::Display for SeedSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} users, {} accounts, {} transactions, {} beneficiaries, {} bills",
            self.users, self.accounts, self.transactions, self.beneficiaries, self.bills
        )
    }
}

pub struct TestDataManager {
    environment: Environment,
    db: Arc<DatabaseManager>,
    cache: StaticDataCache,
    rng: StdRng,
}

impl TestDataManager {
    /// Manager on the process-wide registry with the embedded fixtures
    pub fn new(environment: Environment) -> Self {
        let db = DatabaseRegistry::global().lock().get_or_create(environment);
        Self::with_parts(environment, db, StaticDataCache::default())
    }

    /// Manager on an explicit registry (tests, custom locations)
    pub fn in_registry(
        registry: &mut DatabaseRegistry,
        environment: Environment,
        cache: StaticDataCache,
    ) -> Self {
        let db = registry.get_or_create(environment);
        Self::with_parts(environment, db, cache)
    }

    pub fn with_parts(environment: Environment, db: Arc<DatabaseManager>, cache: StaticDataCache) -> Self {
        TestDataManager {
            environment,
            db,
            cache,
            rng: StdRng::from_entropy(),
        }
    }

    /// Make generated data reproducible
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = StdRng::seed_from_u64(seed);
        self
    }

    pub fn environment(&self) -> Environment {
        self.environment
    }

    pub fn db(&self) -> &DatabaseManager {
        &self.db
    }

    // ========================================================================
    // STATIC DATA (JSON)
    // ========================================================================

    pub fn static_data(&mut self) -> Result<Arc<StaticData>> {
        self.cache.load()
    }

    pub fn clear_cache(&mut self) {
        self.cache.invalidate();
    }

    /// `None` when the key is absent
    pub fn get_user(&mut self, key: &str) -> Result<Option<UserFixture>> {
        Ok(self.static_data()?.users.get(key).cloned())
    }

    pub fn get_account(&mut self, key: &str) -> Result<Option<AccountFixture>> {
        Ok(self.static_data()?.accounts.get(key).cloned())
    }

    pub fn get_beneficiary(&mut self, key: &str) -> Result<Option<BeneficiaryFixture>> {
        Ok(self.static_data()?.beneficiaries.get(key).cloned())
    }

    pub fn get_bill(&mut self, key: &str) -> Result<Option<BillFixture>> {
        Ok(self.static_data()?.bills.get(key).cloned())
    }

    pub fn get_invalid_credentials(&mut self) -> Result<InvalidCredentials> {
        Ok(self.static_data()?.invalid_credentials.clone())
    }

    pub fn get_password_requirements(&mut self) -> Result<PasswordRequirements> {
        Ok(self.static_data()?.password_requirements.clone())
    }

    // ========================================================================
    // GENERATED DATA (FACTORIES)
    // ========================================================================

    pub fn generate_user(&mut self, overrides: UserOverrides) -> User {
        UserFactory::build(&mut self.rng, overrides)
    }

    pub fn generate_account(&mut self, overrides: AccountOverrides) -> Account {
        AccountFactory::build(&mut self.rng, overrides)
    }

    pub fn generate_transaction(&mut self, overrides: TransactionOverrides) -> Transaction {
        TransactionFactory::build(&mut self.rng, overrides)
    }

    pub fn generate_beneficiary(&mut self, overrides: BeneficiaryOverrides) -> Beneficiary {
        BeneficiaryFactory::build(&mut self.rng, overrides)
    }

    pub fn generate_bill(&mut self, overrides: BillOverrides) -> Bill {
        BillFactory::build(&mut self.rng, overrides)
    }

    // ========================================================================
    // SEEDING
    // ========================================================================

    /// Create the schema if needed, then insert every canonical fixture.
    ///
    /// Accounts and beneficiaries belong to the standard user, whose id is
    /// only known once the users are inserted; bills have no owner.
    pub fn seed_standard_data(&mut self) -> Result<SeedSummary> {
        let data = self.static_data()?;
        self.db.create_tables()?;

        let summary = self.db.scoped_session(|s| {
            let mut summary = SeedSummary::default();

            for fixture in data.users.values() {
                s.add_user(&mut fixture.to_user())?;
                summary.users += 1;
            }

            let standard = match data.standard_user() {
                Some(fixture) => s.find_user_by_email(&fixture.email)?,
                None => None,
            };

            match standard.and_then(|user| user.id) {
                Some(user_id) => {
                    for fixture in data.accounts.values() {
                        s.add_account(&mut fixture.to_account(user_id))?;
                        summary.accounts += 1;
                    }
                    for fixture in data.beneficiaries.values() {
                        s.add_beneficiary(&mut fixture.to_beneficiary(user_id))?;
                        summary.beneficiaries += 1;
                    }
                }
                None => warn!(
                    "No '{}' user in static data: accounts and beneficiaries not seeded",
                    STANDARD_USER_KEY
                ),
            }

            for fixture in data.bills.values() {
                s.add_bill(&mut fixture.to_bill())?;
                summary.bills += 1;
            }

            Ok(summary)
        })?;

        info!(environment = %self.environment, "Seeded standard data: {}", summary);
        Ok(summary)
    }

    /// Bulk random data: `count` users with two accounts each, five
    /// transactions on each of the first `count` accounts, three
    /// beneficiaries for each of the first `count / 2` users and `count` bills.
    pub fn seed_random_data(&mut self, count: usize) -> Result<SeedSummary> {
        self.db.create_tables()?;

        let rng = &mut self.rng;
        let summary = self.db.scoped_session(|s| {
            let mut summary = SeedSummary::default();

            let mut users = UserFactory::batch(rng, count, UserOverrides::default());
            for user in &mut users {
                s.add_user(user)?;
            }
            summary.users = users.len();

            for user in &users {
                let overrides = AccountOverrides {
                    user_id: user.id,
                    ..Default::default()
                };
                for mut account in AccountFactory::batch(rng, RANDOM_ACCOUNTS_PER_USER, overrides) {
                    s.add_account(&mut account)?;
                    summary.accounts += 1;
                }
            }

            for account in s.all_accounts()?.iter().take(count) {
                let overrides = TransactionOverrides {
                    account_id: account.id,
                    ..Default::default()
                };
                for mut tx in
                    TransactionFactory::batch(rng, RANDOM_TRANSACTIONS_PER_ACCOUNT, overrides)
                {
                    s.add_transaction(&mut tx)?;
                    summary.transactions += 1;
                }
            }

            for user in users.iter().take(count / 2) {
                let overrides = BeneficiaryOverrides {
                    user_id: user.id,
                    ..Default::default()
                };
                for mut beneficiary in
                    BeneficiaryFactory::batch(rng, RANDOM_BENEFICIARIES_PER_USER, overrides)
                {
                    s.add_beneficiary(&mut beneficiary)?;
                    summary.beneficiaries += 1;
                }
            }

            for mut bill in BillFactory::batch(rng, count, BillOverrides::default()) {
                s.add_bill(&mut bill)?;
                summary.bills += 1;
            }

            Ok(summary)
        })?;

        info!(environment = %self.environment, "Seeded random data: {}", summary);
        Ok(summary)
    }

    /// Drop every table
    pub fn cleanup(&self) -> Result<()> {
        self.db.drop_tables()?;
        info!(environment = %self.environment, "Test data removed");
        Ok(())
    }

    /// Known-good state regardless of prior content
    pub fn reset(&mut self) -> Result<SeedSummary> {
        self.db.reset_database()?;
        self.seed_standard_data()
    }

    /// Current row count of every table (missing tables count as empty)
    pub fn table_counts(&self) -> Result<SeedSummary> {
        self.db.scoped_session(|s| {
            let mut summary = SeedSummary::default();
            for table in Table::ALL {
                summary.set(table, s.count(table)? as usize);
            }
            Ok(summary)
        })
    }
}
