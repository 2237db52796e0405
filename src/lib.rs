// DigitalBank Test Data - Core Library
// Exposes all modules for use in the seeding CLI and the test suites

pub mod config;
pub mod db;
pub mod entities;
pub mod error;
pub mod factories;
pub mod hooks;
pub mod manager;
pub mod static_data;

// Re-export commonly used types
pub use config::{
    load_environment, DataSettings, Environment, EnvironmentConfig, EnvironmentsConfig,
};
pub use db::{close_all, get_db, DatabaseManager, DatabaseRegistry, Session};
pub use entities::{Account, Beneficiary, Bill, Table, Transaction, TransactionType, User};
pub use error::{Error, Result};
pub use factories::{
    generate_french_iban, generate_valid_password, is_valid_password, seeded_rng,
    AccountFactory, AccountOverrides, BeneficiaryFactory, BeneficiaryOverrides, BillFactory,
    BillOverrides, Factory, TransactionFactory, TransactionOverrides, UserFactory, UserOverrides,
};
pub use hooks::{on_session_finish, on_session_start, TestSession};
pub use manager::{SeedSummary, TestDataManager};
pub use static_data::{
    AccountFixture, BeneficiaryFixture, BillFixture, InvalidCredentials, PasswordRequirements,
    StaticData, StaticDataCache, StaticSource, UserFixture, STANDARD_USER_KEY,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
