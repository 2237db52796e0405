// Entity Models - DigitalBank test data
//
// Each entity has:
// - Auto-assigned integer identity (None until the row is inserted)
// - Plain-map conversion for JSON fixtures and assertions
// - Its own table DDL and insert/select helpers

pub mod user;
pub mod account;
pub mod transaction;
pub mod beneficiary;
pub mod bill;

pub use user::User;
pub use account::Account;
pub use transaction::{Transaction, TransactionType};
pub use beneficiary::Beneficiary;
pub use bill::Bill;

use std::fmt;

/// Tables owned by the toolkit, in creation order (owners before dependents)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Users,
    Accounts,
    Transactions,
    Beneficiaries,
    Bills,
}

impl Table {
    pub const ALL: [Table; 5] = [
        Table::Users,
        Table::Accounts,
        Table::Transactions,
        Table::Beneficiaries,
        Table::Bills,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Table::Users => "users",
            Table::Accounts => "accounts",
            Table::Transactions => "transactions",
            Table::Beneficiaries => "beneficiaries",
            Table::Bills => "bills",
        }
    }

    pub(crate) fn create_sql(&self) -> &'static str {
        match self {
            Table::Users => user::CREATE_TABLE,
            Table::Accounts => account::CREATE_TABLE,
            Table::Transactions => transaction::CREATE_TABLE,
            Table::Beneficiaries => beneficiary::CREATE_TABLE,
            Table::Bills => bill::CREATE_TABLE,
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
