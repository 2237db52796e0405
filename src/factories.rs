// 🏭 Factories - transient test entities with realistic French data
//
// Factories never touch storage: every value they return is unsaved
// (`id == None`). Randomness always comes from the caller's `Rng`, so a
// `StdRng::seed_from_u64` source makes a run reproducible.

use crate::entities::{Account, Beneficiary, Bill, Transaction, TransactionType, User};
use chrono::{DateTime, Datelike, Duration, Utc};
use fake::faker::internet::raw::SafeEmail;
use fake::faker::name::raw::Name;
use fake::locales::FR_FR;
use fake::Fake;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashSet;

/// Symbols accepted by the DigitalBank password policy
pub const PASSWORD_SYMBOLS: &str = "!@#$%^&*";

/// Code accepted by the test backend when 2FA is on and no code was given
pub const DEFAULT_TOTP_CODE: &str = "123456";

pub const ACCOUNT_TYPES: [&str; 4] = ["Compte Courant", "Livret A", "PEL", "Compte Joint"];

pub const CREDIT_DESCRIPTIONS: [&str; 5] = [
    "Virement reçu",
    "Remboursement",
    "Salaire",
    "Prime",
    "Remboursement Sécu",
];

pub const DEBIT_DESCRIPTIONS: [&str; 5] = [
    "Paiement CB",
    "Prélèvement",
    "Virement émis",
    "Retrait DAB",
    "Frais bancaires",
];

/// (provider name, reference prefix)
pub const BILL_PROVIDERS: [(&str, &str); 6] = [
    ("EDF", "EDF-"),
    ("Orange", "ORG-"),
    ("Free", "FREE-"),
    ("Engie", "ENG-"),
    ("SFR", "SFR-"),
    ("Veolia", "VEO-"),
];

/// Reproducible random source for factories
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// ============================================================================
// GENERATORS
// ============================================================================

/// 1 uppercase + 5 lowercase + 2 digits + 1 symbol, shuffled
pub fn generate_valid_password<R: Rng>(rng: &mut R) -> String {
    let symbols: Vec<char> = PASSWORD_SYMBOLS.chars().collect();

    let mut chars = Vec::with_capacity(9);
    chars.push(rng.gen_range(b'A'..=b'Z') as char);
    for _ in 0..5 {
        chars.push(rng.gen_range(b'a'..=b'z') as char);
    }
    for _ in 0..2 {
        chars.push(rng.gen_range(b'0'..=b'9') as char);
    }
    if let Some(symbol) = symbols.choose(rng) {
        chars.push(*symbol);
    }

    chars.shuffle(rng);
    chars.into_iter().collect()
}

/// Length ≥ 8 with at least one uppercase, one lowercase, two digits and one symbol
pub fn is_valid_password(password: &str) -> bool {
    password.chars().count() >= 8
        && password.chars().any(|c| c.is_ascii_uppercase())
        && password.chars().any(|c| c.is_ascii_lowercase())
        && password.chars().filter(|c| c.is_ascii_digit()).count() >= 2
        && password.chars().any(|c| PASSWORD_SYMBOLS.contains(c))
}

fn random_digits<R: Rng>(rng: &mut R, count: usize) -> String {
    (0..count)
        .map(|_| rng.gen_range(b'0'..=b'9') as char)
        .collect()
}

/// `FR76 ddddd ddddd ddddddddddd dd`: looks like an IBAN, checksum not valid
pub fn generate_french_iban<R: Rng>(rng: &mut R) -> String {
    let bank_code = random_digits(rng, 5);
    let branch_code = random_digits(rng, 5);
    let account_number = random_digits(rng, 11);
    let check_digits = random_digits(rng, 2);
    format!(
        "FR76 {} {} {} {}",
        bank_code, branch_code, account_number, check_digits
    )
}

/// Fake email with a short random tag so batches stay unique
fn generate_email<R: Rng>(rng: &mut R) -> String {
    let email: String = SafeEmail(FR_FR).fake_with_rng(rng);
    match email.split_once('@') {
        Some((local, domain)) => format!("{}.{:04x}@{}", local, rng.gen::<u16>(), domain),
        None => email,
    }
}

fn generate_name<R: Rng>(rng: &mut R) -> String {
    Name(FR_FR).fake_with_rng(rng)
}

/// Builds `count` entities, redrawing any whose `key` repeats an earlier one.
/// Only used while the unique column is generated, never when it is overridden.
fn distinct_batch<R, T, F, K>(rng: &mut R, count: usize, mut build: F, key: K) -> Vec<T>
where
    R: Rng,
    F: FnMut(&mut R) -> T,
    K: Fn(&T) -> String,
{
    let mut seen = HashSet::with_capacity(count);
    let mut entities = Vec::with_capacity(count);
    while entities.len() < count {
        let entity = build(rng);
        if seen.insert(key(&entity)) {
            entities.push(entity);
        }
    }
    entities
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ============================================================================
// FACTORY TRAIT
// ============================================================================

/// Builds unsaved entities; any field left `None` in the overrides is generated
pub trait Factory {
    type Output;
    type Overrides: Clone + Default;

    fn build<R: Rng>(rng: &mut R, overrides: Self::Overrides) -> Self::Output;

    /// `count` independently randomized entities sharing the given overrides
    fn batch<R: Rng>(rng: &mut R, count: usize, overrides: Self::Overrides) -> Vec<Self::Output> {
        (0..count)
            .map(|_| Self::build(rng, overrides.clone()))
            .collect()
    }
}

// ============================================================================
// USER
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct UserOverrides {
    pub email: Option<String>,
    pub password: Option<String>,
    pub name: Option<String>,
    pub has_2fa: bool,
    pub totp_code: Option<String>,
}

pub struct UserFactory;

impl Factory for UserFactory {
    type Output = User;
    type Overrides = UserOverrides;

    fn build<R: Rng>(rng: &mut R, overrides: UserOverrides) -> User {
        let email = overrides.email.unwrap_or_else(|| generate_email(rng));
        let password = overrides
            .password
            .unwrap_or_else(|| generate_valid_password(rng));
        let name = overrides.name.unwrap_or_else(|| generate_name(rng));

        let mut user = User::new(email, password, name);
        user.has_2fa = overrides.has_2fa;
        user.totp_code = overrides
            .totp_code
            .or_else(|| overrides.has_2fa.then(|| DEFAULT_TOTP_CODE.to_string()));
        user
    }

    /// Emails are UNIQUE in storage, so generated ones never repeat within a batch
    fn batch<R: Rng>(rng: &mut R, count: usize, overrides: UserOverrides) -> Vec<User> {
        if overrides.email.is_some() {
            return (0..count)
                .map(|_| Self::build(rng, overrides.clone()))
                .collect();
        }
        distinct_batch(
            rng,
            count,
            |rng| Self::build(rng, overrides.clone()),
            |user| user.email.clone(),
        )
    }
}

impl UserFactory {
    /// test@digitalbank.fr, no 2FA
    pub fn standard_user() -> User {
        User::new("test@digitalbank.fr", "Test1234!", "Utilisateur Test")
    }

    /// marie.martin@email.com with 2FA (code 123456)
    pub fn user_with_2fa() -> User {
        User::new("marie.martin@email.com", "SecurePass456!", "Marie Martin")
            .with_2fa(DEFAULT_TOTP_CODE)
    }

    pub fn random_user<R: Rng>(rng: &mut R, has_2fa: bool) -> User {
        Self::build(
            rng,
            UserOverrides {
                has_2fa,
                ..Default::default()
            },
        )
    }
}

// ============================================================================
// ACCOUNT
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct AccountOverrides {
    pub user_id: Option<i64>,
    pub account_type: Option<String>,
    pub number: Option<String>,
    pub balance: Option<f64>,
}

pub struct AccountFactory;

impl Factory for AccountFactory {
    type Output = Account;
    type Overrides = AccountOverrides;

    fn build<R: Rng>(rng: &mut R, overrides: AccountOverrides) -> Account {
        let account_type = overrides.account_type.unwrap_or_else(|| {
            ACCOUNT_TYPES
                .choose(rng)
                .copied()
                .unwrap_or(ACCOUNT_TYPES[0])
                .to_string()
        });
        let number = overrides
            .number
            .unwrap_or_else(|| generate_french_iban(rng));
        let balance = overrides
            .balance
            .unwrap_or_else(|| round_cents(rng.gen_range(100.0..10_000.0)));

        Account::new(overrides.user_id, account_type, number).with_balance(balance)
    }
}

impl AccountFactory {
    pub fn compte_courant<R: Rng>(rng: &mut R, user_id: Option<i64>) -> Account {
        Self::build(
            rng,
            AccountOverrides {
                user_id,
                account_type: Some("Compte Courant".to_string()),
                number: Some("FR76 0000 1111 2222 3333 4444 555".to_string()),
                balance: None,
            },
        )
    }

    pub fn livret_a<R: Rng>(rng: &mut R, user_id: Option<i64>) -> Account {
        Self::build(
            rng,
            AccountOverrides {
                user_id,
                account_type: Some("Livret A".to_string()),
                number: Some("FR76 0000 1111 2222 3333 4444 666".to_string()),
                balance: None,
            },
        )
    }
}

// ============================================================================
// TRANSACTION
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct TransactionOverrides {
    pub account_id: Option<i64>,
    pub transaction_type: Option<TransactionType>,
    pub amount: Option<f64>,
    pub description: Option<String>,
    pub date: Option<DateTime<Utc>>,
    pub reference: Option<String>,
}

pub struct TransactionFactory;

impl Factory for TransactionFactory {
    type Output = Transaction;
    type Overrides = TransactionOverrides;

    fn build<R: Rng>(rng: &mut R, overrides: TransactionOverrides) -> Transaction {
        let transaction_type = overrides.transaction_type.unwrap_or_else(|| {
            if rng.gen_bool(0.5) {
                TransactionType::Credit
            } else {
                TransactionType::Debit
            }
        });
        let descriptions: &[&str] = match transaction_type {
            TransactionType::Credit => &CREDIT_DESCRIPTIONS,
            TransactionType::Debit => &DEBIT_DESCRIPTIONS,
        };

        let amount = overrides
            .amount
            .unwrap_or_else(|| round_cents(rng.gen_range(10.0..500.0)));
        let description = overrides.description.or_else(|| {
            descriptions.choose(rng).map(|d| d.to_string())
        });
        let date = overrides.date.unwrap_or_else(|| {
            Utc::now() - Duration::seconds(rng.gen_range(0..30 * 24 * 3600))
        });
        let reference = overrides.reference.unwrap_or_else(|| {
            let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
            format!("TRX-{}", &uuid.simple().to_string()[..8].to_uppercase())
        });

        let mut tx = Transaction::new(overrides.account_id, transaction_type, amount);
        tx.description = description;
        tx.date = date;
        tx.reference = Some(reference);
        tx
    }
}

impl TransactionFactory {
    pub fn credit<R: Rng>(rng: &mut R, account_id: Option<i64>, amount: Option<f64>) -> Transaction {
        Self::build(
            rng,
            TransactionOverrides {
                account_id,
                transaction_type: Some(TransactionType::Credit),
                amount,
                ..Default::default()
            },
        )
    }

    pub fn debit<R: Rng>(rng: &mut R, account_id: Option<i64>, amount: Option<f64>) -> Transaction {
        Self::build(
            rng,
            TransactionOverrides {
                account_id,
                transaction_type: Some(TransactionType::Debit),
                amount,
                ..Default::default()
            },
        )
    }
}

// ============================================================================
// BENEFICIARY
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BeneficiaryOverrides {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub iban: Option<String>,
}

pub struct BeneficiaryFactory;

impl Factory for BeneficiaryFactory {
    type Output = Beneficiary;
    type Overrides = BeneficiaryOverrides;

    fn build<R: Rng>(rng: &mut R, overrides: BeneficiaryOverrides) -> Beneficiary {
        let name = overrides.name.unwrap_or_else(|| generate_name(rng));
        let iban = overrides.iban.unwrap_or_else(|| generate_french_iban(rng));
        Beneficiary::new(overrides.user_id, name, iban)
    }
}

impl BeneficiaryFactory {
    pub fn marc_bernard(user_id: Option<i64>) -> Beneficiary {
        Beneficiary::new(user_id, "Marc Bernard", "FR76 7777 8888 9999 0000 1111 222")
    }

    pub fn julie_petit(user_id: Option<i64>) -> Beneficiary {
        Beneficiary::new(user_id, "Julie Petit", "FR76 3333 4444 5555 6666 7777 888")
    }
}

// ============================================================================
// BILL
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct BillOverrides {
    pub provider: Option<String>,
    pub reference: Option<String>,
    pub amount: Option<f64>,
    pub due_date: Option<DateTime<Utc>>,
    pub paid: bool,
}

pub struct BillFactory;

impl BillFactory {
    /// Reference prefix for a provider: the known one, else its initials
    fn reference_prefix(provider: &str) -> String {
        BILL_PROVIDERS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(provider))
            .map(|(_, prefix)| prefix.to_string())
            .unwrap_or_else(|| {
                let initials: String = provider
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .take(3)
                    .collect();
                format!("{}-", initials.to_ascii_uppercase())
            })
    }

    pub fn edf<R: Rng>(rng: &mut R) -> Bill {
        Self::build(
            rng,
            BillOverrides {
                provider: Some("EDF".to_string()),
                reference: Some("EDF-2025-001234".to_string()),
                amount: Some(156.78),
                ..Default::default()
            },
        )
    }

    pub fn orange<R: Rng>(rng: &mut R) -> Bill {
        Self::build(
            rng,
            BillOverrides {
                provider: Some("Orange".to_string()),
                reference: Some("ORG-2025-567890".to_string()),
                amount: Some(49.99),
                ..Default::default()
            },
        )
    }
}

impl Factory for BillFactory {
    type Output = Bill;
    type Overrides = BillOverrides;

    fn build<R: Rng>(rng: &mut R, overrides: BillOverrides) -> Bill {
        let provider = overrides.provider.unwrap_or_else(|| {
            BILL_PROVIDERS
                .choose(rng)
                .map(|(name, _)| name.to_string())
                .unwrap_or_else(|| BILL_PROVIDERS[0].0.to_string())
        });
        let now = Utc::now();

        let reference = overrides.reference.unwrap_or_else(|| {
            format!(
                "{}{}-{}",
                Self::reference_prefix(&provider),
                now.year(),
                rng.gen_range(100_000..=999_999)
            )
        });
        let amount = overrides
            .amount
            .unwrap_or_else(|| round_cents(rng.gen_range(20.0..200.0)));
        let due_date = overrides
            .due_date
            .unwrap_or_else(|| now + Duration::days(rng.gen_range(7..=30)));

        let mut bill = Bill::new(provider, reference, amount);
        bill.due_date = Some(due_date);
        bill.paid = overrides.paid;
        bill
    }

    /// References are UNIQUE in storage, so generated ones never repeat within a batch
    fn batch<R: Rng>(rng: &mut R, count: usize, overrides: BillOverrides) -> Vec<Bill> {
        if overrides.reference.is_some() {
            return (0..count)
                .map(|_| Self::build(rng, overrides.clone()))
                .collect();
        }
        distinct_batch(
            rng,
            count,
            |rng| Self::build(rng, overrides.clone()),
            |bill| bill.reference.clone(),
        )
    }
}
