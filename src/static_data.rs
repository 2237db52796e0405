// 📄 Static fixtures - canonical test entities from test_users.json
//
// The document is the single source of truth for canonical values.
// Field names here are consumed by the seeding code and by the UI suites.

use crate::entities::{Account, Beneficiary, Bill, User};
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Key of the user that owns every seeded account and beneficiary
pub const STANDARD_USER_KEY: &str = "standard";

/// Mirrors the CHECK on users.totp_code
const MAX_TOTP_LEN: usize = 6;

const EMBEDDED_DOCUMENT: &str = include_str!("../data/test_users.json");

// ============================================================================
// FIXTURE TYPES
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserFixture {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub has_2fa: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub totp_code: Option<String>,
}

impl UserFixture {
    pub fn to_user(&self) -> User {
        let mut user = User::new(&self.email, &self.password, &self.name);
        user.has_2fa = self.has_2fa;
        user.totp_code = self.totp_code.clone();
        user
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountFixture {
    #[serde(rename = "type")]
    pub account_type: String,
    pub number: String,
    /// Displayed balance for UI assertions; seeded rows start at 0.0
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub balance: Option<f64>,
}

impl AccountFixture {
    pub fn to_account(&self, user_id: i64) -> Account {
        Account::new(Some(user_id), &self.account_type, &self.number)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeneficiaryFixture {
    pub name: String,
    pub iban: String,
}

impl BeneficiaryFixture {
    pub fn to_beneficiary(&self, user_id: i64) -> Beneficiary {
        Beneficiary::new(Some(user_id), &self.name, &self.iban)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillFixture {
    pub provider: String,
    pub reference: String,
    pub amount: f64,
}

impl BillFixture {
    pub fn to_bill(&self) -> Bill {
        Bill::new(&self.provider, &self.reference, self.amount)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidCredentials {
    pub wrong_email: String,
    pub wrong_password: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PasswordRequirements {
    #[serde(default = "default_min_length")]
    pub min_length: usize,
    pub valid_new_password: String,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn default_min_length() -> usize {
    8
}

// ============================================================================
// DOCUMENT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaticData {
    pub users: BTreeMap<String, UserFixture>,
    #[serde(default)]
    pub accounts: BTreeMap<String, AccountFixture>,
    #[serde(default)]
    pub beneficiaries: BTreeMap<String, BeneficiaryFixture>,
    #[serde(default)]
    pub bills: BTreeMap<String, BillFixture>,
    pub invalid_credentials: InvalidCredentials,
    pub password_requirements: PasswordRequirements,
}

impl StaticData {
    /// Parse and validate a document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let data: StaticData = serde_json::from_str(json)?;
        data.validate()?;
        Ok(data)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// The document shipped with the crate (data/test_users.json)
    pub fn embedded() -> Result<Self> {
        Self::from_json_str(EMBEDDED_DOCUMENT)
    }

    /// A user claiming 2FA must carry a non-empty one-time code that fits the
    /// users.totp_code column
    pub fn validate(&self) -> Result<()> {
        for (key, user) in &self.users {
            let has_code = user
                .totp_code
                .as_deref()
                .is_some_and(|code| !code.trim().is_empty());

            if user.has_2fa && !has_code {
                return Err(Error::InvalidFixture {
                    key: format!("users.{}", key),
                    reason: "has_2fa is true but totp_code is missing".to_string(),
                });
            }

            if let Some(code) = &user.totp_code {
                if code.chars().count() > MAX_TOTP_LEN {
                    return Err(Error::InvalidFixture {
                        key: format!("users.{}", key),
                        reason: format!("totp_code is longer than {} characters", MAX_TOTP_LEN),
                    });
                }
            }
        }
        Ok(())
    }

    pub fn standard_user(&self) -> Option<&UserFixture> {
        self.users.get(STANDARD_USER_KEY)
    }
}

/// Serialize a fixture into a plain mapping
pub fn fixture_to_map<T: Serialize>(fixture: &T) -> Map<String, Value> {
    match serde_json::to_value(fixture) {
        Ok(Value::Object(map)) => map,
        _ => Map::new(),
    }
}

// ============================================================================
// CACHE
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StaticSource {
    Embedded,
    File(PathBuf),
}

/// Loads the document once and keeps it until `invalidate`
#[derive(Debug)]
pub struct StaticDataCache {
    source: StaticSource,
    cached: Option<Arc<StaticData>>,
}

impl StaticDataCache {
    pub fn new(source: StaticSource) -> Self {
        StaticDataCache {
            source,
            cached: None,
        }
    }

    pub fn embedded() -> Self {
        Self::new(StaticSource::Embedded)
    }

    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self::new(StaticSource::File(path.into()))
    }

    pub fn source(&self) -> &StaticSource {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.cached.is_some()
    }

    pub fn load(&mut self) -> Result<Arc<StaticData>> {
        if let Some(data) = &self.cached {
            return Ok(Arc::clone(data));
        }

        let data = match &self.source {
            StaticSource::Embedded => StaticData::embedded()?,
            StaticSource::File(path) => StaticData::from_path(path)?,
        };
        debug!(source = ?self.source, users = data.users.len(), "Static test data loaded");

        let data = Arc::new(data);
        self.cached = Some(Arc::clone(&data));
        Ok(data)
    }

    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}

impl Default for StaticDataCache {
    fn default() -> Self {
        Self::embedded()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_embedded_document_loads() {
        let data = StaticData::embedded().unwrap();

        let standard = data.standard_user().unwrap();
        assert_eq!(standard.email, "test@digitalbank.fr");
        assert!(data.accounts.contains_key("compte_courant"));
        assert!(data.beneficiaries.contains_key("marc_bernard"));
        assert!(data.bills.contains_key("edf"));
        assert_eq!(data.password_requirements.min_length, 8);
        assert!(!data.invalid_credentials.wrong_password.is_empty());
    }

    #[test]
    fn test_2fa_without_code_is_rejected() {
        let json = r#"{
            "users": {
                "broken": {"email": "b@x.fr", "password": "Test1234!", "name": "B", "has_2fa": true}
            },
            "invalid_credentials": {"wrong_email": "w@x.fr", "wrong_password": "nope"},
            "password_requirements": {"valid_new_password": "NewSecure789!"}
        }"#;

        let err = StaticData::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::InvalidFixture { ref key, .. } if key == "users.broken"));
    }

    #[test]
    fn test_overlong_totp_is_rejected_at_load() {
        let json = r#"{
            "users": {
                "long_code": {"email": "l@x.fr", "password": "Test1234!", "name": "L", "has_2fa": true, "totp_code": "1234567"}
            },
            "invalid_credentials": {"wrong_email": "w@x.fr", "wrong_password": "nope"},
            "password_requirements": {"valid_new_password": "NewSecure789!"}
        }"#;

        let err = StaticData::from_json_str(json).unwrap_err();
        assert!(matches!(err, Error::InvalidFixture { ref key, .. } if key == "users.long_code"));
    }

    #[test]
    fn test_fixture_conversions() {
        let data = StaticData::embedded().unwrap();

        let user = data.users["with_2fa"].to_user();
        assert!(user.has_2fa);
        assert_eq!(user.totp_code.as_deref(), Some("123456"));

        let account = data.accounts["livret_a"].to_account(5);
        assert_eq!(account.user_id, Some(5));
        assert_eq!(account.balance, 0.0);

        let map = fixture_to_map(&data.accounts["livret_a"]);
        assert_eq!(map["type"], Value::from("Livret A"));
    }

    #[test]
    fn test_cache_loads_once_until_invalidated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("test_users.json");
        std::fs::write(&path, EMBEDDED_DOCUMENT).unwrap();

        let mut cache = StaticDataCache::from_path(&path);
        assert!(!cache.is_loaded());

        let first = cache.load().unwrap();
        std::fs::remove_file(&path).unwrap();

        // Served from cache, file no longer needed
        let second = cache.load().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        cache.invalidate();
        assert!(!cache.is_loaded());
        assert!(cache.load().is_err());
    }
}
