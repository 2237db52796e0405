// ⚙️ Configuration - environments and data locations
//
// Environment names are a closed set: anything outside dev/int/uat/preprod
// is a configuration error, never a silent fallback to dev.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DB_DIR_VAR: &str = "DIGITALBANK_DB_DIR";
pub const STATIC_DATA_VAR: &str = "DIGITALBANK_STATIC_DATA";
pub const ENVIRONMENTS_FILE_VAR: &str = "DIGITALBANK_ENVIRONMENTS";

pub const DEFAULT_DB_DIR: &str = "data/db";
pub const DEFAULT_ENVIRONMENTS_FILE: &str = "config/environments.yaml";

// ============================================================================
// ENVIRONMENT
// ============================================================================

/// Deployment target; each one owns an isolated SQLite file
#[derive(
    Debug,
    Default,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Dev,
    Int,
    Uat,
    Preprod,
}

impl Environment {
    pub const ALL: [Environment; 4] = [
        Environment::Dev,
        Environment::Int,
        Environment::Uat,
        Environment::Preprod,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Dev => "dev",
            Environment::Int => "int",
            Environment::Uat => "uat",
            Environment::Preprod => "preprod",
        }
    }

    /// File name of the environment's database, e.g. `test_data_dev.db`
    pub fn db_file_name(&self) -> String {
        format!("test_data_{}.db", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = Error;

    /// Exact lowercase names only, the same set the CLI accepts
    fn from_str(s: &str) -> Result<Self> {
        match s {
            "dev" => Ok(Environment::Dev),
            "int" => Ok(Environment::Int),
            "uat" => Ok(Environment::Uat),
            "preprod" => Ok(Environment::Preprod),
            _ => Err(Error::UnknownEnvironment(s.to_string())),
        }
    }
}

// ============================================================================
// ENVIRONMENTS FILE (config/environments.yaml)
// ============================================================================

/// Per-environment endpoints consumed by the UI/API suites
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    /// Filled from the map key on load
    #[serde(default)]
    pub name: String,

    pub base_url: String,

    pub api_url: String,

    /// Implicit wait for drivers, in seconds
    #[serde(default = "default_implicit_wait")]
    pub implicit_wait: u64,

    /// Everything else (appium device, credentials placeholders, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_implicit_wait() -> u64 {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnvironmentsConfig {
    pub environments: BTreeMap<String, EnvironmentConfig>,
}

impl EnvironmentsConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: EnvironmentsConfig = serde_yaml::from_str(yaml)?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_yaml_str(&content)
    }

    /// Look up one environment; unknown names are a configuration error
    pub fn environment(&self, name: &str) -> Result<EnvironmentConfig> {
        let mut config = self
            .environments
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownEnvironment(name.to_string()))?;
        config.name = name.to_string();
        Ok(config)
    }
}

/// Load `name` from the environments file at `path`
pub fn load_environment(path: impl AsRef<Path>, name: &str) -> Result<EnvironmentConfig> {
    EnvironmentsConfig::from_path(path)?.environment(name)
}

// ============================================================================
// DATA SETTINGS
// ============================================================================

/// Where databases, the static document and the environments file live
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSettings {
    pub db_dir: PathBuf,
    /// `None` means the document embedded in the library
    pub static_data: Option<PathBuf>,
    pub environments_file: PathBuf,
}

impl Default for DataSettings {
    fn default() -> Self {
        DataSettings {
            db_dir: PathBuf::from(DEFAULT_DB_DIR),
            static_data: None,
            environments_file: PathBuf::from(DEFAULT_ENVIRONMENTS_FILE),
        }
    }
}

impl DataSettings {
    /// Read settings from process environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let defaults = DataSettings::default();

        DataSettings {
            db_dir: non_empty(DB_DIR_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.db_dir),
            static_data: non_empty(STATIC_DATA_VAR).map(PathBuf::from),
            environments_file: non_empty(ENVIRONMENTS_FILE_VAR)
                .map(PathBuf::from)
                .unwrap_or(defaults.environments_file),
        }
    }

    /// Command-line values win over the environment variables
    pub fn with_overrides(mut self, db_dir: Option<PathBuf>, static_data: Option<PathBuf>) -> Self {
        if let Some(db_dir) = db_dir {
            self.db_dir = db_dir;
        }
        if static_data.is_some() {
            self.static_data = static_data;
        }
        self
    }

    /// Reject locations that can never work before touching any database
    pub fn validate(&self) -> Result<()> {
        if self.db_dir.is_file() {
            return Err(Error::InvalidConfig(format!(
                "database directory {} is a file",
                self.db_dir.display()
            )));
        }
        if let Some(path) = &self.static_data {
            if !path.is_file() {
                return Err(Error::InvalidConfig(format!(
                    "static data file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(())
    }

    /// Endpoints for `environment`, or `None` when no environments file is present
    pub fn environment_config(&self, environment: Environment) -> Result<Option<EnvironmentConfig>> {
        if !self.environments_file.is_file() {
            return Ok(None);
        }
        load_environment(&self.environments_file, environment.as_str()).map(Some)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const YAML: &str = r#"
environments:
  dev:
    base_url: "https://dev.digitalbank.fr"
    api_url: "https://api.dev.digitalbank.fr"
    implicit_wait: 5
    appium:
      device_name: "emulator-5554"
  uat:
    base_url: "https://uat.digitalbank.fr"
    api_url: "https://api.uat.digitalbank.fr"
"#;

    #[test]
    fn test_environment_parse() {
        assert_eq!("dev".parse::<Environment>().unwrap(), Environment::Dev);
        assert_eq!("preprod".parse::<Environment>().unwrap(), Environment::Preprod);
        assert_eq!(Environment::default(), Environment::Dev);
    }

    #[test]
    fn test_environment_parse_matches_cli_values() {
        use clap::ValueEnum;

        for env in Environment::ALL {
            let cli_name = env.to_possible_value().unwrap();
            assert_eq!(cli_name.get_name().parse::<Environment>().unwrap(), env);
        }

        assert!("PREPROD".parse::<Environment>().is_err());
        assert!(" uat ".parse::<Environment>().is_err());
        assert!(<Environment as ValueEnum>::from_str("Dev", false).is_err());
    }

    #[test]
    fn test_unknown_environment_is_config_error() {
        let err = "staging".parse::<Environment>().unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(ref name) if name == "staging"));
    }

    #[test]
    fn test_db_file_name() {
        assert_eq!(Environment::Dev.db_file_name(), "test_data_dev.db");
        assert_eq!(Environment::Preprod.db_file_name(), "test_data_preprod.db");
    }

    #[test]
    fn test_load_environment_from_yaml() {
        let config = EnvironmentsConfig::from_yaml_str(YAML).unwrap();

        let dev = config.environment("dev").unwrap();
        assert_eq!(dev.name, "dev");
        assert_eq!(dev.base_url, "https://dev.digitalbank.fr");
        assert_eq!(dev.implicit_wait, 5);
        assert!(dev.extra.contains_key("appium"));

        let uat = config.environment("uat").unwrap();
        assert_eq!(uat.implicit_wait, 10);
    }

    #[test]
    fn test_environment_loader_rejects_unknown_name() {
        let config = EnvironmentsConfig::from_yaml_str(YAML).unwrap();

        let err = config.environment("int").unwrap_err();
        assert!(matches!(err, Error::UnknownEnvironment(_)));
    }

    #[test]
    fn test_load_environment_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("environments.yaml");
        std::fs::write(&path, YAML).unwrap();

        let dev = load_environment(&path, "dev").unwrap();
        assert_eq!(dev.api_url, "https://api.dev.digitalbank.fr");
        assert!(load_environment(&path, "nowhere").is_err());
    }

    #[test]
    fn test_settings_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (DB_DIR_VAR, "/tmp/digitalbank"),
            (STATIC_DATA_VAR, ""),
        ]
        .into_iter()
        .collect();

        let settings = DataSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()));

        assert_eq!(settings.db_dir, PathBuf::from("/tmp/digitalbank"));
        assert_eq!(settings.static_data, None);
        assert_eq!(
            settings.environments_file,
            PathBuf::from(DEFAULT_ENVIRONMENTS_FILE)
        );
    }

    #[test]
    fn test_cli_values_override_variables() {
        let vars: HashMap<&str, &str> = [
            (DB_DIR_VAR, "/tmp/from-env"),
            (STATIC_DATA_VAR, "/tmp/from-env.json"),
        ]
        .into_iter()
        .collect();

        let settings = DataSettings::from_lookup(|k| vars.get(k).map(|v| v.to_string()))
            .with_overrides(Some(PathBuf::from("/tmp/from-cli")), None);

        assert_eq!(settings.db_dir, PathBuf::from("/tmp/from-cli"));
        assert_eq!(settings.static_data, Some(PathBuf::from("/tmp/from-env.json")));
    }

    #[test]
    fn test_validate_rejects_unusable_locations() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let settings = DataSettings::default().with_overrides(Some(file), None);
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

        let settings = DataSettings::default()
            .with_overrides(Some(dir.path().join("db")), Some(dir.path().join("missing.json")));
        assert!(matches!(settings.validate(), Err(Error::InvalidConfig(_))));

        let settings = DataSettings::default().with_overrides(Some(dir.path().join("db")), None);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_environment_config_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = DataSettings {
            environments_file: dir.path().join("environments.yaml"),
            ..DataSettings::default()
        };
        assert!(settings.environment_config(Environment::Dev).unwrap().is_none());

        std::fs::write(&settings.environments_file, YAML).unwrap();
        let dev = settings.environment_config(Environment::Dev).unwrap().unwrap();
        assert_eq!(dev.base_url, "https://dev.digitalbank.fr");
        assert!(settings.environment_config(Environment::Int).is_err());

        settings.environments_file = dir.path().join("gone.yaml");
        assert!(settings.environment_config(Environment::Uat).unwrap().is_none());
    }
}
