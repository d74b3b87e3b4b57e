//! Bootstrap configuration: which secrets to provision and which plain
//! variables an operator must supply.

use crate::error::{Error, Result};
use crate::password::{DEFAULT_LENGTH, DEFAULT_SPECIAL_CHARS};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::LazyLock;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "envboot.toml";

/// Default name of the managed env file.
pub const DEFAULT_ENV_FILE: &str = ".env";

static VAR_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("variable name pattern is valid")
});

/// Characters that would break or be reinterpreted inside a double-quoted
/// dotenv value.
const FORBIDDEN_SPECIALS: &[char] = &['"', '\'', '`', '\\', '$'];

/// A secret that is generated when absent.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct SecretSpec {
    pub name: String,
    /// Password length (default: 64)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    /// Extra characters mixed into the alphabet (default: "!@#^*()")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special_chars: Option<String>,
}

impl SecretSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            length: None,
            special_chars: None,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = Some(length);
        self
    }

    pub fn with_special_chars(mut self, special_chars: impl Into<String>) -> Self {
        self.special_chars = Some(special_chars.into());
        self
    }

    pub fn length(&self) -> usize {
        self.length.unwrap_or(DEFAULT_LENGTH)
    }

    pub fn special_chars(&self) -> &str {
        self.special_chars.as_deref().unwrap_or(DEFAULT_SPECIAL_CHARS)
    }

    /// Check the name and that generated values fit in a double-quoted entry.
    pub fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        if self.length() == 0 {
            return Err(Error::InvalidConfig(format!(
                "secret {} must have a length greater than zero",
                self.name
            )));
        }
        if let Some(c) = self
            .special_chars()
            .chars()
            .find(|c| c.is_whitespace() || c.is_control() || FORBIDDEN_SPECIALS.contains(c))
        {
            return Err(Error::InvalidConfig(format!(
                "secret {} uses unsupported special character {:?}",
                self.name, c
            )));
        }
        Ok(())
    }
}

/// Configuration for the bootstrapper
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// Path of the env file to manage (default: ".env")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub env_file: Option<String>,
    /// Plain variables that must be supplied by the operator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Secrets generated when absent
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secrets: Option<Vec<SecretSpec>>,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|e| {
            Error::InvalidConfig(format!("failed to parse {}: {}", path.display(), e))
        })
    }

    /// A starter configuration written by `envboot init-config`.
    pub fn sample() -> Self {
        Self {
            env_file: Some(DEFAULT_ENV_FILE.to_string()),
            required: Some(vec![
                "DATABASE_URL".to_string(),
                "REDIS_URL".to_string(),
            ]),
            secrets: Some(vec![
                SecretSpec::new("SECRET_KEY"),
                SecretSpec::new("SESSION_SECRET")
                    .with_length(32)
                    .with_special_chars(""),
            ]),
        }
    }

    pub fn env_file(&self) -> &str {
        self.env_file.as_deref().unwrap_or(DEFAULT_ENV_FILE)
    }

    pub fn required(&self) -> &[String] {
        self.required.as_deref().unwrap_or_default()
    }

    pub fn secrets(&self) -> &[SecretSpec] {
        self.secrets.as_deref().unwrap_or_default()
    }

    /// Append extra required names, skipping ones already listed.
    pub fn add_required<I: IntoIterator<Item = String>>(&mut self, names: I) {
        let list = self.required.get_or_insert_with(Vec::new);
        for name in names {
            if !list.contains(&name) {
                list.push(name);
            }
        }
    }

    /// Append extra secrets with default parameters, skipping ones already listed.
    pub fn add_secrets<I: IntoIterator<Item = String>>(&mut self, names: I) {
        let list = self.secrets.get_or_insert_with(Vec::new);
        for name in names {
            if !list.iter().any(|s| s.name == name) {
                list.push(SecretSpec::new(name));
            }
        }
    }

    /// Reject configurations that would produce a broken env file.
    pub fn validate(&self) -> Result<()> {
        if self.env_file().trim().is_empty() {
            return Err(Error::InvalidConfig("env_file must not be empty".into()));
        }

        let mut seen = HashSet::new();
        for secret in self.secrets() {
            if !seen.insert(secret.name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "secret {} is listed more than once",
                    secret.name
                )));
            }
            secret.validate()?;
        }

        for name in self.required() {
            check_name(name)?;
            if seen.contains(name.as_str()) {
                return Err(Error::InvalidConfig(format!(
                    "{name} is listed both as a secret and as a required variable"
                )));
            }
        }

        Ok(())
    }
}

fn check_name(name: &str) -> Result<()> {
    if VAR_NAME.is_match(name) {
        Ok(())
    } else {
        Err(Error::InvalidConfig(format!(
            "{name:?} is not a valid variable name"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.env_file(), ".env");
        assert!(config.required().is_empty());
        assert!(config.secrets().is_empty());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_toml() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("envboot.toml");
        fs::write(
            &path,
            r#"
env_file = "app.env"
required = ["DATABASE_URL", "REDIS_URL"]

[[secrets]]
name = "DJANGO_SECRET_KEY"

[[secrets]]
name = "API_TOKEN"
length = 40
special_chars = "-_"
"#,
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.env_file(), "app.env");
        assert_eq!(config.required(), ["DATABASE_URL", "REDIS_URL"]);
        assert_eq!(config.secrets().len(), 2);
        assert_eq!(config.secrets()[0].length(), 64);
        assert_eq!(config.secrets()[0].special_chars(), "!@#^*()");
        assert_eq!(config.secrets()[1].length(), 40);
        assert_eq!(config.secrets()[1].special_chars(), "-_");
        assert!(config.validate().is_ok());

        Ok(())
    }

    #[test]
    fn test_load_rejects_bad_toml() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let path = temp_dir.path().join("envboot.toml");
        fs::write(&path, "required = \"not a list\"")?;

        assert!(matches!(Config::load(&path), Err(Error::InvalidConfig(_))));
        Ok(())
    }

    #[test]
    fn test_add_lists_skip_duplicates() {
        let mut config = Config::sample();
        config.add_required(["DATABASE_URL".to_string(), "SMTP_HOST".to_string()]);
        config.add_secrets(["SECRET_KEY".to_string(), "JWT_SECRET".to_string()]);

        assert_eq!(config.required(), ["DATABASE_URL", "REDIS_URL", "SMTP_HOST"]);
        let names: Vec<_> = config.secrets().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, ["SECRET_KEY", "SESSION_SECRET", "JWT_SECRET"]);
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let config = Config {
            required: Some(vec!["1BAD".to_string()]),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = Config {
            secrets: Some(vec![SecretSpec::new("HAS-DASH")]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_length_and_quotes() {
        let config = Config {
            secrets: Some(vec![SecretSpec::new("KEY").with_length(0)]),
            ..Default::default()
        };
        assert!(config.validate().is_err());

        for bad in ["\"", "$", "\\", "a b"] {
            let config = Config {
                secrets: Some(vec![SecretSpec::new("KEY").with_special_chars(bad)]),
                ..Default::default()
            };
            assert!(config.validate().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_secret_spec_validate() {
        assert!(SecretSpec::new("KEY").validate().is_ok());
        assert!(SecretSpec::new("KEY").with_special_chars("-_.").validate().is_ok());
        assert!(SecretSpec::new("KEY").with_special_chars("\"$").validate().is_err());
        assert!(SecretSpec::new("KEY").with_length(0).validate().is_err());
    }

    #[test]
    fn test_validate_rejects_overlap() {
        let config = Config {
            required: Some(vec!["KEY".to_string()]),
            secrets: Some(vec![SecretSpec::new("KEY")]),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sample_roundtrips_through_toml() -> anyhow::Result<()> {
        let sample = Config::sample();
        let text = toml::to_string_pretty(&sample)?;
        let parsed: Config = toml::from_str(&text)?;
        assert_eq!(parsed, sample);
        Ok(())
    }
}
