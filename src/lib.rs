//! Env Bootstrap Library
//!
//! Prepares a `.env` file for a container start: missing secrets are generated
//! with a CSPRNG and appended, required plain variables are enforced, and the
//! resulting environment can be handed to a downstream command.

pub mod config;
pub mod envfile;
pub mod error;
pub mod exec;
pub mod logging;
pub mod password;

pub use config::{Config, SecretSpec};
pub use envfile::{EnvFile, EnvSnapshot};
pub use error::{Error, Result};
pub use password::generate_password;

/// Names from `required` that are not keys of `snapshot`, in input order.
pub fn missing_vars<'a, I>(required: I, snapshot: &EnvSnapshot) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    required
        .into_iter()
        .filter(|name| !snapshot.contains(name))
        .collect()
}

/// Names from `required` that are present but blank, in input order.
pub fn empty_vars<'a, I>(required: I, snapshot: &EnvSnapshot) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    required
        .into_iter()
        .filter(|name| snapshot.get(name).is_some_and(|v| v.trim().is_empty()))
        .collect()
}

/// Outcome of a successful bootstrap run.
#[derive(Debug, Clone)]
pub struct Bootstrap {
    /// The env file did not exist and was created empty
    pub created_env_file: bool,
    /// Secrets generated and appended during this run
    pub generated: Vec<String>,
    /// Environment after provisioning, including generated secrets
    pub snapshot: EnvSnapshot,
}

/// Problems found by a read-only check.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    pub missing_secrets: Vec<String>,
    pub missing_required: Vec<String>,
    pub empty_required: Vec<String>,
}

impl Findings {
    pub fn is_clean(&self) -> bool {
        self.missing_secrets.is_empty()
            && self.missing_required.is_empty()
            && self.empty_required.is_empty()
    }
}

/// Drives provisioning and enforcement for one env file.
#[derive(Debug, Clone)]
pub struct Bootstrapper {
    config: Config,
    env_file: EnvFile,
}

impl Bootstrapper {
    /// Create a bootstrapper with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(Config::default())
    }

    /// Create a bootstrapper with custom configuration
    pub fn with_config(config: Config) -> Result<Self> {
        config.validate()?;
        let env_file = EnvFile::new(config.env_file());
        Ok(Self { config, env_file })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn env_file(&self) -> &EnvFile {
        &self.env_file
    }

    /// Layer the env file's values under `base`. Values in `base` win.
    pub fn snapshot(&self, base: EnvSnapshot) -> Result<EnvSnapshot> {
        let mut snapshot = base;
        snapshot.fill_from(self.env_file.read()?.iter());
        Ok(snapshot)
    }

    /// Generate and persist every configured secret missing from `snapshot`.
    ///
    /// Generated values are also inserted into `snapshot`. Returns the names
    /// that were generated.
    pub fn provision_secrets(&self, snapshot: &mut EnvSnapshot) -> Result<Vec<String>> {
        let secrets = self.config.secrets();
        let missing = missing_vars(secrets.iter().map(|s| s.name.as_str()), snapshot);

        for name in empty_vars(secrets.iter().map(|s| s.name.as_str()), snapshot) {
            tracing::warn!(name, "secret is set but empty; leaving it unchanged");
        }

        if missing.is_empty() {
            tracing::info!("all required secrets are present");
            return Ok(Vec::new());
        }

        let generated: Vec<(String, String)> = secrets
            .iter()
            .filter(|s| missing.contains(&s.name.as_str()))
            .map(|s| {
                tracing::info!(name = %s.name, length = s.length(), "generating secret");
                (
                    s.name.clone(),
                    generate_password(s.length(), s.special_chars()),
                )
            })
            .collect();

        self.env_file
            .append(generated.iter().map(|(k, v)| (k.as_str(), v.as_str())))?;

        let names = generated.iter().map(|(k, _)| k.clone()).collect();
        for (name, value) in generated {
            snapshot.insert(name, value);
        }

        tracing::info!(
            path = %self.env_file.path().display(),
            "secrets added to env file"
        );
        Ok(names)
    }

    /// Fail when required plain variables are absent or blank.
    ///
    /// Absent variables get `NAME=""` placeholders appended so an operator can
    /// fill them in before the next start.
    pub fn enforce_required(&self, snapshot: &EnvSnapshot) -> Result<()> {
        let required = || self.config.required().iter().map(String::as_str);

        let missing = missing_vars(required(), snapshot);
        if !missing.is_empty() {
            self.env_file.append(missing.iter().map(|name| (*name, "")))?;
            for name in &missing {
                tracing::error!(name, "required variable is not set");
            }
            return Err(Error::MissingVariables(owned_names(&missing)));
        }

        let empty = empty_vars(required(), snapshot);
        if !empty.is_empty() {
            for name in &empty {
                tracing::error!(name, "required variable is empty");
            }
            return Err(Error::EmptyVariables(owned_names(&empty)));
        }

        tracing::info!("all required variables are set");
        Ok(())
    }

    /// Run the full entrypoint sequence against the process environment.
    pub fn bootstrap(&self) -> Result<Bootstrap> {
        self.bootstrap_with(EnvSnapshot::from_process())
    }

    /// Run the full entrypoint sequence with `base` as the live environment.
    pub fn bootstrap_with(&self, base: EnvSnapshot) -> Result<Bootstrap> {
        let created_env_file = self.env_file.ensure_exists()?;
        let mut snapshot = self.snapshot(base)?;
        let generated = self.provision_secrets(&mut snapshot)?;
        self.enforce_required(&snapshot)?;

        Ok(Bootstrap {
            created_env_file,
            generated,
            snapshot,
        })
    }

    /// Report problems without touching the env file.
    pub fn check(&self) -> Result<Findings> {
        self.check_with(EnvSnapshot::from_process())
    }

    pub fn check_with(&self, base: EnvSnapshot) -> Result<Findings> {
        let snapshot = self.snapshot(base)?;
        let secrets = self.config.secrets().iter().map(|s| s.name.as_str());
        let required = || self.config.required().iter().map(String::as_str);

        Ok(Findings {
            missing_secrets: owned_names(&missing_vars(secrets, &snapshot)),
            missing_required: owned_names(&missing_vars(required(), &snapshot)),
            empty_required: owned_names(&empty_vars(required(), &snapshot)),
        })
    }
}

fn owned_names(names: &[&str]) -> Vec<String> {
    names.iter().map(|n| n.to_string()).collect()
}

/// Bootstrap against the process environment with the given configuration
pub fn bootstrap_with_config(config: Config) -> Result<Bootstrap> {
    Bootstrapper::with_config(config)?.bootstrap()
}

/// Check the process environment against the given configuration
pub fn check_with_config(config: Config) -> Result<Findings> {
    Bootstrapper::with_config(config)?.check()
}
