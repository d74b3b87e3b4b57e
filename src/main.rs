//! Env Bootstrap CLI
//!
//! Container entrypoint that makes sure a .env file holds every required
//! secret and configuration value before handing off to the real process.

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use env_bootstrap::config::{DEFAULT_CONFIG_FILE, DEFAULT_ENV_FILE};
use env_bootstrap::password::{DEFAULT_LENGTH, DEFAULT_SPECIAL_CHARS};
use env_bootstrap::{Bootstrapper, Config, Error, SecretSpec, exec, generate_password, logging};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "envboot")]
#[command(about = "Provision secrets and enforce required variables in a .env file")]
#[command(version = "0.1.0")]
#[command(long_about = "
Env Bootstrap prepares a .env file at container start. Missing secrets are
generated with a cryptographically secure RNG and appended; missing required
variables get empty placeholders and stop the start with exit status 1 so an
operator can fill them in.

Examples:
  envboot run                             # Provision and check using envboot.toml
  envboot run -- gunicorn app.wsgi        # Then hand off to the app server
  envboot run --require DATABASE_URL      # Add a required variable ad hoc
  envboot check                           # Report problems without writing
  envboot password --length 32            # Print a fresh password
")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug)]
struct TargetArgs {
    /// Configuration file path (default: envboot.toml if present)
    #[arg(short, long, value_name = "CONFIG", env = "ENVBOOT_CONFIG")]
    config: Option<PathBuf>,

    /// Env file to manage (default: .env)
    #[arg(short = 'f', long, value_name = "FILE", env = "ENVBOOT_ENV_FILE")]
    env_file: Option<String>,

    /// Secrets to generate when absent (can be used multiple times)
    #[arg(long, value_name = "VARIABLE")]
    secret: Vec<String>,

    /// Variables that must be set and non-empty (can be used multiple times)
    #[arg(long, value_name = "VARIABLE")]
    require: Vec<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Provision secrets, enforce required variables, then run COMMAND if given
    Run {
        #[command(flatten)]
        target: TargetArgs,

        /// Command to run once the environment is ready
        #[arg(last = true, value_name = "COMMAND")]
        command: Vec<String>,
    },

    /// Report missing secrets and missing or empty variables without writing
    Check {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Print a freshly generated password
    Password {
        /// Number of characters
        #[arg(short, long, default_value_t = DEFAULT_LENGTH)]
        length: usize,

        /// Special characters mixed into the alphabet
        #[arg(short, long, default_value = DEFAULT_SPECIAL_CHARS)]
        special_chars: String,
    },

    /// Show current configuration
    Config {
        /// Configuration file path
        #[arg(short, long, value_name = "CONFIG", env = "ENVBOOT_CONFIG")]
        config: Option<PathBuf>,
    },

    /// Create a sample configuration file
    InitConfig {
        /// Output path for config file (default: envboot.toml)
        #[arg(value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

fn load_config(config: Option<&Path>) -> Result<Config> {
    match config {
        Some(path) => Config::load(path)
            .with_context(|| format!("Failed to load configuration file {}", path.display())),
        None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
            tracing::debug!("loading default config {}", DEFAULT_CONFIG_FILE);
            Config::load(DEFAULT_CONFIG_FILE).context("Failed to load default configuration")
        }
        None => Ok(Config::default()),
    }
}

fn resolve_config(target: TargetArgs) -> Result<Config> {
    let mut config = load_config(target.config.as_deref())?;

    // Command line arguments override the file
    if let Some(env_file) = target.env_file {
        config.env_file = Some(env_file);
    }
    config.add_secrets(target.secret);
    config.add_required(target.require);

    if config.secrets().is_empty() && config.required().is_empty() {
        tracing::warn!("no secrets or required variables configured");
    }

    Ok(config)
}

/// Print the stdout report for a missing/empty failure.
fn report_failure(err: &Error, env_file: &str) {
    match err {
        Error::MissingVariables(names) => {
            for name in names {
                println!("ERROR: {} is not set in {}.", name, env_file);
            }
            println!(
                "Placeholders added to {}. Fill them in and start again.",
                env_file
            );
        }
        Error::EmptyVariables(names) => {
            for name in names {
                println!("ERROR: {} is empty in {}.", name, env_file);
            }
        }
        other => println!("ERROR: {}", other),
    }
}

/// Child exit codes outside 0..=255 collapse to 1.
#[cfg(any(not(unix), test))]
fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    logging::init_logging(cli.verbose);

    match cli.command {
        Commands::Run { target, command } => {
            let config = resolve_config(target)?;
            let bootstrapper =
                Bootstrapper::with_config(config).context("Invalid configuration")?;
            let env_file = bootstrapper.config().env_file().to_string();

            let bootstrap = match bootstrapper.bootstrap() {
                Ok(bootstrap) => bootstrap,
                Err(err @ (Error::MissingVariables(_) | Error::EmptyVariables(_))) => {
                    report_failure(&err, &env_file);
                    return Ok(ExitCode::FAILURE);
                }
                Err(err) => return Err(err).context("Failed to bootstrap environment"),
            };

            if bootstrap.created_env_file {
                println!("Created {}.", env_file);
            }
            if bootstrap.generated.is_empty() {
                println!("All required secrets are present in {}.", env_file);
            } else {
                for name in &bootstrap.generated {
                    println!("Generated password for {}.", name);
                }
                println!("Passwords added to {}.", env_file);
            }
            println!("All required variables are set.");

            if command.is_empty() {
                return Ok(ExitCode::SUCCESS);
            }

            io::stdout().flush().context("Failed to flush stdout")?;

            #[cfg(unix)]
            return Err(exec::exec_command(&command, &bootstrap.snapshot))
                .context("Failed to run command");

            #[cfg(not(unix))]
            {
                let status = exec::run_command(&command, &bootstrap.snapshot)
                    .context("Failed to run command")?;
                Ok(ExitCode::from(exit_status(exec::exit_code(status))))
            }
        }

        Commands::Check { target } => {
            let config = resolve_config(target)?;
            let bootstrapper =
                Bootstrapper::with_config(config).context("Invalid configuration")?;
            let env_file = bootstrapper.config().env_file();

            let findings = bootstrapper
                .check()
                .context("Failed to read environment")?;

            for name in &findings.missing_secrets {
                println!("MISSING SECRET: {} (will be generated on run)", name);
            }
            for name in &findings.missing_required {
                println!("ERROR: {} is not set in {}.", name, env_file);
            }
            for name in &findings.empty_required {
                println!("ERROR: {} is empty in {}.", name, env_file);
            }

            if findings.is_clean() {
                println!("Everything required by {} is set.", env_file);
                Ok(ExitCode::SUCCESS)
            } else {
                Ok(ExitCode::FAILURE)
            }
        }

        Commands::Password {
            length,
            special_chars,
        } => {
            let spec = SecretSpec::new("PASSWORD")
                .with_length(length)
                .with_special_chars(special_chars);
            spec.validate().context("Invalid password settings")?;

            println!("{}", generate_password(spec.length(), spec.special_chars()));
            Ok(ExitCode::SUCCESS)
        }

        Commands::Config { config } => {
            let config_path = config.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

            if config_path.exists() {
                let config_obj = load_config(Some(config_path.as_path()))?;
                config_obj
                    .validate()
                    .with_context(|| format!("Invalid configuration in {}", config_path.display()))?;
                println!("Configuration from: {}", config_path.display());
                println!();

                let toml_content = toml::to_string_pretty(&config_obj)
                    .context("Failed to serialize configuration")?;
                println!("{}", toml_content);
            } else {
                println!("Configuration file not found: {}", config_path.display());
                println!("Using default configuration:");
                println!();

                let default_config = Config {
                    env_file: Some(DEFAULT_ENV_FILE.to_string()),
                    ..Default::default()
                };
                let toml_content = toml::to_string_pretty(&default_config)
                    .context("Failed to serialize default configuration")?;
                println!("{}", toml_content);

                println!();
                println!("To create a configuration file, run:");
                println!("  envboot init-config");
            }

            Ok(ExitCode::SUCCESS)
        }

        Commands::InitConfig { output } => {
            let config_path = output.unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));

            if config_path.exists() {
                println!(
                    "Configuration file already exists: {}",
                    config_path.display()
                );
                return Ok(ExitCode::SUCCESS);
            }

            let toml_content = toml::to_string_pretty(&Config::sample())
                .context("Failed to serialize configuration")?;

            std::fs::write(
                &config_path,
                format!(
                    "# Env Bootstrap Configuration\n\
                 # Secrets are generated when absent; required variables must be set by hand.\n\n{}",
                    toml_content
                ),
            )
            .context("Failed to write configuration file")?;

            println!("Created configuration file: {}", config_path.display());
            println!();
            println!("Edit the file to customize your settings:");
            println!("  - env_file: Env file to manage");
            println!("  - required: Variables an operator must provide");
            println!("  - secrets: Variables generated when absent (name, length, special_chars)");

            Ok(ExitCode::SUCCESS)
        }
    }
}
