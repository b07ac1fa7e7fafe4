/// `load_config` module: gathers credentials and tunables into a strongly-typed [`Settings`].
///
/// # Sources, in order
/// 1. An optional YAML settings file with the non-secret tunables
///    (`api_base_url`, `pause_secs`, `request_timeout_secs`). Unknown keys are rejected.
/// 2. Environment variables for the API token and both database connections.
///    `.env` files are loaded by `main` before this runs.
/// 3. An interactive prompt for any environment value that is absent or empty,
///    when a [`Prompter`] is able to ask.
///
/// # Errors
/// A value that is still missing after prompting fails with
/// [`SyncError::ConfigMissing`]; an unparsable port fails with
/// [`SyncError::ConfigInvalid`]. Both surface as `anyhow::Error` at the CLI boundary
/// and abort the run before any database or network work.
use std::fmt;
use std::fs;
use std::io::IsTerminal;
use std::path::Path;
use std::time::Duration;

use anyhow::Result;
use coverage_sync_core::config::SynchroniseConfig;
use coverage_sync_core::error::SyncError;
use serde::Deserialize;
use tracing::{error, info, warn};

pub const ENV_API_TOKEN: &str = "CODACY_API_TOKEN";
pub const ENV_DB_HOST: &str = "DB_HOST";
pub const ENV_DB_USERNAME: &str = "DB_USERNAME";
pub const ENV_DB_PASSWORD: &str = "DB_PASSWORD";
pub const ENV_DB_ANALYSIS_NAME: &str = "DB_ANALYSIS_NAME";
pub const ENV_DB_ACCOUNTS_NAME: &str = "DB_ACCOUNTS_NAME";
pub const ENV_DB_PORT: &str = "DB_PORT";

pub const DEFAULT_API_BASE_URL: &str = "https://api.codacy.com";

/// Tunables read from the optional YAML file.
#[derive(Debug, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileSettings {
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_pause_secs")]
    pub pause_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl Default for FileSettings {
    fn default() -> Self {
        Self {
            api_base_url: default_api_base_url(),
            pause_secs: default_pause_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_pause_secs() -> u64 {
    1
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Connection details shared by the analysis and accounts databases.
#[derive(Clone, PartialEq)]
pub struct DatabaseSettings {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    /// Database holding the coverage rows.
    pub analysis_db: String,
    /// Database holding projects and organizations.
    pub accounts_db: String,
}

impl fmt::Debug for DatabaseSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseSettings")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("analysis_db", &self.analysis_db)
            .field("accounts_db", &self.accounts_db)
            .finish()
    }
}

/// Everything a run needs, fully resolved.
#[derive(Clone)]
pub struct Settings {
    pub api_token: String,
    pub database: DatabaseSettings,
    pub api_base_url: String,
    pub pause: Duration,
    pub request_timeout: Duration,
}

impl Settings {
    pub fn synchronise_config(&self) -> SynchroniseConfig {
        SynchroniseConfig::new(self.api_token.clone()).with_pause(self.pause)
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("api_token", &"<redacted>")
            .field("database", &self.database)
            .field("api_base_url", &self.api_base_url)
            .field("pause", &self.pause)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}

/// Asks the operator for a value that the environment did not provide.
pub trait Prompter {
    /// Returns `None` when no answer can be obtained.
    fn ask(&self, variable: &str, message: &str, secret: bool) -> Option<String>;
}

/// Prompts on the terminal, or declines when stdin is not a terminal.
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn ask(&self, variable: &str, message: &str, secret: bool) -> Option<String> {
        if !std::io::stdin().is_terminal() {
            return None;
        }
        let answer = if secret {
            dialoguer::Password::new().with_prompt(message).interact()
        } else {
            dialoguer::Input::<String>::new()
                .with_prompt(message)
                .interact_text()
        };
        match answer {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(error = %e, variable, "Prompt for configuration value failed");
                None
            }
        }
    }
}

/// Never prompts; used with `--no-prompt` and in tests.
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&self, _variable: &str, _message: &str, _secret: bool) -> Option<String> {
        None
    }
}

/// Loads settings from the optional file, the process environment and `prompter`.
pub fn load_config(path: Option<&Path>, prompter: &dyn Prompter) -> Result<Settings> {
    load_config_with(path, |key| std::env::var(key).ok(), prompter)
}

/// Same as [`load_config`] with an injectable environment lookup.
pub fn load_config_with<E>(path: Option<&Path>, env: E, prompter: &dyn Prompter) -> Result<Settings>
where
    E: Fn(&str) -> Option<String>,
{
    let file = match path {
        Some(path) => read_settings_file(path)?,
        None => {
            info!("No settings file given, using defaults");
            FileSettings::default()
        }
    };

    let lookup = |variable: &str, message: &str, secret: bool| -> Result<String> {
        if let Some(value) = env(variable).filter(|v| !v.is_empty()) {
            info!(variable, "Configuration value found in env");
            return Ok(value);
        }
        match prompter.ask(variable, message, secret).filter(|v| !v.is_empty()) {
            Some(value) => {
                info!(variable, "Configuration value provided at prompt");
                Ok(value)
            }
            None => {
                error!(variable, "Configuration value not set and could not be prompted for");
                Err(SyncError::ConfigMissing {
                    variable: variable.to_string(),
                }
                .into())
            }
        }
    };

    let api_token = lookup(ENV_API_TOKEN, "Your Codacy API Token", true)?;
    let host = lookup(ENV_DB_HOST, "Your Postgres DB Host", false)?;
    let username = lookup(ENV_DB_USERNAME, "Your Postgres DB Username", false)?;
    let password = lookup(ENV_DB_PASSWORD, "Your Postgres DB Password", true)?;
    let analysis_db = lookup(ENV_DB_ANALYSIS_NAME, "Your Postgres Analysis DB Name", false)?;
    let accounts_db = lookup(ENV_DB_ACCOUNTS_NAME, "Your Postgres Accounts DB Name", false)?;
    let port_raw = lookup(ENV_DB_PORT, "Your Postgres DB Port", false)?;

    let port = match port_raw.trim().parse::<u16>() {
        Ok(port) => port,
        Err(e) => {
            error!(error = ?e, raw = %port_raw, "DB_PORT must be a valid port number");
            return Err(SyncError::ConfigInvalid {
                variable: ENV_DB_PORT.to_string(),
                reason: e.to_string(),
            }
            .into());
        }
    };

    let settings = Settings {
        api_token,
        database: DatabaseSettings {
            host,
            port,
            username,
            password,
            analysis_db,
            accounts_db,
        },
        api_base_url: file.api_base_url,
        pause: Duration::from_secs(file.pause_secs),
        request_timeout: Duration::from_secs(file.request_timeout_secs),
    };

    info!(
        db_host = %settings.database.host,
        db_port = settings.database.port,
        api_base_url = %settings.api_base_url,
        "Config loaded and merged successfully"
    );
    Ok(settings)
}

fn read_settings_file(path: &Path) -> Result<FileSettings> {
    info!(config_path = ?path, "Loading settings from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read settings file");
            return Err(anyhow::anyhow!("Failed to read settings file {:?}: {}", path, e));
        }
    };

    // An empty file means "all defaults".
    if content.trim().is_empty() {
        return Ok(FileSettings::default());
    }

    match serde_yaml::from_str(&content) {
        Ok(settings) => {
            info!(config_path = ?path, "Parsed settings YAML successfully");
            Ok(settings)
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse settings YAML");
            Err(anyhow::anyhow!("Failed to parse settings YAML: {e}"))
        }
    }
}
