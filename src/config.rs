use anyhow::{Context, Result};
use dirs::config_dir;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::discovery::DirLayout;
use crate::error::ConfigError;
use crate::github::{ListingRequest, ListingScope, DEFAULT_API};
use crate::mask::REDACTED;
use crate::retry::{RetryScheduler, RetrySettings};

/// Settings file contents. Every section is optional.
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq, Eq)]
pub struct Settings {
    /// Account, credentials and what to list
    #[serde(default)]
    pub github: GitHubSettings,

    /// Where and how mirrors are written
    #[serde(default)]
    pub backup: BackupSettings,

    /// Backoff between sync attempts
    #[serde(default)]
    pub retry: RetrySettings,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// GitHub account and listing configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct GitHubSettings {
    /// User or organization to back up
    pub account: Option<String>,

    /// Token or password
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret: Option<String>,

    /// API base URL, for GitHub Enterprise
    #[serde(default = "default_api_url")]
    pub api_url: String,

    #[serde(default)]
    pub scope: ListingScope,

    /// Keep only repositories owned by `account` (authenticated scope)
    #[serde(default)]
    pub owner_filter: bool,

    /// Ask the API for owned repositories only
    #[serde(default)]
    pub owned_only: bool,
}

/// Backup target configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct BackupSettings {
    /// Target directory for the mirrors
    pub directory: Option<String>,

    /// Maximum parallel syncs
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// `flat` or `nested`, derived from the scope when unset
    pub layout: Option<DirLayout>,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
pub struct LoggingSettings {
    /// Log level
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default value functions
fn default_api_url() -> String {
    DEFAULT_API.to_string()
}
fn default_workers() -> usize {
    10
}
fn default_log_level() -> String {
    "info".to_string()
}

impl Default for GitHubSettings {
    fn default() -> Self {
        Self {
            account: None,
            secret: None,
            api_url: default_api_url(),
            scope: ListingScope::default(),
            owner_filter: false,
            owned_only: false,
        }
    }
}

impl Default for BackupSettings {
    fn default() -> Self {
        Self {
            directory: None,
            workers: default_workers(),
            layout: None,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

/// Command line values that take precedence over the settings file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub directory: Option<String>,
    pub account: Option<String>,
    pub secret: Option<String>,
    pub api_url: Option<String>,
    pub workers: Option<usize>,
    pub scope: Option<ListingScope>,
    pub owner_filter: bool,
    pub owned_only: bool,
    pub layout: Option<DirLayout>,
}

impl Settings {
    /// Load the given file, or the default one when it exists.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }

        let config_path = Self::default_config_path()?;
        if config_path.exists() {
            tracing::debug!("Using settings from {:?}", config_path);
            Self::load(&config_path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load settings from a specific file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {:?}", path))?;

        let mut settings: Settings = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {:?}", path))?;

        settings.expand_paths()?;

        Ok(settings)
    }

    /// Save settings to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_yaml::to_string(self).context("Failed to serialize configuration")?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory: {:?}", parent))?;
        }
        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file: {:?}", path))?;

        Ok(())
    }

    /// Get the default settings file path (XDG compliant)
    pub fn default_config_path() -> Result<PathBuf> {
        let config_dir = config_dir().context("Failed to get user config directory")?;

        Ok(config_dir.join("ghbackup").join("config.yml"))
    }

    /// Expand `~` and environment variables in the target directory
    pub fn expand_paths(&mut self) -> Result<(), ConfigError> {
        if let Some(directory) = &self.backup.directory {
            self.backup.directory = Some(expand(directory)?);
        }
        Ok(())
    }

    /// Apply command line values on top of the file settings.
    pub fn apply(&mut self, overrides: Overrides) -> Result<(), ConfigError> {
        if let Some(directory) = overrides.directory {
            self.backup.directory = Some(expand(&directory)?);
        }
        if overrides.account.is_some() {
            self.github.account = overrides.account;
        }
        if overrides.secret.is_some() {
            self.github.secret = overrides.secret;
        }
        if let Some(api_url) = overrides.api_url {
            self.github.api_url = api_url;
        }
        if let Some(workers) = overrides.workers {
            self.backup.workers = workers;
        }
        if let Some(scope) = overrides.scope {
            self.github.scope = scope;
        }
        self.github.owner_filter |= overrides.owner_filter;
        self.github.owned_only |= overrides.owned_only;
        if overrides.layout.is_some() {
            self.backup.layout = overrides.layout;
        }
        Ok(())
    }
}

fn expand(path: &str) -> Result<String, ConfigError> {
    shellexpand::full(path)
        .map(|p| p.into_owned())
        .map_err(|e| ConfigError::Expand {
            path: path.to_string(),
            reason: e.to_string(),
        })
}

/// Account name and credentials. `Debug` never shows the secret.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Account {
    name: Option<String>,
    secret: Option<String>,
}

impl Account {
    /// Empty strings count as absent.
    pub fn new(name: Option<String>, secret: Option<String>) -> Self {
        Self {
            name: name.filter(|n| !n.trim().is_empty()),
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn secret(&self) -> Option<&str> {
        self.secret.as_deref()
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("name", &self.name)
            .field("secret", &self.secret.as_ref().map(|_| REDACTED))
            .finish()
    }
}

/// Validated, immutable configuration of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub account: Account,
    pub directory: PathBuf,
    pub api_url: Url,
    pub workers: usize,
    pub scope: ListingScope,
    pub owner_filter: bool,
    pub owned_only: bool,
    pub layout: DirLayout,
    pub retry: RetryScheduler,
}

impl RunConfig {
    /// Apply defaults and validate.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        let directory = settings
            .backup
            .directory
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .ok_or(ConfigError::MissingDirectory)?;

        let account = Account::new(
            settings.github.account.clone(),
            settings.github.secret.clone(),
        );
        if account.name().is_none() && account.secret().is_none() {
            return Err(ConfigError::MissingAccountOrSecret);
        }

        let api_url = parse_api_url(&settings.github.api_url)?;

        if settings.backup.workers == 0 {
            return Err(ConfigError::Invalid(
                "workers must be at least 1".to_string(),
            ));
        }

        let scope = settings.github.scope;
        match scope {
            ListingScope::Account if account.name().is_none() => {
                return Err(ConfigError::Invalid(
                    "listing an account's repositories needs an account name".to_string(),
                ))
            }
            ListingScope::Authenticated if account.secret().is_none() => {
                return Err(ConfigError::Invalid(
                    "listing the authenticated user's repositories needs a secret".to_string(),
                ))
            }
            ListingScope::Authenticated
                if settings.github.owner_filter && account.name().is_none() =>
            {
                return Err(ConfigError::Invalid(
                    "the owner filter needs an account name".to_string(),
                ))
            }
            _ => {}
        }

        let single_owner = match scope {
            ListingScope::Account => true,
            ListingScope::Authenticated => settings.github.owner_filter,
        };
        let layout = match settings.backup.layout {
            Some(DirLayout::Flat) if !single_owner => {
                return Err(ConfigError::Invalid(
                    "the flat layout needs a listing restricted to one owner".to_string(),
                ))
            }
            Some(layout) => layout,
            None if single_owner => DirLayout::Flat,
            None => DirLayout::Nested,
        };

        // Child processes run in other directories, so relative targets are anchored here.
        let directory =
            std::path::absolute(directory).map_err(|e| ConfigError::Expand {
                path: directory.to_string(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            account,
            directory,
            api_url,
            workers: settings.backup.workers,
            scope,
            owner_filter: settings.github.owner_filter,
            owned_only: settings.github.owned_only,
            layout,
            retry: settings.retry.to_scheduler()?,
        })
    }

    /// What the repository lister should fetch.
    pub fn listing_request(&self) -> ListingRequest {
        ListingRequest {
            scope: self.scope,
            account: self.account.name().map(str::to_string),
            owner_filter: self.owner_filter,
            owned_only: self.owned_only,
        }
    }
}

fn parse_api_url(value: &str) -> Result<Url, ConfigError> {
    let invalid = |reason: String| ConfigError::InvalidApiUrl {
        url: value.to_string(),
        reason,
    };
    let url = Url::parse(value.trim()).map_err(|e| invalid(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(format!("unsupported scheme `{}`", url.scheme())));
    }
    Ok(url)
}
