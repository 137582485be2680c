//! Graveyard configuration
//!
//! All tunable parameters in one place. Loaded from TOML at startup,
//! falls back to defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GraveyardConfig {
    /// Account rules (admin allow-list).
    pub accounts: AccountsConfig,
    /// Project field limits.
    pub projects: ProjectsConfig,
    /// Commentary limits.
    pub notes: NotesConfig,
    /// Leaderboard sizing.
    pub leaderboard: LeaderboardConfig,
    /// Event fan-out.
    pub notifier: NotifierConfig,
    /// Ledger persistence.
    pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AccountsConfig {
    /// Emails promoted to admin at sign-up / log-in. Compared case-insensitively.
    pub admin_emails: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProjectsConfig {
    pub max_title_chars: usize,
    pub max_description_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotesConfig {
    pub max_body_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LeaderboardConfig {
    /// Entries returned when the caller does not ask for a size.
    pub default_limit: usize,
    /// Hard cap on requested sizes.
    pub max_limit: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifierConfig {
    /// Broadcast buffer per subscriber. Slow subscribers lag and drop old events.
    pub channel_capacity: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Ledger snapshot file. `None` keeps the ledger in memory only.
    pub snapshot_path: Option<PathBuf>,
}

// ============================================================
// Defaults
// ============================================================

impl Default for ProjectsConfig {
    fn default() -> Self {
        Self { max_title_chars: 120, max_description_chars: 10_000 }
    }
}

impl Default for NotesConfig {
    fn default() -> Self {
        Self { max_body_chars: 4_000 }
    }
}

impl Default for LeaderboardConfig {
    fn default() -> Self {
        Self { default_limit: 10, max_limit: 100 }
    }
}

impl Default for NotifierConfig {
    fn default() -> Self {
        Self { channel_capacity: 256 }
    }
}

// ============================================================
// Loading
// ============================================================

impl GraveyardConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match Self::from_toml(&content) {
                Ok(config) => {
                    tracing::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    tracing::warn!("Failed to parse {}: {} — using defaults", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => {
                tracing::info!("No config at {} — using defaults", path.display());
                Self::default()
            }
        }
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| Error::ConfigError(e.to_string()))
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    pub fn admin_allow_list(&self) -> AdminAllowList {
        AdminAllowList::new(self.accounts.admin_emails.iter())
    }

    pub fn leaderboard_limit(&self, requested: Option<usize>) -> usize {
        self.leaderboard.resolve(requested)
    }
}

impl LeaderboardConfig {
    /// Resolve a requested leaderboard size against the configured default and cap.
    pub fn resolve(&self, requested: Option<usize>) -> usize {
        requested.unwrap_or(self.default_limit).min(self.max_limit)
    }
}

/// Normalize an email for storage and comparison.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Emails that are promoted to admin. Injected into the accounts service.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdminAllowList {
    emails: BTreeSet<String>,
}

impl AdminAllowList {
    pub fn new<I, S>(emails: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            emails: emails
                .into_iter()
                .map(|e| normalize_email(e.as_ref()))
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    pub fn contains(&self, email: &str) -> bool {
        self.emails.contains(&normalize_email(email))
    }

    pub fn len(&self) -> usize {
        self.emails.len()
    }

    pub fn is_empty(&self) -> bool {
        self.emails.is_empty()
    }
}
