//! Configuration management for the grabber
//!
//! Everything comes from the environment (a `.env` file is loaded by the
//! binary first). Values are read once at startup and passed down
//! explicitly.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::download::retry::{DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY, RetryPolicy};
use crate::download::{DEFAULT_DOWNLOAD_DIR, DEFAULT_OWNER, DownloadSettings, OwnershipFix};
use crate::{Error, Result};

/// Grabber configuration
#[derive(Debug)]
pub struct Config {
    /// Numeric bot id (`API_ID`)
    pub api_id: i64,

    /// Bot secret (`API_HASH`)
    pub api_hash: SecretString,

    /// Account identifier (`PHONE_NUMBER`)
    pub phone_number: String,

    /// Group username or id to watch (`TARGET_GROUP`)
    pub target_group: String,

    /// Download behaviour
    pub download: DownloadSettings,
}

impl Config {
    /// Load configuration from process environment variables
    ///
    /// # Errors
    ///
    /// Returns error if a required variable is missing or a value is malformed
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup
    ///
    /// Empty values count as missing.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigMissing`] for the first absent required value
    /// (`API_ID`, `API_HASH`, `PHONE_NUMBER`, then `TARGET_GROUP`) and
    /// [`Error::Config`] for values that do not parse
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };
        let require = |key: &'static str| get(key).ok_or(Error::ConfigMissing(key));

        let api_id_raw = require("API_ID")?;
        let api_hash = require("API_HASH")?;
        let phone_number = require("PHONE_NUMBER")?;
        let target_group = require("TARGET_GROUP")?;

        let api_id = api_id_raw
            .parse::<i64>()
            .map_err(|_| Error::Config(format!("API_ID must be numeric, got {api_id_raw:?}")))?;

        let max_attempts = match get("DOWNLOAD_MAX_ATTEMPTS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| {
                    Error::Config(format!(
                        "DOWNLOAD_MAX_ATTEMPTS must be a positive integer, got {raw:?}"
                    ))
                })?,
            None => DEFAULT_MAX_ATTEMPTS,
        };

        let delay = match get("DOWNLOAD_RETRY_DELAY_SECS") {
            Some(raw) => raw.parse::<u64>().map(Duration::from_secs).map_err(|_| {
                Error::Config(format!(
                    "DOWNLOAD_RETRY_DELAY_SECS must be a whole number of seconds, got {raw:?}"
                ))
            })?,
            None => DEFAULT_RETRY_DELAY,
        };

        let ownership_fix = (get("INSIDE_DOCKER").as_deref() == Some("1")).then(|| {
            OwnershipFix::new(get("OWNERSHIP_OWNER").unwrap_or_else(|| DEFAULT_OWNER.to_string()))
        });

        let download = DownloadSettings {
            root: get("DOWNLOAD_DIR")
                .map_or_else(|| PathBuf::from(DEFAULT_DOWNLOAD_DIR), PathBuf::from),
            retry: RetryPolicy {
                max_attempts,
                delay,
            },
            ownership_fix,
            show_progress: true,
        };

        Ok(Self {
            api_id,
            api_hash: SecretString::from(api_hash),
            phone_number,
            target_group,
            download,
        })
    }
}
