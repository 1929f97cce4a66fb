//! Connection parameters and retry policy.
//!
//! The core needs only three connection settings: the repository, an
//! access token and a branch. They travel in an explicit
//! [`ConnectionConfig`] rather than ambient process state.

use core::fmt;
use core::time::Duration;

use secrecy::{ExposeSecret as _, SecretString};

use crate::error::{LedgerError, Result};

/// Default content API base URL.
pub const DEFAULT_API_BASE: &str = "https://api.github.com";

/// Branch used when none is configured.
pub const DEFAULT_BRANCH: &str = "main";

/// Environment variable holding the `owner/name` repository identifier.
pub const ENV_REPOSITORY: &str = "REPO_LEDGER_REPOSITORY";

/// Environment variable holding the access token.
pub const ENV_TOKEN: &str = "REPO_LEDGER_TOKEN";

/// Environment variable holding the branch name.
pub const ENV_BRANCH: &str = "REPO_LEDGER_BRANCH";

/// Environment variable overriding the API base URL.
pub const ENV_API_BASE: &str = "REPO_LEDGER_API_BASE";

/// Settings needed to reach one branch of one repository.
///
/// The token is held as a [`SecretString`] so it never appears in
/// `Debug` output or logs.
#[derive(Debug)]
pub struct ConnectionConfig {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Personal access token.
    pub token: SecretString,
    /// Branch the documents live on.
    pub branch: String,
    /// Content API base URL.
    pub api_base: String,
}

impl ConnectionConfig {
    /// Creates a configuration for `repository` on the default branch.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InvalidArgument`] if `repository` is not in
    /// `owner/name` form.
    pub fn new<R: Into<String>, T: Into<String>>(repository: R, token: T) -> Result<Self> {
        let slug: String = repository.into();
        validate_repository(&slug)?;
        Ok(Self {
            repository: slug,
            token: SecretString::from(token.into()),
            branch: DEFAULT_BRANCH.to_owned(),
            api_base: DEFAULT_API_BASE.to_owned(),
        })
    }

    /// Sets the branch.
    #[inline]
    #[must_use]
    pub fn with_branch<S: Into<String>>(mut self, branch: S) -> Self {
        self.branch = branch.into();
        self
    }

    /// Overrides the API base URL.
    #[inline]
    #[must_use]
    pub fn with_api_base<S: Into<String>>(mut self, api_base: S) -> Self {
        self.api_base = api_base.into();
        self
    }

    /// Reads the configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::MissingSetting`] if the repository or token
    /// variable is unset or empty, and [`LedgerError::InvalidArgument`]
    /// if the repository is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup.
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());
        let repository = non_empty(ENV_REPOSITORY).ok_or(LedgerError::MissingSetting(ENV_REPOSITORY))?;
        let token = non_empty(ENV_TOKEN).ok_or(LedgerError::MissingSetting(ENV_TOKEN))?;
        let mut config = Self::new(repository.trim(), token.trim())?;
        config.branch = non_empty(ENV_BRANCH)
            .map_or_else(|| DEFAULT_BRANCH.to_owned(), |raw| raw.trim().to_owned());
        config.api_base = non_empty(ENV_API_BASE).map_or_else(
            || DEFAULT_API_BASE.to_owned(),
            |raw| raw.trim().trim_end_matches('/').to_owned(),
        );
        Ok(config)
    }

    /// Exposes the token for building an authorization header.
    #[inline]
    pub(crate) fn token(&self) -> &str {
        self.token.expose_secret()
    }

    /// Cache key identifying this repository and branch.
    #[inline]
    #[must_use]
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey {
            repository: self.repository.clone(),
            branch: self.branch.clone(),
        }
    }
}

/// Checks that `repository` looks like `owner/name`.
pub(crate) fn validate_repository(repository: &str) -> Result<()> {
    let mut parts = repository.split('/');
    let valid = matches!(
        (parts.next(), parts.next(), parts.next()),
        (Some(owner), Some(name), None) if !owner.is_empty() && !name.is_empty()
    );
    if valid {
        Ok(())
    } else {
        Err(LedgerError::InvalidArgument(format!(
            "repository must be in owner/name form, got {repository:?}"
        )))
    }
}

/// Identity of a document set, used to key cached loads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionKey {
    /// Repository in `owner/name` form.
    pub repository: String,
    /// Branch name.
    pub branch: String,
}

impl ConnectionKey {
    /// Creates a key from its parts.
    #[inline]
    #[must_use]
    pub fn new<R: Into<String>, B: Into<String>>(repository: R, branch: B) -> Self {
        Self {
            repository: repository.into(),
            branch: branch.into(),
        }
    }
}

impl fmt::Display for ConnectionKey {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.repository, self.branch)
    }
}

/// Bounds and delays for request retries and rate-limit waits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after a timeout or transport error.
    pub max_retries: u32,
    /// Fixed delay between transport retries.
    pub retry_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Lower bound of a burst-limit wait.
    pub burst_wait_min: Duration,
    /// Upper bound of a burst-limit wait.
    pub burst_wait_max: Duration,
    /// Upper bound of the jitter added to a quota reset wait.
    pub reset_jitter_max: Duration,
    /// Consecutive rate-limit waits before giving up.
    pub max_rate_limit_waits: u32,
}

impl Default for RetryPolicy {
    #[inline]
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(15),
            burst_wait_min: Duration::from_secs(2),
            burst_wait_max: Duration::from_secs(6),
            reset_jitter_max: Duration::from_secs(2),
            max_rate_limit_waits: 5,
        }
    }
}

impl RetryPolicy {
    /// A policy with the default bounds and no delays.
    #[inline]
    #[must_use]
    pub fn immediate() -> Self {
        Self {
            retry_delay: Duration::ZERO,
            burst_wait_min: Duration::ZERO,
            burst_wait_max: Duration::ZERO,
            reset_jitter_max: Duration::ZERO,
            ..Self::default()
        }
    }
}
