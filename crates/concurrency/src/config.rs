//! Database configuration and retry behavior
//!
//! `DatabaseConfig` can be loaded from a TOML file. Every key is optional;
//! missing keys take their defaults.
//!
//! ```toml
//! # Maximum retry attempts for conflicting transactions
//! max_retries = 5
//! # Exponential backoff base and cap, in milliseconds
//! base_delay_ms = 10
//! max_delay_ms = 100
//! # Number of recent commits kept for conflict detection
//! history_limit = 1024
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use stored_core::{Result, StoredError};

// ============================================================================
// Retry Configuration
// ============================================================================

/// Configuration for transaction retry behavior
///
/// Transactions that fail with a retryable error (a commit conflict or a
/// read version older than retained history) are re-run after an
/// exponentially growing delay.
///
/// # Example
/// ```
/// use stored_concurrency::RetryConfig;
/// let config = RetryConfig::new().with_max_retries(5).with_base_delay_ms(1);
/// assert_eq!(config.max_retries, 5);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of retry attempts (0 = no retries)
    pub max_retries: usize,
    /// Base delay between retries in milliseconds (exponential backoff)
    pub base_delay_ms: u64,
    /// Maximum delay between retries in milliseconds
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 10,
            max_delay_ms: 100,
        }
    }
}

impl RetryConfig {
    /// Create a new RetryConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a RetryConfig with no retries
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    /// Set maximum number of retries
    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set base delay for exponential backoff
    pub fn with_base_delay_ms(mut self, base_delay_ms: u64) -> Self {
        self.base_delay_ms = base_delay_ms;
        self
    }

    /// Set maximum delay between retries
    pub fn with_max_delay_ms(mut self, max_delay_ms: u64) -> Self {
        self.max_delay_ms = max_delay_ms;
        self
    }

    /// Calculate delay for a given attempt (exponential backoff)
    pub fn calculate_delay(&self, attempt: usize) -> Duration {
        // Cap the shift to prevent overflow (1 << 63 is the max for u64)
        let shift = attempt.min(63);
        let multiplier = 1u64 << shift;
        let delay_ms = self.base_delay_ms.saturating_mul(multiplier);
        Duration::from_millis(delay_ms.min(self.max_delay_ms))
    }
}

// ============================================================================
// Database Configuration
// ============================================================================

/// Configuration for a [`MemoryDatabase`](crate::MemoryDatabase)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// Maximum retry attempts per transaction
    pub max_retries: usize,
    /// Backoff base delay in milliseconds
    pub base_delay_ms: u64,
    /// Backoff delay cap in milliseconds
    pub max_delay_ms: u64,
    /// Number of recent commits retained for conflict detection
    pub history_limit: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let retry = RetryConfig::default();
        Self {
            max_retries: retry.max_retries,
            base_delay_ms: retry.base_delay_ms,
            max_delay_ms: retry.max_delay_ms,
            history_limit: 1024,
        }
    }
}

impl DatabaseConfig {
    /// Retry policy described by this config
    pub fn retry(&self) -> RetryConfig {
        RetryConfig {
            max_retries: self.max_retries,
            base_delay_ms: self.base_delay_ms,
            max_delay_ms: self.max_delay_ms,
        }
    }

    /// Parse config from TOML text
    ///
    /// # Errors
    ///
    /// Returns `StoredError::Config` if the text is not valid TOML, a value
    /// has the wrong type, or `history_limit` is zero.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: DatabaseConfig = toml::from_str(content)
            .map_err(|e| StoredError::Config(format!("invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse config from a file path
    ///
    /// # Errors
    ///
    /// Returns `StoredError::Config` if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StoredError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    fn validate(&self) -> Result<()> {
        if self.history_limit == 0 {
            return Err(StoredError::Config(
                "history_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
