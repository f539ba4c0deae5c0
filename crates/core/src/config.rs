//! Run configuration.
//!
//! # Example
//!
//! ```rust
//! use sitescout_core::ScoutConfig;
//!
//! let config = ScoutConfig::builder()
//!     .max_iterations(10)
//!     .max_articles(20)
//!     .sample_count(3)
//!     .build();
//! assert!(config.validate().is_ok());
//! ```

use crate::agent::{AgentConfig, DEFAULT_MAX_ARTICLES, DEFAULT_MAX_ITERATIONS, STAGNATION_LIMIT};
use crate::fetch::FetchConfig;
use crate::refine::DEFAULT_MAX_RETRIES;
use crate::retry::RetryPolicy;
use crate::{Result, ScoutError};

/// Default number of article pages sampled for validation.
pub const DEFAULT_SAMPLE_COUNT: usize = 5;

/// Every caller-overridable knob of a generation run.
#[derive(Debug, Clone)]
pub struct ScoutConfig {
    /// THINK steps per exploration (default: 15).
    pub max_iterations: u32,

    /// Article ceiling; reaching it stops exploration (default: 30).
    pub max_articles: usize,

    /// Revisions after the initial selector proposal (default: 2).
    pub max_retries: u32,

    /// Article pages fetched for validation (default: 5).
    pub sample_count: usize,

    /// Iterations without a new article before giving up (default: 3).
    pub stagnation_limit: u32,

    /// Retry policy for Reasoner calls.
    pub retry: RetryPolicy,

    /// HTTP settings for page fetches.
    pub fetch: FetchConfig,
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_articles: DEFAULT_MAX_ARTICLES,
            max_retries: DEFAULT_MAX_RETRIES,
            sample_count: DEFAULT_SAMPLE_COUNT,
            stagnation_limit: STAGNATION_LIMIT,
            retry: RetryPolicy::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ScoutConfig {
    /// Creates a new builder for ScoutConfig.
    pub fn builder() -> ScoutConfigBuilder {
        ScoutConfigBuilder::new()
    }

    /// Reject limits that can never produce a result.
    pub fn validate(&self) -> Result<()> {
        if self.max_iterations == 0 {
            return Err(ScoutError::InvalidInput("max_iterations must be at least 1".to_string()));
        }
        if self.max_articles == 0 {
            return Err(ScoutError::InvalidInput("max_articles must be at least 1".to_string()));
        }
        if self.sample_count == 0 {
            return Err(ScoutError::InvalidInput("sample_count must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Limits for the exploration agent.
    pub fn agent(&self) -> AgentConfig {
        AgentConfig {
            max_iterations: self.max_iterations,
            max_articles: self.max_articles,
            stagnation_limit: self.stagnation_limit,
            retry: self.retry,
        }
    }
}

/// Builder for ScoutConfig.
pub struct ScoutConfigBuilder {
    config: ScoutConfig,
}

impl ScoutConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ScoutConfig::default() }
    }

    pub fn max_iterations(mut self, value: u32) -> Self {
        self.config.max_iterations = value;
        self
    }

    pub fn max_articles(mut self, value: usize) -> Self {
        self.config.max_articles = value;
        self
    }

    pub fn max_retries(mut self, value: u32) -> Self {
        self.config.max_retries = value;
        self
    }

    pub fn sample_count(mut self, value: usize) -> Self {
        self.config.sample_count = value;
        self
    }

    pub fn stagnation_limit(mut self, value: u32) -> Self {
        self.config.stagnation_limit = value;
        self
    }

    /// Sets the retry policy for Reasoner calls.
    pub fn retry(mut self, value: RetryPolicy) -> Self {
        self.config.retry = value;
        self
    }

    /// Sets the HTTP settings for page fetches.
    pub fn fetch(mut self, value: FetchConfig) -> Self {
        self.config.fetch = value;
        self
    }

    /// Builds the config.
    pub fn build(self) -> ScoutConfig {
        self.config
    }
}

impl Default for ScoutConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
