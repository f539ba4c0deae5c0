//! Error types for sitescout operations.
//!
//! This module defines the main error type [`ScoutError`]. Transport failures
//! met during exploration never surface here: they are recorded as negative
//! observations. What does surface is configuration misuse, exhausted
//! Reasoner retries, and failures of the outer pipeline.
//!
//! # Example
//!
//! ```rust
//! use sitescout_core::{ScoutError, Result};
//!
//! fn require_samples(count: usize) -> Result<()> {
//!     if count == 0 {
//!         return Err(ScoutError::InvalidInput("no sample pages".to_string()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use thiserror::Error;

use crate::agent::ExplorationState;
use crate::refine::RefinementAttempt;

/// Main error type for exploration, validation and generation.
///
/// Every variant is a *hard* failure. Soft outcomes (SPA detection, a
/// best-effort selector set) are reported through
/// [`Outcome`](crate::pipeline::Outcome) instead.
#[derive(Error, Debug)]
pub enum ScoutError {
    /// HTTP request errors from reqwest.
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Non-success HTTP status.
    #[error("HTTP status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Caller passed arguments that can never produce a result,
    /// such as an empty sample set or a zero article ceiling.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The Reasoner failed or returned something that could not be parsed.
    ///
    /// `transient` marks failures worth retrying (timeouts, rate limits,
    /// malformed responses).
    #[error("Reasoner error: {message}")]
    Reasoner { message: String, transient: bool },

    /// The exploration run aborted because the Reasoner kept failing.
    ///
    /// Carries the partial state so callers can inspect what was found.
    #[error("Exploration aborted after {} iterations: {source}", .partial.iterations)]
    Exploration {
        partial: Box<ExplorationState>,
        #[source]
        source: Box<ScoutError>,
    },

    /// The refinement loop aborted because the Reasoner kept failing.
    ///
    /// Carries the best attempt validated before the failure.
    #[error("Refinement aborted at attempt {}: {source}", .best.number)]
    RefinementAborted {
        best: Box<RefinementAttempt>,
        #[source]
        source: Box<ScoutError>,
    },

    /// Selector proposal or refinement failed after exploration succeeded.
    ///
    /// `partial` is the finished exploration with `usage` covering every
    /// stage that completed; `best` is the best validated attempt, if any.
    #[error("Generation aborted for {} after exploration: {source}", .partial.base_url)]
    Generation {
        partial: Box<ExplorationState>,
        best: Option<Box<RefinementAttempt>>,
        #[source]
        source: Box<ScoutError>,
    },

    /// Exploration finished without a single confirmed article.
    #[error("No article URLs found on {base_url}")]
    NoArticles { base_url: String },

    /// None of the sampled article pages could be fetched.
    #[error("No sample pages could be fetched for {base_url}")]
    NoSamples { base_url: String },

    /// A local page directory or file does not exist.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Serialization of a report failed.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// File write errors.
    #[error("Failed to write to file: {0}")]
    WriteError(#[from] std::io::Error),
}

impl ScoutError {
    /// Shorthand for a Reasoner error worth retrying.
    pub fn transient(message: impl Into<String>) -> Self {
        ScoutError::Reasoner { message: message.into(), transient: true }
    }

    /// Exploration state carried by an aborted run, if any.
    pub fn partial_state(&self) -> Option<&ExplorationState> {
        match self {
            ScoutError::Exploration { partial, .. } | ScoutError::Generation { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// Whether the failure is worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            ScoutError::Timeout { .. } => true,
            ScoutError::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            ScoutError::HttpError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            ScoutError::Reasoner { transient, .. } => *transient,
            _ => false,
        }
    }
}

/// Result type alias for ScoutError.
pub type Result<T> = std::result::Result<T, ScoutError>;
