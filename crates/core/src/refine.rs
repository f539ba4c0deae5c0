//! The validate-and-revise loop.
//!
//! [`RefinementController::refine`] validates a selector set, and while it is
//! not accepted and the retry budget lasts, asks the Reasoner to replace the
//! failing fields. Every attempt is kept unchanged; the best one is returned.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::reasoner::{ProposalContext, Reasoner, TokenUsage};
use crate::retry::{RetryPolicy, retry};
use crate::selectors::{Field, SelectorSet};
use crate::validate::{SamplePage, SelectorValidator, ValidationResult};
use crate::{Result, ScoutError};

/// Default number of revisions after the initial attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// One validated selector set. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementAttempt {
    /// 1-based attempt number.
    pub number: u32,
    pub selectors: SelectorSet,
    pub validation: ValidationResult,
}

/// Result of a refinement run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefinementOutcome {
    pub attempts: Vec<RefinementAttempt>,
    /// Index of the best attempt in `attempts`.
    pub best_index: usize,
    pub accepted: bool,
    /// Fields still failing in the best attempt.
    pub failing_fields: Vec<Field>,
    pub warnings: Vec<String>,
    /// Tokens spent on revisions.
    pub usage: TokenUsage,
}

impl RefinementOutcome {
    pub fn best(&self) -> &RefinementAttempt {
        &self.attempts[self.best_index]
    }
}

/// Index of the best attempt: an accepted one if any, else the highest
/// score, the earliest attempt winning ties.
pub fn best_attempt(attempts: &[RefinementAttempt]) -> Option<usize> {
    if let Some(i) = attempts.iter().position(|a| a.validation.accepted) {
        return Some(i);
    }
    let mut best: Option<usize> = None;
    for (i, attempt) in attempts.iter().enumerate() {
        match best {
            Some(b) if attempts[b].validation.score >= attempt.validation.score => {}
            _ => best = Some(i),
        }
    }
    best
}

/// Runs the validate-and-revise loop.
pub struct RefinementController {
    reasoner: Arc<dyn Reasoner>,
    validator: SelectorValidator,
    max_retries: u32,
    retry: RetryPolicy,
}

impl RefinementController {
    pub fn new(reasoner: Arc<dyn Reasoner>, max_retries: u32) -> Self {
        Self { reasoner, validator: SelectorValidator::default(), max_retries, retry: RetryPolicy::default() }
    }

    pub fn with_validator(mut self, validator: SelectorValidator) -> Self {
        self.validator = validator;
        self
    }

    /// Retry policy for Reasoner calls.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Refine `initial` against `samples`.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::InvalidInput`] for an empty or article-less sample set.
    /// - [`ScoutError::RefinementAborted`] when the Reasoner keeps failing;
    ///   it carries the best attempt validated so far.
    pub async fn refine(&self, base_url: &str, initial: SelectorSet, samples: &[SamplePage]) -> Result<RefinementOutcome> {
        let context = ProposalContext::from_samples(base_url, samples);
        let mut attempts: Vec<RefinementAttempt> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut current = initial;
        let mut number = 1;

        loop {
            let validation = self.validator.validate(&current, samples)?;
            info!(attempt = number, score = validation.score, accepted = validation.accepted, "validated selectors");
            let accepted = validation.accepted;
            attempts.push(RefinementAttempt { number, selectors: current, validation });

            if accepted || number > self.max_retries {
                break;
            }

            let Some(last) = attempts.last() else { break };
            let failing = last.validation.failing_fields();
            let revised = retry(self.retry, "reasoner.revise_selectors", || {
                self.reasoner.revise_selectors(&context, &last.selectors, &last.validation, &failing)
            })
            .await;

            let revision = match revised {
                Ok(revision) => revision,
                Err(err) => {
                    warn!(attempt = number, error = %err, "reasoner failed, aborting refinement");
                    let best = best_attempt(&attempts).map(|i| attempts[i].clone()).unwrap_or_else(|| last.clone());
                    return Err(ScoutError::RefinementAborted { best: Box::new(best), source: Box::new(err) });
                }
            };
            usage += revision.usage;
            current = last.selectors.patched(&revision.patch, &failing);
            number += 1;
        }

        let best_index = best_attempt(&attempts).unwrap_or(0);
        let best = &attempts[best_index];
        let accepted = best.validation.accepted;
        let failing_fields = best.validation.failing_fields();

        let mut warnings = Vec::new();
        if !accepted {
            warnings.push(format!(
                "Selectors not accepted after {} attempts; using attempt {} (score {:.2})",
                attempts.len(),
                best.number,
                best.validation.score
            ));
            for field in best.validation.blocking_fields() {
                if let Some(failure) = best.validation.field(field).and_then(|r| r.failure.as_ref()) {
                    warnings.push(format!("{} failing: {}", field, failure));
                }
            }
        }

        Ok(RefinementOutcome { attempts, best_index, accepted, failing_fields, warnings, usage })
    }
}
