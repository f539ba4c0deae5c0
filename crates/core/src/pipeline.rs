//! End-to-end generation for one site.
//!
//! exploration, then sample fetch, then initial proposal, then refinement,
//! ending in a [`GenerationReport`]. Saved page directories skip exploration.

use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::agent::{ExplorationAgent, ExplorationState, TerminationReason};
use crate::config::ScoutConfig;
use crate::fetch::{EXPLORATION_PAGE_CHARS, FileFetcher, PageFetcher, SAMPLE_PAGE_CHARS};
use crate::reasoner::{ProposalContext, Reasoner, TokenUsage};
use crate::refine::{RefinementAttempt, RefinementController};
use crate::retry::retry;
use crate::selectors::{Field, SelectorSet};
use crate::spa::{SpaEvidence, assess};
use crate::validate::{PageRole, SamplePage, ValidationResult};
use crate::{Result, ScoutError};

/// How a generation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The selector set passed validation.
    Accepted,
    /// Validation never passed; the best attempt is reported with warnings.
    BestEffort,
    /// The site is client-rendered and was not processed further.
    SpaDetected,
}

/// A sampled page, without its markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleRef {
    pub url: String,
    pub role: PageRole,
}

/// Everything a downstream consumer needs from one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationReport {
    pub site: String,
    pub generated_at: DateTime<Utc>,
    pub outcome: Outcome,
    pub termination: TerminationReason,
    pub iterations: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spa_evidence: Option<SpaEvidence>,
    pub articles: Vec<String>,
    pub listing_pages: Vec<String>,
    pub samples: Vec<SampleRef>,
    pub selectors: Option<SelectorSet>,
    pub validation: Option<ValidationResult>,
    pub attempts: Vec<RefinementAttempt>,
    pub failing_fields: Vec<Field>,
    pub usage: TokenUsage,
    pub warnings: Vec<String>,
}

impl GenerationReport {
    fn from_exploration(state: &ExplorationState, reason: TerminationReason, outcome: Outcome) -> Self {
        Self {
            site: state.base_url.clone(),
            generated_at: Utc::now(),
            outcome,
            termination: reason,
            iterations: state.iterations,
            spa_evidence: state.spa_evidence.clone(),
            articles: state.articles.iter().cloned().collect(),
            listing_pages: state.listing_pages.iter().cloned().collect(),
            samples: Vec::new(),
            selectors: None,
            validation: None,
            attempts: Vec::new(),
            failing_fields: Vec::new(),
            usage: state.usage,
            warnings: Vec::new(),
        }
    }
}

/// Pick up to `count` items spread evenly over `items`.
pub fn spread_sample<T: Clone>(items: &[T], count: usize) -> Vec<T> {
    if items.len() <= count {
        return items.to_vec();
    }
    (0..count).map(|i| items[i * items.len() / count].clone()).collect()
}

/// Wrap a post-exploration failure so the exploration result survives it.
fn generation_error(state: ExplorationState, err: ScoutError) -> ScoutError {
    warn!(site = %state.base_url, error = %err, "generation aborted after exploration");
    let (best, source) = match err {
        ScoutError::RefinementAborted { best, source } => (Some(best), source),
        other => (None, Box::new(other)),
    };
    ScoutError::Generation { partial: Box::new(state), best, source }
}

/// Runs the whole pipeline for one site.
pub struct Generator {
    reasoner: Arc<dyn Reasoner>,
    fetcher: Arc<dyn PageFetcher>,
    config: ScoutConfig,
}

impl Generator {
    pub fn new(reasoner: Arc<dyn Reasoner>, fetcher: Arc<dyn PageFetcher>, config: ScoutConfig) -> Self {
        Self { reasoner, fetcher, config }
    }

    /// Explore `base_url`, propose selectors and refine them.
    ///
    /// # Errors
    ///
    /// Exploration errors propagate unchanged. Failures after exploration
    /// become [`ScoutError::Generation`], carrying the exploration state.
    /// [`ScoutError::NoArticles`] and [`ScoutError::NoSamples`] report runs
    /// that found nothing to validate against.
    pub async fn generate(&self, base_url: &str) -> Result<GenerationReport> {
        self.config.validate()?;

        let agent = ExplorationAgent::new(self.reasoner.clone(), self.fetcher.clone(), self.config.agent());
        let (state, reason) = agent.explore(base_url).await?;
        self.finish(state, reason, self.fetcher.as_ref()).await
    }

    /// Generate selectors for a directory of saved pages.
    ///
    /// The directory's `*.html` files stand in for explored article URLs and
    /// its root `index.html`, when present, is the listing page. No
    /// exploration runs, so the report has zero iterations.
    ///
    /// # Errors
    ///
    /// [`ScoutError::FileNotFound`] when `dir` is not a directory; otherwise
    /// as [`Generator::generate`].
    pub async fn generate_local(&self, dir: &Path) -> Result<GenerationReport> {
        self.config.validate()?;

        let pages = FileFetcher::new(dir)?;
        let mut state = ExplorationState::new(pages.base_url()?, 0, self.config.max_articles);
        state.articles = pages.html_pages(self.config.max_articles)?.into_iter().collect();

        let mut reason = TerminationReason::AgentDone;
        if let Some(index) = pages.index_url() {
            let page = pages.fetch(&index, EXPLORATION_PAGE_CHARS).await;
            let evidence = assess(&page.html);
            if page.is_ok() && evidence.is_spa() {
                state.spa_evidence = Some(evidence);
                state.spa_page = Some(index.clone());
                reason = TerminationReason::SpaDetected;
            }
            state.listing_pages.insert(index);
        }
        state.termination = Some(reason);
        info!(dir = %pages.root().display(), pages = state.articles.len(), "loaded local pages");

        self.finish(state, reason, &pages).await
    }

    /// Sample, propose and refine once the article URLs are known.
    async fn finish(
        &self, state: ExplorationState, reason: TerminationReason, fetcher: &dyn PageFetcher,
    ) -> Result<GenerationReport> {
        if reason == TerminationReason::SpaDetected {
            info!(site = %state.base_url, page = ?state.spa_page, "site is JavaScript-rendered, stopping");
            let mut report = GenerationReport::from_exploration(&state, reason, Outcome::SpaDetected);
            report.warnings.push("Site requires JavaScript rendering; static selectors will not work".to_string());
            return Ok(report);
        }
        if state.articles.is_empty() {
            return Err(ScoutError::NoArticles { base_url: state.base_url.clone() });
        }

        let mut warnings = Vec::new();
        let samples = self.fetch_samples(fetcher, &state, &mut warnings).await;
        if !samples.iter().any(|s| s.role == PageRole::Article) {
            return Err(ScoutError::NoSamples { base_url: state.base_url.clone() });
        }

        let context = ProposalContext::from_samples(state.base_url.clone(), &samples);
        let proposed = retry(self.config.retry, "reasoner.propose_selectors", || {
            self.reasoner.propose_selectors(&context)
        })
        .await;
        let proposal = match proposed {
            Ok(proposal) => proposal,
            Err(err) => return Err(generation_error(state, err)),
        };

        let controller =
            RefinementController::new(self.reasoner.clone(), self.config.max_retries).with_retry(self.config.retry);
        let refined = controller.refine(&state.base_url, proposal.selectors, &samples).await;
        let refined = match refined {
            Ok(refined) => refined,
            Err(err) => {
                let mut state = state;
                state.usage += proposal.usage;
                return Err(generation_error(state, err));
            }
        };

        let outcome = if refined.accepted { Outcome::Accepted } else { Outcome::BestEffort };
        let best = refined.best().clone();
        info!(site = %state.base_url, ?outcome, score = best.validation.score, "generation finished");

        let mut report = GenerationReport::from_exploration(&state, reason, outcome);
        report.samples = samples.iter().map(|s| SampleRef { url: s.url.clone(), role: s.role }).collect();
        report.selectors = Some(best.selectors);
        report.validation = Some(best.validation);
        report.failing_fields = refined.failing_fields;
        report.usage = state.usage + proposal.usage + refined.usage;
        report.attempts = refined.attempts;
        warnings.extend(refined.warnings);
        report.warnings = warnings;
        Ok(report)
    }

    /// Fetch one listing page and a spread of article pages. Failed fetches
    /// are skipped with a warning.
    async fn fetch_samples(
        &self, fetcher: &dyn PageFetcher, state: &ExplorationState, warnings: &mut Vec<String>,
    ) -> Vec<SamplePage> {
        let listing_url = state.listing_pages.iter().next().cloned().unwrap_or_else(|| state.base_url.clone());
        let articles: Vec<String> = state.articles.iter().cloned().collect();

        let mut samples = Vec::new();
        let page = fetcher.fetch(&listing_url, SAMPLE_PAGE_CHARS).await;
        match page.error {
            None => samples.push(SamplePage::listing(page.url, page.html)),
            Some(err) => {
                warn!(url = %listing_url, error = %err, "listing sample fetch failed");
                warnings.push(format!("Could not fetch listing page {}: {}", listing_url, err));
            }
        }

        for url in spread_sample(&articles, self.config.sample_count) {
            let page = fetcher.fetch(&url, SAMPLE_PAGE_CHARS).await;
            match page.error {
                None => samples.push(SamplePage::article(page.url, page.html)),
                Some(err) => {
                    warn!(%url, error = %err, "article sample fetch failed");
                    warnings.push(format!("Could not fetch sample article {}: {}", url, err));
                }
            }
        }
        samples
    }
}
