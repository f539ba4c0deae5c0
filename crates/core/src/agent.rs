//! The exploration agent.
//!
//! [`ExplorationAgent::explore`] runs a Thought-Action-Observation loop:
//!
//! - **THINK**: the Reasoner reads the full [`History`] plus a
//!   [`StateSummary`] and either requests tool calls or signals completion.
//! - **ACT**: requested tools run in order. Failures become observations.
//! - **OBSERVE**: observations are logged, link payloads are classified,
//!   fetched pages are checked for client-side rendering and the
//!   termination conditions are evaluated.
//!
//! The loop ends on the first of [`TerminationReason`] in priority order.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use url::Url;

use crate::classify::{LISTING_MIN_ARTICLES, PageContext, UrlClassifier};
use crate::fetch::PageFetcher;
use crate::reasoner::{Reasoner, Step, TokenUsage, ToolCall};
use crate::retry::{RetryPolicy, retry};
use crate::spa::{self, SpaEvidence};
use crate::tools::{self, Action, Observation, PageCache};
use crate::{Result, ScoutError};

/// Default number of THINK steps per run.
pub const DEFAULT_MAX_ITERATIONS: u32 = 15;

/// Default article ceiling.
pub const DEFAULT_MAX_ARTICLES: usize = 30;

/// Consecutive iterations without a new article after which a run is stagnant.
pub const STAGNATION_LIMIT: u32 = 3;

/// Why an exploration run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    /// A fetched page is client-rendered. Highest priority.
    SpaDetected,
    /// The article ceiling was reached.
    EarlyStop,
    /// The iteration budget ran out.
    MaxIterations,
    /// Too many iterations in a row found nothing new.
    Stagnant,
    /// The Reasoner signalled completion.
    AgentDone,
}

impl fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TerminationReason::SpaDetected => "SPA_DETECTED",
            TerminationReason::EarlyStop => "EARLY_STOP",
            TerminationReason::MaxIterations => "MAX_ITERATIONS",
            TerminationReason::Stagnant => "STAGNANT",
            TerminationReason::AgentDone => "AGENT_DONE",
        };
        f.write_str(name)
    }
}

/// One record in the exploration log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "entry", rename_all = "snake_case")]
pub enum HistoryEntry {
    /// The task statement that opens every run.
    Task { text: String },
    /// A THINK step that requested tool calls.
    Thought { iteration: u32, thought: String, calls: Vec<ToolCall> },
    /// The result of one tool call.
    Observation { iteration: u32, call_id: String, tool: String, observation: Observation },
    /// A THINK step that signalled completion.
    Completion { iteration: u32, thought: String, urls: Vec<String> },
}

/// Append-only log of a run. The Reasoner only ever gets a shared reference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// A log opened with a task statement.
    pub fn new(task: impl Into<String>) -> Self {
        Self { entries: vec![HistoryEntry::Task { text: task.into() }] }
    }

    pub(crate) fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A compact view of the run state handed to the Reasoner with the history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateSummary {
    pub base_url: String,
    pub iteration: u32,
    pub max_iterations: u32,
    pub articles_found: usize,
    pub max_articles: usize,
    pub listing_pages: Vec<String>,
    pub no_progress: u32,
    pub recent_articles: Vec<String>,
}

impl fmt::Display for StateSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Site: {}", self.base_url)?;
        writeln!(f, "Iteration {} of {}", self.iteration, self.max_iterations)?;
        writeln!(f, "Confirmed articles: {} of {}", self.articles_found, self.max_articles)?;
        if self.no_progress > 0 {
            writeln!(f, "Iterations without new articles: {}", self.no_progress)?;
        }
        if !self.listing_pages.is_empty() {
            writeln!(f, "Listing pages: {}", self.listing_pages.join(", "))?;
        }
        for url in &self.recent_articles {
            writeln!(f, "  {}", url)?;
        }
        Ok(())
    }
}

/// Everything one run has learned. Owned by exactly one run.
#[derive(Debug, Clone, Serialize)]
pub struct ExplorationState {
    pub base_url: String,
    /// Confirmed article URLs, normalized and unique.
    pub articles: BTreeSet<String>,
    /// Pages promoted to article listings.
    pub listing_pages: BTreeSet<String>,
    pub iterations: u32,
    pub max_iterations: u32,
    pub max_articles: usize,
    /// Consecutive iterations that confirmed nothing new.
    pub no_progress: u32,
    pub usage: TokenUsage,
    pub termination: Option<TerminationReason>,
    /// Evidence from the page that triggered `SPA_DETECTED`.
    pub spa_evidence: Option<SpaEvidence>,
    pub spa_page: Option<String>,
    #[serde(skip)]
    pages: PageCache,
}

impl ExplorationState {
    pub fn new(base_url: impl Into<String>, max_iterations: u32, max_articles: usize) -> Self {
        Self {
            base_url: base_url.into(),
            articles: BTreeSet::new(),
            listing_pages: BTreeSet::new(),
            iterations: 0,
            max_iterations,
            max_articles,
            no_progress: 0,
            usage: TokenUsage::default(),
            termination: None,
            spa_evidence: None,
            spa_page: None,
            pages: PageCache::default(),
        }
    }

    /// Whether the article ceiling has been reached.
    pub fn at_ceiling(&self) -> bool {
        self.articles.len() >= self.max_articles
    }

    /// Add confirmed articles without exceeding the ceiling. Returns how many
    /// were new.
    pub fn admit<I: IntoIterator<Item = String>>(&mut self, urls: I) -> usize {
        let before = self.articles.len();
        for url in urls {
            if self.at_ceiling() {
                break;
            }
            self.articles.insert(url);
        }
        self.articles.len() - before
    }

    /// Markup of a page fetched during the run.
    pub fn page(&self, url: &str) -> Option<&str> {
        self.pages.get(url)
    }

    /// The termination condition that holds now, if any, in priority order.
    pub fn termination_due(&self, agent_done: bool, stagnation_limit: u32) -> Option<TerminationReason> {
        if self.spa_evidence.is_some() {
            Some(TerminationReason::SpaDetected)
        } else if self.at_ceiling() {
            Some(TerminationReason::EarlyStop)
        } else if self.iterations >= self.max_iterations {
            Some(TerminationReason::MaxIterations)
        } else if self.no_progress >= stagnation_limit {
            Some(TerminationReason::Stagnant)
        } else if agent_done {
            Some(TerminationReason::AgentDone)
        } else {
            None
        }
    }

    pub fn summary(&self) -> StateSummary {
        StateSummary {
            base_url: self.base_url.clone(),
            iteration: self.iterations,
            max_iterations: self.max_iterations,
            articles_found: self.articles.len(),
            max_articles: self.max_articles,
            listing_pages: self.listing_pages.iter().cloned().collect(),
            no_progress: self.no_progress,
            recent_articles: self.articles.iter().take(10).cloned().collect(),
        }
    }
}

/// Limits for one exploration run.
#[derive(Debug, Clone, Copy)]
pub struct AgentConfig {
    pub max_iterations: u32,
    pub max_articles: usize,
    pub stagnation_limit: u32,
    /// Retry policy for Reasoner calls.
    pub retry: RetryPolicy,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            max_articles: DEFAULT_MAX_ARTICLES,
            stagnation_limit: STAGNATION_LIMIT,
            retry: RetryPolicy::default(),
        }
    }
}

/// Drives the Reasoner through a bounded discovery run over one site.
pub struct ExplorationAgent {
    reasoner: Arc<dyn Reasoner>,
    fetcher: Arc<dyn PageFetcher>,
    classifier: UrlClassifier,
    config: AgentConfig,
}

impl ExplorationAgent {
    pub fn new(reasoner: Arc<dyn Reasoner>, fetcher: Arc<dyn PageFetcher>, config: AgentConfig) -> Self {
        Self { reasoner, fetcher, classifier: UrlClassifier::default(), config }
    }

    /// Replace the default URL classifier.
    pub fn with_classifier(mut self, classifier: UrlClassifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Explore `base_url` until a termination condition holds.
    ///
    /// # Errors
    ///
    /// - [`ScoutError::InvalidUrl`] if `base_url` is not an http(s) URL.
    /// - [`ScoutError::InvalidInput`] if either limit is zero.
    /// - [`ScoutError::Exploration`] if the Reasoner keeps failing; it
    ///   carries the partial state.
    pub async fn explore(&self, base_url: &str) -> Result<(ExplorationState, TerminationReason)> {
        let base = Url::parse(base_url).map_err(|e| ScoutError::InvalidUrl(format!("{}: {}", base_url, e)))?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(ScoutError::InvalidUrl(format!("{}: unsupported scheme", base_url)));
        }
        if self.config.max_iterations == 0 || self.config.max_articles == 0 {
            return Err(ScoutError::InvalidInput("max_iterations and max_articles must be positive".to_string()));
        }

        let mut state = ExplorationState::new(base.as_str(), self.config.max_iterations, self.config.max_articles);
        let mut history = History::new(format!(
            "Find up to {} article URLs on {}. Start by fetching the homepage and checking whether it is \
             JavaScript-rendered, then locate the article listing pages.",
            self.config.max_articles, base
        ));

        info!(base_url = %base, max_iterations = self.config.max_iterations, max_articles = self.config.max_articles, "starting exploration");

        loop {
            state.iterations += 1;
            let iteration = state.iterations;
            let summary = state.summary();

            let decision = match retry(self.config.retry, "reasoner.decide", || self.reasoner.decide(&history, &summary)).await {
                Ok(decision) => decision,
                Err(err) => {
                    warn!(iteration, error = %err, "reasoner failed, aborting exploration");
                    return Err(ScoutError::Exploration { partial: Box::new(state), source: Box::new(err) });
                }
            };
            state.usage += decision.usage;

            let before = state.articles.len();
            let agent_done = match decision.step {
                Step::Complete { urls } => {
                    let found = self.classifier.classify(&urls, &base, &base, PageContext::Unknown);
                    state.admit(found);
                    history.push(HistoryEntry::Completion { iteration, thought: decision.thought, urls });
                    true
                }
                Step::Invoke { calls } => {
                    history.push(HistoryEntry::Thought { iteration, thought: decision.thought, calls: calls.clone() });
                    for call in calls {
                        let observation = self.act(&mut state, &base, &call).await;
                        self.observe(&mut state, &base, &observation);
                        history.push(HistoryEntry::Observation {
                            iteration,
                            call_id: call.id,
                            tool: call.name,
                            observation,
                        });
                    }
                    false
                }
            };

            if state.articles.len() > before {
                state.no_progress = 0;
            } else {
                state.no_progress += 1;
            }

            info!(iteration, articles = state.articles.len(), no_progress = state.no_progress, "iteration finished");

            if let Some(reason) = state.termination_due(agent_done, self.config.stagnation_limit) {
                info!(%reason, iterations = state.iterations, articles = state.articles.len(), "exploration finished");
                state.termination = Some(reason);
                return Ok((state, reason));
            }
        }
    }

    async fn act(&self, state: &mut ExplorationState, base: &Url, call: &ToolCall) -> Observation {
        if state.spa_evidence.is_some() {
            return Observation::skipped("site is JavaScript-rendered");
        }
        let action = match Action::parse(&call.name, &call.args) {
            Ok(action) => action,
            Err(err) => return Observation::error(err.to_string()),
        };
        if action.yields_articles() && state.at_ceiling() {
            return Observation::skipped(format!("article ceiling of {} reached", state.max_articles));
        }
        tools::execute(&action, self.fetcher.as_ref(), base, &mut state.pages).await
    }

    fn observe(&self, state: &mut ExplorationState, base: &Url, observation: &Observation) {
        let assessed = match observation {
            Observation::Fetched { url, html, .. } => Some((url.clone(), spa::assess(html))),
            Observation::JsCheck { url, evidence } => {
                Some((url.clone().unwrap_or_else(|| base.to_string()), evidence.clone()))
            }
            _ => None,
        };
        if let Some((url, evidence)) = assessed
            && evidence.is_spa()
            && state.spa_evidence.is_none()
        {
            warn!(%url, indicators = evidence.triggered(), "page is JavaScript-rendered");
            state.spa_evidence = Some(evidence);
            state.spa_page = Some(url);
        }

        let (page, hrefs) = observation.candidates();
        if hrefs.is_empty() {
            return;
        }
        let page_url = page.and_then(|p| Url::parse(p).ok()).unwrap_or_else(|| base.clone());
        let page_key = self.classifier.normalize(page_url.as_str()).unwrap_or_else(|| page_url.to_string());
        let context = if state.listing_pages.contains(&page_key) { PageContext::Listing } else { PageContext::Unknown };

        let found = self.classifier.classify(hrefs, &page_url, base, context);
        if page.is_some() && context == PageContext::Unknown && found.len() >= LISTING_MIN_ARTICLES {
            debug!(page = %page_key, articles = found.len(), "promoted to listing page");
            state.listing_pages.insert(page_key);
        }
        let added = state.admit(found);
        debug!(tool_payload = hrefs.len(), added, total = state.articles.len(), "classified links");
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::json;

    use super::*;
    use crate::fetch::FetchedPage;
    use crate::reasoner::{Decision, Proposal, ProposalContext, Revision};
    use crate::selectors::{Field, SelectorSet};
    use crate::validate::ValidationResult;

    /// Finishes at once, claiming `urls` are articles.
    struct Finisher {
        urls: Vec<String>,
    }

    #[async_trait]
    impl Reasoner for Finisher {
        async fn decide(&self, _history: &History, _summary: &StateSummary) -> Result<Decision> {
            Ok(Decision {
                thought: "done".to_string(),
                step: Step::Complete { urls: self.urls.clone() },
                usage: TokenUsage::new(1, 1),
            })
        }

        async fn propose_selectors(&self, _context: &ProposalContext) -> Result<Proposal> {
            Err(ScoutError::transient("not scripted"))
        }

        async fn revise_selectors(
            &self, _context: &ProposalContext, _current: &SelectorSet, _validation: &ValidationResult,
            _failing: &[Field],
        ) -> Result<Revision> {
            Err(ScoutError::transient("not scripted"))
        }
    }

    struct Offline;

    #[async_trait]
    impl PageFetcher for Offline {
        async fn fetch(&self, url: &str, _max_chars: usize) -> FetchedPage {
            FetchedPage::failed(url, None, "offline")
        }
    }

    fn finisher(urls: &[&str]) -> ExplorationAgent {
        let reasoner = Finisher { urls: urls.iter().map(|u| u.to_string()).collect() };
        ExplorationAgent::new(Arc::new(reasoner), Arc::new(Offline), AgentConfig::default())
    }

    #[tokio::test]
    async fn test_article_yielding_calls_are_skipped_at_ceiling() {
        let agent = finisher(&[]);
        let base = Url::parse("https://x.test/").unwrap();
        let mut state = ExplorationState::new("https://x.test/", 15, 1);
        state.admit(["https://x.test/blog/a".to_string()]);

        let patterns = ToolCall {
            id: "c1".to_string(),
            name: "find_url_patterns".to_string(),
            args: json!({ "urls": ["https://x.test/blog/b"] }),
        };
        let js_check = ToolCall {
            id: "c2".to_string(),
            name: "check_js_rendered".to_string(),
            args: json!({ "html": "<html><body><p>static</p></body></html>" }),
        };

        assert!(matches!(agent.act(&mut state, &base, &patterns).await, Observation::Skipped { .. }));
        assert!(matches!(agent.act(&mut state, &base, &js_check).await, Observation::JsCheck { .. }));
    }

    #[tokio::test]
    async fn test_custom_classifier_markers() {
        let urls = ["https://x.test/journal/spring-update", "https://x.test/blog/ignored"];

        let (state, _) = finisher(&urls)
            .with_classifier(UrlClassifier::with_markers(["journal"]))
            .explore("https://x.test/")
            .await
            .unwrap();
        assert_eq!(state.articles.iter().collect::<Vec<_>>(), vec!["https://x.test/journal/spring-update"]);

        let (state, reason) = finisher(&urls).explore("https://x.test/").await.unwrap();
        assert_eq!(reason, TerminationReason::AgentDone);
        assert_eq!(state.articles.iter().collect::<Vec<_>>(), vec!["https://x.test/blog/ignored"]);
    }

    #[test]
    fn test_spa_beats_early_stop() {
        let mut state = ExplorationState::new("https://x.test/", 15, 2);
        state.admit(["https://x.test/blog/a".to_string(), "https://x.test/blog/b".to_string()]);
        state.spa_evidence = Some(SpaEvidence::default());

        assert_eq!(state.termination_due(true, 3), Some(TerminationReason::SpaDetected));
    }

    #[test]
    fn test_termination_precedence() {
        let mut state = ExplorationState::new("https://x.test/", 3, 5);
        assert_eq!(state.termination_due(false, 3), None);
        assert_eq!(state.termination_due(true, 3), Some(TerminationReason::AgentDone));

        state.no_progress = 3;
        assert_eq!(state.termination_due(true, 3), Some(TerminationReason::Stagnant));

        state.iterations = 3;
        assert_eq!(state.termination_due(true, 3), Some(TerminationReason::MaxIterations));

        state.admit((0..5).map(|i| format!("https://x.test/blog/{}", i)));
        assert_eq!(state.termination_due(true, 3), Some(TerminationReason::EarlyStop));
    }

    #[test]
    fn test_admit_respects_ceiling() {
        let mut state = ExplorationState::new("https://x.test/", 15, 3);
        let added = state.admit((0..10).map(|i| format!("https://x.test/blog/{}", i)));

        assert_eq!(added, 3);
        assert_eq!(state.articles.len(), 3);
        assert!(state.at_ceiling());
        assert_eq!(state.admit(["https://x.test/blog/z".to_string()]), 0);
    }

    #[test]
    fn test_termination_reason_names() {
        assert_eq!(TerminationReason::EarlyStop.to_string(), "EARLY_STOP");
        assert_eq!(serde_json::to_value(TerminationReason::SpaDetected).unwrap(), "SPA_DETECTED");
    }

    #[test]
    fn test_history_starts_with_task() {
        let history = History::new("find articles");
        assert_eq!(history.len(), 1);
        assert!(matches!(&history.entries()[0], HistoryEntry::Task { text } if text == "find articles"));
    }
}
