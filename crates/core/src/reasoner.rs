//! The Reasoner seam.
//!
//! A [`Reasoner`] is the opaque decision maker behind exploration and
//! selector generation. It may be slow, may fail, and may answer
//! differently to the same question; callers wrap every call in a bounded
//! [`retry`](crate::retry::retry) and treat its output as untrusted.

use std::ops::{Add, AddAssign};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Result;
use crate::agent::{History, StateSummary};
use crate::fetch::{ARTICLE_PREVIEW_CHARS, LISTING_PREVIEW_CHARS};
use crate::parse::truncate_chars;
use crate::selectors::{Field, SelectorPatch, SelectorSet};
use crate::validate::{PageRole, SamplePage, ValidationResult};

/// Token counts reported by the Reasoner. Informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub total: u64,
}

impl TokenUsage {
    pub fn new(input: u64, output: u64) -> Self {
        Self { input, output, total: input + output }
    }
}

impl Add for TokenUsage {
    type Output = TokenUsage;

    fn add(self, rhs: TokenUsage) -> TokenUsage {
        TokenUsage { input: self.input + rhs.input, output: self.output + rhs.output, total: self.total + rhs.total }
    }
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: TokenUsage) {
        *self = *self + rhs;
    }
}

/// A tool invocation requested by the Reasoner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub args: Value,
}

/// What the Reasoner wants to do next.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Step {
    /// Run these tools, in order.
    Invoke { calls: Vec<ToolCall> },
    /// Exploration is finished. `urls` are article URLs the Reasoner claims
    /// to have seen; they still go through classification.
    Complete { urls: Vec<String> },
}

/// One THINK step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub thought: String,
    pub step: Step,
    pub usage: TokenUsage,
}

/// Page markup shown to the Reasoner when proposing selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagePreview {
    pub url: String,
    pub role: PageRole,
    pub html: String,
}

/// Everything the Reasoner sees when proposing or revising selectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContext {
    pub base_url: String,
    pub pages: Vec<PagePreview>,
}

impl ProposalContext {
    /// Build previews from sample pages, truncated to the preview ceilings.
    pub fn from_samples(base_url: impl Into<String>, samples: &[SamplePage]) -> Self {
        let pages = samples
            .iter()
            .map(|sample| {
                let limit = match sample.role {
                    PageRole::Listing => LISTING_PREVIEW_CHARS,
                    PageRole::Article => ARTICLE_PREVIEW_CHARS,
                };
                PagePreview {
                    url: sample.url.clone(),
                    role: sample.role,
                    html: truncate_chars(&sample.html, limit).0.to_string(),
                }
            })
            .collect();
        Self { base_url: base_url.into(), pages }
    }
}

/// An initial selector set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proposal {
    pub selectors: SelectorSet,
    pub usage: TokenUsage,
}

/// Replacement selectors for failing fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    pub patch: SelectorPatch,
    pub usage: TokenUsage,
}

/// The external decision maker.
#[async_trait]
pub trait Reasoner: Send + Sync {
    /// Decide the next exploration step from the full history.
    async fn decide(&self, history: &History, summary: &StateSummary) -> Result<Decision>;

    /// Propose a complete selector set for the sampled pages.
    async fn propose_selectors(&self, context: &ProposalContext) -> Result<Proposal>;

    /// Propose replacements for `failing` fields given the last validation.
    async fn revise_selectors(
        &self, context: &ProposalContext, current: &SelectorSet, validation: &ValidationResult, failing: &[Field],
    ) -> Result<Revision>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_accumulates() {
        let mut usage = TokenUsage::default();
        usage += TokenUsage::new(100, 20);
        usage += TokenUsage::new(50, 5);
        assert_eq!(usage, TokenUsage { input: 150, output: 25, total: 175 });
    }

    #[test]
    fn test_previews_respect_role_ceilings() {
        let long = "x".repeat(20_000);
        let samples = vec![SamplePage::listing("https://x.test/blog", long.clone()), SamplePage::article("https://x.test/blog/a", long)];
        let context = ProposalContext::from_samples("https://x.test", &samples);

        assert_eq!(context.pages[0].html.len(), LISTING_PREVIEW_CHARS);
        assert_eq!(context.pages[1].html.len(), ARTICLE_PREVIEW_CHARS);
    }
}
