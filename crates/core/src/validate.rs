//! Selector validation against sample pages.
//!
//! [`SelectorValidator::validate`] applies each field of a [`SelectorSet`]
//! to every relevant sample and reports per-field match fractions, pass
//! flags, a weighted overall score and one concrete failing sample per
//! field, which the refinement loop feeds back to the Reasoner.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate};
use regex::Regex;
use scraper::Selector;
use serde::{Deserialize, Serialize};

use crate::parse::{Document, compile_selector, truncate_chars};
use crate::selectors::{Field, SelectorSet};
use crate::{Result, ScoutError};

/// Minimum match fraction for a field to pass.
pub const PASS_THRESHOLD: f64 = 0.8;

/// Minimum characters of normalized text for a content match.
pub const MIN_CONTENT_CHARS: usize = 200;

/// Length of excerpts quoted in evidence.
const EXCERPT_CHARS: usize = 120;

/// What a sample page is used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageRole {
    /// An individual article: title, content, date, author.
    Article,
    /// A page listing articles: article links.
    Listing,
}

/// A fetched page used for validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SamplePage {
    pub url: String,
    #[serde(skip)]
    pub html: String,
    pub role: PageRole,
}

impl SamplePage {
    pub fn article(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: url.into(), html: html.into(), role: PageRole::Article }
    }

    pub fn listing(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self { url: url.into(), html: html.into(), role: PageRole::Listing }
    }
}

/// How one field fared on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum SampleOutcome {
    /// The selector found an acceptable value.
    Matched { excerpt: String },
    /// The selector matched nothing.
    NoMatch,
    /// The selector matched, but the value failed the field's quality rule.
    Rejected { excerpt: String, reason: String },
    /// The selector could not be compiled.
    InvalidSelector { message: String },
    /// No selector was proposed for the field.
    Missing,
}

impl SampleOutcome {
    pub fn is_match(&self) -> bool {
        matches!(self, SampleOutcome::Matched { .. })
    }
}

/// Evidence about one field on one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldEvidence {
    pub sample_url: String,
    pub selector: Option<String>,
    #[serde(flatten)]
    pub outcome: SampleOutcome,
}

impl fmt::Display for FieldEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let selector = self.selector.as_deref().unwrap_or("<none>");
        match &self.outcome {
            SampleOutcome::Matched { excerpt } => write!(f, "`{}` on {} -> \"{}\"", selector, self.sample_url, excerpt),
            SampleOutcome::NoMatch => write!(f, "`{}` on {} -> no match", selector, self.sample_url),
            SampleOutcome::Rejected { excerpt, reason } => {
                write!(f, "`{}` on {} -> \"{}\" ({})", selector, self.sample_url, excerpt, reason)
            }
            SampleOutcome::InvalidSelector { message } => write!(f, "`{}` is invalid: {}", selector, message),
            SampleOutcome::Missing => write!(f, "no selector proposed (checked on {})", self.sample_url),
        }
    }
}

/// Validation outcome for one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldReport {
    pub field: Field,
    pub selector: Option<String>,
    /// Samples the field was evaluated on.
    pub evaluated: usize,
    pub successes: usize,
    /// `successes / evaluated`, 0.0 to 1.0.
    pub match_fraction: f64,
    pub passed: bool,
    /// First successful sample, if any.
    pub example: Option<FieldEvidence>,
    /// First failing sample, if any.
    pub failure: Option<FieldEvidence>,
    /// For dates: samples whose value parsed as a date.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parsed_dates: Option<usize>,
}

/// Result of validating one selector set. Never mutated once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub fields: Vec<FieldReport>,
    /// Weighted mean of match fractions.
    pub score: f64,
    /// Whether every acceptance-critical field passed.
    pub accepted: bool,
}

impl ValidationResult {
    /// Report for one field.
    pub fn field(&self, field: Field) -> Option<&FieldReport> {
        self.fields.iter().find(|r| r.field == field)
    }

    /// Every field that did not pass.
    pub fn failing_fields(&self) -> Vec<Field> {
        self.fields.iter().filter(|r| !r.passed).map(|r| r.field).collect()
    }

    /// Failing fields that block acceptance.
    pub fn blocking_fields(&self) -> Vec<Field> {
        self.failing_fields().into_iter().filter(|f| f.blocks_acceptance()).collect()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "score {:.2}, {}", self.score, if self.accepted { "accepted" } else { "rejected" })?;
        for report in &self.fields {
            write!(
                f,
                "  {:<16} {:>3}/{:<3} {:>5.1}% {}",
                report.field.name(),
                report.successes,
                report.evaluated,
                report.match_fraction * 100.0,
                if report.passed { "pass" } else { "FAIL" }
            )?;
            if let Some(failure) = &report.failure
                && !report.passed
            {
                write!(f, "  e.g. {}", failure)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

/// Scores selector sets against sample pages.
#[derive(Debug, Clone)]
pub struct SelectorValidator {
    pub pass_threshold: f64,
    pub min_content_chars: usize,
}

impl Default for SelectorValidator {
    fn default() -> Self {
        Self { pass_threshold: PASS_THRESHOLD, min_content_chars: MIN_CONTENT_CHARS }
    }
}

struct ParsedSample<'s> {
    page: &'s SamplePage,
    doc: Document,
}

impl SelectorValidator {
    /// Validate `selectors` against `samples`.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidInput`] when `samples` is empty or holds
    /// no article page.
    pub fn validate(&self, selectors: &SelectorSet, samples: &[SamplePage]) -> Result<ValidationResult> {
        if samples.is_empty() {
            return Err(ScoutError::InvalidInput("validation needs at least one sample page".to_string()));
        }
        if !samples.iter().any(|s| s.role == PageRole::Article) {
            return Err(ScoutError::InvalidInput("validation needs at least one article sample".to_string()));
        }

        let parsed: Vec<ParsedSample<'_>> =
            samples.iter().map(|page| ParsedSample { page, doc: Document::parse(&page.html) }).collect();

        let articles: Vec<&ParsedSample<'_>> = parsed.iter().filter(|s| s.page.role == PageRole::Article).collect();
        let listings: Vec<&ParsedSample<'_>> = parsed.iter().filter(|s| s.page.role == PageRole::Listing).collect();
        let link_samples = if listings.is_empty() { parsed.iter().collect() } else { listings };

        let fields: Vec<FieldReport> = Field::ALL
            .into_iter()
            .map(|field| match field {
                Field::ArticleLinks => self.check_field(field, selectors, &link_samples),
                Field::BaseUrlPattern => self.check_pattern(selectors, &articles),
                _ => self.check_field(field, selectors, &articles),
            })
            .collect();

        let total_weight: f64 = fields.iter().map(|r| r.field.weight()).sum();
        let weighted: f64 = fields.iter().map(|r| r.field.weight() * r.match_fraction).sum();
        let score = if total_weight > 0.0 { weighted / total_weight } else { 0.0 };
        let accepted = fields.iter().filter(|r| r.field.blocks_acceptance()).all(|r| r.passed);

        Ok(ValidationResult { fields, score, accepted })
    }

    fn check_field(&self, field: Field, selectors: &SelectorSet, samples: &[&ParsedSample<'_>]) -> FieldReport {
        let selector_text = selectors.get(field).map(str::to_string);
        let compiled: std::result::Result<Option<Selector>, String> = match &selector_text {
            None => Ok(None),
            Some(text) => compile_selector(text).map(Some).map_err(|e| e.to_string()),
        };

        let mut parsed_dates = 0;
        let outcomes: Vec<(String, SampleOutcome)> = samples
            .iter()
            .map(|sample| {
                let outcome = match &compiled {
                    Err(message) => SampleOutcome::InvalidSelector { message: message.clone() },
                    Ok(None) => SampleOutcome::Missing,
                    Ok(Some(selector)) => {
                        let outcome = self.apply(field, selector, &sample.doc);
                        if field == Field::Date
                            && let SampleOutcome::Matched { excerpt } = &outcome
                            && parse_date(excerpt).is_some()
                        {
                            parsed_dates += 1;
                        }
                        outcome
                    }
                };
                (sample.page.url.clone(), outcome)
            })
            .collect();

        let mut report = self.summarize(field, selector_text, outcomes);
        if field == Field::Date {
            report.parsed_dates = Some(parsed_dates);
        }
        report
    }

    /// Apply one compiled selector to one document under the field's quality rule.
    fn apply(&self, field: Field, selector: &Selector, doc: &Document) -> SampleOutcome {
        let matches = doc.select_compiled(selector);
        if matches.is_empty() {
            return SampleOutcome::NoMatch;
        }

        match field {
            Field::ArticleLinks => {
                let hrefs: Vec<String> = matches
                    .iter()
                    .flat_map(|el| match el.attr("href") {
                        Some(href) => vec![href.to_string()],
                        None => el
                            .select("a[href]")
                            .unwrap_or_default()
                            .iter()
                            .filter_map(|a| a.attr("href").map(str::to_string))
                            .collect(),
                    })
                    .filter(|href| !href.trim().is_empty())
                    .collect();
                match hrefs.first() {
                    Some(first) => SampleOutcome::Matched { excerpt: format!("{} links, e.g. {}", hrefs.len(), first) },
                    None => SampleOutcome::Rejected {
                        excerpt: excerpt(&matches[0].text()),
                        reason: format!("{} elements matched but none carries an href", matches.len()),
                    },
                }
            }
            Field::Content => {
                let text = matches.iter().map(|el| el.text()).collect::<Vec<_>>().join(" ");
                let chars = text.chars().count();
                if chars >= self.min_content_chars {
                    SampleOutcome::Matched { excerpt: excerpt(&text) }
                } else {
                    SampleOutcome::Rejected {
                        excerpt: excerpt(&text),
                        reason: format!("only {} chars, need {}", chars, self.min_content_chars),
                    }
                }
            }
            _ => match matches.iter().map(|el| el.value_text()).find(|v| !v.is_empty()) {
                Some(value) => SampleOutcome::Matched { excerpt: excerpt(&value) },
                None => SampleOutcome::Rejected {
                    excerpt: String::new(),
                    reason: format!("{} elements matched but all are empty", matches.len()),
                },
            },
        }
    }

    fn check_pattern(&self, selectors: &SelectorSet, samples: &[&ParsedSample<'_>]) -> FieldReport {
        let pattern = selectors.get(Field::BaseUrlPattern).map(str::to_string);
        let regex = pattern.as_deref().and_then(|p| Regex::new(p).ok());

        let outcomes = samples
            .iter()
            .map(|sample| {
                let url = &sample.page.url;
                let outcome = match (&pattern, &regex) {
                    (None, _) => SampleOutcome::Missing,
                    (Some(_), Some(re)) if re.is_match(url) => SampleOutcome::Matched { excerpt: url.clone() },
                    (Some(p), None) if url.contains(p.as_str()) => SampleOutcome::Matched { excerpt: url.clone() },
                    (Some(_), _) => SampleOutcome::NoMatch,
                };
                (url.clone(), outcome)
            })
            .collect();

        self.summarize(Field::BaseUrlPattern, pattern, outcomes)
    }

    fn summarize(&self, field: Field, selector: Option<String>, outcomes: Vec<(String, SampleOutcome)>) -> FieldReport {
        let evaluated = outcomes.len();
        let successes = outcomes.iter().filter(|(_, o)| o.is_match()).count();
        let match_fraction = if evaluated == 0 { 0.0 } else { successes as f64 / evaluated as f64 };

        let evidence = |(url, outcome): &(String, SampleOutcome)| FieldEvidence {
            sample_url: url.clone(),
            selector: selector.clone(),
            outcome: outcome.clone(),
        };
        let example = outcomes.iter().find(|(_, o)| o.is_match()).map(evidence);
        let failure = outcomes.iter().find(|(_, o)| !o.is_match()).map(evidence);

        FieldReport {
            field,
            selector: selector.clone(),
            evaluated,
            successes,
            match_fraction,
            passed: evaluated > 0 && match_fraction >= self.pass_threshold,
            example,
            failure,
            parsed_dates: None,
        }
    }
}

/// Validate with the default thresholds.
pub fn validate(selectors: &SelectorSet, samples: &[SamplePage]) -> Result<ValidationResult> {
    SelectorValidator::default().validate(selectors, samples)
}

fn excerpt(text: &str) -> String {
    let (head, truncated) = truncate_chars(text, EXCERPT_CHARS);
    if truncated { format!("{}...", head) } else { head.to_string() }
}

static ISO_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\d{4}-\d{2}-\d{2}").expect("hardcoded regex pattern is valid"));

/// Best-effort date parse. Only attempted: a failure does not fail the field.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.date_naive());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(value) {
        return Some(dt.date_naive());
    }
    for format in ["%Y-%m-%d", "%B %d, %Y", "%b %d, %Y", "%d %B %Y", "%d %b %Y", "%d/%m/%Y", "%m/%d/%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(value, format) {
            return Some(date);
        }
    }
    ISO_DATE.find(value).and_then(|m| NaiveDate::parse_from_str(m.as_str(), "%Y-%m-%d").ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article_html(title: &str, paragraphs: usize) -> String {
        format!(
            r#"<html><head><meta property="article:published_time" content="2024-05-01T08:00:00Z"></head>
            <body><article><h1 class="entry-title">{}</h1><span class="byline">Jane Doe</span>
            <div class="entry-content">{}</div></article></body></html>"#,
            title,
            "<p>Some meaningful sentence about the topic at hand.</p>".repeat(paragraphs)
        )
    }

    fn listing_html() -> String {
        r#"<html><body><ul class="posts">
            <li><a class="post-link" href="/blog/a">A</a></li>
            <li><a class="post-link" href="/blog/b">B</a></li>
        </ul></body></html>"#
            .to_string()
    }

    fn samples(count: usize) -> Vec<SamplePage> {
        let mut pages: Vec<SamplePage> = (0..count)
            .map(|i| SamplePage::article(format!("https://x.test/blog/post-{}", i), article_html("Hello", 8)))
            .collect();
        pages.push(SamplePage::listing("https://x.test/blog", listing_html()));
        pages
    }

    fn good_selectors() -> SelectorSet {
        SelectorSet {
            article_links: "a.post-link".into(),
            title: "h1.entry-title".into(),
            content: "div.entry-content".into(),
            date: Some(r#"meta[property="article:published_time"]"#.into()),
            author: Some("span.byline".into()),
            base_url_pattern: "/blog/".into(),
        }
    }

    #[test]
    fn test_full_match_is_accepted_with_perfect_scores() {
        let result = validate(&good_selectors(), &samples(5)).unwrap();

        assert!(result.accepted);
        for field in Field::ALL {
            let report = result.field(field).unwrap();
            assert_eq!(report.match_fraction, 1.0, "{}", field);
            assert!(report.passed);
        }
        assert_eq!(result.score, 1.0);
        assert_eq!(result.field(Field::Title).unwrap().evaluated, 5);
        assert_eq!(result.field(Field::ArticleLinks).unwrap().evaluated, 1);
        assert_eq!(result.field(Field::Date).unwrap().parsed_dates, Some(5));
    }

    #[test]
    fn test_zero_content_rejects_regardless_of_other_fields() {
        let selectors = SelectorSet { content: "div.does-not-exist".into(), ..good_selectors() };
        let result = validate(&selectors, &samples(5)).unwrap();

        let content = result.field(Field::Content).unwrap();
        assert!(!content.passed);
        assert_eq!(content.match_fraction, 0.0);
        assert!(!result.accepted);
        assert_eq!(result.blocking_fields(), vec![Field::Content]);
        assert_eq!(content.failure.as_ref().unwrap().outcome, SampleOutcome::NoMatch);
        assert!(result.score < 1.0);
    }

    #[test]
    fn test_short_content_is_rejected_with_reason() {
        let pages = vec![SamplePage::article("https://x.test/blog/short", article_html("Hi", 1))];
        let result = validate(&good_selectors(), &pages).unwrap();

        let failure = result.field(Field::Content).unwrap().failure.clone().unwrap();
        match failure.outcome {
            SampleOutcome::Rejected { reason, .. } => assert!(reason.contains("need 200")),
            other => panic!("unexpected outcome {:?}", other),
        }
    }

    #[test]
    fn test_optional_failures_do_not_block_acceptance() {
        let selectors = SelectorSet { author: None, date: Some("time.missing".into()), ..good_selectors() };
        let result = validate(&selectors, &samples(3)).unwrap();

        assert!(result.accepted);
        assert_eq!(result.failing_fields(), vec![Field::Date, Field::Author]);
        assert!(result.blocking_fields().is_empty());
        assert_eq!(result.field(Field::Author).unwrap().failure.as_ref().unwrap().outcome, SampleOutcome::Missing);
    }

    #[test]
    fn test_four_of_five_passes_threshold() {
        let mut pages = samples(4);
        pages.push(SamplePage::article("https://x.test/blog/odd", "<html><body><h2>Other</h2></body></html>"));
        let result = validate(&good_selectors(), &pages).unwrap();

        let title = result.field(Field::Title).unwrap();
        assert_eq!(title.successes, 4);
        assert_eq!(title.evaluated, 5);
        assert!(title.passed);
        assert_eq!(title.failure.as_ref().unwrap().sample_url, "https://x.test/blog/odd");
    }

    #[test]
    fn test_invalid_selector_is_reported_not_raised() {
        let selectors = SelectorSet { title: "h1[[".into(), ..good_selectors() };
        let result = validate(&selectors, &samples(2)).unwrap();

        let title = result.field(Field::Title).unwrap();
        assert!(!title.passed);
        assert!(matches!(
            title.failure.as_ref().unwrap().outcome,
            SampleOutcome::InvalidSelector { .. }
        ));
    }

    #[test]
    fn test_link_selector_without_hrefs_is_rejected() {
        let selectors = SelectorSet { article_links: "ul.posts".into(), ..good_selectors() };
        let result = validate(&selectors, &samples(1)).unwrap();
        assert!(result.field(Field::ArticleLinks).unwrap().passed, "container with nested anchors counts");

        let selectors = SelectorSet { article_links: "li".into(), ..good_selectors() };
        let result = validate(&selectors, &samples(1)).unwrap();
        assert!(result.field(Field::ArticleLinks).unwrap().passed);

        let selectors = SelectorSet { article_links: "h1".into(), ..good_selectors() };
        let result = validate(&selectors, &[SamplePage::article("https://x.test/blog/a", article_html("T", 8))]).unwrap();
        assert!(!result.field(Field::ArticleLinks).unwrap().passed);
    }

    #[test]
    fn test_empty_samples_are_invalid_input() {
        assert!(matches!(validate(&good_selectors(), &[]), Err(ScoutError::InvalidInput(_))));
        let listing_only = vec![SamplePage::listing("https://x.test/blog", listing_html())];
        assert!(matches!(validate(&good_selectors(), &listing_only), Err(ScoutError::InvalidInput(_))));
    }

    #[test]
    fn test_parse_date_formats() {
        assert!(parse_date("2024-05-01T08:00:00Z").is_some());
        assert!(parse_date("May 1, 2024").is_some());
        assert!(parse_date("Published on 2024-05-01 by Jane").is_some());
        assert!(parse_date("yesterday").is_none());
    }
}
