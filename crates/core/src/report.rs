//! Persisting generation reports.
//!
//! Each site's [`GenerationReport`] is written as pretty JSON to a file named
//! after its domain; batch runs add a `generation_report.json` summary.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::pipeline::{GenerationReport, Outcome};
use crate::{Result, ScoutError};

/// File name of the batch summary.
pub const BATCH_REPORT_FILE: &str = "generation_report.json";

/// File stem for a site: host without `www.`, dots and dashes as underscores.
///
/// ```rust
/// use sitescout_core::report::site_stem;
///
/// assert_eq!(site_stem("https://www.my-blog.example.com/").unwrap(), "my_blog_example_com");
/// ```
///
/// Saved page directories (`file://` URLs) are named `local_` plus the
/// directory name.
pub fn site_stem(site: &str) -> Result<String> {
    let url = Url::parse(site).map_err(|e| ScoutError::InvalidUrl(format!("{}: {}", site, e)))?;
    if url.scheme() == "file" {
        let dir = url
            .path_segments()
            .and_then(|mut segments| segments.rfind(|s| !s.is_empty()))
            .ok_or_else(|| ScoutError::InvalidUrl(format!("{}: no directory name", site)))?;
        return Ok(format!("local_{}", dir.replace(['.', '-'], "_")));
    }
    let host = url.host_str().ok_or_else(|| ScoutError::InvalidUrl(format!("{}: no host", site)))?;
    let host = host.strip_prefix("www.").unwrap_or(host);
    Ok(host.replace(['.', '-'], "_"))
}

/// Output file name for a site's report.
pub fn report_filename(site: &str) -> Result<String> {
    Ok(format!("{}_selectors.json", site_stem(site)?))
}

/// Write `report` into `dir`, creating the directory if needed.
pub fn write_report(report: &GenerationReport, dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    let path = dir.join(report_filename(&report.site)?);
    fs::write(&path, serde_json::to_string_pretty(report)?)?;
    Ok(path)
}

/// Read a report written by [`write_report`].
pub fn read_report(path: &Path) -> Result<GenerationReport> {
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// One site's line in a batch summary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchEntry {
    pub site: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub articles: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BatchEntry {
    pub fn succeeded(&self) -> bool {
        self.outcome == Some(Outcome::Accepted)
    }
}

/// Results of a batch run. Failures are recorded per site and never stop
/// the batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub generated_at: DateTime<Utc>,
    pub sites: Vec<BatchEntry>,
}

impl Default for BatchSummary {
    fn default() -> Self {
        Self { generated_at: Utc::now(), sites: Vec::new() }
    }
}

impl BatchSummary {
    pub fn record_report(&mut self, report: &GenerationReport, output: Option<PathBuf>) {
        self.sites.push(BatchEntry {
            site: report.site.clone(),
            outcome: Some(report.outcome),
            score: report.validation.as_ref().map(|v| v.score),
            articles: Some(report.articles.len()),
            output,
            error: None,
        });
    }

    /// Record a failed site. Aborted runs still report how many articles
    /// exploration confirmed.
    pub fn record_error(&mut self, site: impl Into<String>, error: &ScoutError) {
        self.sites.push(BatchEntry {
            site: site.into(),
            outcome: None,
            score: None,
            articles: error.partial_state().map(|state| state.articles.len()),
            output: None,
            error: Some(error.to_string()),
        });
    }

    pub fn total(&self) -> usize {
        self.sites.len()
    }

    /// Sites whose selectors were accepted.
    pub fn successful(&self) -> usize {
        self.sites.iter().filter(|s| s.succeeded()).count()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.sites.iter().filter(|s| s.outcome == Some(outcome)).count()
    }

    /// Sites that ended in an error.
    pub fn failed(&self) -> usize {
        self.sites.iter().filter(|s| s.error.is_some()).count()
    }

    pub fn success_rate(&self) -> f64 {
        if self.sites.is_empty() { 0.0 } else { self.successful() as f64 / self.total() as f64 }
    }

    /// Write the summary as `generation_report.json` in `dir`.
    pub fn write(&self, dir: &Path) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(BATCH_REPORT_FILE);
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::TerminationReason;
    use crate::reasoner::TokenUsage;

    fn report(site: &str, outcome: Outcome) -> GenerationReport {
        GenerationReport {
            site: site.to_string(),
            generated_at: Utc::now(),
            outcome,
            termination: TerminationReason::EarlyStop,
            iterations: 4,
            spa_evidence: None,
            articles: vec![format!("{}blog/a", site)],
            listing_pages: Vec::new(),
            samples: Vec::new(),
            selectors: None,
            validation: None,
            attempts: Vec::new(),
            failing_fields: Vec::new(),
            usage: TokenUsage::new(10, 2),
            warnings: Vec::new(),
        }
    }

    #[test]
    fn test_site_stem() {
        assert_eq!(site_stem("https://anadea.info/").unwrap(), "anadea_info");
        assert_eq!(site_stem("http://www.the-family.co.uk/blog").unwrap(), "the_family_co_uk");
        assert!(site_stem("not a url").is_err());
        assert_eq!(report_filename("https://x.test").unwrap(), "x_test_selectors.json");
        assert_eq!(site_stem("file:///srv/saved/acme-blog/").unwrap(), "local_acme_blog");
        assert!(site_stem("file:///").is_err());
    }

    #[test]
    fn test_write_and_read_report() {
        let dir = tempfile::tempdir().unwrap();
        let original = report("https://x.test/", Outcome::BestEffort);

        let path = write_report(&original, dir.path()).unwrap();
        assert!(path.ends_with("x_test_selectors.json"));

        let restored = read_report(&path).unwrap();
        assert_eq!(restored, original);

        let json: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["outcome"], "best_effort");
        assert_eq!(json["termination"], "EARLY_STOP");
        assert_eq!(json["usage"]["total"], 12);
    }

    #[test]
    fn test_batch_summary_counts() {
        let dir = tempfile::tempdir().unwrap();
        let mut summary = BatchSummary::default();
        summary.record_report(&report("https://a.test/", Outcome::Accepted), None);
        summary.record_report(&report("https://b.test/", Outcome::SpaDetected), None);
        summary.record_error("https://c.test/", &ScoutError::NoArticles { base_url: "https://c.test/".into() });

        assert_eq!(summary.total(), 3);
        assert_eq!(summary.successful(), 1);
        assert_eq!(summary.count(Outcome::SpaDetected), 1);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.sites[2].articles, None);

        let path = summary.write(dir.path()).unwrap();
        assert!(path.ends_with(BATCH_REPORT_FILE));
    }
}
