//! The tool surface exposed to the Reasoner during exploration.
//!
//! Tool calls arrive as a name plus loosely typed JSON arguments and are
//! parsed into an [`Action`]. Running an action never fails: fetch errors,
//! bad selectors and malformed arguments all come back as an
//! [`Observation::Error`] the Reasoner can read and react to.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::debug;
use url::Url;

use crate::classify::SECTION_MARKERS;
use crate::fetch::{EXPLORATION_PAGE_CHARS, LISTING_PREVIEW_CHARS, PageFetcher};
use crate::parse::{Document, Element, truncate_chars};
use crate::spa::{self, SpaEvidence};
use crate::{Result, ScoutError};

/// Matched elements quoted back by `test_selector`.
const PROBE_SAMPLES: usize = 5;

/// Text length of each quoted element.
const PROBE_TEXT_CHARS: usize = 150;

/// Structural containers listed by `parse_html_structure`.
const STRUCTURE_TAGS: &[&str] = &["header", "nav", "main", "article", "section", "aside", "footer"];

const STRUCTURE_LIMIT: usize = 40;

/// Most frequent classes reported by `parse_html_structure`.
const TOP_CLASSES: usize = 20;

/// Most frequent path segments reported by `find_url_patterns`.
const TOP_SEGMENTS: usize = 15;

/// Where a tool reads its markup from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HtmlSource {
    /// Markup passed inline.
    Html(String),
    /// A page fetched earlier in the run.
    Url(String),
}

/// A parsed tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "tool", rename_all = "snake_case")]
pub enum Action {
    FetchHtml { url: String },
    TestSelector { source: HtmlSource, selector: String },
    FindUrlPatterns { urls: Vec<String> },
    ParseHtmlStructure { source: HtmlSource },
    CheckJsRendered { source: HtmlSource },
}

impl Action {
    /// Parse a tool call by name. `args` may be a JSON object or a string
    /// holding one.
    pub fn parse(name: &str, args: &Value) -> Result<Action> {
        let owned;
        let args = match args {
            Value::String(raw) => {
                owned = serde_json::from_str::<Value>(raw)
                    .map_err(|e| ScoutError::InvalidInput(format!("{} arguments are not JSON: {}", name, e)))?;
                &owned
            }
            other => other,
        };

        match name {
            "fetch_html" => Ok(Action::FetchHtml { url: string_arg(name, args, "url")? }),
            "test_selector" => Ok(Action::TestSelector {
                source: source_arg(name, args)?,
                selector: string_arg(name, args, "selector")?,
            }),
            "find_url_patterns" => {
                let urls = args
                    .get("urls")
                    .and_then(Value::as_array)
                    .ok_or_else(|| ScoutError::InvalidInput(format!("{} requires a `urls` array", name)))?
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect();
                Ok(Action::FindUrlPatterns { urls })
            }
            "parse_html_structure" => Ok(Action::ParseHtmlStructure { source: source_arg(name, args)? }),
            "check_js_rendered" => Ok(Action::CheckJsRendered { source: source_arg(name, args)? }),
            other => Err(ScoutError::InvalidInput(format!("Unknown tool: {}", other))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Action::FetchHtml { .. } => "fetch_html",
            Action::TestSelector { .. } => "test_selector",
            Action::FindUrlPatterns { .. } => "find_url_patterns",
            Action::ParseHtmlStructure { .. } => "parse_html_structure",
            Action::CheckJsRendered { .. } => "check_js_rendered",
        }
    }

    /// Whether the action can add confirmed articles. These are skipped
    /// once the article ceiling is reached.
    pub fn yields_articles(&self) -> bool {
        matches!(
            self,
            Action::FetchHtml { .. }
                | Action::TestSelector { .. }
                | Action::FindUrlPatterns { .. }
                | Action::ParseHtmlStructure { .. }
        )
    }
}

fn string_arg(tool: &str, args: &Value, key: &str) -> Result<String> {
    args.get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ScoutError::InvalidInput(format!("{} requires a non-empty `{}` string", tool, key)))
}

fn source_arg(tool: &str, args: &Value) -> Result<HtmlSource> {
    if let Some(html) = args.get("html").and_then(Value::as_str)
        && !html.trim().is_empty()
    {
        return Ok(HtmlSource::Html(html.to_string()));
    }
    match args.get("url").and_then(Value::as_str).map(str::trim) {
        Some(url) if !url.is_empty() => Ok(HtmlSource::Url(url.to_string())),
        _ => Err(ScoutError::InvalidInput(format!("{} requires `html` or `url`", tool))),
    }
}

/// One element quoted by a selector test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchSample {
    pub tag: String,
    pub text: String,
    pub href: Option<String>,
}

/// A structural container summarized by `parse_html_structure`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    pub tag: String,
    pub id: Option<String>,
    pub classes: Vec<String>,
    pub links: usize,
}

/// The result of running one [`Action`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Observation {
    Fetched {
        url: String,
        status: Option<u16>,
        html: String,
        total_chars: usize,
        truncated: bool,
        links: Vec<String>,
    },
    SelectorProbe {
        url: Option<String>,
        selector: String,
        matches: usize,
        samples: Vec<MatchSample>,
        hrefs: Vec<String>,
    },
    UrlPatterns {
        urls: Vec<String>,
        segments: Vec<(String, usize)>,
        likely_pattern: Option<String>,
    },
    Structure {
        url: Option<String>,
        title: Option<String>,
        containers: Vec<Container>,
        link_count: usize,
        article_links: Vec<String>,
        common_classes: Vec<(String, usize)>,
    },
    JsCheck {
        url: Option<String>,
        evidence: SpaEvidence,
    },
    Error {
        message: String,
    },
    Skipped {
        reason: String,
    },
}

impl Observation {
    pub fn error(message: impl Into<String>) -> Self {
        Observation::Error { message: message.into() }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Observation::Skipped { reason: reason.into() }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Observation::Error { .. })
    }

    /// Link candidates carried by the payload, with the URL of the page they
    /// came from when known. Relative hrefs resolve against that page.
    pub fn candidates(&self) -> (Option<&str>, &[String]) {
        match self {
            Observation::Fetched { url, links, .. } => (Some(url.as_str()), links),
            Observation::SelectorProbe { url, hrefs, .. } => (url.as_deref(), hrefs),
            Observation::UrlPatterns { urls, .. } => (None, urls),
            Observation::Structure { url, article_links, .. } => (url.as_deref(), article_links),
            _ => (None, &[]),
        }
    }
}

impl fmt::Display for Observation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Observation::Fetched { url, status, html, total_chars, truncated, links } => {
                let status = status.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string());
                writeln!(f, "Fetched {} (status {}, {} chars, {} links)", url, status, total_chars, links.len())?;
                if *truncated {
                    writeln!(f, "[markup truncated at {} chars]", EXPLORATION_PAGE_CHARS)?;
                }
                let (preview, cut) = truncate_chars(html, LISTING_PREVIEW_CHARS);
                write!(f, "{}", preview)?;
                if cut {
                    write!(f, "\n[preview truncated; reference this page by url in other tools]")?;
                }
                Ok(())
            }
            Observation::SelectorProbe { url, selector, matches, samples, hrefs } => {
                write!(f, "Selector `{}` matched {} elements", selector, matches)?;
                if let Some(url) = url {
                    write!(f, " on {}", url)?;
                }
                writeln!(f, " ({} with links)", hrefs.len())?;
                for (i, sample) in samples.iter().enumerate() {
                    write!(f, "  {}. <{}> {}", i + 1, sample.tag, sample.text)?;
                    if let Some(href) = &sample.href {
                        write!(f, " -> {}", href)?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            Observation::UrlPatterns { urls, segments, likely_pattern } => {
                writeln!(f, "Analyzed {} URLs", urls.len())?;
                for (segment, count) in segments {
                    writeln!(f, "  /{}/ appears in {} URLs", segment, count)?;
                }
                match likely_pattern {
                    Some(pattern) => write!(f, "Likely article pattern: {}", pattern),
                    None => write!(f, "No dominant pattern"),
                }
            }
            Observation::Structure { url, title, containers, link_count, article_links, common_classes } => {
                writeln!(f, "Structure of {}", url.as_deref().unwrap_or("inline markup"))?;
                if let Some(title) = title {
                    writeln!(f, "Title: {}", title)?;
                }
                writeln!(f, "Links: {} total, {} with article keywords", link_count, article_links.len())?;
                for link in article_links.iter().take(20) {
                    writeln!(f, "  {}", link)?;
                }
                writeln!(f, "Containers:")?;
                for c in containers {
                    write!(f, "  <{}", c.tag)?;
                    if let Some(id) = &c.id {
                        write!(f, " id=\"{}\"", id)?;
                    }
                    if !c.classes.is_empty() {
                        write!(f, " class=\"{}\"", c.classes.join(" "))?;
                    }
                    writeln!(f, "> {} links", c.links)?;
                }
                let classes: Vec<String> = common_classes.iter().map(|(c, n)| format!("{} ({})", c, n)).collect();
                write!(f, "Common classes: {}", classes.join(", "))
            }
            Observation::JsCheck { url, evidence } => {
                if let Some(url) = url {
                    writeln!(f, "Page: {}", url)?;
                }
                write!(f, "{}", evidence)
            }
            Observation::Error { message } => write!(f, "ERROR: {}", message),
            Observation::Skipped { reason } => write!(f, "SKIPPED: {}", reason),
        }
    }
}

/// Markup of pages fetched during one run, keyed by URL.
#[derive(Debug, Clone, Default)]
pub struct PageCache {
    pages: HashMap<String, String>,
}

impl PageCache {
    pub fn insert(&mut self, url: impl Into<String>, html: impl Into<String>) {
        self.pages.insert(url.into(), html.into());
    }

    /// Look a page up, tolerating a trailing-slash difference.
    pub fn get(&self, url: &str) -> Option<&str> {
        let alternate = match url.strip_suffix('/') {
            Some(stripped) => stripped.to_string(),
            None => format!("{}/", url),
        };
        self.pages.get(url).or_else(|| self.pages.get(&alternate)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pages.is_empty()
    }
}

/// Run one action. Relative URLs resolve against `base_url`; fetched pages
/// are stored in `cache`.
pub async fn execute(action: &Action, fetcher: &dyn PageFetcher, base_url: &Url, cache: &mut PageCache) -> Observation {
    debug!(tool = action.name(), "executing tool");
    match action {
        Action::FetchHtml { url } => {
            let Ok(resolved) = base_url.join(url) else {
                return Observation::error(format!("Invalid URL: {}", url));
            };
            let page = fetcher.fetch(resolved.as_str(), EXPLORATION_PAGE_CHARS).await;
            if let Some(err) = page.error {
                return Observation::error(format!("Failed to fetch {}: {}", page.url, err));
            }
            let links = Document::parse(&page.html).links();
            cache.insert(page.url.clone(), page.html.clone());
            Observation::Fetched {
                url: page.url,
                status: page.status,
                html: page.html,
                total_chars: page.total_chars,
                truncated: page.truncated,
                links,
            }
        }
        Action::TestSelector { source, selector } => match resolve(source, base_url, cache) {
            Ok((url, html)) => test_selector(html, selector, url),
            Err(message) => Observation::error(message),
        },
        Action::FindUrlPatterns { urls } => find_url_patterns(urls),
        Action::ParseHtmlStructure { source } => match resolve(source, base_url, cache) {
            Ok((url, html)) => parse_html_structure(html, url),
            Err(message) => Observation::error(message),
        },
        Action::CheckJsRendered { source } => match resolve(source, base_url, cache) {
            Ok((url, html)) => Observation::JsCheck { url, evidence: spa::assess(html) },
            Err(message) => Observation::error(message),
        },
    }
}

fn resolve<'c>(
    source: &'c HtmlSource, base_url: &Url, cache: &'c PageCache,
) -> std::result::Result<(Option<String>, &'c str), String> {
    match source {
        HtmlSource::Html(html) => Ok((None, html.as_str())),
        HtmlSource::Url(url) => {
            let resolved = base_url.join(url).map_err(|_| format!("Invalid URL: {}", url))?;
            cache
                .get(resolved.as_str())
                .map(|html| (Some(resolved.to_string()), html))
                .ok_or_else(|| format!("{} has not been fetched yet; call fetch_html first", resolved))
        }
    }
}

/// Apply a CSS selector and quote the first few matches.
pub fn test_selector(html: &str, selector: &str, url: Option<String>) -> Observation {
    let doc = Document::parse(html);
    let elements = match doc.select(selector) {
        Ok(elements) => elements,
        Err(e) => return Observation::error(e.to_string()),
    };

    let hrefs: Vec<String> = elements.iter().flat_map(element_hrefs).collect();
    let samples = elements
        .iter()
        .take(PROBE_SAMPLES)
        .map(|el| MatchSample {
            tag: el.tag_name(),
            text: truncate_chars(&el.text(), PROBE_TEXT_CHARS).0.to_string(),
            href: element_hrefs(el).into_iter().next(),
        })
        .collect();

    Observation::SelectorProbe { url, selector: selector.to_string(), matches: elements.len(), samples, hrefs }
}

/// The element's own `href`, or those of anchors inside it.
fn element_hrefs(el: &Element<'_>) -> Vec<String> {
    let hrefs: Vec<String> = match el.attr("href") {
        Some(href) => vec![href.trim().to_string()],
        None => el
            .select("a[href]")
            .unwrap_or_default()
            .iter()
            .filter_map(|a| a.attr("href").map(|h| h.trim().to_string()))
            .collect(),
    };
    hrefs.into_iter().filter(|h| !h.is_empty()).collect()
}

/// Count path segments across URLs and suggest the dominant article prefix.
pub fn find_url_patterns(urls: &[String]) -> Observation {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut prefixes: BTreeMap<String, usize> = BTreeMap::new();

    for raw in urls {
        let path = Url::parse(raw).map(|u| u.path().to_string()).unwrap_or_else(|_| raw.clone());
        let segments: Vec<String> =
            path.split('/').filter(|s| !s.is_empty()).map(|s| s.to_lowercase()).collect();
        let mut seen = Vec::new();
        for segment in &segments {
            if !seen.contains(segment) {
                *counts.entry(segment.clone()).or_default() += 1;
                seen.push(segment.clone());
            }
        }
        if segments.len() >= 2 {
            *prefixes.entry(segments[0].clone()).or_default() += 1;
        }
    }

    let mut segments: Vec<(String, usize)> = counts.into_iter().filter(|(_, n)| *n > 1).collect();
    segments.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    segments.truncate(TOP_SEGMENTS);

    let likely_pattern = prefixes
        .into_iter()
        .filter(|(_, n)| *n * 2 > urls.len())
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)))
        .map(|(prefix, _)| format!("/{}/", prefix));

    Observation::UrlPatterns { urls: urls.to_vec(), segments, likely_pattern }
}

/// Summarize page layout: containers, keyword links and frequent classes.
pub fn parse_html_structure(html: &str, url: Option<String>) -> Observation {
    let doc = Document::parse(html);

    let containers = doc
        .elements_by_tags(STRUCTURE_TAGS, STRUCTURE_LIMIT)
        .iter()
        .map(|el| Container {
            tag: el.tag_name(),
            id: el.attr("id").map(str::to_string),
            classes: el.classes().into_iter().map(str::to_string).collect(),
            links: el.select("a[href]").map(|a| a.len()).unwrap_or(0),
        })
        .collect();

    let all_links = doc.links();
    let mut article_links: Vec<String> = Vec::new();
    for link in &all_links {
        let lowered = link.to_lowercase();
        let keyword = SECTION_MARKERS.iter().any(|m| lowered.contains(&format!("/{}/", m)));
        if keyword && !article_links.contains(link) {
            article_links.push(link.clone());
        }
    }

    let mut class_counts: HashMap<String, usize> = HashMap::new();
    for el in doc.classed_elements() {
        for class in el.classes() {
            *class_counts.entry(class.to_string()).or_default() += 1;
        }
    }
    let mut common_classes: Vec<(String, usize)> = class_counts.into_iter().collect();
    common_classes.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    common_classes.truncate(TOP_CLASSES);

    Observation::Structure {
        url,
        title: doc.title(),
        containers,
        link_count: all_links.len(),
        article_links,
        common_classes,
    }
}

/// Function-calling schemas for every tool, in the chat-completions format.
pub fn definitions() -> Vec<Value> {
    let source = json!({
        "html": { "type": "string", "description": "Raw HTML markup" },
        "url": { "type": "string", "description": "URL of a page already fetched with fetch_html" }
    });
    vec![
        tool(
            "fetch_html",
            "Fetch a page and return its HTML and links. Use this first on the homepage.",
            json!({ "url": { "type": "string", "description": "Absolute or site-relative URL" } }),
            &["url"],
        ),
        tool(
            "test_selector",
            "Apply a CSS selector to a fetched page or raw HTML and show what it matches.",
            merge(&source, json!({ "selector": { "type": "string", "description": "CSS selector" } })),
            &["selector"],
        ),
        tool(
            "find_url_patterns",
            "Find common path segments across a list of URLs to spot the article URL pattern.",
            json!({ "urls": { "type": "array", "items": { "type": "string" } } }),
            &["urls"],
        ),
        tool(
            "parse_html_structure",
            "Summarize the layout of a page: containers, article-like links, frequent classes.",
            source.clone(),
            &[],
        ),
        tool(
            "check_js_rendered",
            "Check whether a page depends on JavaScript rendering. Run this on the homepage.",
            source,
            &[],
        ),
    ]
}

fn tool(name: &str, description: &str, properties: Value, required: &[&str]) -> Value {
    json!({
        "type": "function",
        "function": {
            "name": name,
            "description": description,
            "parameters": { "type": "object", "properties": properties, "required": required }
        }
    })
}

fn merge(a: &Value, b: Value) -> Value {
    let mut merged = a.clone();
    if let (Some(target), Value::Object(extra)) = (merged.as_object_mut(), b) {
        target.extend(extra);
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::FetchedPage;
    use async_trait::async_trait;

    struct OnePage;

    #[async_trait]
    impl PageFetcher for OnePage {
        async fn fetch(&self, url: &str, max_chars: usize) -> FetchedPage {
            if url.ends_with("/blog") {
                FetchedPage::ok(url, 200, r#"<a href="/blog/one">1</a><a href="/blog/two">2</a>"#, max_chars)
            } else {
                FetchedPage::failed(url, Some(404), "HTTP status 404")
            }
        }
    }

    #[test]
    fn test_parse_actions() {
        let action = Action::parse("fetch_html", &json!({ "url": "https://x.test" })).unwrap();
        assert_eq!(action, Action::FetchHtml { url: "https://x.test".into() });

        let action = Action::parse("test_selector", &json!("{\"url\": \"/blog\", \"selector\": \"a\"}")).unwrap();
        assert_eq!(action, Action::TestSelector { source: HtmlSource::Url("/blog".into()), selector: "a".into() });

        assert!(Action::parse("fetch_html", &json!({})).is_err());
        assert!(Action::parse("test_selector", &json!({ "selector": "a" })).is_err());
        assert!(Action::parse("rm_rf", &json!({})).is_err());
    }

    #[test]
    fn test_only_article_yielding_actions_are_capped() {
        assert!(Action::FetchHtml { url: "/".into() }.yields_articles());
        assert!(Action::FindUrlPatterns { urls: vec![] }.yields_articles());
        assert!(Action::ParseHtmlStructure { source: HtmlSource::Url("/".into()) }.yields_articles());
        assert!(!Action::CheckJsRendered { source: HtmlSource::Html(String::new()) }.yields_articles());
    }

    #[test]
    fn test_selector_reports_hrefs() {
        let html = r#"<ul><li class="post"><a href="/blog/a">A post</a></li><li class="post"><a href="/blog/b">B</a></li></ul>"#;
        let obs = test_selector(html, "li.post", None);

        match &obs {
            Observation::SelectorProbe { matches, hrefs, samples, .. } => {
                assert_eq!(*matches, 2);
                assert_eq!(hrefs, &vec!["/blog/a".to_string(), "/blog/b".to_string()]);
                assert_eq!(samples[0].href.as_deref(), Some("/blog/a"));
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(obs.to_string().contains("matched 2 elements"));
    }

    #[test]
    fn test_invalid_selector_is_an_error_observation() {
        assert!(test_selector("<p></p>", "p[[", None).is_error());
    }

    #[test]
    fn test_url_patterns_find_dominant_prefix() {
        let urls: Vec<String> = ["/blog/a", "/blog/b", "/blog/c", "/about/team"]
            .iter()
            .map(|p| format!("https://x.test{}", p))
            .collect();
        match find_url_patterns(&urls) {
            Observation::UrlPatterns { likely_pattern, segments, .. } => {
                assert_eq!(likely_pattern.as_deref(), Some("/blog/"));
                assert_eq!(segments[0], ("blog".to_string(), 3));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_structure_lists_keyword_links() {
        let html = r#"<html><head><title>Site</title></head><body>
            <nav class="menu"><a href="/about">About</a></nav>
            <main class="content"><a href="/blog/one">1</a><a href="/news/two">2</a></main></body></html>"#;
        match parse_html_structure(html, None) {
            Observation::Structure { title, article_links, containers, link_count, .. } => {
                assert_eq!(title.as_deref(), Some("Site"));
                assert_eq!(article_links, vec!["/blog/one".to_string(), "/news/two".to_string()]);
                assert_eq!(link_count, 3);
                assert!(containers.iter().any(|c| c.tag == "main" && c.links == 2));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_caches_page_for_later_tools() {
        let base = Url::parse("https://x.test").unwrap();
        let mut cache = PageCache::default();

        let obs = execute(&Action::FetchHtml { url: "/blog".into() }, &OnePage, &base, &mut cache).await;
        assert_eq!(obs.candidates().1.len(), 2);
        assert_eq!(cache.len(), 1);

        let action = Action::TestSelector { source: HtmlSource::Url("/blog/".into()), selector: "a".into() };
        let obs = execute(&action, &OnePage, &base, &mut cache).await;
        assert_eq!(obs.candidates().0, Some("https://x.test/blog/"));
        assert_eq!(obs.candidates().1.len(), 2);
    }

    #[tokio::test]
    async fn test_unfetched_url_and_fetch_failure_become_errors() {
        let base = Url::parse("https://x.test").unwrap();
        let mut cache = PageCache::default();

        let obs = execute(&Action::CheckJsRendered { source: HtmlSource::Url("/x".into()) }, &OnePage, &base, &mut cache).await;
        assert!(obs.to_string().contains("has not been fetched"));

        let obs = execute(&Action::FetchHtml { url: "/missing".into() }, &OnePage, &base, &mut cache).await;
        assert!(obs.is_error());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_definitions_cover_every_tool() {
        let names: Vec<String> = definitions()
            .iter()
            .map(|d| d["function"]["name"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(
            names,
            vec!["fetch_html", "test_selector", "find_url_patterns", "parse_html_structure", "check_js_rendered"]
        );
    }
}
