//! Article URL classification.
//!
//! [`UrlClassifier`] turns raw `href` candidates into confirmed article URLs.
//! It is deterministic and has no access to the network: the same hrefs in
//! the same page context always give the same set.
//!
//! # Example
//!
//! ```rust
//! use sitescout_core::classify::{PageContext, UrlClassifier};
//! use url::Url;
//!
//! let base = Url::parse("https://x.test").unwrap();
//! let hrefs = ["/blog/post-1/", "/blog/post-1", "/category/news/", "/about/"];
//! let found = UrlClassifier::default().classify(hrefs, &base, &base, PageContext::Unknown);
//!
//! assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["https://x.test/blog/post-1"]);
//! ```

use std::collections::BTreeSet;
use std::fmt;

use url::Url;

/// Path segments that mark an article section.
pub const SECTION_MARKERS: &[&str] = &[
    "blog", "blogs", "article", "articles", "post", "posts", "news", "review", "reviews", "story", "stories", "insight",
    "insights",
];

/// A page is promoted to article-listing page once it links to at least this
/// many marker-confirmed articles.
pub const LISTING_MIN_ARTICLES: usize = 3;

/// Segments of listing, taxonomy and pagination pages.
const EXCLUDED_SEGMENTS: &[&str] = &[
    "category", "categories", "tag", "tags", "page", "author", "authors", "feed", "rss", "industries", "search",
    "archive", "archives", "wp-json", "login",
];

/// Directories holding static resources.
const ASSET_DIRECTORIES: &[&str] = &["images", "img", "assets", "static", "media", "css", "js", "fonts", "wp-content", "uploads"];

/// File extensions of static resources.
const STATIC_EXTENSIONS: &[&str] = &[
    "css", "js", "png", "jpg", "jpeg", "gif", "webp", "svg", "ico", "woff", "woff2", "ttf", "eot", "mp4", "mp3", "pdf",
    "zip", "xml", "json", "rss",
];

/// Extensions of server-side handlers whose identity lives in the query string.
const HANDLER_EXTENSIONS: &[&str] = &["php", "asp", "aspx", "jsp", "cfm"];

/// Query keys that page through a listing.
const PAGINATION_KEYS: &[&str] = &["page", "p", "paged", "offset", "start"];

/// Where the hrefs being classified came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageContext {
    /// Any page not (yet) known to be a listing.
    #[default]
    Unknown,
    /// A page already confirmed to be an article listing: links need no
    /// section marker to be accepted.
    Listing,
}

/// Why a candidate was rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rejection {
    /// Could not be resolved against the page URL.
    Unresolvable,
    /// Resolved to something other than http(s).
    Scheme(String),
    /// Points at another host.
    ForeignHost(String),
    /// Contains a taxonomy, pagination or listing segment.
    ExcludedSegment(String),
    /// Pages through a listing by query key or numbered segment.
    Pagination(String),
    /// Points at a static resource.
    Asset,
    /// No section marker and not reached from a listing page.
    NoSectionMarker,
    /// Fewer than two path segments, or the path is a bare section root.
    SectionRoot,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Unresolvable => write!(f, "unresolvable href"),
            Rejection::Scheme(scheme) => write!(f, "unsupported scheme {}", scheme),
            Rejection::ForeignHost(host) => write!(f, "foreign host {}", host),
            Rejection::ExcludedSegment(seg) => write!(f, "excluded segment /{}/", seg),
            Rejection::Pagination(part) => write!(f, "pagination {}", part),
            Rejection::Asset => write!(f, "static resource"),
            Rejection::NoSectionMarker => write!(f, "no article section marker"),
            Rejection::SectionRoot => write!(f, "section root"),
        }
    }
}

/// Filters link candidates down to confirmed article URLs.
#[derive(Debug, Clone)]
pub struct UrlClassifier {
    section_markers: Vec<String>,
}

impl Default for UrlClassifier {
    fn default() -> Self {
        Self::with_markers(SECTION_MARKERS.iter().copied())
    }
}

impl UrlClassifier {
    /// Classifier with a custom set of article section markers.
    pub fn with_markers<I, S>(markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self { section_markers: markers.into_iter().map(|m| m.as_ref().to_lowercase()).collect() }
    }

    /// Classify every candidate and return the normalized, deduplicated set
    /// of confirmed article URLs.
    pub fn classify<I, S>(&self, hrefs: I, page_url: &Url, base_url: &Url, context: PageContext) -> BTreeSet<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        hrefs
            .into_iter()
            .filter_map(|href| self.classify_one(href.as_ref(), page_url, base_url, context).ok())
            .collect()
    }

    /// Classify a single candidate, explaining rejections.
    pub fn classify_one(
        &self, href: &str, page_url: &Url, base_url: &Url, context: PageContext,
    ) -> Result<String, Rejection> {
        let mut url = page_url.join(href.trim()).map_err(|_| Rejection::Unresolvable)?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Rejection::Scheme(url.scheme().to_string()));
        }

        let host = url.host_str().unwrap_or_default().to_string();
        if bare_host(&host) != bare_host(base_url.host_str().unwrap_or_default()) {
            return Err(Rejection::ForeignHost(host));
        }

        let segments = path_segments(&url);

        if let Some(seg) = segments.iter().find(|seg| EXCLUDED_SEGMENTS.contains(&seg.as_str())) {
            return Err(Rejection::ExcludedSegment(seg.clone()));
        }

        if is_asset(&segments) {
            return Err(Rejection::Asset);
        }

        if let Some((key, _)) = url.query_pairs().find(|(k, _)| PAGINATION_KEYS.contains(&k.as_ref())) {
            return Err(Rejection::Pagination(format!("?{}=", key)));
        }
        if let Some(seg) = self.pagination_segment(&segments) {
            return Err(Rejection::Pagination(format!("/{}/", seg)));
        }

        let marker = self.section_marker(&segments);
        if marker.is_none() && context != PageContext::Listing {
            return Err(Rejection::NoSectionMarker);
        }

        let ends_in_marker = segments.last().is_some_and(|last| self.section_markers.contains(last));
        if segments.len() < 2 || ends_in_marker {
            return Err(Rejection::SectionRoot);
        }

        if base_url.host_str() != Some(host.as_str()) {
            let _ = url.set_host(base_url.host_str());
        }
        Ok(normalize_url(&url))
    }

    /// The first (leftmost) path segment that is a section marker.
    ///
    /// Paths with several markers (`/news/blog/x`) are attributed to the
    /// leftmost one; acceptance does not depend on which.
    pub fn section_marker(&self, segments: &[String]) -> Option<String> {
        segments.iter().find(|seg| self.section_markers.contains(seg)).cloned()
    }

    /// A numbered page directly under a section marker: `/blog/2`, `/news/page3`.
    fn pagination_segment<'s>(&self, segments: &'s [String]) -> Option<&'s str> {
        segments.windows(2).enumerate().find_map(|(i, pair)| {
            let under_marker = self.section_markers.contains(&pair[0]);
            let numbered = is_numbered_page(&pair[1]) || (i + 2 == segments.len() && is_number(&pair[1]));
            (under_marker && numbered).then_some(pair[1].as_str())
        })
    }

    /// Normalize a URL string the same way accepted candidates are.
    pub fn normalize(&self, url: &str) -> Option<String> {
        Url::parse(url).ok().map(|u| normalize_url(&u))
    }
}

/// Host without a leading `www.`.
fn bare_host(host: &str) -> &str {
    host.strip_prefix("www.").unwrap_or(host)
}

/// Lowercased non-empty path segments.
fn path_segments(url: &Url) -> Vec<String> {
    url.path_segments()
        .map(|segs| segs.filter(|s| !s.is_empty()).map(|s| s.to_lowercase()).collect())
        .unwrap_or_default()
}

fn extension(segment: &str) -> Option<&str> {
    segment.rsplit_once('.').map(|(_, ext)| ext)
}

fn is_asset(segments: &[String]) -> bool {
    let in_asset_dir = segments
        .iter()
        .any(|seg| ASSET_DIRECTORIES.contains(&seg.as_str()) || seg.starts_with("_hu"));
    let static_file = segments
        .last()
        .and_then(|last| extension(last))
        .is_some_and(|ext| STATIC_EXTENSIONS.contains(&ext));
    in_asset_dir || static_file
}

fn is_number(segment: &str) -> bool {
    !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit())
}

/// `page2`, `page-2`, `page_2`.
fn is_numbered_page(segment: &str) -> bool {
    segment
        .strip_prefix("page")
        .map(|rest| rest.trim_start_matches(['-', '_']))
        .is_some_and(is_number)
}

/// Whether the query string is what tells two articles apart: the path ends
/// in a server-side handler script.
fn query_identifies(segments: &[String]) -> bool {
    segments
        .last()
        .and_then(|last| extension(last))
        .is_some_and(|ext| HANDLER_EXTENSIONS.contains(&ext))
}

fn normalize_url(url: &Url) -> String {
    let mut url = url.clone();
    url.set_fragment(None);

    let segments = path_segments(&url);
    if query_identifies(&segments) && url.query().is_some() {
        let kept: Vec<(String, String)> = url
            .query_pairs()
            .filter(|(k, _)| !k.starts_with("utm_"))
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        if kept.is_empty() {
            url.set_query(None);
        } else {
            url.query_pairs_mut().clear().extend_pairs(kept);
        }
    } else {
        url.set_query(None);
    }

    let trimmed = url.path().trim_end_matches('/').to_string();
    if trimmed.is_empty() {
        url.set_path("/");
    } else {
        url.set_path(&trimmed);
    }

    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Url {
        Url::parse("https://x.test").unwrap()
    }

    fn classify_all(hrefs: &[&str], context: PageContext) -> Vec<String> {
        UrlClassifier::default()
            .classify(hrefs.iter().copied(), &base(), &base(), context)
            .into_iter()
            .collect()
    }

    fn reject(href: &str) -> Rejection {
        UrlClassifier::default()
            .classify_one(href, &base(), &base(), PageContext::Unknown)
            .unwrap_err()
    }

    #[test]
    fn test_reference_example() {
        let found = classify_all(
            &["/blog/post-1/", "/blog/post-1", "/category/news/", "/blog/images/logo.png", "/about/"],
            PageContext::Unknown,
        );
        assert_eq!(found, vec!["https://x.test/blog/post-1"]);
    }

    #[test]
    fn test_rejection_reasons() {
        assert_eq!(reject("https://other.test/blog/a"), Rejection::ForeignHost("other.test".into()));
        assert_eq!(reject("mailto:hi@x.test"), Rejection::Scheme("mailto".into()));
        assert_eq!(reject("/blog/tag/rust"), Rejection::ExcludedSegment("tag".into()));
        assert_eq!(reject("/blog/page/2"), Rejection::ExcludedSegment("page".into()));
        assert_eq!(reject("/author/jane"), Rejection::ExcludedSegment("author".into()));
        assert_eq!(reject("/blog/styles.css"), Rejection::Asset);
        assert_eq!(reject("/static/blog/x"), Rejection::Asset);
        assert_eq!(reject("/blog/_hu123/x"), Rejection::Asset);
        assert_eq!(reject("/about/team"), Rejection::NoSectionMarker);
        assert_eq!(reject("/blog/"), Rejection::SectionRoot);
        assert_eq!(reject("/en/blog/"), Rejection::SectionRoot);
    }

    #[test]
    fn test_pagination_is_rejected() {
        assert_eq!(reject("/en/blog?page=2"), Rejection::Pagination("?page=".into()));
        assert_eq!(reject("/blog?page=2"), Rejection::Pagination("?page=".into()));
        assert_eq!(reject("/news/articles?page=3"), Rejection::Pagination("?page=".into()));
        assert_eq!(reject("/news/index.php?paged=4"), Rejection::Pagination("?paged=".into()));
        assert_eq!(reject("/blog/post-1?offset=20"), Rejection::Pagination("?offset=".into()));
        assert_eq!(reject("/blog/2/"), Rejection::Pagination("/2/".into()));
        assert_eq!(reject("/news/page2"), Rejection::Pagination("/page2/".into()));
        assert_eq!(reject("/news/page-3/older"), Rejection::Pagination("/page-3/".into()));
    }

    #[test]
    fn test_section_root_with_query_is_still_a_root() {
        assert_eq!(reject("/en/blog?lang=fr"), Rejection::SectionRoot);
        assert_eq!(reject("/news/articles?sort=new"), Rejection::SectionRoot);
    }

    #[test]
    fn test_dated_paths_are_not_pagination() {
        let found = classify_all(&["/blog/2024/05/launch", "/news/pageant-winners"], PageContext::Unknown);
        assert_eq!(
            found,
            vec!["https://x.test/blog/2024/05/launch", "https://x.test/news/pageant-winners"]
        );
    }

    #[test]
    fn test_www_prefix_is_same_site_and_normalized() {
        let found = classify_all(&["https://www.x.test/news/launch", "/news/launch/"], PageContext::Unknown);
        assert_eq!(found, vec!["https://x.test/news/launch"]);
    }

    #[test]
    fn test_fragment_and_plain_query_are_dropped() {
        let found = classify_all(&["/posts/hello#comments", "/posts/hello?utm_source=x"], PageContext::Unknown);
        assert_eq!(found, vec!["https://x.test/posts/hello"]);
    }

    #[test]
    fn test_query_kept_when_it_identifies_the_article() {
        let found = classify_all(&["/news/article.php?id=7", "/news/article.php?id=8&utm_medium=rss"], PageContext::Unknown);
        assert_eq!(
            found,
            vec!["https://x.test/news/article.php?id=7", "https://x.test/news/article.php?id=8"]
        );
    }

    #[test]
    fn test_listing_context_accepts_unmarked_links() {
        let page = Url::parse("https://x.test/journal/").unwrap();
        let classifier = UrlClassifier::default();
        let hrefs = ["2024/spring-update", "/journal/tag/x", "/contact"];

        let unknown = classifier.classify(hrefs, &page, &base(), PageContext::Unknown);
        let listing = classifier.classify(hrefs, &page, &base(), PageContext::Listing);

        assert!(unknown.is_empty());
        assert_eq!(
            listing.into_iter().collect::<Vec<_>>(),
            vec!["https://x.test/journal/2024/spring-update"]
        );
    }

    #[test]
    fn test_relative_hrefs_resolve_against_current_page() {
        let page = Url::parse("https://x.test/blog/").unwrap();
        let found = UrlClassifier::default().classify(["first-post"], &page, &base(), PageContext::Unknown);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["https://x.test/blog/first-post"]);
    }

    #[test]
    fn test_custom_markers() {
        let classifier = UrlClassifier::with_markers(["Journal"]);
        let found = classifier.classify(["/journal/a", "/blog/b"], &base(), &base(), PageContext::Unknown);
        assert_eq!(found.into_iter().collect::<Vec<_>>(), vec!["https://x.test/journal/a"]);
    }

    #[test]
    fn test_leftmost_marker_wins() {
        let classifier = UrlClassifier::default();
        let segments = vec!["news".to_string(), "blog".to_string(), "x".to_string()];
        assert_eq!(classifier.section_marker(&segments), Some("news".to_string()));
    }
}
