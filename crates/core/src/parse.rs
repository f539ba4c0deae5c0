//! HTML parsing and DOM queries.
//!
//! This module provides the [`Document`] and [`Element`] types used by the
//! SPA detector, the exploration tools and the selector validator. They wrap
//! `scraper` and expose only the handful of queries those callers need.
//!
//! # Example
//!
//! ```rust
//! use sitescout_core::parse::Document;
//!
//! let html = r#"
//!     <html>
//!         <body>
//!             <h1>Title</h1>
//!             <a href="/blog/first-post">First</a>
//!         </body>
//!     </html>
//! "#;
//!
//! let doc = Document::parse(html);
//! assert_eq!(doc.links(), vec!["/blog/first-post".to_string()]);
//! ```

use scraper::{Html, Selector};

use crate::{Result, ScoutError};

/// Tags whose text never reaches the reader.
const HIDDEN_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Compile a CSS selector, mapping the parse error into [`ScoutError::InvalidInput`].
pub fn compile_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScoutError::InvalidInput(format!("Invalid selector `{}`: {}", selector, e)))
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max_chars` characters, respecting char boundaries.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], true),
        None => (text, false),
    }
}

/// Represents a parsed HTML document.
///
/// # Example
///
/// ```rust
/// use sitescout_core::parse::Document;
///
/// let html = "<html><head><title>Test</title></head><body><p>Hello</p></body></html>";
/// let doc = Document::parse(html);
/// assert_eq!(doc.title(), Some("Test".to_string()));
/// ```
pub struct Document {
    html: Html,
}

impl Document {
    /// Parses HTML from a string. Parsing is lenient and never fails.
    pub fn parse(html: &str) -> Self {
        Self { html: Html::parse_document(html) }
    }

    /// Selects elements using a CSS selector.
    ///
    /// # Errors
    ///
    /// Returns [`ScoutError::InvalidInput`] if the selector is invalid.
    ///
    /// # Example
    ///
    /// ```rust
    /// use sitescout_core::parse::Document;
    ///
    /// let html = r#"<p class="content">First</p><p class="content">Second</p>"#;
    /// let doc = Document::parse(html);
    /// let elements = doc.select("p.content").unwrap();
    /// assert_eq!(elements.len(), 2);
    /// ```
    pub fn select(&'_ self, selector: &str) -> Result<Vec<Element<'_>>> {
        let sel = compile_selector(selector)?;
        Ok(self.select_compiled(&sel))
    }

    /// Selects elements with an already compiled selector.
    pub fn select_compiled(&'_ self, selector: &Selector) -> Vec<Element<'_>> {
        self.html.select(selector).map(|el| Element { element: el }).collect()
    }

    /// Number of elements matching a selector that is known to be valid.
    fn count(&self, selector: &str) -> usize {
        Selector::parse(selector)
            .map(|sel| self.html.select(&sel).count())
            .unwrap_or(0)
    }

    /// Gets the content of the `<title>` element if present.
    pub fn title(&self) -> Option<String> {
        let selector = Selector::parse("title").ok()?;
        self.html
            .select(&selector)
            .next()
            .map(|el| normalize_whitespace(&el.text().collect::<String>()))
    }

    /// All `href` values of anchors, in document order.
    pub fn links(&self) -> Vec<String> {
        let Ok(selector) = Selector::parse("a[href]") else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .filter_map(|el| el.value().attr("href"))
            .map(|href| href.trim().to_string())
            .filter(|href| !href.is_empty())
            .collect()
    }

    /// Number of anchors carrying an `href`.
    pub fn link_count(&self) -> usize {
        self.count("a[href]")
    }

    /// Number of `<script>` elements.
    pub fn script_count(&self) -> usize {
        self.count("script")
    }

    /// Text a reader would see: script, style and noscript content excluded,
    /// each text node trimmed, nodes joined by a single space.
    pub fn visible_text(&self) -> String {
        let mut chunks = Vec::new();
        for node in self.html.tree.root().descendants() {
            let Some(text) = node.value().as_text() else {
                continue;
            };
            let hidden = node
                .ancestors()
                .any(|a| a.value().as_element().is_some_and(|e| HIDDEN_TAGS.contains(&e.name())));
            let trimmed = text.trim();
            if !hidden && !trimmed.is_empty() {
                chunks.push(trimmed);
            }
        }
        chunks.join(" ")
    }

    /// Whether the document has an explicit or implied `<body>`.
    pub fn has_body(&self) -> bool {
        self.count("body") > 0
    }

    /// Number of element children directly under `<body>`, ignoring scripts
    /// and other hidden elements.
    pub fn body_child_count(&self) -> usize {
        let Ok(selector) = Selector::parse("body") else {
            return 0;
        };
        let Some(body) = self.html.select(&selector).next() else {
            return 0;
        };
        body.children()
            .filter_map(|child| child.value().as_element())
            .filter(|el| !HIDDEN_TAGS.contains(&el.name()))
            .count()
    }

    /// Whether any element matches the selector.
    pub fn contains(&self, selector: &str) -> bool {
        self.count(selector) > 0
    }

    /// All elements of the given tags, in document order, capped at `limit`.
    pub fn elements_by_tags(&'_ self, tags: &[&str], limit: usize) -> Vec<Element<'_>> {
        let Ok(selector) = Selector::parse(&tags.join(", ")) else {
            return Vec::new();
        };
        self.html
            .select(&selector)
            .take(limit)
            .map(|el| Element { element: el })
            .collect()
    }

    /// Every element that carries a `class` attribute.
    pub fn classed_elements(&'_ self) -> Vec<Element<'_>> {
        self.select("[class]").unwrap_or_default()
    }
}

/// A wrapper around scraper's ElementRef.
///
/// # Example
///
/// ```rust
/// use sitescout_core::parse::Document;
///
/// let html = r#"<a href="https://example.com">Link text</a>"#;
/// let doc = Document::parse(html);
/// let link = &doc.select("a").unwrap()[0];
///
/// assert_eq!(link.text(), "Link text");
/// assert_eq!(link.attr("href"), Some("https://example.com"));
/// ```
#[derive(Clone, Debug)]
pub struct Element<'a> {
    element: scraper::ElementRef<'a>,
}

impl<'a> Element<'a> {
    /// Concatenated text of all descendant text nodes, whitespace normalized.
    pub fn text(&self) -> String {
        normalize_whitespace(&self.element.text().collect::<String>())
    }

    /// Gets the value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.element.value().attr(name)
    }

    /// Gets the lowercase tag name.
    pub fn tag_name(&self) -> String {
        self.element.value().name().to_lowercase()
    }

    /// Descendants of this element matching a selector.
    pub fn select(&self, selector: &str) -> Result<Vec<Element<'a>>> {
        let sel = compile_selector(selector)?;
        Ok(self.element.select(&sel).map(|el| Element { element: el }).collect())
    }

    /// Class names of the element.
    pub fn classes(&self) -> Vec<&str> {
        self.element.value().classes().collect()
    }

    /// The value a field extractor should read: the element text, falling back
    /// to `content` (meta tags) and `datetime` (time tags) attributes.
    pub fn value_text(&self) -> String {
        let text = self.text();
        if !text.is_empty() {
            return text;
        }
        ["content", "datetime", "title"]
            .iter()
            .find_map(|name| self.attr(name).map(normalize_whitespace).filter(|v| !v.is_empty()))
            .unwrap_or_default()
    }
}
