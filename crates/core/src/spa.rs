//! Detection of JavaScript-rendered (single-page application) sites.
//!
//! [`assess`] scores markup against five independent indicators. A page is
//! treated as client-rendered when at least [`SPA_THRESHOLD`] of them fire;
//! fewer is common on image-heavy but server-rendered sites.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::parse::Document;

/// Number of triggered indicators at which a page counts as client-rendered.
pub const SPA_THRESHOLD: usize = 3;

/// Visible text below this many characters counts as minimal.
pub const MIN_VISIBLE_TEXT: usize = 500;

/// Visible text ceiling for the near-empty body indicator.
pub const NEAR_EMPTY_TEXT: usize = 1_000;

/// More scripts than this, together with few links, is suspicious.
const SCRIPT_HEAVY: usize = 10;

/// Fewer links than this, together with many scripts, is suspicious.
const LINK_LIGHT: usize = 20;

/// Conventional mount points of client-side frameworks.
const ROOT_CONTAINERS: &[&str] = &["div#root", "div#app", "div#__next", "div#__nuxt", "[data-reactroot]"];

/// Markup fragments left behind by front-end frameworks, matched case-insensitively.
const FRAMEWORK_SIGNATURES: &[(&str, &str)] = &[
    ("data-reactroot", "React"),
    ("__next_data__", "Next.js"),
    ("react", "React"),
    ("data-v-", "Vue"),
    ("__nuxt__", "Nuxt"),
    ("vue", "Vue"),
    ("ng-version", "Angular"),
    ("ng-app", "Angular"),
    ("angular", "Angular"),
    ("data-svelte", "Svelte"),
];

/// One independently evaluated SPA indicator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Indicator {
    /// A framework mount point such as `#root` or `#__next`.
    RootContainer { selector: String },
    /// A framework signature string somewhere in the markup.
    FrameworkSignature { framework: String },
    /// Visible text shorter than [`MIN_VISIBLE_TEXT`].
    MinimalText { chars: usize },
    /// Many scripts but few links.
    ScriptHeavy { scripts: usize, links: usize },
    /// Body with at most two structural children and little text.
    NearEmptyBody { children: usize, chars: usize },
}

impl fmt::Display for Indicator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Indicator::RootContainer { selector } => write!(f, "SPA root container found ({})", selector),
            Indicator::FrameworkSignature { framework } => write!(f, "{} framework signature detected", framework),
            Indicator::MinimalText { chars } => write!(f, "very little visible text ({} chars)", chars),
            Indicator::ScriptHeavy { scripts, links } => {
                write!(f, "high script count ({}) vs low link count ({})", scripts, links)
            }
            Indicator::NearEmptyBody { children, chars } => {
                write!(f, "nearly empty body: {} main elements, {} chars", children, chars)
            }
        }
    }
}

/// Evidence produced by [`assess`] for a single page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaEvidence {
    /// Indicators that fired, in evaluation order.
    pub indicators: Vec<Indicator>,
    /// Visible text length in characters.
    pub text_chars: usize,
    /// Number of `<script>` tags.
    pub script_count: usize,
    /// Number of anchors with an `href`.
    pub link_count: usize,
    /// Number of structural elements directly under `<body>`.
    pub body_children: usize,
}

impl SpaEvidence {
    /// How many indicators fired.
    pub fn triggered(&self) -> usize {
        self.indicators.len()
    }

    /// Whether the page should be treated as client-rendered.
    pub fn is_spa(&self) -> bool {
        self.triggered() >= SPA_THRESHOLD
    }
}

impl fmt::Display for SpaEvidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "JAVASCRIPT RENDERING CHECK")?;
        writeln!(f, "Text content: {} characters", self.text_chars)?;
        writeln!(f, "Links found: {}", self.link_count)?;
        writeln!(f, "Script tags: {}", self.script_count)?;
        writeln!(f, "Body structure: {} main elements", self.body_children)?;
        for indicator in &self.indicators {
            writeln!(f, "  - {}", indicator)?;
        }
        if self.is_spa() {
            write!(f, "VERDICT: JavaScript-rendered site ({} indicators); static scraping will not work", self.triggered())
        } else {
            write!(f, "VERDICT: sufficient static HTML ({} indicators); proceed with article search", self.triggered())
        }
    }
}

/// Score markup for client-side rendering indicators. Pure; no network access.
pub fn assess(html: &str) -> SpaEvidence {
    let doc = Document::parse(html);
    let lowered = html.to_lowercase();

    let text_chars = doc.visible_text().chars().count();
    let script_count = doc.script_count();
    let link_count = doc.link_count();
    let body_children = doc.body_child_count();

    let mut indicators = Vec::new();

    if let Some(selector) = ROOT_CONTAINERS.iter().find(|sel| doc.contains(sel)) {
        indicators.push(Indicator::RootContainer { selector: selector.to_string() });
    }

    if let Some((_, framework)) = FRAMEWORK_SIGNATURES.iter().find(|(sig, _)| lowered.contains(sig)) {
        indicators.push(Indicator::FrameworkSignature { framework: framework.to_string() });
    }

    if text_chars < MIN_VISIBLE_TEXT {
        indicators.push(Indicator::MinimalText { chars: text_chars });
    }

    if script_count > SCRIPT_HEAVY && link_count < LINK_LIGHT {
        indicators.push(Indicator::ScriptHeavy { scripts: script_count, links: link_count });
    }

    if doc.has_body() && body_children <= 2 && text_chars < NEAR_EMPTY_TEXT {
        indicators.push(Indicator::NearEmptyBody { children: body_children, chars: text_chars });
    }

    SpaEvidence { indicators, text_chars, script_count, link_count, body_children }
}
