//! Extraction selector sets.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A field of a [`SelectorSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    ArticleLinks,
    Title,
    Content,
    Date,
    Author,
    BaseUrlPattern,
}

impl Field {
    /// All fields, in reporting order.
    pub const ALL: [Field; 6] =
        [Field::ArticleLinks, Field::Title, Field::Content, Field::Date, Field::Author, Field::BaseUrlPattern];

    /// Fields that must pass validation for a selector set to be accepted.
    pub const ACCEPTANCE: [Field; 3] = [Field::ArticleLinks, Field::Title, Field::Content];

    /// Snake-case name, as used on the wire and in reports.
    pub fn name(self) -> &'static str {
        match self {
            Field::ArticleLinks => "article_links",
            Field::Title => "title",
            Field::Content => "content",
            Field::Date => "date",
            Field::Author => "author",
            Field::BaseUrlPattern => "base_url_pattern",
        }
    }

    /// Whether the field may be absent from a selector set.
    pub fn is_optional(self) -> bool {
        matches!(self, Field::Date | Field::Author)
    }

    /// Whether a failure of this field blocks acceptance.
    pub fn blocks_acceptance(self) -> bool {
        Field::ACCEPTANCE.contains(&self)
    }

    /// Weight in the overall score.
    pub fn weight(self) -> f64 {
        if self.blocks_acceptance() { 3.0 } else { 1.0 }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Field {
    type Err = String;

    /// Accepts both `title` and the `title_selector` spelling models tend to use.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        let key = key.strip_suffix("_selector").unwrap_or(&key);
        Field::ALL
            .into_iter()
            .find(|field| field.name() == key)
            .ok_or_else(|| format!("Unknown selector field: {}", s))
    }
}

/// Selectors for every field of an article scraper.
///
/// `date` and `author` are optional; the remaining fields are always present,
/// possibly as an empty string when nothing usable was proposed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorSet {
    pub article_links: String,
    pub title: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    pub base_url_pattern: String,
}

impl SelectorSet {
    /// The selector for a field, `None` when absent or blank.
    pub fn get(&self, field: Field) -> Option<&str> {
        let value = match field {
            Field::ArticleLinks => Some(self.article_links.as_str()),
            Field::Title => Some(self.title.as_str()),
            Field::Content => Some(self.content.as_str()),
            Field::Date => self.date.as_deref(),
            Field::Author => self.author.as_deref(),
            Field::BaseUrlPattern => Some(self.base_url_pattern.as_str()),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }

    /// Set a field's selector. Blank values clear optional fields.
    pub fn set(&mut self, field: Field, selector: impl Into<String>) {
        let selector = selector.into().trim().to_string();
        let optional = (!selector.is_empty()).then(|| selector.clone());
        match field {
            Field::ArticleLinks => self.article_links = selector,
            Field::Title => self.title = selector,
            Field::Content => self.content = selector,
            Field::Date => self.date = optional,
            Field::Author => self.author = optional,
            Field::BaseUrlPattern => self.base_url_pattern = selector,
        }
    }

    /// A copy with `patch` applied, restricted to the fields in `allowed`.
    /// Entries for other fields are ignored.
    pub fn patched(&self, patch: &SelectorPatch, allowed: &[Field]) -> SelectorSet {
        let mut next = self.clone();
        for (field, selector) in patch.iter() {
            if allowed.contains(field) {
                next.set(*field, selector.clone());
            }
        }
        next
    }

    /// Mandatory fields that are blank.
    pub fn missing_mandatory(&self) -> Vec<Field> {
        Field::ALL
            .into_iter()
            .filter(|f| !f.is_optional() && self.get(*f).is_none())
            .collect()
    }

    /// Build a set from loose `field -> selector` pairs, as parsed from a
    /// model answer. Unknown keys and `null`-like values are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> SelectorSet
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut set = SelectorSet::default();
        for (field, selector) in SelectorPatch::from_pairs(pairs).iter() {
            set.set(*field, selector.clone());
        }
        set
    }
}

/// Replacement selectors for a subset of fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectorPatch(BTreeMap<Field, String>);

impl SelectorPatch {
    /// Build a patch from loose pairs; unknown keys and `null`-like values are skipped.
    pub fn from_pairs<I, K, V>(pairs: I) -> SelectorPatch
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let entries = pairs
            .into_iter()
            .filter_map(|(k, v)| {
                let field = k.as_ref().parse::<Field>().ok()?;
                let value = v.as_ref().trim().trim_matches('`').trim();
                let blank = value.is_empty() || matches!(value.to_lowercase().as_str(), "null" | "none" | "n/a");
                (!blank).then(|| (field, value.to_string()))
            })
            .collect();
        SelectorPatch(entries)
    }

    /// Insert one replacement.
    pub fn insert(&mut self, field: Field, selector: impl Into<String>) {
        self.0.insert(field, selector.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Field, &String)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
