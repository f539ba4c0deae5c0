use std::fmt::Write;

use crate::reasoner::{PagePreview, ProposalContext};
use crate::selectors::{Field, SelectorSet};
use crate::validate::{PageRole, ValidationResult};

/// Marker the model uses to end exploration.
pub const FINAL_ANSWER: &str = "FINAL_ANSWER";

/// Article previews included in a revision prompt.
const REVISION_ARTICLES: usize = 2;

pub fn exploration_system(base_url: &str, max_articles: usize) -> String {
    format!(
        r#"You are an expert web scraping analyst. Find article or blog post URLs on {base_url}.

GOAL: a representative sample of up to {max_articles} individual article URLs, enough to identify the
site's article pattern. You do not need every article.

Work in a Thought-Action-Observation cycle: state what you know, call tools, read their results.

STRATEGY:
1. Fetch the homepage with fetch_html.
2. Immediately run check_js_rendered on it (pass "url"). If the verdict says the site is
   JavaScript-rendered, stop and reply with a short explanation.
3. Otherwise look for blog, news or articles sections, fetch those listing pages and collect
   individual article links. Check two or three pagination pages at most.
4. Use test_selector and parse_html_structure with "url" to inspect pages you already fetched,
   and find_url_patterns to confirm which URLs follow the article pattern.

Skip category, tag, author and pagination pages: only individual articles count.

When you have enough articles, reply without tool calls:
{FINAL_ANSWER}: followed by the article URLs, one per line."#
    )
}

pub fn proposal(context: &ProposalContext) -> String {
    let mut prompt = format!(
        "Analyze the HTML of {} and determine CSS selectors for scraping its articles.\n\n",
        context.base_url
    );
    for (i, page) in context.pages.iter().enumerate() {
        write_preview(&mut prompt, i + 1, page);
    }
    prompt.push_str(&format!(
        r#"
Determine selectors for:
1. article_links - links to individual articles on a listing page
2. title - the article title on an article page
3. content - the main article body
4. date - the publication date, if present (meta tags count)
5. author - the author, if present (meta tags count)
6. base_url_pattern - a path pattern shared by article URLs, such as /blog/

Selectors must work on every sample, not just one. Prefer simple selectors. Use null when a
field does not exist on the site.

Reply with ONLY this JSON:
{}"#,
        json_template()
    ));
    prompt
}

pub fn revision(
    context: &ProposalContext, current: &SelectorSet, validation: &ValidationResult, failing: &[Field],
) -> String {
    let current_json = serde_json::to_string_pretty(current).unwrap_or_default();
    let failing_names: Vec<&str> = failing.iter().map(|f| f.name()).collect();

    let mut prompt = format!(
        "The CSS selectors for {} do not work correctly.\n\nCurrent selectors:\n{}\n\nValidation results:\n{}\n",
        context.base_url, current_json, validation
    );
    for field in failing {
        if let Some(failure) = validation.field(*field).and_then(|r| r.failure.as_ref()) {
            let _ = writeln!(prompt, "{} failed: {}", field, failure);
        }
    }

    let listing = context.pages.iter().filter(|p| p.role == PageRole::Listing).take(1);
    let articles = context.pages.iter().filter(|p| p.role == PageRole::Article).take(REVISION_ARTICLES);
    for (i, page) in listing.chain(articles).enumerate() {
        write_preview(&mut prompt, i + 1, page);
    }

    let _ = write!(
        prompt,
        "\nFix ONLY these fields: {}. Reply with ONLY a JSON object mapping each of those field \
         names to a new selector, for example {{\"{}\": \"...\"}}.",
        failing_names.join(", "),
        failing_names.first().copied().unwrap_or("title")
    );
    prompt
}

fn write_preview(prompt: &mut String, index: usize, page: &PagePreview) {
    let role = match page.role {
        PageRole::Listing => "Listing page",
        PageRole::Article => "Article",
    };
    let _ = write!(prompt, "\n--- {} {} (URL: {}) ---\n{}\n", role, index, page.url, page.html);
}

fn json_template() -> String {
    let mut template = String::from("{\n");
    for field in Field::ALL {
        let _ = writeln!(template, "  \"{}\": \"CSS selector or null\",", field);
    }
    template.push_str("  \"notes\": \"short notes\"\n}");
    template
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::SamplePage;

    #[test]
    fn test_proposal_lists_every_field_and_sample() {
        let samples = vec![
            SamplePage::listing("https://x.test/blog", "<ul></ul>"),
            SamplePage::article("https://x.test/blog/a", "<h1>A</h1>"),
        ];
        let prompt = proposal(&ProposalContext::from_samples("https://x.test", &samples));

        for field in Field::ALL {
            assert!(prompt.contains(field.name()));
        }
        assert!(prompt.contains("Listing page 1 (URL: https://x.test/blog)"));
        assert!(prompt.contains("Article 2 (URL: https://x.test/blog/a)"));
    }

    #[test]
    fn test_exploration_prompt_names_final_marker() {
        assert!(exploration_system("https://x.test", 30).contains("FINAL_ANSWER:"));
    }
}
