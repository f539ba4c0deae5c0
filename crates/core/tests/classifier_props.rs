//! Property tests for URL classification.
use proptest::prelude::*;
use sitescout_core::classify::{PageContext, UrlClassifier};
use url::Url;

const VOCAB: &[&str] = &[
    "blog", "news", "articles", "posts", "stories", "category", "tag", "page", "author", "feed", "images", "static",
    "wp-content", "_hu42", "index.php", "en", "2024", "about", "page2", "3",
];

const HOSTS: &[&str] = &["", "https://x.test", "https://www.x.test", "http://x.test", "https://other.test"];

const EXCLUDED: &[&str] = &["category", "tag", "page", "author", "feed"];

const MARKERS: &[&str] = &["blog", "news", "articles", "posts", "stories"];

const PAGINATION_KEYS: &[&str] = &["page", "p", "paged", "offset", "start"];

fn segment() -> impl Strategy<Value = String> {
    prop_oneof![prop::sample::select(VOCAB).prop_map(String::from), "[a-z0-9-]{1,8}"]
}

fn href() -> impl Strategy<Value = String> {
    (
        prop::sample::select(HOSTS),
        prop::collection::vec(segment(), 0..5),
        any::<bool>(),
        prop::option::of(prop_oneof![
            Just("utm_source=mail".to_string()),
            Just("page=2".to_string()),
            "[a-z]{1,4}=[0-9]{1,3}"
        ]),
        prop::option::of("[a-z]{1,6}"),
    )
        .prop_map(|(host, segments, trailing, query, fragment)| {
            let mut href = format!("{}/{}", host, segments.join("/"));
            if trailing && !segments.is_empty() {
                href.push('/');
            }
            if let Some(query) = query {
                href.push('?');
                href.push_str(&query);
            }
            if let Some(fragment) = fragment {
                href.push('#');
                href.push_str(&fragment);
            }
            href
        })
}

fn base() -> Url {
    Url::parse("https://x.test/").unwrap()
}

proptest! {
    #[test]
    fn classification_is_deterministic(hrefs in prop::collection::vec(href(), 0..20)) {
        let classifier = UrlClassifier::default();
        let first = classifier.classify(&hrefs, &base(), &base(), PageContext::Unknown);
        let second = classifier.classify(&hrefs, &base(), &base(), PageContext::Unknown);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn accepted_urls_are_normalized_same_site_articles(hrefs in prop::collection::vec(href(), 0..20)) {
        let classifier = UrlClassifier::default();
        let accepted = classifier.classify(&hrefs, &base(), &base(), PageContext::Unknown);

        for url in &accepted {
            let parsed = Url::parse(url).unwrap();
            prop_assert_eq!(parsed.host_str(), Some("x.test"));
            prop_assert!(parsed.fragment().is_none());
            prop_assert!(!url.contains("utm_"));
            prop_assert!(!parsed.path().ends_with('/'));
            prop_assert_eq!(classifier.normalize(url), Some(url.clone()));

            let segments: Vec<&str> = parsed.path_segments().unwrap().filter(|s| !s.is_empty()).collect();
            prop_assert!(segments.len() >= 2);
            for segment in &segments {
                prop_assert!(!EXCLUDED.contains(segment));
            }
            prop_assert!(!MARKERS.contains(segments.last().unwrap()));
            for pair in segments.windows(2) {
                if MARKERS.contains(&pair[0]) {
                    prop_assert_ne!(pair[1], "page2");
                }
            }
            let last_two = &segments[segments.len() - 2..];
            prop_assert!(!(MARKERS.contains(&last_two[0]) && last_two[1].bytes().all(|b| b.is_ascii_digit())));
            for (key, _) in parsed.query_pairs() {
                prop_assert!(!PAGINATION_KEYS.contains(&key.as_ref()));
            }
            if parsed.query().is_some() {
                prop_assert!(parsed.path().ends_with(".php"));
            }
        }

        let again = classifier.classify(&accepted, &base(), &base(), PageContext::Unknown);
        prop_assert_eq!(again, accepted);
    }

    #[test]
    fn listing_context_only_adds_urls(hrefs in prop::collection::vec(href(), 0..20)) {
        let classifier = UrlClassifier::default();
        let unknown = classifier.classify(&hrefs, &base(), &base(), PageContext::Unknown);
        let listing = classifier.classify(&hrefs, &base(), &base(), PageContext::Listing);
        prop_assert!(unknown.is_subset(&listing));
    }
}
