// tests/feed_fixtures.rs
// Full-file parses of realistic RSS and Atom bodies.

use ai_news_collector::feeds::parser::parse_feed;

const RSS: &str = include_str!("fixtures/rss_sample.xml");
const ATOM: &str = include_str!("fixtures/atom_sample.xml");

#[test]
fn rss_fixture_yields_only_valid_items() {
    let items = parse_feed(RSS, "Example AI News").expect("rss parses");

    // 4 items in the file; one has no link, one has no title
    assert_eq!(items.len(), 2);

    let first = &items[0];
    assert_eq!(first.title, "ChatGPT gets new voice mode");
    assert_eq!(first.url, "https://example.com/a");
    assert_eq!(first.source, "Example AI News");
    // content:encoded wins over description
    assert!(first.description.contains("voice mode"));
    assert!(first.description.contains("paying users"));
    assert_eq!(first.published.to_rfc3339(), "2025-05-05T10:30:00+00:00");

    assert_eq!(items[1].url, "https://example.com/b");
}

#[test]
fn atom_fixture_picks_html_links() {
    let items = parse_feed(ATOM, "Example Atom Feed").expect("atom parses");
    assert_eq!(items.len(), 2);

    // alternate link preferred over the self link
    assert_eq!(items[0].url, "https://example.org/posts/gemini-ga");
    assert!(items[0].description.contains("Gemini 2.5"));
    assert_eq!(items[0].published.to_rfc3339(), "2025-05-06T09:00:00+00:00");

    // a single bare link is still usable
    assert_eq!(items[1].url, "https://example.org/posts/copilot-agents");
    assert_eq!(items[1].description, "Microsoft widened the agent preview.");
}

#[test]
fn titles_come_out_normalized() {
    let items = parse_feed(RSS, "x").unwrap();
    for item in &items {
        assert!(!item.title.contains('<'));
        assert_eq!(item.title, item.title.trim());
    }
}
