// src/feeds/parser.rs
//! Syndication feed parsing: RSS 2.0 `<channel><item>` and Atom
//! `<feed><entry>`, sniffed by trying one shape after the other. Output is
//! already normalized and filtered down to items with a title and a link.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use metrics::histogram;
use quick_xml::de::from_str;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::{OffsetDateTime, UtcOffset};

use super::RawItem;
use crate::normalize::normalize_text;

// --- RSS 2.0 -----------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    // quick-xml strips the namespace prefix, so `content:encoded` arrives as
    // the local name `encoded`
    #[serde(rename = "encoded")]
    content_encoded: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

// --- Atom --------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<AtomText>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    summary: Option<AtomText>,
    content: Option<AtomText>,
    published: Option<String>,
    updated: Option<String>,
}

/// Atom text construct; `type` and markup are ignored, tags are stripped by
/// normalization later.
#[derive(Debug, Deserialize)]
struct AtomText {
    #[serde(rename = "$text")]
    value: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
    #[serde(rename = "@type")]
    kind: Option<String>,
}

/// Pick the entry's article link: an explicit alternate or HTML-typed link
/// wins, otherwise the first link with an href at all.
fn pick_atom_link(links: &[AtomLink]) -> Option<String> {
    let preferred = links.iter().find(|l| {
        l.rel.as_deref() == Some("alternate")
            || l.kind.as_deref().is_some_and(|t| t.contains("html"))
    });
    preferred
        .or_else(|| links.iter().find(|l| l.href.is_some()))
        .and_then(|l| l.href.clone())
}

/// Parse an RFC-2822 (RSS) or RFC-3339 (Atom) timestamp; items without a
/// usable date get the current time so ordering stays sane.
pub fn parse_feed_date(raw: Option<&str>) -> DateTime<Utc> {
    raw.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| {
            OffsetDateTime::parse(s, &Rfc2822)
                .or_else(|_| OffsetDateTime::parse(s, &Rfc3339))
                .ok()
        })
        .map(|dt| dt.to_offset(UtcOffset::UTC).unix_timestamp())
        .and_then(|secs| DateTime::from_timestamp(secs, 0))
        .unwrap_or_else(Utc::now)
}

/// Bare named entities are common in real-world feeds and are not valid XML;
/// swap the usual suspects for literals before handing the body to quick-xml.
fn scrub_html_entities_for_xml(s: &str) -> String {
    s.replace("&nbsp;", " ")
        .replace("&ndash;", "-")
        .replace("&mdash;", "-")
        .replace("&ldquo;", "\"")
        .replace("&rdquo;", "\"")
        .replace("&lsquo;", "'")
        .replace("&rsquo;", "'")
}

/// Parse a feed body in either supported shape into normalized `RawItem`s.
/// Entries without a title or link are dropped here, before any counting or
/// network work downstream.
pub fn parse_feed(body: &str, source: &str) -> Result<Vec<RawItem>> {
    let t0 = std::time::Instant::now();
    let xml = scrub_html_entities_for_xml(body);

    // `AtomFeed` would happily deserialize any XML to zero entries, so only
    // take that branch when the body actually looks like an Atom document.
    let items = if let Ok(rss) = from_str::<Rss>(&xml) {
        rss.channel.items.into_iter().filter_map(|it| rss_item(it, source)).collect()
    } else if xml.contains("<feed") {
        let atom: AtomFeed = from_str(&xml).context("parsing atom feed")?;
        atom.entries.into_iter().filter_map(|e| atom_entry(e, source)).collect()
    } else {
        anyhow::bail!("body parses as neither RSS nor Atom");
    };

    histogram!("feed_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(items)
}

fn rss_item(it: RssItem, source: &str) -> Option<RawItem> {
    build_item(
        it.title.as_deref(),
        it.link.as_deref(),
        // content:encoded carries the full body when present
        it.content_encoded.or(it.description),
        it.pub_date.as_deref(),
        source,
    )
}

fn atom_entry(e: AtomEntry, source: &str) -> Option<RawItem> {
    let link = pick_atom_link(&e.links);
    build_item(
        e.title.and_then(|t| t.value).as_deref(),
        link.as_deref(),
        e.content.or(e.summary).and_then(|t| t.value),
        e.published.or(e.updated).as_deref(),
        source,
    )
}

fn build_item(
    title: Option<&str>,
    link: Option<&str>,
    body: Option<String>,
    date: Option<&str>,
    source: &str,
) -> Option<RawItem> {
    let title = normalize_text(title.unwrap_or_default());
    let url = link.unwrap_or_default().trim().to_string();
    if title.is_empty() || url.is_empty() {
        return None;
    }
    Some(RawItem {
        title,
        url,
        description: body.unwrap_or_default(),
        published: parse_feed_date(date),
        source: source.to_string(),
    })
}
