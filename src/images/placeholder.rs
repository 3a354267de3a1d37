// src/images/placeholder.rs
//! Last-resort presentation image: a small inline SVG rendered as a data
//! URL. Keyed only by category, so the output is fully deterministic and
//! needs no network or storage.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use crate::classify::Category;

const WIDTH: u32 = 1200;
const HEIGHT: u32 = 630;

/// Gradient stops, glyph, and the site-locale label for one category.
fn theme(category: Category) -> (&'static str, &'static str, &'static str, &'static str) {
    match category {
        Category::OfficialAnnouncement => ("#6366f1", "#8b5cf6", "📢", "公式発表"),
        Category::ToolUpdate => ("#0ea5e9", "#22d3ee", "🔧", "ツール更新"),
        Category::HowTo => ("#10b981", "#34d399", "📘", "使い方ガイド"),
        Category::Other => ("#64748b", "#94a3b8", "📰", "AIニュース"),
    }
}

/// Render the category placeholder as a `data:image/svg+xml;base64,...` URL.
pub fn placeholder_data_url(category: Category) -> String {
    let (from, to, glyph, label) = theme(category);
    let svg = format!(
        concat!(
            r##"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">"##,
            r##"<defs><linearGradient id="g" x1="0" y1="0" x2="1" y2="1">"##,
            r##"<stop offset="0%" stop-color="{from}"/><stop offset="100%" stop-color="{to}"/>"##,
            r##"</linearGradient></defs>"##,
            r##"<rect width="{w}" height="{h}" fill="url(#g)"/>"##,
            r##"<text x="600" y="300" font-size="160" text-anchor="middle">{glyph}</text>"##,
            r##"<text x="600" y="440" font-family="sans-serif" font-size="56" font-weight="bold" fill="#ffffff" text-anchor="middle">{label}</text>"##,
            r##"</svg>"##
        ),
        w = WIDTH,
        h = HEIGHT,
        from = from,
        to = to,
        glyph = glyph,
        label = label,
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg.as_bytes()))
}
