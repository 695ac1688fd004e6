use scraper::Html;
use tracing::debug;

use super::fetch::FeedSource;
use super::types::FeedEntry;

// Bound on prompt size.
pub const MAX_ARTICLE_CHARS: usize = 6000;

/// Article text for one entry, best source first: feed-embedded content,
/// feed summary, then the live page. Fetch failures yield empty text so
/// the summarizer can fall back to the title.
pub async fn extract_text(source: &dyn FeedSource, entry: &FeedEntry) -> String {
    let raw_html = if let Some(content) = non_empty(entry.content.as_deref()) {
        content.to_string()
    } else if let Some(summary) = non_empty(entry.summary.as_deref()) {
        summary.to_string()
    } else {
        match source.fetch_article(&entry.link).await {
            Ok(html) => html,
            Err(err) => {
                debug!("page fetch failed for {}: {err:#}", entry.link);
                String::new()
            }
        }
    };

    truncate_chars(&strip_html(&raw_html), MAX_ARTICLE_CHARS)
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}

/// Flatten markup to plain text: script/style subtrees skipped, entities
/// decoded by the parser, whitespace collapsed to single spaces.
pub fn strip_html(html: &str) -> String {
    let doc = Html::parse_document(html);

    let mut parts: Vec<&str> = Vec::new();
    for node in doc.tree.nodes() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let in_skipped = node.ancestors().any(|a| {
            matches!(
                a.value().as_element().map(|e| e.name()),
                Some("script") | Some("style")
            )
        });
        if in_skipped {
            continue;
        }
        parts.push(text);
    }

    parts
        .join(" ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Char-boundary-safe truncation.
pub fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}
