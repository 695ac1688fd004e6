use anyhow::Result;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use rss::{Channel, Item};

use super::types::FeedEntry;

/// Parse a feed document and return up to `limit` entries in document
/// order. Items without a link cannot be deduplicated or written, so they
/// are dropped here.
pub fn parse_entries(xml: &Bytes, limit: usize) -> Result<Vec<FeedEntry>> {
    let channel = Channel::read_from(&xml[..])?;
    let entries = channel
        .items()
        .iter()
        .take(limit)
        .filter_map(entry_from_item)
        .collect();
    Ok(entries)
}

fn entry_from_item(item: &Item) -> Option<FeedEntry> {
    let link = item.link()?.to_string();
    Some(FeedEntry {
        title: item.title().unwrap_or("(untitled)").to_string(),
        link,
        content: item.content().map(str::to_string),
        summary: item.description().map(str::to_string),
        published: extract_published_at(item),
    })
}

pub fn extract_published_at(item: &Item) -> Option<DateTime<Utc>> {
    if let Some(pub_date) = item.pub_date() {
        if let Ok(dt) = DateTime::parse_from_rfc2822(pub_date) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    // Attempt Dublin Core date if available (RFC3339)
    if let Some(dc) = item.dublin_core_ext() {
        if let Some(first) = dc.dates().first() {
            if let Ok(dt) = DateTime::parse_from_rfc3339(first) {
                return Some(dt.with_timezone(&Utc));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed_xml(items: &str) -> Bytes {
        Bytes::from(format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Test</title><link>https://t.test</link>
<description>d</description>{items}</channel></rss>"#
        ))
    }

    #[test]
    fn parses_items_in_document_order_up_to_limit() {
        let items: String = (1..=7)
            .map(|i| {
                format!(
                    "<item><title>Post {i}</title><link>https://t.test/p{i}</link></item>"
                )
            })
            .collect();
        let entries = parse_entries(&feed_xml(&items), 5).unwrap();
        assert_eq!(entries.len(), 5);
        assert_eq!(entries[0].title, "Post 1");
        assert_eq!(entries[4].link, "https://t.test/p5");
    }

    #[test]
    fn linkless_items_are_dropped() {
        let items = "<item><title>No link</title></item>\
                     <item><title>Ok</title><link>https://t.test/ok</link></item>";
        let entries = parse_entries(&feed_xml(items), 5).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].link, "https://t.test/ok");
    }

    #[test]
    fn pub_date_is_parsed_as_rfc2822() {
        let items = "<item><title>T</title><link>https://t.test/t</link>\
                     <pubDate>Wed, 01 May 2024 12:30:00 GMT</pubDate></item>";
        let entries = parse_entries(&feed_xml(items), 5).unwrap();
        let published = entries[0].published.unwrap();
        assert_eq!(published.to_rfc3339(), "2024-05-01T12:30:00+00:00");
    }

    #[test]
    fn unparseable_pub_date_yields_none() {
        let items = "<item><title>T</title><link>https://t.test/t</link>\
                     <pubDate>next tuesday</pubDate></item>";
        let entries = parse_entries(&feed_xml(items), 5).unwrap();
        assert!(entries[0].published.is_none());
    }

    #[test]
    fn description_lands_in_summary() {
        let items = "<item><title>T</title><link>https://t.test/t</link>\
                     <description>&lt;p&gt;Body&lt;/p&gt;</description></item>";
        let entries = parse_entries(&feed_xml(items), 5).unwrap();
        assert_eq!(entries[0].summary.as_deref(), Some("<p>Body</p>"));
        assert!(entries[0].content.is_none());
    }

    #[test]
    fn invalid_xml_is_an_error() {
        assert!(parse_entries(&Bytes::from_static(b"not xml"), 5).is_err());
    }
}
