use crate::llm::CompletionClient;
use crate::notion::types::{CollectionContext, NewRow};
use crate::notion::CollectionStore;
use crate::telemetry::ctx::LogCtx;
use crate::telemetry::ops::sync::{Phase, Sync as SyncOp};

use super::dedupe::{self, DedupStatus};
use super::extract;
use super::fetch::FeedSource;
use super::parse;
use super::summarize;
use super::types::{FeedReport, RunReport, RunTotals};

pub struct SyncOptions {
    pub feeds: Vec<String>,
    pub limit: usize,
    pub test_mode: bool,
    pub model: Option<String>,
}

/// One full run: for each feed, for each entry, dedupe → extract →
/// summarize → write. Per-entry failures are isolated; a feed that fails
/// to fetch or parse contributes zero entries.
pub async fn run(
    opts: &SyncOptions,
    ctx: &CollectionContext,
    source: &dyn FeedSource,
    store: &dyn CollectionStore,
    llm: &dyn CompletionClient,
    log: &LogCtx<SyncOp>,
) -> RunReport {
    let mut totals = RunTotals::default();
    let mut per_feed: Vec<FeedReport> = Vec::new();

    for feed_url in &opts.feeds {
        let _feed_span = log
            .span_kv(&Phase::Feed, [("url", feed_url.clone())])
            .entered();
        let mut report = FeedReport {
            url: feed_url.clone(),
            entries: 0,
            added: 0,
            skipped: 0,
            failed: 0,
        };

        let entries = {
            let fetched = {
                let _s = log.span(&Phase::FetchFeed).entered();
                source.fetch_feed(feed_url).await
            };
            match fetched {
                Ok(xml) => {
                    let _s = log.span(&Phase::ParseFeed).entered();
                    match parse::parse_entries(&xml, opts.limit) {
                        Ok(entries) => entries,
                        Err(err) => {
                            log.warn_kv(
                                "⚠️ feed parse failed",
                                [("url", feed_url.clone()), ("error", format!("{err:#}"))],
                            );
                            Vec::new()
                        }
                    }
                }
                Err(err) => {
                    log.warn_kv(
                        "⚠️ feed fetch failed",
                        [("url", feed_url.clone()), ("error", format!("{err:#}"))],
                    );
                    Vec::new()
                }
            }
        };
        report.entries = entries.len();

        for entry in &entries {
            let normalized = dedupe::normalize_url(&entry.link);
            log.info_kv(
                "▶ entry",
                [("title", entry.title.clone()), ("url", normalized.clone())],
            );

            let status = {
                let _s = log.span(&Phase::Dedupe).entered();
                dedupe::check(store, &ctx.data_source_id, &entry.link).await
            };
            match status {
                DedupStatus::Exists => {
                    log.info_kv("↩️ skip (already exists)", [("url", normalized)]);
                    report.skipped += 1;
                    continue;
                }
                DedupStatus::Fresh => {}
                DedupStatus::Unverified(err) => {
                    // fail-open: a lookup error must not block the run
                    log.warn_kv(
                        "⚠️ lookup failed, processing anyway",
                        [("url", normalized.clone()), ("error", err.to_string())],
                    );
                }
            }

            let text = {
                let _s = log.span(&Phase::Extract).entered();
                extract::extract_text(source, entry).await
            };

            if opts.test_mode {
                log.info_kv(
                    "📝 test mode — summary and write skipped",
                    [("title", entry.title.clone())],
                );
                report.added += 1;
                continue;
            }

            let summary = {
                let _s = log.span(&Phase::Summarize).entered();
                summarize::summarize(llm, opts.model.as_deref(), &entry.title, &text).await
            };
            let summary = match summary {
                Ok(summary) => summary,
                Err(err) => {
                    log.error_kv(
                        "❌ summarization failed",
                        [
                            ("title", entry.title.clone()),
                            ("url", normalized.clone()),
                            ("error", err.to_string()),
                        ],
                    );
                    report.failed += 1;
                    continue;
                }
            };

            let row = NewRow {
                title: entry.title.clone(),
                url: entry.link.clone(),
                summary,
                published: entry.published,
            };
            let written = {
                let _s = log.span(&Phase::WriteRow).entered();
                store.create_row(&ctx.data_source_id, &row).await
            };
            match written {
                Ok(()) => {
                    log.info_kv("➕ added", [("title", entry.title.clone())]);
                    report.added += 1;
                }
                Err(err) => {
                    log.error_kv(
                        "❌ write failed",
                        [
                            ("title", entry.title.clone()),
                            ("url", normalized),
                            ("error", err.to_string()),
                        ],
                    );
                    report.failed += 1;
                }
            }
        }

        log.feed_summary(feed_url, report.added, report.skipped, report.failed);
        totals.added += report.added;
        totals.skipped += report.skipped;
        totals.failed += report.failed;
        per_feed.push(report);
    }

    RunReport {
        test_mode: opts.test_mode,
        totals,
        per_feed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::MockCompletions;
    use crate::notion::{MockStore, NotionError};
    use crate::sync::fetch::MockFeedSource;
    use crate::telemetry;
    use std::collections::BTreeMap;

    fn test_ctx() -> CollectionContext {
        CollectionContext {
            collection_id: "11111111-2222-3333-4444-555555555555".into(),
            data_source_id: "ds-1".into(),
            properties: BTreeMap::new(),
        }
    }

    fn opts(feeds: Vec<&str>, test_mode: bool) -> SyncOptions {
        SyncOptions {
            feeds: feeds.into_iter().map(str::to_string).collect(),
            limit: 5,
            test_mode,
            model: None,
        }
    }

    fn feed_xml(host: &str, count: usize) -> String {
        let items: String = (1..=count)
            .map(|i| {
                format!(
                    "<item><title>Post {i}</title>\
                     <link>https://{host}/p{i}</link>\
                     <description>Body of post {i}, long enough to look like a real article summary for prompting.</description>\
                     <pubDate>Wed, 01 May 2024 12:00:00 GMT</pubDate></item>"
                )
            })
            .collect();
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>{host}</title><link>https://{host}</link>
<description>d</description>{items}</channel></rss>"#
        )
    }

    #[tokio::test]
    async fn test_mode_counts_added_without_completions_or_writes() {
        let source =
            MockFeedSource::new().with_feed("https://f.test/rss", &feed_xml("f.test", 3));
        let store = MockStore::new();
        let llm = MockCompletions::new();
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://f.test/rss"], true),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(report.totals.added, 3);
        assert_eq!(report.totals.skipped, 0);
        assert_eq!(report.totals.failed, 0);
        assert!(llm.calls().is_empty());
        assert!(store.created().is_empty());
        // dedup lookups still ran
        assert_eq!(store.lookups().len(), 3);
    }

    #[tokio::test]
    async fn full_run_splits_added_skipped_and_failed() {
        // 2 feeds x 5 entries; 3 already exist; 1 write fails
        let source = MockFeedSource::new()
            .with_feed("https://a.test/rss", &feed_xml("a.test", 5))
            .with_feed("https://b.test/rss", &feed_xml("b.test", 5));
        let store = MockStore::new();
        store.insert_url("https://a.test/p1");
        store.insert_url("https://a.test/p4");
        store.insert_url("https://b.test/p2");
        store.fail_create_for("https://b.test/p5");

        let llm = MockCompletions::new();
        for _ in 0..7 {
            llm.push_response(Ok("要約".into()));
        }
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://a.test/rss", "https://b.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(store.lookups().len(), 10);
        assert_eq!(report.totals.added, 6);
        assert_eq!(report.totals.skipped, 3);
        assert_eq!(report.totals.failed, 1);
        assert_eq!(llm.calls().len(), 7);
        assert_eq!(store.created().len(), 6);

        let a = &report.per_feed[0];
        assert_eq!((a.entries, a.added, a.skipped, a.failed), (5, 3, 2, 0));
        let b = &report.per_feed[1];
        assert_eq!((b.entries, b.added, b.skipped, b.failed), (5, 3, 1, 1));
    }

    #[tokio::test]
    async fn lookup_error_fails_open_and_entry_is_written() {
        let source =
            MockFeedSource::new().with_feed("https://f.test/rss", &feed_xml("f.test", 1));
        let store = MockStore::new();
        store.fail_next_lookup(NotionError::Timeout);
        let llm = MockCompletions::new();
        llm.push_response(Ok("要約".into()));
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://f.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(report.totals.added, 1);
        assert_eq!(report.totals.failed, 0);
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn summarization_error_lands_in_failed_bucket() {
        let source =
            MockFeedSource::new().with_feed("https://f.test/rss", &feed_xml("f.test", 2));
        let store = MockStore::new();
        let llm = MockCompletions::new();
        llm.push_response(Err(crate::llm::CompletionError::Timeout));
        llm.push_response(Ok("要約".into()));
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://f.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(report.totals.added, 1);
        assert_eq!(report.totals.failed, 1);
        assert_eq!(report.totals.skipped, 0);
        assert_eq!(store.created().len(), 1);
    }

    #[tokio::test]
    async fn entry_without_text_uses_title_only_prompt() {
        // no description/content in the feed, and no article page behind it
        let xml = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>t</title><link>https://f.test</link>
<description>d</description>
<item><title>Mystery Post</title><link>https://f.test/p1</link></item>
</channel></rss>"#;
        let source = MockFeedSource::new().with_feed("https://f.test/rss", xml);
        let store = MockStore::new();
        let llm = MockCompletions::new();
        llm.push_response(Ok("推測要約".into()));
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://f.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(report.totals.added, 1);
        let calls = llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].prompt.contains("Mystery Post"));
        assert!(calls[0].prompt.contains("推測"));
    }

    #[tokio::test]
    async fn unfetchable_feed_contributes_zero_entries() {
        let source =
            MockFeedSource::new().with_feed("https://ok.test/rss", &feed_xml("ok.test", 2));
        let store = MockStore::new();
        let llm = MockCompletions::new();
        for _ in 0..2 {
            llm.push_response(Ok("要約".into()));
        }
        let log = telemetry::sync();

        let report = run(
            &opts(vec!["https://dead.test/rss", "https://ok.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        assert_eq!(report.per_feed[0].entries, 0);
        assert_eq!(report.per_feed[1].entries, 2);
        assert_eq!(report.totals.added, 2);
    }

    #[tokio::test]
    async fn published_date_is_carried_onto_the_row() {
        let source =
            MockFeedSource::new().with_feed("https://f.test/rss", &feed_xml("f.test", 1));
        let store = MockStore::new();
        let llm = MockCompletions::new();
        llm.push_response(Ok("要約".into()));
        let log = telemetry::sync();

        run(
            &opts(vec!["https://f.test/rss"], false),
            &test_ctx(),
            &source,
            &store,
            &llm,
            &log,
        )
        .await;

        let created = store.created();
        assert_eq!(created.len(), 1);
        let published = created[0].published.expect("published date");
        assert_eq!(published.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        assert_eq!(created[0].title, "Post 1");
        assert_eq!(created[0].summary, "要約");
    }
}
