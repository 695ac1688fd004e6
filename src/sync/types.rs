use chrono::{DateTime, Utc};
use serde::Serialize;

/// One feed item after parsing. Read-only, discarded after processing.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedEntry {
    pub title: String,
    pub link: String,
    pub content: Option<String>,
    pub summary: Option<String>,
    pub published: Option<DateTime<Utc>>,
}

// Result envelope types
#[derive(Serialize)]
pub struct FeedReport {
    pub url: String,
    pub entries: usize,
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Serialize, Default)]
pub struct RunTotals {
    pub added: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Outcome of one pipeline run. Entries that error at the summarize or
/// write step land in `failed`, never in `added` or `skipped`.
#[derive(Serialize)]
pub struct RunReport {
    pub test_mode: bool,
    pub totals: RunTotals,
    pub per_feed: Vec<FeedReport>,
}
