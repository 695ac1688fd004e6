use tracing::Span;
use tracing::info_span;

use crate::telemetry::ctx::{OpMarker, PhaseSpan};

#[derive(Copy, Clone, Debug)]
pub struct Sync;

#[derive(Copy, Clone, Debug)]
pub enum Phase { Resolve, Feed, FetchFeed, ParseFeed, Dedupe, Extract, Summarize, WriteRow }

impl PhaseSpan for Phase {
    fn name(&self) -> &'static str { match self {
        Phase::Resolve => "resolve",
        Phase::Feed => "feed",
        Phase::FetchFeed => "fetch_feed",
        Phase::ParseFeed => "parse_feed",
        Phase::Dedupe => "dedupe",
        Phase::Extract => "extract",
        Phase::Summarize => "summarize",
        Phase::WriteRow => "write_row",
    }}
    fn span(&self) -> Span { match self {
        Phase::Resolve => info_span!("resolve"),
        Phase::Feed => info_span!("feed"),
        Phase::FetchFeed => info_span!("fetch_feed"),
        Phase::ParseFeed => info_span!("parse_feed"),
        Phase::Dedupe => info_span!("dedupe"),
        Phase::Extract => info_span!("extract"),
        Phase::Summarize => info_span!("summarize"),
        Phase::WriteRow => info_span!("write_row"),
    }}
}

impl OpMarker for Sync {
    const NAME: &'static str = "sync";
    type Phase = Phase;
    fn root_span() -> Span { info_span!("sync") }
}
