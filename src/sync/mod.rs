use anyhow::{Context, Result};
use clap::Args;

use crate::config::AppConfig;
use crate::llm::{OpenAiClient, OpenAiClientConfig};
use crate::notion::{NotionClient, NotionClientConfig, resolve};
use crate::telemetry;
use crate::telemetry::emit::Meta;
use crate::telemetry::ops::sync::Phase as SyncPhase;
use std::time::Instant;

pub mod dedupe;
pub mod extract;
pub mod fetch;
pub mod parse;
pub mod pipeline;
pub mod summarize;
pub mod types;

/// `feednote sync`
#[derive(Args)]
pub struct SyncCmd {
    /// Max entries to take per feed
    #[arg(long, default_value_t = 5)]
    pub limit: usize,
    /// Dry run: skip summarization and row writes, count entries as added
    /// (also enabled by TEST_MODE in the environment)
    #[arg(long, default_value_t = false)]
    pub test_mode: bool,
    /// Completion model override
    #[arg(long)]
    pub model: Option<String>,
}

pub async fn run(cfg: &AppConfig, args: SyncCmd) -> Result<()> {
    let log = telemetry::sync();
    let started = Instant::now();
    let run_id = uuid::Uuid::new_v4().to_string();
    let test_mode = args.test_mode || cfg.test_mode;
    let _g = log
        .root_span_kv([
            ("run_id", run_id.clone()),
            ("feeds", cfg.feeds.len().to_string()),
            ("limit", args.limit.to_string()),
            ("test_mode", test_mode.to_string()),
            ("model", format!("{:?}", args.model)),
        ])
        .entered();

    let store = NotionClient::new(NotionClientConfig::new(&cfg.notion_token))?;
    let llm = OpenAiClient::new(
        OpenAiClientConfig::new(&cfg.openai_api_key).with_env_overrides(),
    )?;
    let source = fetch::HttpFeedSource::new()?;

    let ctx = {
        let _s = log.span(&SyncPhase::Resolve).entered();
        resolve::resolve_context(&store, &cfg.collection_id)
            .await
            .context("resolve collection context")?
    };
    log.info_kv(
        "🔗 collection resolved",
        [
            ("collection_id", ctx.collection_id.clone()),
            ("data_source_id", ctx.data_source_id.clone()),
        ],
    );

    let opts = pipeline::SyncOptions {
        feeds: cfg.feeds.clone(),
        limit: args.limit,
        test_mode,
        model: args.model,
    };
    let report = pipeline::run(&opts, &ctx, &source, &store, &llm, &log).await;

    log.totals(
        report.totals.added,
        report.totals.skipped,
        report.totals.failed,
    );
    if telemetry::config::json_mode() {
        let meta = Meta {
            duration_ms: Some(started.elapsed().as_millis()),
            run_id: Some(run_id),
        };
        // a test-mode run is a plan, not an applied result
        if report.test_mode {
            log.plan(&report, Some(meta))?;
        } else {
            log.result(&report, Some(meta))?;
        }
    }
    Ok(())
}
