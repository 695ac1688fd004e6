use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::config::AppConfig;
use crate::notion::{NotionClient, NotionClientConfig, resolve};
use crate::telemetry;
use crate::telemetry::ops::check::Phase as CheckPhase;

/// `feednote check` — verify access to the collection and show what the
/// run would write into.
#[derive(Args)]
pub struct CheckCmd {}

#[derive(Serialize)]
struct CheckReport {
    collection_id: String,
    data_source_id: String,
    properties: Vec<PropertyInfo>,
}

#[derive(Serialize)]
struct PropertyInfo {
    name: String,
    kind: String,
}

pub async fn run(cfg: &AppConfig, _args: CheckCmd) -> Result<()> {
    let log = telemetry::check();
    let _g = log
        .root_span_kv([("collection_id", cfg.collection_id.clone())])
        .entered();

    let store = NotionClient::new(NotionClientConfig::new(&cfg.notion_token))?;

    let ctx = {
        let _s = log.span(&CheckPhase::Resolve).entered();
        resolve::resolve_context(&store, &cfg.collection_id)
            .await
            .context("resolve collection context")?
    };

    let _report_span = log.span(&CheckPhase::Report).entered();
    log.info(format!(
        "🔗 Collection {} → data source {}",
        ctx.collection_id, ctx.data_source_id
    ));
    log.info(format!("   {} properties:", ctx.properties.len()));
    for (name, spec) in &ctx.properties {
        log.info(format!("   - {} ({})", name, spec.kind));
    }

    if telemetry::config::json_mode() {
        let report = CheckReport {
            collection_id: ctx.collection_id,
            data_source_id: ctx.data_source_id,
            properties: ctx
                .properties
                .into_iter()
                .map(|(name, spec)| PropertyInfo { name, kind: spec.kind })
                .collect(),
        };
        log.result(&report, None)?;
    }
    Ok(())
}
