use anyhow::{Result, bail};
use std::env;

// Works locally with .env (loaded in main) and in CI via plain env vars.
pub const DEFAULT_FEEDS: &[&str] = &[
    "https://medium.com/feed/towards-data-science",
    "https://medium.com/feed/tag/artificial-intelligence",
];

/// Process configuration, resolved once at startup and passed down
/// explicitly. Nothing else in the crate reads the environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub notion_token: String,
    pub openai_api_key: String,
    pub collection_id: String,
    pub test_mode: bool,
    pub feeds: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let notion_token = match env::var("NOTION_TOKEN") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => bail!("NOTION_TOKEN is not set. Put it in .env or your environment."),
        };
        let collection_id = match env::var("DB_ID") {
            Ok(v) if !v.trim().is_empty() => v,
            _ => bail!("DB_ID is not set. Put it in .env or your environment."),
        };
        // OPENAI_KEY is the legacy name; OPENAI_API_KEY wins when both are set.
        let openai_api_key = match env::var("OPENAI_API_KEY").or_else(|_| env::var("OPENAI_KEY")) {
            Ok(v) if !v.trim().is_empty() => v,
            _ => bail!("OPENAI_API_KEY is not set. Put it in .env or your environment."),
        };
        let test_mode = parse_bool_flag(env::var("TEST_MODE").ok().as_deref());
        let feeds = parse_feed_list(env::var("FEED_URLS").ok().as_deref());

        Ok(Self {
            notion_token,
            openai_api_key,
            collection_id,
            test_mode,
            feeds,
        })
    }
}

pub fn parse_bool_flag(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|s| s.trim().to_ascii_lowercase()).as_deref(),
        Some("1") | Some("true") | Some("yes") | Some("y") | Some("on")
    )
}

pub fn parse_feed_list(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw else {
        return DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect();
    };
    let feeds: Vec<String> = raw
        .split(|c: char| c == ',' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if feeds.is_empty() {
        DEFAULT_FEEDS.iter().map(|s| s.to_string()).collect()
    } else {
        feeds
    }
}
