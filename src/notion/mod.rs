use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client as HttpClient, StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

pub mod resolve;
pub mod types;

pub use types::{Collection, CollectionContext, DataSource, NewRow, QueryPage};

const DEFAULT_BASE_URL: &str = "https://api.notion.com/v1";
// API revision that introduced multi-data-source collections.
const NOTION_VERSION: &str = "2025-09-03";
const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Remote collection API: retrieve the collection and its queryable data
/// source, look rows up by URL, create rows.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    async fn retrieve_collection(&self, collection_id: &str) -> Result<Collection, NotionError>;
    async fn retrieve_data_source(&self, data_source_id: &str) -> Result<DataSource, NotionError>;
    /// Exact-match lookup on the URL property, page size 1.
    async fn row_exists_by_url(&self, data_source_id: &str, url: &str) -> Result<bool, NotionError>;
    async fn create_row(&self, data_source_id: &str, row: &NewRow) -> Result<(), NotionError>;
}

#[derive(Clone, Debug)]
pub struct NotionClientConfig {
    pub token: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl NotionClientConfig {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Clone)]
pub struct NotionClient {
    http: HttpClient,
    cfg: NotionClientConfig,
}

impl NotionClient {
    pub fn new(cfg: NotionClientConfig) -> Result<Self, NotionError> {
        let http = HttpClient::builder()
            .timeout(cfg.timeout)
            .build()
            .map_err(NotionError::http)?;
        Ok(Self { http, cfg })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.cfg.base_url.trim_end_matches('/'), path)
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(&self, path: &str) -> Result<T, NotionError> {
        let response = self
            .http
            .get(self.endpoint(path))
            .bearer_auth(&self.cfg.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await
            .map_err(NotionError::http)?;
        decode_response(response).await
    }

    async fn post_json<T: for<'de> Deserialize<'de>>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, NotionError> {
        let response = self
            .http
            .post(self.endpoint(path))
            .bearer_auth(&self.cfg.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(body)
            .send()
            .await
            .map_err(NotionError::http)?;
        decode_response(response).await
    }
}

async fn decode_response<T: for<'de> Deserialize<'de>>(
    response: reqwest::Response,
) -> Result<T, NotionError> {
    let status = response.status();
    let bytes = response.bytes().await.map_err(NotionError::http)?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ApiErrorBody>(&bytes)
            .ok()
            .map(|body| body.message)
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(NotionError::Api { status, message });
    }

    serde_json::from_slice(&bytes).map_err(NotionError::Decode)
}

#[derive(Debug, Clone, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: String,
}

#[async_trait]
impl CollectionStore for NotionClient {
    async fn retrieve_collection(&self, collection_id: &str) -> Result<Collection, NotionError> {
        self.get_json(&format!("databases/{collection_id}")).await
    }

    async fn retrieve_data_source(&self, data_source_id: &str) -> Result<DataSource, NotionError> {
        self.get_json(&format!("data_sources/{data_source_id}")).await
    }

    async fn row_exists_by_url(&self, data_source_id: &str, url: &str) -> Result<bool, NotionError> {
        let body = json!({
            "filter": types::url_filter(url),
            "page_size": 1,
        });
        let page: QueryPage = self
            .post_json(&format!("data_sources/{data_source_id}/query"), &body)
            .await?;
        Ok(!page.results.is_empty())
    }

    async fn create_row(&self, data_source_id: &str, row: &NewRow) -> Result<(), NotionError> {
        let body = json!({
            "parent": { "type": "data_source_id", "data_source_id": data_source_id },
            "properties": types::row_properties(row),
        });
        let _created: Value = self.post_json("pages", &body).await?;
        Ok(())
    }
}

#[derive(Debug)]
pub enum NotionError {
    Http(reqwest::Error),
    Timeout,
    Api { status: StatusCode, message: String },
    Decode(serde_json::Error),
    NoDataSource,
    EmptySchema,
    MockMissing(&'static str),
}

impl NotionError {
    fn http(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            NotionError::Timeout
        } else {
            NotionError::Http(err)
        }
    }
}

impl std::fmt::Display for NotionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NotionError::Http(err) => write!(f, "http error: {err}"),
            NotionError::Timeout => write!(f, "request timed out"),
            NotionError::Api { status, message } => write!(f, "api error {status}: {message}"),
            NotionError::Decode(err) => write!(f, "decode error: {err}"),
            NotionError::NoDataSource => {
                write!(f, "no data sources found for the collection, check permissions")
            }
            NotionError::EmptySchema => write!(
                f,
                "failed to read collection properties, the id may be incorrect or the integration lacks access"
            ),
            NotionError::MockMissing(what) => write!(f, "mock store has no {what} configured"),
        }
    }
}

impl std::error::Error for NotionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            NotionError::Http(err) => Some(err),
            NotionError::Decode(err) => Some(err),
            _ => None,
        }
    }
}

/// In-memory stand-in for tests: a fixed collection/data source, a set of
/// URLs already present, scripted lookup failures, recorded writes.
#[derive(Default)]
pub struct MockStore {
    collection: Mutex<Option<Collection>>,
    data_source: Mutex<Option<DataSource>>,
    existing_urls: Mutex<HashSet<String>>,
    lookup_failures: Mutex<VecDeque<NotionError>>,
    create_failures: Mutex<HashSet<String>>,
    lookups: Mutex<Vec<String>>,
    created: Mutex<Vec<NewRow>>,
}

impl MockStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_collection(&self, collection: Collection) {
        *self.collection.lock().unwrap() = Some(collection);
    }

    pub fn set_data_source(&self, data_source: DataSource) {
        *self.data_source.lock().unwrap() = Some(data_source);
    }

    pub fn insert_url(&self, url: &str) {
        self.existing_urls.lock().unwrap().insert(url.to_string());
    }

    /// Queue an error for the next URL lookup.
    pub fn fail_next_lookup(&self, err: NotionError) {
        self.lookup_failures.lock().unwrap().push_back(err);
    }

    /// Make create_row fail for the given URL.
    pub fn fail_create_for(&self, url: &str) {
        self.create_failures.lock().unwrap().insert(url.to_string());
    }

    pub fn lookups(&self) -> Vec<String> {
        self.lookups.lock().unwrap().clone()
    }

    pub fn created(&self) -> Vec<NewRow> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl CollectionStore for MockStore {
    async fn retrieve_collection(&self, _collection_id: &str) -> Result<Collection, NotionError> {
        self.collection
            .lock()
            .unwrap()
            .clone()
            .ok_or(NotionError::MockMissing("collection"))
    }

    async fn retrieve_data_source(&self, _data_source_id: &str) -> Result<DataSource, NotionError> {
        self.data_source
            .lock()
            .unwrap()
            .clone()
            .ok_or(NotionError::MockMissing("data source"))
    }

    async fn row_exists_by_url(&self, _data_source_id: &str, url: &str) -> Result<bool, NotionError> {
        self.lookups.lock().unwrap().push(url.to_string());
        if let Some(err) = self.lookup_failures.lock().unwrap().pop_front() {
            return Err(err);
        }
        Ok(self.existing_urls.lock().unwrap().contains(url))
    }

    async fn create_row(&self, _data_source_id: &str, row: &NewRow) -> Result<(), NotionError> {
        if self.create_failures.lock().unwrap().contains(&row.url) {
            return Err(NotionError::Api {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                message: "mock create failure".to_string(),
            });
        }
        self.created.lock().unwrap().push(row.clone());
        Ok(())
    }
}
