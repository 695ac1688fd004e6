use std::collections::BTreeMap;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::Deserialize;
use serde_json::{Value, json};

// Property names the target collection is expected to carry.
pub const PROP_TITLE: &str = "Title";
pub const PROP_SUMMARY: &str = "Summary";
pub const PROP_URL: &str = "URL";
pub const PROP_PUBLISHED: &str = "Published";

/// Retrieve-by-id response for a collection. Newer API versions move the
/// property schema onto a separate data-source object and list only the
/// data-source ids here.
#[derive(Debug, Clone, Deserialize)]
pub struct Collection {
    pub id: String,
    #[serde(default)]
    pub title: Vec<TitleItem>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySpec>,
    #[serde(default)]
    pub data_sources: Vec<DataSourceRef>,
}

impl Collection {
    pub fn title_text(&self) -> String {
        self.title
            .iter()
            .map(|t| t.plain_text.as_str())
            .collect::<String>()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TitleItem {
    #[serde(default)]
    pub plain_text: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataSourceRef {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Retrieve-by-id response for a queryable data source.
#[derive(Debug, Clone, Deserialize)]
pub struct DataSource {
    pub id: String,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertySpec>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PropertySpec {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(rename = "type", default)]
    pub kind: String,
}

/// Query-by-filter response. Row payloads stay opaque; only presence
/// matters for deduplication.
#[derive(Debug, Clone, Deserialize)]
pub struct QueryPage {
    #[serde(default)]
    pub results: Vec<Value>,
}

/// Resolved target for the run: collection id, its queryable data source,
/// and the declared property schema. Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct CollectionContext {
    pub collection_id: String,
    pub data_source_id: String,
    pub properties: BTreeMap<String, PropertySpec>,
}

/// One row to create in the collection.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRow {
    pub title: String,
    pub url: String,
    pub summary: String,
    pub published: Option<DateTime<Utc>>,
}

/// Exact-match filter on the URL property.
pub fn url_filter(url: &str) -> Value {
    json!({ "property": PROP_URL, "url": { "equals": url } })
}

/// Property map for a create-row request.
pub fn row_properties(row: &NewRow) -> Value {
    let mut props = json!({
        "Title": { "title": [{ "text": { "content": row.title } }] },
        "Summary": { "rich_text": [{ "text": { "content": row.summary } }] },
        "URL": { "url": row.url },
    });
    if let Some(published) = row.published {
        props[PROP_PUBLISHED] = json!({
            "date": { "start": published.to_rfc3339_opts(SecondsFormat::Secs, true) }
        });
    }
    props
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn url_filter_is_exact_match_on_url_property() {
        let filter = url_filter("https://a.test/x");
        assert_eq!(filter["property"], "URL");
        assert_eq!(filter["url"]["equals"], "https://a.test/x");
    }

    #[test]
    fn row_properties_without_published_omits_date() {
        let row = NewRow {
            title: "A title".into(),
            url: "https://a.test/x".into(),
            summary: "short summary".into(),
            published: None,
        };
        let props = row_properties(&row);
        assert_eq!(props[PROP_TITLE]["title"][0]["text"]["content"], "A title");
        assert_eq!(props[PROP_SUMMARY]["rich_text"][0]["text"]["content"], "short summary");
        assert_eq!(props[PROP_URL]["url"], "https://a.test/x");
        assert!(props.get(PROP_PUBLISHED).is_none());
    }

    #[test]
    fn row_properties_with_published_sets_date_start() {
        let row = NewRow {
            title: "t".into(),
            url: "https://a.test/x".into(),
            summary: "s".into(),
            published: Some(Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()),
        };
        let props = row_properties(&row);
        assert_eq!(props["Published"]["date"]["start"], "2024-05-01T12:30:00Z");
    }

    #[test]
    fn collection_parses_new_api_shape() {
        let raw = r#"{
            "id": "abc123",
            "object": "database",
            "title": [{"plain_text": "Knowledge "}, {"plain_text": "Base"}],
            "data_sources": [{"id": "ds-1", "name": "Articles"}],
            "properties": {}
        }"#;
        let col: Collection = serde_json::from_str(raw).unwrap();
        assert_eq!(col.id, "abc123");
        assert_eq!(col.title_text(), "Knowledge Base");
        assert!(col.properties.is_empty());
        assert_eq!(col.data_sources[0].id, "ds-1");
    }

    #[test]
    fn collection_parses_legacy_inline_schema() {
        let raw = r#"{
            "id": "abc123",
            "properties": {
                "Title": {"id": "t", "type": "title"},
                "URL": {"id": "u", "type": "url"}
            },
            "data_sources": [{"id": "ds-1"}]
        }"#;
        let col: Collection = serde_json::from_str(raw).unwrap();
        assert_eq!(col.properties.len(), 2);
        assert_eq!(col.properties["URL"].kind, "url");
    }
}
