use url::Url;

use crate::notion::{CollectionStore, NotionError};

/// Outcome of the remote existence check. `Unverified` is the fail-open
/// case: the lookup errored, and the caller decides to proceed as if the
/// entry were fresh.
#[derive(Debug)]
pub enum DedupStatus {
    Exists,
    Fresh,
    Unverified(NotionError),
}

/// Drop query string and fragment to avoid duplication due to tracking
/// params. Input that does not parse as a URL is truncated at the first
/// `?` or `#` instead.
pub fn normalize_url(raw: &str) -> String {
    match Url::parse(raw) {
        Ok(mut url) => {
            url.set_query(None);
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => raw
            .split(['?', '#'])
            .next()
            .unwrap_or(raw)
            .to_string(),
    }
}

/// Check the collection for a row matching the entry's URL: first the
/// normalized form, then the raw form when it differs. One probe erroring
/// short-circuits to `Unverified`.
pub async fn check(
    store: &dyn CollectionStore,
    data_source_id: &str,
    raw_url: &str,
) -> DedupStatus {
    let normalized = normalize_url(raw_url);

    match store.row_exists_by_url(data_source_id, &normalized).await {
        Ok(true) => return DedupStatus::Exists,
        Ok(false) => {}
        Err(err) => return DedupStatus::Unverified(err),
    }

    if raw_url != normalized {
        match store.row_exists_by_url(data_source_id, raw_url).await {
            Ok(true) => return DedupStatus::Exists,
            Ok(false) => {}
            Err(err) => return DedupStatus::Unverified(err),
        }
    }

    DedupStatus::Fresh
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notion::MockStore;

    #[test]
    fn normalize_strips_query_and_fragment() {
        assert_eq!(
            normalize_url("https://a.test/x?utm_source=rss&utm_medium=feed#section"),
            "https://a.test/x"
        );
        assert_eq!(normalize_url("https://a.test/x"), "https://a.test/x");
    }

    #[test]
    fn normalize_is_idempotent() {
        for raw in [
            "https://a.test/x?q=1#f",
            "https://a.test",
            "https://A.test/Path",
            "not a url?q=1",
        ] {
            let once = normalize_url(raw);
            assert_eq!(normalize_url(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn query_and_fragment_variants_normalize_identically() {
        let base = "https://a.test/article";
        assert_eq!(
            normalize_url(&format!("{base}?utm=1#top")),
            normalize_url(base)
        );
    }

    #[test]
    fn unparseable_input_is_truncated_at_separators() {
        assert_eq!(normalize_url("not a url?tracking=1"), "not a url");
        assert_eq!(normalize_url("also#frag"), "also");
    }

    #[tokio::test]
    async fn tracked_url_matches_stored_normalized_row() {
        let store = MockStore::new();
        store.insert_url("https://a.test/x");

        let status = check(&store, "ds", "https://a.test/x?utm=1").await;
        assert!(matches!(status, DedupStatus::Exists));
    }

    #[tokio::test]
    async fn raw_url_is_probed_when_it_differs() {
        let store = MockStore::new();
        // only the raw (tracked) form exists remotely
        store.insert_url("https://a.test/x?id=1");

        let status = check(&store, "ds", "https://a.test/x?id=1").await;
        assert!(matches!(status, DedupStatus::Exists));
        assert_eq!(
            store.lookups(),
            vec!["https://a.test/x", "https://a.test/x?id=1"]
        );
    }

    #[tokio::test]
    async fn identical_raw_and_normalized_probe_once() {
        let store = MockStore::new();
        let status = check(&store, "ds", "https://a.test/x").await;
        assert!(matches!(status, DedupStatus::Fresh));
        assert_eq!(store.lookups().len(), 1);
    }

    #[tokio::test]
    async fn lookup_error_yields_unverified() {
        let store = MockStore::new();
        store.fail_next_lookup(NotionError::Timeout);

        let status = check(&store, "ds", "https://a.test/x?utm=1").await;
        assert!(matches!(status, DedupStatus::Unverified(NotionError::Timeout)));
        // fail-open short-circuits before the raw probe
        assert_eq!(store.lookups().len(), 1);
    }
}
