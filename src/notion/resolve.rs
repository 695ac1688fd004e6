use tracing::warn;
use uuid::Uuid;

use super::{CollectionStore, NotionError};
use super::types::CollectionContext;

/// Resolve the target collection into a context the pipeline can query:
/// its id, its first queryable data source, and a non-empty property
/// schema. Older API shapes inline the schema on the collection; newer
/// ones require a second fetch against the data source.
pub async fn resolve_context(
    store: &dyn CollectionStore,
    collection_id: &str,
) -> Result<CollectionContext, NotionError> {
    let id = normalize_collection_id(collection_id);
    let collection = store.retrieve_collection(&id).await?;

    let Some(source) = collection.data_sources.first() else {
        return Err(NotionError::NoDataSource);
    };

    if !collection.properties.is_empty() {
        return Ok(CollectionContext {
            collection_id: collection.id,
            data_source_id: source.id.clone(),
            properties: collection.properties,
        });
    }

    let data_source = store.retrieve_data_source(&source.id).await?;
    if data_source.properties.is_empty() {
        return Err(NotionError::EmptySchema);
    }

    Ok(CollectionContext {
        collection_id: collection.id,
        data_source_id: data_source.id,
        properties: data_source.properties,
    })
}

/// Collection ids arrive hyphenated or as bare 32-hex strings. Anything
/// that parses as a UUID is canonicalized; anything else passes through
/// with a warning rather than failing the run here.
pub fn normalize_collection_id(raw: &str) -> String {
    let trimmed = raw.trim();
    match Uuid::try_parse(trimmed) {
        Ok(id) => id.hyphenated().to_string(),
        Err(_) => {
            warn!("collection id does not look like a UUID, using it as-is: {trimmed}");
            trimmed.to_string()
        }
    }
}
