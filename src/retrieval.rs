//! Retrieval service.
//!
//! Read-side counterpart of the commit pipeline: metadata lookups by
//! backing-store identifier and content streams by object name.  Both go
//! straight to the [`ObjectStore`]; nothing here re-verifies digests.

use std::sync::Arc;

use crate::store::object::{BlobStream, ObjectStore};

/// Metadata projection returned for identifier lookups; content is never
/// streamed through this view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataView {
    pub name: String,
    pub hash: String,
    pub creator: String,
    pub sys_id: String,
}

/// Serves lookups against the backing store.
pub struct RetrievalService {
    store: Arc<dyn ObjectStore>,
}

impl RetrievalService {
    pub fn new(store: Arc<dyn ObjectStore>) -> Self {
        Self { store }
    }

    /// Look up metadata by the store's native identifier.
    ///
    /// Repeated calls with the same valid id return identical views; an
    /// unknown or ill-formed id is a miss, never an error.
    pub async fn by_id(&self, id: &str) -> anyhow::Result<Option<MetadataView>> {
        let record = self.store.query_metadata_by_id(id).await?;
        Ok(record.map(|record| MetadataView {
            name: record.name,
            hash: record.hash,
            creator: record.creator,
            sys_id: record.sys_id,
        }))
    }

    /// Stream the most recently created blob with `name`.
    ///
    /// Read errors mid-stream surface through the returned stream and
    /// terminate it without completing the body.
    pub async fn by_name(&self, name: &str) -> anyhow::Result<Option<BlobStream>> {
        self.store.open_blob(name).await
    }
}
