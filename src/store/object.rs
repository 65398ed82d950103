//! Abstract backing-store trait.
//!
//! Every backing store must implement [`ObjectStore`].  The trait works in
//! terms of opaque byte buffers and streams so callers do not need to know
//! the underlying medium.  Blob creation and metadata insertion are
//! deliberately separate operations; the commit pipeline owns atomicity
//! across them via a compensating delete.

use bytes::Bytes;
use std::future::Future;
use std::pin::Pin;

use crate::meta::FileProperty;

/// A blob's content, yielded as a fallible chunk stream so read errors
/// mid-stream reach the consumer.
pub type BlobStream = Pin<Box<dyn futures::Stream<Item = std::io::Result<Bytes>> + Send>>;

/// The durable record for a committed object: the store-assigned blob
/// reference plus the verified user-declared metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRecord {
    /// Globally unique identifier, assigned by the store at blob creation.
    pub reference: String,
    /// Declared object name (not unique).
    pub name: String,
    /// Declared creator.
    pub creator: String,
    /// Hex-encoded SHA-256 digest, verified at commit time.
    pub hash: String,
    /// Declared system identifier.
    pub sys_id: String,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

/// Async backing-store contract.
pub trait ObjectStore: Send + Sync + 'static {
    /// Allocate a new blob named `name` holding `data`, returning the
    /// store-assigned unique reference.
    fn create_blob(
        &self,
        name: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>>;

    /// Delete the blob at `reference`.  Deleting an unknown reference is a
    /// no-op so the compensation path stays idempotent.
    fn delete_blob(
        &self,
        reference: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Write one metadata record indexed by `reference`.  No uniqueness is
    /// enforced on `name`, `creator` or `sys_id`.
    fn insert_metadata(
        &self,
        reference: &str,
        property: &FileProperty,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>>;

    /// Look up a metadata record by the store's native identifier.  Ids
    /// that do not lexically match the identifier format yield `None`
    /// rather than an error.
    fn query_metadata_by_id(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>>;

    /// Open the most recently created blob with `name` for sequential read.
    fn open_blob(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BlobStream>>> + Send + '_>>;
}

/// Current RFC 3339 timestamp with millisecond precision.
pub(crate) fn now_rfc3339() -> String {
    chrono::Utc::now()
        .to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
