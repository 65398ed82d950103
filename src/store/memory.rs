//! In-memory object store.
//!
//! Keeps blobs and metadata in process memory behind a `Mutex`.  Used by
//! tests and by the `memory` backend config for ephemeral deployments.
//! Blobs are held in insertion order so "most recently created wins" is
//! well defined for duplicate names.

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use bytes::Bytes;

use super::object::{now_rfc3339, BlobStream, FileRecord, ObjectStore};
use crate::meta::FileProperty;

#[derive(Debug, Clone)]
struct BlobEntry {
    reference: String,
    name: String,
    data: Bytes,
}

#[derive(Default)]
struct Inner {
    blobs: Vec<BlobEntry>,
    meta: HashMap<String, FileRecord>,
}

/// Object store holding everything in memory.
#[derive(Default)]
pub struct MemoryObjectStore {
    inner: Mutex<Inner>,
}

impl MemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ObjectStore for MemoryObjectStore {
    fn create_blob(
        &self,
        name: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            let reference = uuid::Uuid::new_v4().to_string();
            let mut inner = self.inner.lock().expect("mutex poisoned");
            inner.blobs.push(BlobEntry {
                reference: reference.clone(),
                name,
                data,
            });
            Ok(reference)
        })
    }

    fn delete_blob(
        &self,
        reference: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let reference = reference.to_string();
        Box::pin(async move {
            let mut inner = self.inner.lock().expect("mutex poisoned");
            inner.blobs.retain(|blob| blob.reference != reference);
            inner.meta.remove(&reference);
            Ok(())
        })
    }

    fn insert_metadata(
        &self,
        reference: &str,
        property: &FileProperty,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let reference = reference.to_string();
        let property = property.clone();
        Box::pin(async move {
            let mut inner = self.inner.lock().expect("mutex poisoned");
            if inner.meta.contains_key(&reference) {
                anyhow::bail!("metadata already exists for reference {reference}");
            }
            inner.meta.insert(
                reference.clone(),
                FileRecord {
                    reference,
                    name: property.name,
                    creator: property.creator,
                    hash: property.hash,
                    sys_id: property.sys_id,
                    created_at: now_rfc3339(),
                },
            );
            Ok(())
        })
    }

    fn query_metadata_by_id(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            if uuid::Uuid::parse_str(&id).is_err() {
                return Ok(None);
            }
            let inner = self.inner.lock().expect("mutex poisoned");
            Ok(inner.meta.get(&id).cloned())
        })
    }

    fn open_blob(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BlobStream>>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            let inner = self.inner.lock().expect("mutex poisoned");
            let data = inner
                .blobs
                .iter()
                .rev()
                .find(|blob| blob.name == name)
                .map(|blob| blob.data.clone());

            Ok(data.map(|bytes| {
                let chunks = vec![Ok::<_, std::io::Error>(bytes)];
                Box::pin(futures::stream::iter(chunks)) as BlobStream
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn make_property(name: &str) -> FileProperty {
        FileProperty {
            name: name.to_string(),
            hash: "deadbeef".to_string(),
            creator: "u1".to_string(),
            sys_id: "s1".to_string(),
        }
    }

    async fn read_stream(mut stream: BlobStream) -> Vec<u8> {
        let mut data = Vec::new();
        while let Some(chunk) = stream.next().await {
            data.extend_from_slice(&chunk.expect("stream read failed"));
        }
        data
    }

    #[tokio::test]
    async fn test_roundtrip() {
        let store = MemoryObjectStore::new();
        let reference = store
            .create_blob("a.bin", Bytes::from("payload"))
            .await
            .unwrap();
        store
            .insert_metadata(&reference, &make_property("a.bin"))
            .await
            .unwrap();

        let record = store
            .query_metadata_by_id(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.name, "a.bin");

        let stream = store.open_blob("a.bin").await.unwrap().unwrap();
        assert_eq!(read_stream(stream).await, b"payload");
    }

    #[tokio::test]
    async fn test_latest_wins_on_duplicate_names() {
        let store = MemoryObjectStore::new();
        store
            .create_blob("dup.bin", Bytes::from("old"))
            .await
            .unwrap();
        store
            .create_blob("dup.bin", Bytes::from("new"))
            .await
            .unwrap();

        let stream = store.open_blob("dup.bin").await.unwrap().unwrap();
        assert_eq!(read_stream(stream).await, b"new");
    }

    #[tokio::test]
    async fn test_delete_blob_removes_both() {
        let store = MemoryObjectStore::new();
        let reference = store
            .create_blob("a.bin", Bytes::from("data"))
            .await
            .unwrap();
        store
            .insert_metadata(&reference, &make_property("a.bin"))
            .await
            .unwrap();

        store.delete_blob(&reference).await.unwrap();
        assert!(store.open_blob("a.bin").await.unwrap().is_none());
        assert!(store
            .query_metadata_by_id(&reference)
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_non_uuid_id_is_miss() {
        let store = MemoryObjectStore::new();
        assert!(store
            .query_metadata_by_id("not-a-uuid")
            .await
            .unwrap()
            .is_none());
    }
}
