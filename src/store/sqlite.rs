//! SQLite-backed object store.
//!
//! Uses `rusqlite` with the `bundled` feature so no system SQLite library
//! is required.  All async trait methods are thin wrappers around
//! synchronous rusqlite calls executed under a `Mutex`.
//!
//! Blob content lives in the `blobs` table; the metadata index lives in
//! `file_meta`.  The two are inserted by separate statements on purpose:
//! the commit pipeline compensates when the second step fails.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;

use bytes::Bytes;
use rusqlite::{params, Connection, OptionalExtension};

use super::object::{now_rfc3339, BlobStream, FileRecord, ObjectStore};
use crate::meta::FileProperty;

/// Object store backed by a single SQLite database file.
pub struct SqliteObjectStore {
    /// The database connection, guarded by a mutex for Send + Sync.
    conn: Mutex<Connection>,
}

impl SqliteObjectStore {
    /// Open (or create) the database at `path` and initialize the schema.
    ///
    /// Passing `":memory:"` creates an in-memory database (useful for tests).
    pub fn new(path: &str) -> anyhow::Result<Self> {
        let conn = Connection::open(path)?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.apply_pragmas()?;
        store.init_db()?;
        Ok(store)
    }

    /// Apply recommended SQLite pragmas for performance and safety.
    fn apply_pragmas(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA busy_timeout = 5000;
            ",
        )?;
        Ok(())
    }

    /// Create the required tables and indexes if they do not already exist.
    /// Idempotent, safe to call on every startup.
    fn init_db(&self) -> anyhow::Result<()> {
        let conn = self.conn.lock().expect("mutex poisoned");
        conn.execute_batch(
            "
            -- Blob content
            CREATE TABLE IF NOT EXISTS blobs (
                reference  TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                content    BLOB NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_blobs_name
                ON blobs(name);

            -- Metadata index
            CREATE TABLE IF NOT EXISTS file_meta (
                reference  TEXT PRIMARY KEY,
                name       TEXT NOT NULL,
                creator    TEXT NOT NULL,
                hash       TEXT NOT NULL,
                sys_id     TEXT NOT NULL,
                created_at TEXT NOT NULL,

                FOREIGN KEY (reference) REFERENCES blobs(reference) ON DELETE CASCADE
            );
            ",
        )?;
        Ok(())
    }
}

impl ObjectStore for SqliteObjectStore {
    fn create_blob(
        &self,
        name: &str,
        data: Bytes,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<String>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            let reference = uuid::Uuid::new_v4().to_string();
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO blobs (reference, name, content, created_at) VALUES (?1, ?2, ?3, ?4)",
                params![reference, name, data.as_ref(), now_rfc3339()],
            )?;
            Ok(reference)
        })
    }

    fn delete_blob(
        &self,
        reference: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send + '_>> {
        let reference = reference.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute("DELETE FROM blobs WHERE reference = ?1", params![reference])?;
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
            let conn = self.conn.lock().expect("mutex poisoned");
            conn.execute(
                "INSERT INTO file_meta (reference, name, creator, hash, sys_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    reference,
                    property.name,
                    property.creator,
                    property.hash,
                    property.sys_id,
                    now_rfc3339()
                ],
            )?;
            Ok(())
        })
    }

    fn query_metadata_by_id(
        &self,
        id: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<FileRecord>>> + Send + '_>> {
        let id = id.to_string();
        Box::pin(async move {
            // Ids that are not well-formed references are a miss, not an error.
            if uuid::Uuid::parse_str(&id).is_err() {
                return Ok(None);
            }

            let conn = self.conn.lock().expect("mutex poisoned");
            let record = conn
                .query_row(
                    "SELECT reference, name, creator, hash, sys_id, created_at
                     FROM file_meta WHERE reference = ?1",
                    params![id],
                    |row| {
                        Ok(FileRecord {
                            reference: row.get(0)?,
                            name: row.get(1)?,
                            creator: row.get(2)?,
                            hash: row.get(3)?,
                            sys_id: row.get(4)?,
                            created_at: row.get(5)?,
                        })
                    },
                )
                .optional()?;
            Ok(record)
        })
    }

    fn open_blob(
        &self,
        name: &str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Option<BlobStream>>> + Send + '_>> {
        let name = name.to_string();
        Box::pin(async move {
            let conn = self.conn.lock().expect("mutex poisoned");
            // Duplicate names are allowed; the most recently created wins.
            let content: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT content FROM blobs WHERE name = ?1 ORDER BY rowid DESC LIMIT 1",
                    params![name],
                    |row| row.get(0),
                )
                .optional()?;

            Ok(content.map(|bytes| {
                let chunks = vec![Ok::<_, std::io::Error>(Bytes::from(bytes))];
                Box::pin(futures::stream::iter(chunks)) as BlobStream
            }))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    fn test_store() -> SqliteObjectStore {
        SqliteObjectStore::new(":memory:").expect("failed to create in-memory store")
    }

    fn make_property(name: &str, hash: &str) -> FileProperty {
        FileProperty {
            name: name.to_string(),
            hash: hash.to_string(),
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
    async fn test_schema_idempotent() {
        let store = test_store();
        store.init_db().expect("second init_db failed");
    }

    #[tokio::test]
    async fn test_create_blob_assigns_unique_references() {
        let store = test_store();
        let a = store.create_blob("a.bin", Bytes::from("one")).await.unwrap();
        let b = store.create_blob("a.bin", Bytes::from("two")).await.unwrap();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[tokio::test]
    async fn test_insert_and_query_metadata() {
        let store = test_store();
        let reference = store
            .create_blob("a.bin", Bytes::from("data"))
            .await
            .unwrap();
        store
            .insert_metadata(&reference, &make_property("a.bin", "deadbeef"))
            .await
            .unwrap();

        let record = store
            .query_metadata_by_id(&reference)
            .await
            .unwrap()
            .expect("record missing");
        assert_eq!(record.reference, reference);
        assert_eq!(record.name, "a.bin");
        assert_eq!(record.hash, "deadbeef");
        assert_eq!(record.creator, "u1");
        assert_eq!(record.sys_id, "s1");

        // Idempotent: a second query returns the identical record.
        let again = store
            .query_metadata_by_id(&reference)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again, record);
    }

    #[tokio::test]
    async fn test_query_with_non_uuid_id_is_miss() {
        let store = test_store();
        assert_eq!(store.query_metadata_by_id("not-a-uuid").await.unwrap(), None);
        assert_eq!(store.query_metadata_by_id("").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_query_unknown_id_is_miss() {
        let store = test_store();
        let id = uuid::Uuid::new_v4().to_string();
        assert_eq!(store.query_metadata_by_id(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_open_blob_returns_content() {
        let store = test_store();
        store
            .create_blob("a.bin", Bytes::from("payload"))
            .await
            .unwrap();

        let stream = store.open_blob("a.bin").await.unwrap().expect("blob missing");
        assert_eq!(read_stream(stream).await, b"payload");
    }

    #[tokio::test]
    async fn test_open_blob_latest_wins_on_duplicate_names() {
        let store = test_store();
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
    async fn test_open_blob_unknown_name_is_miss() {
        let store = test_store();
        assert!(store.open_blob("nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_blob_cascades_metadata() {
        let store = test_store();
        let reference = store
            .create_blob("a.bin", Bytes::from("data"))
            .await
            .unwrap();
        store
            .insert_metadata(&reference, &make_property("a.bin", "deadbeef"))
            .await
            .unwrap();

        store.delete_blob(&reference).await.unwrap();
        assert!(store.open_blob("a.bin").await.unwrap().is_none());
        assert_eq!(store.query_metadata_by_id(&reference).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_unknown_blob_is_ok() {
        let store = test_store();
        let id = uuid::Uuid::new_v4().to_string();
        store.delete_blob(&id).await.unwrap();
    }

    #[tokio::test]
    async fn test_duplicate_metadata_reference_rejected() {
        let store = test_store();
        let reference = store
            .create_blob("a.bin", Bytes::from("data"))
            .await
            .unwrap();
        store
            .insert_metadata(&reference, &make_property("a.bin", "deadbeef"))
            .await
            .unwrap();

        let err = store
            .insert_metadata(&reference, &make_property("a.bin", "deadbeef"))
            .await;
        assert!(err.is_err());
    }
}
