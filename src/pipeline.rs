//! Verified commit pipeline.
//!
//! The sole correctness gate of the gateway: no object becomes discoverable
//! unless the digest computed over the staged bytes matches the digest the
//! client declared.  The pipeline stages the body, verifies it, then runs
//! the two-step create-blob / insert-metadata commit with a compensating
//! delete so a metadata failure cannot leave an orphaned blob behind.

use std::sync::Arc;

use bytes::Bytes;
use tracing::{error, info, warn};

use crate::errors::GatewayError;
use crate::meta::RequestMeta;
use crate::staging::StagingArea;
use crate::store::object::{FileRecord, ObjectStore};

/// Result of a pipeline run that did not fail.
#[derive(Debug)]
pub enum CommitOutcome {
    /// The object was verified and committed.
    Stored(FileRecord),
    /// The property set was incomplete; nothing was stored.  Callers keep
    /// observing an overall "success" status for backward compatibility,
    /// but the outcome is distinct so non-creation can be asserted.
    Skipped { missing: Vec<&'static str> },
}

/// Orchestrates stage → digest → compare → commit-or-reject.
pub struct CommitPipeline {
    staging: StagingArea,
    store: Arc<dyn ObjectStore>,
}

impl CommitPipeline {
    pub fn new(staging: StagingArea, store: Arc<dyn ObjectStore>) -> Self {
        Self { staging, store }
    }

    /// Stage `body`, verify its SHA-256 digest against the declared hash,
    /// and commit the blob plus metadata on a match.
    ///
    /// The staged file is removed on every path: success, mismatch and
    /// storage failure.
    pub async fn commit_atomic(
        &self,
        meta: &RequestMeta,
        body: Bytes,
    ) -> Result<CommitOutcome, GatewayError> {
        let property = &meta.property;

        if !property.is_valid() {
            let missing = property.missing_fields();
            warn!(?missing, "upload skipped: incomplete property set");
            return Ok(CommitOutcome::Skipped { missing });
        }

        // The range header, when present, is advisory: the body is always
        // treated as a complete, single-shot transfer.
        let staged = self.staging.create(&property.name)?;
        staged.write(&body).map_err(GatewayError::Storage)?;

        let computed = staged.sha256_hex().map_err(GatewayError::Storage)?;
        if computed != property.hash {
            return Err(GatewayError::HashMismatch {
                declared: property.hash.clone(),
                computed,
            });
        }

        let content = staged.read_all().map_err(GatewayError::Storage)?;
        let reference = self
            .store
            .create_blob(&property.name, Bytes::from(content))
            .await
            .map_err(GatewayError::Storage)?;

        if let Err(err) = self.store.insert_metadata(&reference, property).await {
            // Compensate: without its metadata the blob must not stay behind.
            if let Err(delete_err) = self.store.delete_blob(&reference).await {
                error!(
                    reference = %reference,
                    error = %delete_err,
                    "failed to delete blob while compensating metadata failure"
                );
            }
            return Err(GatewayError::Storage(err));
        }

        let record = self
            .store
            .query_metadata_by_id(&reference)
            .await
            .map_err(GatewayError::Storage)?
            .ok_or_else(|| {
                GatewayError::Storage(anyhow::anyhow!(
                    "metadata record not visible after insert"
                ))
            })?;

        info!(
            reference = %reference,
            name = %property.name,
            "object verified and committed"
        );
        staged.remove();

        Ok(CommitOutcome::Stored(record))
    }
}
