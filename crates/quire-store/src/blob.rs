//! Content blobs: a digest record in the `blobs` bucket plus the raw bytes
//! in a file under the blob root.

use quire_types::{Blob, ContentHash, Uid};
use tracing::debug;

use crate::bucket::Bucket;
use crate::document;
use crate::error::{StoreError, StoreResult};
use crate::tx::Tx;

/// Blob operations. Stateless; every call runs in the caller's transaction.
#[derive(Clone, Copy, Debug, Default)]
pub struct BlobStore;

impl BlobStore {
    /// Store `data` under a fresh uid.
    pub fn create(&self, tx: &Tx, data: &[u8]) -> StoreResult<Blob> {
        let blob = Blob {
            uid: Uid::new(),
            hash: ContentHash::compute(data),
        };
        self.write(tx, &blob, data)?;
        debug!(blob = %blob.uid, hash = %blob.hash.short_hex(), "blob created");
        Ok(blob)
    }

    /// The blob record, without its bytes.
    pub fn get_blob(&self, tx: &Tx, uid: &Uid) -> StoreResult<Blob> {
        document::one(tx, Bucket::Blobs, &uid.key())
    }

    /// The blob's bytes.
    pub fn get(&self, tx: &Tx, uid: &Uid) -> StoreResult<Vec<u8>> {
        // The record is the source of truth; a file without one is garbage.
        self.get_blob(tx, uid)?;
        tx.read_blob(uid)?.ok_or_else(|| StoreError::NotFound {
            bucket: Bucket::Blobs.name(),
            key: uid.key(),
        })
    }

    /// Replace the bytes of an existing blob and recompute its digest.
    ///
    /// Always rewrites; use [`Blob::matches`] first to skip unchanged content.
    pub fn update(&self, tx: &Tx, uid: &Uid, data: &[u8]) -> StoreResult<Blob> {
        let mut blob = self.get_blob(tx, uid)?;
        blob.hash = ContentHash::compute(data);
        self.write(tx, &blob, data)?;
        debug!(blob = %blob.uid, hash = %blob.hash.short_hex(), "blob updated");
        Ok(blob)
    }

    fn write(&self, tx: &Tx, blob: &Blob, data: &[u8]) -> StoreResult<()> {
        tx.require_writable()?;
        tx.stage_blob(blob.uid, data)?;
        document::save(tx, Bucket::Blobs, &blob.uid.key(), blob)
    }
}
