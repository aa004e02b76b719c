//! Typed access to a bucket.
//!
//! Records are encoded whole with `serde_json`; there are no partial-field
//! updates, callers read, modify, and save.

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::bucket::Bucket;
use crate::error::{StoreError, StoreResult};
use crate::tx::Tx;

/// Load the record under `key`, failing with [`StoreError::NotFound`].
pub fn one<T: DeserializeOwned>(tx: &Tx, bucket: Bucket, key: &str) -> StoreResult<T> {
    find(tx, bucket, key)?.ok_or_else(|| StoreError::NotFound {
        bucket: bucket.name(),
        key: key.to_string(),
    })
}

/// Load the record under `key` if present.
pub fn find<T: DeserializeOwned>(tx: &Tx, bucket: Bucket, key: &str) -> StoreResult<Option<T>> {
    match tx.get_raw(bucket, key)? {
        Some(bytes) => decode(bucket, key, &bytes).map(Some),
        None => Ok(None),
    }
}

pub fn save<T: Serialize>(tx: &Tx, bucket: Bucket, key: &str, record: &T) -> StoreResult<()> {
    let bytes = serde_json::to_vec(record)
        .map_err(|e| StoreError::Serialization(format!("encode {bucket}/{key}: {e}")))?;
    tx.put_raw(bucket, key, &bytes)
}

/// Delete `key`. Returns whether anything was removed.
pub fn remove(tx: &Tx, bucket: Bucket, key: &str) -> StoreResult<bool> {
    tx.remove_raw(bucket, key)
}

/// Newest-first page of records.
///
/// Starts at `start` (inclusive) or at the newest key, and returns at most
/// `limit` records together with the key to pass as `start` for the next
/// page. The cursor is `None` once the bucket is exhausted.
pub fn many<T: DeserializeOwned>(
    tx: &Tx,
    bucket: Bucket,
    start: Option<&str>,
    limit: usize,
) -> StoreResult<(Vec<T>, Option<String>)> {
    let (raw, cursor) = tx.scan_raw(bucket, start, limit)?;
    let records = raw
        .iter()
        .map(|bytes| decode(bucket, "<scan>", bytes))
        .collect::<StoreResult<Vec<T>>>()?;
    Ok((records, cursor))
}

fn decode<T: DeserializeOwned>(bucket: Bucket, key: &str, bytes: &[u8]) -> StoreResult<T> {
    serde_json::from_slice(bytes)
        .map_err(|e| StoreError::Serialization(format!("decode {bucket}/{key}: {e}")))
}
