//! Transaction handle shared by every storage call in a unit of work.
//!
//! A [`Tx`] wraps one redb transaction (read-only or writable) together with
//! the caller's [`CancelToken`] and any blob bytes staged during the
//! transaction. Storage functions take `&Tx`, so nested calls join the
//! caller's transaction instead of opening their own. [`Tx::end`] is the
//! single exit point: it commits or rolls back exactly once. A `Tx` dropped
//! without `end` (early return, panic) rolls back.
//!
//! Blob bytes cannot live inside the engine's transaction, so they are
//! written to temporary files in the blob root and renamed into place only
//! after the engine commit succeeded. Rollback deletes them.

use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use quire_types::Uid;
use redb::{
    ReadOnlyTable, ReadTransaction, ReadableTable, Table, TableError, TableHandle,
    WriteTransaction,
};
use tempfile::NamedTempFile;
use tracing::{debug, error};

use crate::bucket::Bucket;
use crate::cancel::CancelToken;
use crate::error::{StoreError, StoreResult};

type RawReadTable = ReadOnlyTable<&'static str, &'static [u8]>;
type RawWriteTable<'txn> = Table<'txn, &'static str, &'static [u8]>;

enum Access {
    Read(ReadTransaction),
    Write(WriteTransaction),
}

/// Blob bytes written during a transaction but not yet visible under their
/// final name.
struct StagedBlob {
    uid: Uid,
    file: NamedTempFile,
}

/// An open transaction.
pub struct Tx {
    access: Access,
    cancel: CancelToken,
    blob_root: PathBuf,
    staged: RefCell<Vec<StagedBlob>>,
}

impl Tx {
    pub(crate) fn new_read(tx: ReadTransaction, cancel: CancelToken, blob_root: PathBuf) -> Self {
        Self {
            access: Access::Read(tx),
            cancel,
            blob_root,
            staged: RefCell::new(Vec::new()),
        }
    }

    pub(crate) fn new_write(tx: WriteTransaction, cancel: CancelToken, blob_root: PathBuf) -> Self {
        Self {
            access: Access::Write(tx),
            cancel,
            blob_root,
            staged: RefCell::new(Vec::new()),
        }
    }

    pub fn is_writable(&self) -> bool {
        matches!(self.access, Access::Write(_))
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Fail with [`StoreError::Cancelled`] once the caller gave up.
    pub fn checkpoint(&self) -> StoreResult<()> {
        if self.cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        Ok(())
    }

    /// Fail with [`StoreError::TxPrivilege`] unless this transaction may write.
    pub fn require_writable(&self) -> StoreResult<()> {
        self.writer().map(|_| ())
    }

    fn writer(&self) -> StoreResult<&WriteTransaction> {
        self.checkpoint()?;
        match &self.access {
            Access::Write(tx) => Ok(tx),
            Access::Read(_) => Err(StoreError::TxPrivilege),
        }
    }

    // -----------------------------------------------------------------------
    // Raw bucket access
    // -----------------------------------------------------------------------

    pub(crate) fn get_raw(&self, bucket: Bucket, key: &str) -> StoreResult<Option<Vec<u8>>> {
        self.checkpoint()?;
        let value = match &self.access {
            Access::Read(tx) => get_from(&open_read(tx, bucket)?, key)?,
            Access::Write(tx) => get_from(&open_write(tx, bucket)?, key)?,
        };
        Ok(value)
    }

    pub(crate) fn put_raw(&self, bucket: Bucket, key: &str, value: &[u8]) -> StoreResult<()> {
        let tx = self.writer()?;
        let mut table = open_write(tx, bucket)?;
        table.insert(key, value)?;
        Ok(())
    }

    pub(crate) fn remove_raw(&self, bucket: Bucket, key: &str) -> StoreResult<bool> {
        let tx = self.writer()?;
        let mut table = open_write(tx, bucket)?;
        let removed = table.remove(key)?.is_some();
        Ok(removed)
    }

    /// Walk `bucket` from `start` (inclusive, newest key when `None`) towards
    /// older keys, returning at most `limit` values and the key of the next
    /// unread entry.
    pub(crate) fn scan_raw(
        &self,
        bucket: Bucket,
        start: Option<&str>,
        limit: usize,
    ) -> StoreResult<(Vec<Vec<u8>>, Option<String>)> {
        self.checkpoint()?;
        let page = match &self.access {
            Access::Read(tx) => scan_desc(&open_read(tx, bucket)?, start, limit)?,
            Access::Write(tx) => scan_desc(&open_write(tx, bucket)?, start, limit)?,
        };
        Ok(page)
    }

    // -----------------------------------------------------------------------
    // Blob bytes
    // -----------------------------------------------------------------------

    /// Write `data` to a temporary file that becomes `<root>/<uid>` on commit.
    pub(crate) fn stage_blob(&self, uid: Uid, data: &[u8]) -> StoreResult<()> {
        self.require_writable()?;
        let mut file = NamedTempFile::new_in(&self.blob_root)?;
        file.write_all(data)?;
        file.as_file().sync_all()?;

        let mut staged = self.staged.borrow_mut();
        staged.retain(|blob| blob.uid != uid);
        staged.push(StagedBlob { uid, file });
        debug!(blob = %uid, len = data.len(), "staged blob bytes");
        Ok(())
    }

    /// Read blob bytes, preferring bytes staged by this transaction.
    pub(crate) fn read_blob(&self, uid: &Uid) -> StoreResult<Option<Vec<u8>>> {
        self.checkpoint()?;
        if let Some(blob) = self.staged.borrow().iter().find(|blob| blob.uid == *uid) {
            return Ok(Some(fs::read(blob.file.path())?));
        }
        match fs::read(blob_path(&self.blob_root, uid)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    /// End the transaction with the outcome of the work done inside it.
    ///
    /// - `Err`: roll back and return the error unchanged. If the rollback
    ///   itself fails, the result is [`StoreError::TxEnd`] carrying the
    ///   original error.
    /// - `Ok` on a writable transaction: commit, then publish staged blobs.
    ///   [`StoreError::BlobPublish`] means the commit went through but a
    ///   blob file could not be renamed into place.
    /// - `Ok` on a read-only transaction: roll back (reads never commit).
    /// - Cancelled token: roll back and return [`StoreError::Cancelled`], even
    ///   when the work succeeded.
    pub fn end<T>(self, outcome: StoreResult<T>) -> StoreResult<T> {
        let outcome = match outcome {
            Ok(_) if self.cancel.is_cancelled() => Err(StoreError::Cancelled),
            other => other,
        };
        match outcome {
            Ok(value) => {
                self.commit()?;
                Ok(value)
            }
            Err(err) => match self.rollback() {
                Ok(()) => Err(err),
                Err(source) => Err(StoreError::TxEnd {
                    source,
                    original: Some(Box::new(err)),
                }),
            },
        }
    }

    fn commit(self) -> StoreResult<()> {
        let Tx {
            access,
            blob_root,
            staged,
            ..
        } = self;
        let tx = match access {
            Access::Read(tx) => {
                drop(tx);
                return Ok(());
            }
            Access::Write(tx) => tx,
        };

        tx.commit().map_err(|e| StoreError::TxEnd {
            source: e.into(),
            original: None,
        })?;

        // The records are durable from here on. Publish every staged file
        // even if one fails, and report the first failure.
        let staged = staged.into_inner();
        let published = staged.len();
        let mut failed = None;
        for blob in staged {
            let target = blob_path(&blob_root, &blob.uid);
            if let Err(e) = blob.file.persist(&target) {
                error!(blob = %blob.uid, error = %e.error, "committed blob bytes could not be published");
                failed.get_or_insert(StoreError::BlobPublish {
                    blob: blob.uid,
                    source: e.error,
                });
            }
        }
        if let Some(err) = failed {
            return Err(err);
        }
        debug!(blobs = published, "transaction committed");
        Ok(())
    }

    fn rollback(self) -> Result<(), redb::Error> {
        match self.access {
            Access::Read(tx) => drop(tx),
            Access::Write(tx) => tx.abort()?,
        }
        debug!("transaction rolled back");
        Ok(())
    }
}

impl std::fmt::Debug for Tx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tx")
            .field("writable", &self.is_writable())
            .field("staged_blobs", &self.staged.borrow().len())
            .finish()
    }
}

pub(crate) fn blob_path(root: &Path, uid: &Uid) -> PathBuf {
    root.join(uid.key())
}

fn open_read(tx: &ReadTransaction, bucket: Bucket) -> StoreResult<RawReadTable> {
    tx.open_table(bucket.definition()).map_err(|e| match e {
        TableError::TableDoesNotExist(_) => StoreError::BucketMissing(bucket.name()),
        other => other.into(),
    })
}

fn open_write(tx: &WriteTransaction, bucket: Bucket) -> StoreResult<RawWriteTable<'_>> {
    // Opening a table in a write transaction would silently create it.
    let exists = tx
        .list_tables()?
        .any(|handle| handle.name() == bucket.name());
    if !exists {
        return Err(StoreError::BucketMissing(bucket.name()));
    }
    Ok(tx.open_table(bucket.definition())?)
}

fn get_from<T>(table: &T, key: &str) -> Result<Option<Vec<u8>>, redb::StorageError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    Ok(table.get(key)?.map(|guard| guard.value().to_vec()))
}

fn scan_desc<T>(
    table: &T,
    start: Option<&str>,
    limit: usize,
) -> Result<(Vec<Vec<u8>>, Option<String>), redb::StorageError>
where
    T: ReadableTable<&'static str, &'static [u8]>,
{
    let range = match start {
        Some(start) => table.range::<&str>(..=start)?,
        None => table.range::<&str>(..)?,
    };
    let mut entries = range.rev();

    let mut values = Vec::new();
    while values.len() < limit {
        match entries.next() {
            Some(entry) => {
                let (_, value) = entry?;
                values.push(value.value().to_vec());
            }
            None => return Ok((values, None)),
        }
    }

    let cursor = match entries.next() {
        Some(entry) => {
            let (key, _) = entry?;
            Some(key.value().to_string())
        }
        None => None,
    };
    Ok((values, cursor))
}
