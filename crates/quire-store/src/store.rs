use std::fs;
use std::path::{Path, PathBuf};

use redb::Database;
use tracing::info;

use crate::blob::BlobStore;
use crate::bucket::Bucket;
use crate::cancel::CancelToken;
use crate::error::{StoreError, StoreResult};
use crate::page::PageStore;
use crate::page_version::PageVersionIndex;
use crate::site::SiteStore;
use crate::theme::ThemeStore;
use crate::tx::Tx;
use crate::version::VersionStore;

/// The database file plus the blob directory.
///
/// One writer transaction runs at a time (redb serializes them); readers
/// run concurrently against the snapshot that was committed when they
/// began. `Store` is `Send + Sync` and is usually shared behind an `Arc`.
pub struct Store {
    db: Database,
    blob_root: PathBuf,
}

impl Store {
    /// Open or create the database at `db_path`, create every bucket, and
    /// make sure `blob_root` exists.
    pub fn open(db_path: impl AsRef<Path>, blob_root: impl Into<PathBuf>) -> StoreResult<Self> {
        let db_path = db_path.as_ref();
        let blob_root = blob_root.into();
        fs::create_dir_all(&blob_root)?;

        let db = Database::create(db_path).map_err(redb::Error::from)?;
        let tx = db.begin_write().map_err(StoreError::TxOpen)?;
        for bucket in Bucket::ALL {
            tx.open_table(bucket.definition())?;
        }
        tx.commit().map_err(|e| StoreError::TxEnd {
            source: e.into(),
            original: None,
        })?;

        info!(db = %db_path.display(), blobs = %blob_root.display(), "store opened");
        Ok(Self { db, blob_root })
    }

    pub fn blob_root(&self) -> &Path {
        &self.blob_root
    }

    /// Open a transaction. Blocks while another writer is active when
    /// `writable` is set.
    pub fn begin(&self, writable: bool, cancel: &CancelToken) -> StoreResult<Tx> {
        if cancel.is_cancelled() {
            return Err(StoreError::Cancelled);
        }
        let tx = if writable {
            let tx = self.db.begin_write().map_err(StoreError::TxOpen)?;
            Tx::new_write(tx, cancel.clone(), self.blob_root.clone())
        } else {
            let tx = self.db.begin_read().map_err(StoreError::TxOpen)?;
            Tx::new_read(tx, cancel.clone(), self.blob_root.clone())
        };
        Ok(tx)
    }

    /// Run `f` inside a read-only transaction.
    pub fn read<T>(&self, f: impl FnOnce(&Tx) -> StoreResult<T>) -> StoreResult<T> {
        let tx = self.begin(false, &CancelToken::new())?;
        let outcome = f(&tx);
        tx.end(outcome)
    }

    /// Run `f` inside a writable transaction that commits only if `f`
    /// succeeds and `cancel` has not fired.
    pub fn write<T>(
        &self,
        cancel: &CancelToken,
        f: impl FnOnce(&Tx) -> StoreResult<T>,
    ) -> StoreResult<T> {
        let tx = self.begin(true, cancel)?;
        let outcome = f(&tx);
        tx.end(outcome)
    }

    pub fn sites(&self) -> SiteStore {
        SiteStore
    }

    pub fn pages(&self) -> PageStore {
        PageStore
    }

    pub fn versions(&self) -> VersionStore {
        VersionStore
    }

    pub fn themes(&self) -> ThemeStore {
        ThemeStore
    }

    pub fn blobs(&self) -> BlobStore {
        BlobStore
    }

    pub fn page_versions(&self) -> PageVersionIndex {
        PageVersionIndex
    }
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("blob_root", &self.blob_root)
            .finish()
    }
}

/// Fresh store in a temporary directory. The directory must outlive the
/// store.
#[cfg(test)]
pub(crate) fn test_store() -> (tempfile::TempDir, Store) {
    let dir = tempfile::tempdir().unwrap();
    let store = Store::open(dir.path().join("quire.redb"), dir.path().join("content")).unwrap();
    (dir, store)
}
