//! Reverse index from page uid to the set of versions whose path map
//! contains it.
//!
//! The set is stored as one JSON array per page, sorted because `Uid` sorts
//! by creation time. A page with no memberships has no entry at all.

use std::collections::BTreeSet;

use quire_types::{Uid, Version};
use tracing::trace;

use crate::bucket::Bucket;
use crate::document;
use crate::error::StoreResult;
use crate::tx::Tx;

#[derive(Clone, Copy, Debug, Default)]
pub struct PageVersionIndex;

impl PageVersionIndex {
    /// Versions currently referencing `page`. Empty when unindexed.
    pub fn versions(&self, tx: &Tx, page: &Uid) -> StoreResult<BTreeSet<Uid>> {
        let set = document::find(tx, Bucket::PageVersions, &page.key())?;
        Ok(set.unwrap_or_default())
    }

    pub fn add(&self, tx: &Tx, page: &Uid, version: &Uid) -> StoreResult<()> {
        let mut set = self.versions(tx, page)?;
        if set.insert(*version) {
            trace!(page = %page, version = %version, "index membership added");
            document::save(tx, Bucket::PageVersions, &page.key(), &set)?;
        }
        Ok(())
    }

    pub fn remove(&self, tx: &Tx, page: &Uid, version: &Uid) -> StoreResult<()> {
        let mut set = self.versions(tx, page)?;
        if !set.remove(version) {
            return Ok(());
        }
        trace!(page = %page, version = %version, "index membership removed");
        if set.is_empty() {
            document::remove(tx, Bucket::PageVersions, &page.key())?;
        } else {
            document::save(tx, Bucket::PageVersions, &page.key(), &set)?;
        }
        Ok(())
    }

    /// Register every page of `version`.
    pub fn add_version(&self, tx: &Tx, version: &Version) -> StoreResult<()> {
        for page in version.page_uids() {
            self.add(tx, &page, &version.uid)?;
        }
        Ok(())
    }
}
